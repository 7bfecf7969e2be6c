//! Paged read access to ingested shows

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::{Json, Router, routing::get};
use serde::Deserialize;
use tracing::info;

use crate::api::AppState;
use crate::db::ShowWithCast;

#[derive(Debug, Deserialize)]
pub struct ShowPageQuery {
    #[serde(default = "default_page_size")]
    pub page_size: i64,
    #[serde(default = "default_page")]
    pub page: i64,
}

fn default_page_size() -> i64 {
    25
}

fn default_page() -> i64 {
    1
}

/// List persisted shows with their cast, one page at a time
async fn list_shows(
    State(state): State<AppState>,
    Query(query): Query<ShowPageQuery>,
) -> Result<Json<Vec<ShowWithCast>>, (StatusCode, String)> {
    let max = state.config.max_entries_per_page;
    if query.page_size > max {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("page_size is greater than the allowed page size of {max}."),
        ));
    }
    if query.page_size < 1 || query.page < 1 {
        return Err((
            StatusCode::BAD_REQUEST,
            "page_size and page must be positive.".to_string(),
        ));
    }

    info!(
        page_size = query.page_size,
        page = query.page,
        "Retrieving shows page"
    );

    let shows = state
        .db
        .shows()
        .list_paged(query.page_size, query.page)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to list shows: {e}"),
            )
        })?;

    Ok(Json(shows))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/shows", get(list_shows))
}
