//! In-memory fakes for the scheduler's two seams: the upstream catalog
//! source and the persistence collaborator.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use showvault::config::{Config, RetryConfig, StalePeriod};
use showvault::db::{CastMemberRecord, CatalogStore, PendingFetchRecord, UpsertShow};
use showvault::services::catalog::{
    CastEntry, CatalogDelta, CatalogDeltaEntry, CatalogError, CatalogSource, Person, ShowDetail,
    StatusCode,
};

pub fn status_error(code: u16) -> CatalogError {
    CatalogError::Status(StatusCode::from_u16(code).expect("valid status code"))
}

pub fn delta_of(pairs: &[(i64, i64)]) -> CatalogDelta {
    CatalogDelta(
        pairs
            .iter()
            .map(|&(show_id, updated_at_ms)| CatalogDeltaEntry {
                show_id,
                updated_at_ms,
            })
            .collect(),
    )
}

pub fn test_config(batch_limit: usize, period: StalePeriod) -> Config {
    Config {
        port: 0,
        database_url: String::new(),
        catalog_base_url: String::new(),
        fetch_batch_limit: batch_limit,
        stale_refresh_period: period,
        retry: RetryConfig::default(),
        max_entries_per_page: 25,
    }
}

/// Scripted upstream catalog. Unscripted shows respond 404.
pub struct FakeCatalog {
    pub full_delta: Mutex<Result<CatalogDelta, u16>>,
    pub since_delta: Mutex<Result<CatalogDelta, u16>>,
    pub details: Mutex<HashMap<i64, Result<String, u16>>>,
    pub casts: Mutex<HashMap<i64, Result<Vec<(i64, String)>, u16>>>,
    pub calls: Mutex<Vec<String>>,
    /// When set, fetching this show's detail cancels the token first.
    pub cancel_on_detail: Mutex<Option<(i64, CancellationToken)>>,
}

impl Default for FakeCatalog {
    fn default() -> Self {
        Self {
            full_delta: Mutex::new(Ok(CatalogDelta::default())),
            since_delta: Mutex::new(Ok(CatalogDelta::default())),
            details: Mutex::new(HashMap::new()),
            casts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            cancel_on_detail: Mutex::new(None),
        }
    }
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_full_delta(self, delta: CatalogDelta) -> Self {
        *self.full_delta.lock().unwrap() = Ok(delta);
        self
    }

    pub fn with_since_delta(self, delta: CatalogDelta) -> Self {
        *self.since_delta.lock().unwrap() = Ok(delta);
        self
    }

    pub fn with_failing_deltas(self, code: u16) -> Self {
        *self.full_delta.lock().unwrap() = Err(code);
        *self.since_delta.lock().unwrap() = Err(code);
        self
    }

    pub fn with_show(self, show_id: i64, name: &str) -> Self {
        self.details
            .lock()
            .unwrap()
            .insert(show_id, Ok(name.to_string()));
        self.casts.lock().unwrap().entry(show_id).or_insert(Ok(Vec::new()));
        self
    }

    pub fn with_cast(self, show_id: i64, cast: &[(i64, &str)]) -> Self {
        self.casts.lock().unwrap().insert(
            show_id,
            Ok(cast.iter().map(|&(id, n)| (id, n.to_string())).collect()),
        );
        self
    }

    pub fn with_detail_failure(self, show_id: i64, code: u16) -> Self {
        self.details.lock().unwrap().insert(show_id, Err(code));
        self
    }

    pub fn with_cast_failure(self, show_id: i64, code: u16) -> Self {
        self.casts.lock().unwrap().insert(show_id, Err(code));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl CatalogSource for FakeCatalog {
    async fn show_updates(
        &self,
        since: Option<StalePeriod>,
    ) -> Result<CatalogDelta, CatalogError> {
        self.record(format!("updates since={since:?}"));
        let slot = if since.is_some() {
            &self.since_delta
        } else {
            &self.full_delta
        };
        match &*slot.lock().unwrap() {
            Ok(delta) => Ok(delta.clone()),
            Err(code) => Err(status_error(*code)),
        }
    }

    async fn show_detail(&self, show_id: i64) -> Result<ShowDetail, CatalogError> {
        self.record(format!("detail {show_id}"));
        if let Some((id, token)) = &*self.cancel_on_detail.lock().unwrap() {
            if *id == show_id {
                token.cancel();
            }
        }
        match self.details.lock().unwrap().get(&show_id) {
            Some(Ok(name)) => Ok(ShowDetail {
                id: show_id,
                name: name.clone(),
            }),
            Some(Err(code)) => Err(status_error(*code)),
            None => Err(status_error(404)),
        }
    }

    async fn show_cast(&self, show_id: i64) -> Result<Vec<CastEntry>, CatalogError> {
        self.record(format!("cast {show_id}"));
        match self.casts.lock().unwrap().get(&show_id) {
            Some(Ok(cast)) => Ok(cast
                .iter()
                .map(|(id, name)| CastEntry {
                    person: Person {
                        id: *id,
                        name: name.clone(),
                        birthday: None,
                    },
                })
                .collect()),
            Some(Err(code)) => Err(status_error(*code)),
            None => Err(status_error(404)),
        }
    }
}

/// In-memory persistence collaborator preserving enqueue order.
#[derive(Default)]
pub struct FakeStore {
    pub shows: Mutex<Vec<(i64, String)>>,
    pub cast: Mutex<Vec<CastMemberRecord>>,
    pub links: Mutex<Vec<(i64, i64, i32)>>,
    pub pending: Mutex<Vec<i64>>,
    pub bulk_removals: Mutex<Vec<Vec<i64>>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_pending(&self, show_ids: &[i64]) {
        self.pending.lock().unwrap().extend_from_slice(show_ids);
    }

    pub fn show_names(&self) -> Vec<(i64, String)> {
        self.shows.lock().unwrap().clone()
    }

    pub fn has_show(&self, show_id: i64) -> bool {
        self.shows.lock().unwrap().iter().any(|(id, _)| *id == show_id)
    }

    pub fn pending_order(&self) -> Vec<i64> {
        self.pending.lock().unwrap().clone()
    }

    pub fn bulk_removals(&self) -> Vec<Vec<i64>> {
        self.bulk_removals.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogStore for FakeStore {
    async fn show_ids(&self) -> Result<Vec<i64>> {
        Ok(self.shows.lock().unwrap().iter().map(|(id, _)| *id).collect())
    }

    async fn upsert_show(&self, show: &UpsertShow) -> Result<()> {
        let mut shows = self.shows.lock().unwrap();
        match shows.iter_mut().find(|(id, _)| *id == show.id) {
            Some(existing) => existing.1 = show.name.clone(),
            None => shows.push((show.id, show.name.clone())),
        }
        Ok(())
    }

    async fn remove_show(&self, show_id: i64) -> Result<()> {
        self.shows.lock().unwrap().retain(|(id, _)| *id != show_id);
        self.links.lock().unwrap().retain(|(id, _, _)| *id != show_id);
        Ok(())
    }

    async fn upsert_cast_member(&self, member: &CastMemberRecord) -> Result<()> {
        let mut cast = self.cast.lock().unwrap();
        match cast.iter_mut().find(|m| m.id == member.id) {
            Some(existing) => *existing = member.clone(),
            None => cast.push(member.clone()),
        }
        Ok(())
    }

    async fn link_cast_member(
        &self,
        show_id: i64,
        person_id: i64,
        credit_order: i32,
    ) -> Result<()> {
        self.links.lock().unwrap().push((show_id, person_id, credit_order));
        Ok(())
    }

    async fn pending_ids(&self) -> Result<Vec<i64>> {
        Ok(self.pending.lock().unwrap().clone())
    }

    async fn enqueue_pending(&self, show_id: i64) -> Result<bool> {
        let mut pending = self.pending.lock().unwrap();
        if pending.contains(&show_id) {
            return Ok(false);
        }
        pending.push(show_id);
        Ok(true)
    }

    async fn next_pending(&self, limit: i64) -> Result<Vec<PendingFetchRecord>> {
        let pending = self.pending.lock().unwrap();
        Ok(pending
            .iter()
            .take(limit as usize)
            .map(|&show_id| PendingFetchRecord {
                show_id,
                enqueued_at: chrono::Utc::now(),
            })
            .collect())
    }

    async fn remove_pending(&self, show_id: i64) -> Result<()> {
        self.pending.lock().unwrap().retain(|&id| id != show_id);
        Ok(())
    }

    async fn remove_pending_batch(&self, show_ids: &[i64]) -> Result<u64> {
        self.bulk_removals.lock().unwrap().push(show_ids.to_vec());
        let mut pending = self.pending.lock().unwrap();
        let before = pending.len();
        pending.retain(|id| !show_ids.contains(id));
        Ok((before - pending.len()) as u64)
    }
}
