//! External service clients and supporting glue

pub mod catalog;
pub mod rate_limiter;

pub use catalog::{CatalogClient, CatalogDelta, CatalogDeltaEntry, CatalogError, CatalogSource};
pub use rate_limiter::{RateLimitConfig, RateLimitedClient};
