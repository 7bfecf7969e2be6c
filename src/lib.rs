//! Showvault - TV-show catalog ingestion service
//!
//! Periodically synchronizes a local store against an upstream catalog
//! service. A durable queue of pending fetches survives restarts; a single
//! background worker drains it and re-checks stale shows on a configured
//! cadence. A thin read-only API serves the ingested shows.

pub mod api;
pub mod config;
pub mod db;
pub mod jobs;
pub mod services;
