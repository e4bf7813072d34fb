//! crashstats: Crash Stats API client, Super Search pagination and facet tables
//!
//! Covers:
//! - record search across result pages
//! - facet queries, flattened into renderable tables
//! - per-period facet sweeps
//! - crash artifact downloads and reprocessing requests

pub mod artifacts;
pub mod client;
pub mod config;
pub mod crash_id;
pub mod error;
pub mod facets;
pub mod limit;
pub mod params;
pub mod periods;
pub mod render;
pub mod reprocess;
pub mod supersearch;
pub mod table;

pub use client::{CrashStatsClient, PostResponse, Transport};
pub use config::Config;
pub use error::{Error, Result};
pub use limit::Limit;
pub use params::SearchParams;
pub use periods::{Granularity, Periods};
pub use render::Format;
pub use supersearch::{Hit, Paginator, SuperSearch};
pub use table::{FlatRecord, FlatTable, FlatTables, Scalar, TableKind};
