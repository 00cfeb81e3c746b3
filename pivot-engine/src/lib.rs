//! FILENAME: pivot-engine/src/lib.rs
//! Recategorization and aggregation subsystem for the press dashboard.
//!
//! This crate turns an exploded table (one row per entity and category
//! value) into per-year, per-category numbers. It depends on `engine` for
//! the table model and filtering, and on `rule-parser` for category rules.
//!
//! Layers:
//! - `definition`: Serializable configuration (what to compute)
//! - `recategorize`: One resolved category per entity and grouping
//! - `aggregate`: Per-year counts or sums without double counting
//! - `view`: Cumulative, fractional and densified shapes for plotting
//! - `cache`: Explicit memoization of stage results
//! - `engine`: The recategorize -> filter -> aggregate pipeline

pub mod aggregate;
pub mod cache;
pub mod definition;
pub mod engine;
pub mod recategorize;
pub mod view;

pub use aggregate::{aggregate, Aggregation, CategoryTable, TotalSeries};
pub use cache::{cache_key, content_hash, CacheKey, CacheStats, ResultCache};
pub use definition::*;
pub use self::engine::{run_pipeline, Pipeline, AGGREGATE_OPERATION, RECATEGORIZE_OPERATION};
pub use recategorize::recategorize;
