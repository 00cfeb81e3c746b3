//! FILENAME: engine/src/lib.rs
//! PURPOSE: Main library entry point for the dashboard data engine.
//! CONTEXT: Re-exports the table model, the filter engine, year binning
//! and the error taxonomy shared by the recategorization and aggregation
//! layers in `pivot-engine`.

pub mod error;
pub mod filter;
pub mod table;
pub mod value;
pub mod year;

// Re-export commonly used types at the crate root
pub use error::{EngineError, EngineResult};
pub use filter::{filter_table, FilterDefinition, NumericRange};
pub use table::{Row, Table};
pub use value::{OrderedFloat, Value, ValueKey};
pub use year::{add_year_column, year_of, YearStart};
