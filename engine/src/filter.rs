//! FILENAME: engine/src/filter.rs
//! PURPOSE: Selects the rows of a table that the dashboard should include.
//! CONTEXT: Three kinds of predicates are combined with AND:
//! - a free-text search (case-insensitive regular expression) on one column
//! - categorical allow-lists per column
//! - inclusive numeric ranges per column
//! The result is a row subset with the original row indices preserved.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{EngineError, EngineResult};
use crate::table::{Row, Table};

// ============================================================================
// FILTER DEFINITION
// ============================================================================

/// Inclusive numeric range [min, max].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericRange {
    pub min: f64,
    pub max: f64,
}

impl NumericRange {
    pub fn new(min: f64, max: f64) -> Self {
        NumericRange { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

/// What the user selected in the filter widgets.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterDefinition {
    /// Search pattern. Empty means "include all".
    #[serde(default)]
    pub search_text: String,

    /// Column the search is applied to. Required when `search_text` is set.
    #[serde(default)]
    pub search_column: Option<String>,

    /// Column -> allowed display values. Absent columns are unrestricted.
    #[serde(default)]
    pub categorical: BTreeMap<String, BTreeSet<String>>,

    /// Column -> inclusive range. Absent columns are unrestricted.
    #[serde(default)]
    pub numerical: BTreeMap<String, NumericRange>,
}

impl FilterDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, text: impl Into<String>, column: impl Into<String>) -> Self {
        self.search_text = text.into();
        self.search_column = Some(column.into());
        self
    }

    pub fn with_categories<S: Into<String>>(
        mut self,
        column: impl Into<String>,
        allowed: impl IntoIterator<Item = S>,
    ) -> Self {
        self.categorical
            .insert(column.into(), allowed.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_range(mut self, column: impl Into<String>, min: f64, max: f64) -> Self {
        self.numerical.insert(column.into(), NumericRange::new(min, max));
        self
    }

    /// True when the definition cannot exclude any row.
    pub fn is_unrestricted(&self) -> bool {
        self.search_text.is_empty() && self.categorical.is_empty() && self.numerical.is_empty()
    }
}

// ============================================================================
// COMPILED FILTER
// ============================================================================

/// A filter definition resolved against a table's columns.
struct CompiledFilter<'a> {
    search: Option<(usize, Regex)>,
    categorical: Vec<(usize, &'a BTreeSet<String>)>,
    numerical: Vec<(usize, NumericRange)>,
}

impl<'a> CompiledFilter<'a> {
    fn compile(table: &Table, definition: &'a FilterDefinition) -> EngineResult<Self> {
        let search = if definition.search_text.is_empty() {
            None
        } else {
            let column = definition.search_column.as_deref().ok_or_else(|| {
                EngineError::Configuration("search text given without a search column".to_string())
            })?;
            let regex = RegexBuilder::new(&definition.search_text)
                .case_insensitive(true)
                .build()
                .map_err(|e| EngineError::InvalidSearchPattern(e.to_string()))?;
            Some((table.column_index(column)?, regex))
        };

        let categorical = definition
            .categorical
            .iter()
            .map(|(column, allowed)| Ok((table.column_index(column)?, allowed)))
            .collect::<EngineResult<Vec<_>>>()?;

        let numerical = definition
            .numerical
            .iter()
            .map(|(column, range)| Ok((table.column_index(column)?, *range)))
            .collect::<EngineResult<Vec<_>>>()?;

        Ok(CompiledFilter {
            search,
            categorical,
            numerical,
        })
    }

    fn includes(&self, row: &Row) -> bool {
        if let Some((col, regex)) = &self.search {
            if !regex.is_match(&row.get(*col).display()) {
                return false;
            }
        }

        let categories_ok = self
            .categorical
            .iter()
            .all(|(col, allowed)| allowed.contains(&row.get(*col).display()));

        categories_ok
            && self.numerical.iter().all(|(col, range)| {
                row.get(*col)
                    .as_number()
                    .map(|n| range.contains(n))
                    .unwrap_or(false)
            })
    }
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Applies a filter definition, returning the selected rows as a new table.
pub fn filter_table(table: &Table, definition: &FilterDefinition) -> EngineResult<Table> {
    if definition.is_unrestricted() {
        log::debug!(target: "FILTER", "no criteria, keeping all {} rows", table.len());
        return Ok(table.clone());
    }

    let compiled = CompiledFilter::compile(table, definition)?;
    let selected = table.select(|row| compiled.includes(row));

    log::debug!(
        target: "FILTER",
        "selected {} of {} rows (search={:?}, categorical={}, numerical={})",
        selected.len(),
        table.len(),
        definition.search_text,
        definition.categorical.len(),
        definition.numerical.len()
    );

    Ok(selected)
}
