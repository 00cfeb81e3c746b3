//! FILENAME: pivot-engine/src/view.rs
//! Derived Views - Shapes of an aggregation ready for plotting.
//!
//! None of these change the underlying counts: they re-express an
//! `Aggregation` as running totals, per-year shares, or a continuous year axis.

use std::ops::RangeInclusive;

use crate::aggregate::{Aggregation, CategoryTable, TotalSeries};

// ============================================================================
// CATEGORY TABLE
// ============================================================================

impl CategoryTable {
    /// Running sum of every category down the years.
    pub fn cumulative(&self) -> CategoryTable {
        let mut running = vec![0.0; self.categories.len()];
        let values = self
            .values
            .iter()
            .map(|row| {
                for (acc, v) in running.iter_mut().zip(row) {
                    *acc += v;
                }
                running.clone()
            })
            .collect();

        CategoryTable {
            years: self.years.clone(),
            categories: self.categories.clone(),
            values,
        }
    }

    /// Each cell divided by its year's sum across categories.
    /// Years summing to 0 yield 0 everywhere.
    pub fn fractions(&self) -> CategoryTable {
        let values = self
            .values
            .iter()
            .map(|row| {
                let total: f64 = row.iter().sum();
                row.iter()
                    .map(|v| if total == 0.0 { 0.0 } else { v / total })
                    .collect()
            })
            .collect();

        CategoryTable {
            years: self.years.clone(),
            categories: self.categories.clone(),
            values,
        }
    }

    /// Densifies the rows to every year in `range`, filling 0.
    /// Years outside the range are dropped.
    pub fn reindex_years(&self, range: RangeInclusive<i64>) -> CategoryTable {
        let width = self.categories.len();
        let years: Vec<i64> = range.collect();
        let values = years
            .iter()
            .map(|year| match self.years.iter().position(|y| y == year) {
                Some(idx) => self.values[idx].clone(),
                None => vec![0.0; width],
            })
            .collect();

        CategoryTable {
            years,
            categories: self.categories.clone(),
            values,
        }
    }
}

// ============================================================================
// TOTAL SERIES
// ============================================================================

impl TotalSeries {
    pub fn cumulative(&self) -> TotalSeries {
        let values = self
            .values
            .iter()
            .scan(0.0, |acc, v| {
                *acc += v;
                Some(*acc)
            })
            .collect();

        TotalSeries {
            years: self.years.clone(),
            values,
        }
    }

    pub fn reindex_years(&self, range: RangeInclusive<i64>) -> TotalSeries {
        let years: Vec<i64> = range.collect();
        let values = years
            .iter()
            .map(|year| self.get(*year).unwrap_or(0.0))
            .collect();
        TotalSeries { years, values }
    }
}

// ============================================================================
// AGGREGATION
// ============================================================================

impl Aggregation {
    /// First and last year present, if any.
    pub fn year_span(&self) -> Option<RangeInclusive<i64>> {
        let first = *self.table.years.first()?;
        let last = *self.table.years.last()?;
        Some(first..=last)
    }

    pub fn cumulative(&self) -> Aggregation {
        Aggregation {
            table: self.table.cumulative(),
            total: self.total.cumulative(),
        }
    }

    pub fn reindex_years(&self, range: RangeInclusive<i64>) -> Aggregation {
        Aggregation {
            table: self.table.reindex_years(range.clone()),
            total: self.total.reindex_years(range),
        }
    }
}
