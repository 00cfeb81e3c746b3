//! FILENAME: pivot-engine/src/aggregate.rs
//! Aggregator - Per-year, per-category counts or sums without double counting.
//!
//! Count mode counts distinct entity ids in every (year, category) cell and
//! distinct ids per year for the total.
//!
//! Sum mode keeps the first row per (id, category) before summing, so an
//! entity's weight is added once per category it belongs to. The total keeps
//! the first of those rows per id, so the weight is added once per entity.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use engine::{EngineError, EngineResult, Row, Table, Value, ValueKey};

use crate::definition::{AggregateDefinition, AggregationMode};

// ============================================================================
// OUTPUT TYPES
// ============================================================================

/// Year x category grid. Missing combinations hold 0.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CategoryTable {
    /// Row labels, ascending.
    pub years: Vec<i64>,
    /// Column labels, ascending.
    pub categories: Vec<String>,
    /// `values[year_idx][category_idx]`.
    pub values: Vec<Vec<f64>>,
}

impl CategoryTable {
    pub fn is_empty(&self) -> bool {
        self.years.is_empty() && self.categories.is_empty()
    }

    /// Cell for a year and category, or None if either label is absent.
    pub fn get(&self, year: i64, category: &str) -> Option<f64> {
        let row = self.years.iter().position(|y| *y == year)?;
        let col = self.categories.iter().position(|c| c == category)?;
        Some(self.values[row][col])
    }

    /// One category's values down the years.
    pub fn column(&self, category: &str) -> Option<Vec<f64>> {
        let col = self.categories.iter().position(|c| c == category)?;
        Some(self.values.iter().map(|row| row[col]).collect())
    }

    /// Sum across categories for every year.
    pub fn row_sums(&self) -> Vec<f64> {
        self.values.iter().map(|row| row.iter().sum()).collect()
    }
}

/// Per-year total with no category breakdown.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TotalSeries {
    pub years: Vec<i64>,
    pub values: Vec<f64>,
}

impl TotalSeries {
    pub fn get(&self, year: i64) -> Option<f64> {
        let idx = self.years.iter().position(|y| *y == year)?;
        Some(self.values[idx])
    }

    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }
}

/// The aggregator's result: the category grid and the overall total.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Aggregation {
    pub table: CategoryTable,
    pub total: TotalSeries,
}

// ============================================================================
// CELL CONVERSIONS
// ============================================================================

/// Reads a year cell. Empty cells yield None.
fn year_at(row: &Row, col: usize, column: &str) -> EngineResult<Option<i64>> {
    let non_numeric = |value: &Value| EngineError::NonNumeric {
        column: column.to_string(),
        row: row.index,
        value: value.display(),
    };

    match row.get(col) {
        Value::Empty => Ok(None),
        Value::Number(n) if n.fract() == 0.0 && n.is_finite() => Ok(Some(*n as i64)),
        Value::Text(s) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| non_numeric(row.get(col))),
        other => Err(non_numeric(other)),
    }
}

/// Reads a weight cell. Missing weights count as 0.
fn weight_at(row: &Row, col: usize, column: &str) -> EngineResult<f64> {
    match row.get(col) {
        Value::Empty => Ok(0.0),
        Value::Number(n) => Ok(*n),
        Value::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Text(s) => s.trim().parse::<f64>().map_err(|_| EngineError::NonNumeric {
            column: column.to_string(),
            row: row.index,
            value: s.clone(),
        }),
    }
}

// ============================================================================
// ACCUMULATION
// ============================================================================

/// Interns labels and accumulates cells keyed by (year, category) index.
#[derive(Default)]
struct Accumulator {
    years: Vec<i64>,
    year_ids: FxHashMap<i64, usize>,
    categories: Vec<String>,
    category_ids: FxHashMap<String, usize>,
    cells: FxHashMap<(usize, usize), f64>,
    totals: FxHashMap<usize, f64>,
}

impl Accumulator {
    fn year(&mut self, year: i64) -> usize {
        let next = self.years.len();
        let id = *self.year_ids.entry(year).or_insert(next);
        if id == next {
            self.years.push(year);
        }
        id
    }

    fn category(&mut self, name: String) -> usize {
        if let Some(&id) = self.category_ids.get(&name) {
            return id;
        }
        let id = self.categories.len();
        self.categories.push(name.clone());
        self.category_ids.insert(name, id);
        id
    }

    fn add_cell(&mut self, year: usize, category: usize, amount: f64) {
        *self.cells.entry((year, category)).or_insert(0.0) += amount;
    }

    fn add_total(&mut self, year: usize, amount: f64) {
        *self.totals.entry(year).or_insert(0.0) += amount;
    }

    /// Sorts labels and lays the cells out densely, filling gaps with 0.
    fn finish(self) -> Aggregation {
        let mut year_order: Vec<usize> = (0..self.years.len()).collect();
        year_order.sort_by_key(|&i| self.years[i]);
        let mut category_order: Vec<usize> = (0..self.categories.len()).collect();
        category_order.sort_by(|&a, &b| self.categories[a].cmp(&self.categories[b]));

        let years: Vec<i64> = year_order.iter().map(|&i| self.years[i]).collect();
        let categories: Vec<String> = category_order
            .iter()
            .map(|&i| self.categories[i].clone())
            .collect();

        let values = year_order
            .iter()
            .map(|&y| {
                category_order
                    .iter()
                    .map(|&c| self.cells.get(&(y, c)).copied().unwrap_or(0.0))
                    .collect()
            })
            .collect();

        let totals = year_order
            .iter()
            .map(|&y| self.totals.get(&y).copied().unwrap_or(0.0))
            .collect();

        Aggregation {
            table: CategoryTable {
                years: years.clone(),
                categories,
                values,
            },
            total: TotalSeries {
                years,
                values: totals,
            },
        }
    }
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Aggregates a (recategorized, filtered) table into per-year, per-category values.
pub fn aggregate(table: &Table, definition: &AggregateDefinition) -> EngineResult<Aggregation> {
    let id_col = table.column_index(&definition.id_column)?;
    let year_col = table.column_index(&definition.year_column)?;
    let group_col = table.column_index(&definition.groupby_column)?;

    let mut acc = Accumulator::default();

    match definition.mode {
        AggregationMode::Count => {
            let mut seen_cells: FxHashSet<(usize, Option<usize>, ValueKey)> = FxHashSet::default();
            let mut seen_totals: FxHashSet<(usize, ValueKey)> = FxHashSet::default();

            for row in table.rows() {
                // Categories are interned even for rows without a year.
                let group = row.get(group_col);
                let category = (!group.is_empty()).then(|| acc.category(group.display()));
                let Some(year) = year_at(row, year_col, &definition.year_column)? else {
                    continue;
                };
                let year = acc.year(year);
                let id = row.get(id_col).key();

                if seen_cells.insert((year, category, id.clone())) {
                    if let Some(category) = category {
                        acc.add_cell(year, category, 1.0);
                    }
                }
                if seen_totals.insert((year, id)) {
                    acc.add_total(year, 1.0);
                }
            }
        }
        AggregationMode::Sum => {
            let value_column = definition.value_column.as_deref().ok_or_else(|| {
                EngineError::Configuration("sum aggregation needs a value column".to_string())
            })?;
            let value_col = table.column_index(value_column)?;

            let mut seen_pairs: FxHashSet<(ValueKey, ValueKey)> = FxHashSet::default();
            let mut seen_ids: FxHashSet<ValueKey> = FxHashSet::default();

            for row in table.rows() {
                let id = row.get(id_col).key();
                let group = row.get(group_col);

                // First occurrence per (id, category), then per id.
                if !seen_pairs.insert((id.clone(), group.key())) {
                    continue;
                }
                let first_for_id = seen_ids.insert(id);
                let category = (!group.is_empty()).then(|| acc.category(group.display()));

                let Some(year) = year_at(row, year_col, &definition.year_column)? else {
                    continue;
                };
                let weight = weight_at(row, value_col, value_column)?;
                let year = acc.year(year);

                if let Some(category) = category {
                    acc.add_cell(year, category, weight);
                }
                if first_for_id {
                    acc.add_total(year, weight);
                }
            }
        }
    }

    let result = acc.finish();
    log::debug!(
        target: "AGG",
        "{:?} of '{}' by '{}': {} years x {} categories from {} rows",
        definition.mode,
        definition.value_column.as_deref().unwrap_or(&definition.id_column),
        definition.groupby_column,
        result.table.years.len(),
        result.table.categories.len(),
        table.len()
    );
    Ok(result)
}
