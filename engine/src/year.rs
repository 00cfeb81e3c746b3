//! FILENAME: engine/src/year.rs
//! PURPOSE: Bins dates into reporting years with a configurable start of year.
//! CONTEXT: Reporting years do not always start on January 1 (an academic
//! year may start on September 1). A date belongs to the year whose start
//! is the latest one on or before it, and the year is labelled by the
//! calendar year of that start.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::table::{Row, Table};
use crate::value::Value;

/// Month and day on which a reporting year begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearStart {
    pub month: u32,
    pub day: u32,
}

impl Default for YearStart {
    fn default() -> Self {
        YearStart { month: 1, day: 1 }
    }
}

impl YearStart {
    /// Parses strings such as "January 1" or "sep 15".
    pub fn parse(text: &str) -> EngineResult<Self> {
        // A leap year lets "February 29" through.
        let dated = format!("{} 2000", text.trim());
        let date = NaiveDate::parse_from_str(&dated, "%B %d %Y").map_err(|e| {
            EngineError::Configuration(format!("invalid start of year '{}': {}", text, e))
        })?;
        Ok(YearStart {
            month: date.month(),
            day: date.day(),
        })
    }

    /// The date this reporting year starts in a given calendar year.
    /// February 29 falls back to February 28 in non-leap years.
    fn in_year(&self, year: i32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(year, self.month, self.day)
            .or_else(|| NaiveDate::from_ymd_opt(year, self.month, self.day.saturating_sub(1)))
    }
}

/// Returns the reporting year a date falls in.
pub fn year_of(date: NaiveDate, start: YearStart) -> i64 {
    let year = date.year();
    match start.in_year(year) {
        Some(boundary) if date < boundary => (year - 1) as i64,
        _ => year as i64,
    }
}

/// Parses a date cell. Accepts `YYYY-MM-DD`, optionally followed by a time.
fn parse_date(value: &Value) -> Option<NaiveDate> {
    let Value::Text(text) = value else {
        return None;
    };
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

/// Appends a year column computed from a date column.
///
/// If `year_column` already exists, " (Custom)" is appended to the new
/// column's name so the existing one is kept. Empty date cells give an
/// empty year. When `min_year` is set, rows with an earlier year are
/// dropped. Returns the new table and the name actually used.
pub fn add_year_column(
    table: &Table,
    date_column: &str,
    year_column: &str,
    start: YearStart,
    min_year: Option<i64>,
) -> EngineResult<(Table, String)> {
    let date_col = table.column_index(date_column)?;

    let name = if table.has_column(year_column) {
        format!("{} (Custom)", year_column)
    } else {
        year_column.to_string()
    };

    let mut columns = table.columns().to_vec();
    columns.push(name.clone());

    let mut rows = Vec::with_capacity(table.len());
    let mut dropped = 0usize;
    for row in table.rows() {
        let cell = row.get(date_col);
        let year = if cell.is_empty() {
            None
        } else {
            let date = parse_date(cell).ok_or_else(|| EngineError::InvalidDate {
                column: date_column.to_string(),
                row: row.index,
                value: cell.display(),
            })?;
            Some(year_of(date, start))
        };

        if let (Some(y), Some(min)) = (year, min_year) {
            if y < min {
                dropped += 1;
                continue;
            }
        }

        let mut values = row.values.clone();
        values.push(year.map(Value::from).unwrap_or(Value::Empty));
        rows.push(Row {
            index: row.index,
            values,
        });
    }

    if dropped > 0 {
        log::info!(target: "YEAR", "dropped {} rows with '{}' before {:?}", dropped, name, min_year);
    }

    Ok((Table::from_rows(columns, rows), name))
}
