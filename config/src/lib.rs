//! FILENAME: config/src/lib.rs
//! Dashboard Configuration Module
//!
//! Loads the dashboard's `config.yml` (id, year, text and categorical
//! columns, groupings, weight columns, recategorization rules, start of
//! year) and turns it into the definitions the engine runs on. Keys the
//! engine has no use for (data directories, page titles, palettes) are
//! ignored.

mod error;

pub use error::ConfigError;

use std::path::Path;

use engine::{add_year_column, FilterDefinition, Table, YearStart};
use pivot_engine::{AggregateDefinition, GroupingRules, RecategorizeDefinition, DEFAULT_ID_COLUMN};
use serde::{Deserialize, Serialize};
use serde_yaml::Mapping;

/// Weighting label that selects distinct-entity counting.
pub const ARTICLE_COUNT: &str = "Article Count";

/// Year column used when the config lists none.
pub const DEFAULT_YEAR_COLUMN: &str = "Year";

// ============================================================================
// DEFAULTS
// ============================================================================

fn default_id_column() -> String {
    DEFAULT_ID_COLUMN.to_string()
}

fn default_year_start() -> String {
    "January 1".to_string()
}

fn default_true() -> bool {
    true
}

// ============================================================================
// DASHBOARD CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(rename = "primary_id_column", default = "default_id_column")]
    pub id_column: String,

    /// Columns holding dates, binned into reporting years.
    #[serde(default)]
    pub date_columns: Vec<String>,

    /// Year columns; the first is the default x axis.
    #[serde(default)]
    pub year_columns: Vec<String>,

    /// Columns the free-text search may target.
    #[serde(default)]
    pub text_columns: Vec<String>,

    /// Columns offered for categorical filtering and grouping.
    #[serde(default)]
    pub categorical_columns: Vec<String>,

    /// Multi-valued columns the data is exploded along.
    #[serde(default)]
    pub groupings: Vec<String>,

    /// Numeric columns offered as alternatives to counting articles.
    #[serde(default)]
    pub weight_columns: Vec<String>,

    #[serde(default = "default_true")]
    pub recategorize: bool,

    #[serde(default)]
    pub combine_single_categories: bool,

    /// grouping -> (new category name -> rule expression), both in declaration order.
    #[serde(default)]
    pub new_categories: Mapping,

    #[serde(default = "default_year_start")]
    pub year_start: String,

    #[serde(default)]
    pub min_year: Option<i64>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            id_column: default_id_column(),
            date_columns: Vec::new(),
            year_columns: Vec::new(),
            text_columns: Vec::new(),
            categorical_columns: Vec::new(),
            groupings: Vec::new(),
            weight_columns: Vec::new(),
            recategorize: true,
            combine_single_categories: false,
            new_categories: Mapping::new(),
            year_start: default_year_start(),
            min_year: None,
        }
    }
}

impl DashboardConfig {
    /// Parses and validates a configuration document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: DashboardConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id_column.trim().is_empty() {
            return Err(ConfigError::Invalid("primary_id_column must not be empty".to_string()));
        }
        if self.weight_columns.iter().any(|w| w == ARTICLE_COUNT) {
            return Err(ConfigError::Invalid(format!(
                "'{}' is reserved and cannot be a weight column",
                ARTICLE_COUNT
            )));
        }
        self.year_start()?;

        for rules in self.rule_sets()? {
            let target = rules.target().map_err(|e| ConfigError::Invalid(e.to_string()))?;
            if !self.groupings.contains(&target.source_column) {
                return Err(ConfigError::Invalid(format!(
                    "rules for '{}' read from '{}', which is not a listed grouping",
                    rules.grouping, target.source_column
                )));
            }
            for rule in &rules.rules {
                if rule.name.trim().is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "empty category name in rules for '{}'",
                        rules.grouping
                    )));
                }
                rule_parser::parse(&rule.expression).map_err(|e| {
                    ConfigError::Invalid(format!("rule '{}' for '{}': {}", rule.name, rules.grouping, e))
                })?;
            }
        }
        Ok(())
    }

    pub fn year_start(&self) -> Result<YearStart, ConfigError> {
        YearStart::parse(&self.year_start).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// The first listed year column, or "Year".
    pub fn year_column(&self) -> &str {
        self.year_columns
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_YEAR_COLUMN)
    }

    /// The rule sets in declaration order.
    pub fn rule_sets(&self) -> Result<Vec<GroupingRules>, ConfigError> {
        self.new_categories
            .iter()
            .map(|(grouping, rules)| {
                let grouping = grouping.as_str().ok_or_else(|| {
                    ConfigError::Invalid(format!("grouping name {:?} must be a string", grouping))
                })?;
                let rules = rules.as_mapping().ok_or_else(|| {
                    ConfigError::Invalid(format!("rules for '{}' must be a mapping", grouping))
                })?;
                rules.iter().try_fold(GroupingRules::new(grouping), |acc, (name, expr)| {
                    let name = name.as_str().ok_or_else(|| {
                        ConfigError::Invalid(format!(
                            "category name {:?} for '{}' must be a string",
                            name, grouping
                        ))
                    })?;
                    let expr = expr.as_str().ok_or_else(|| {
                        ConfigError::Invalid(format!(
                            "rule '{}' for '{}' must be a string",
                            name, grouping
                        ))
                    })?;
                    Ok(acc.with_rule(name, expr))
                })
            })
            .collect()
    }

    pub fn recategorize_definition(&self) -> Result<RecategorizeDefinition, ConfigError> {
        let mut definition = if self.recategorize {
            RecategorizeDefinition::new(self.rule_sets()?)
        } else {
            RecategorizeDefinition::disabled()
        };
        definition.id_column = self.id_column.clone();
        definition.combine_single_categories = self.combine_single_categories;
        Ok(definition)
    }

    /// Columns that can be grouped by after recategorization: groupings,
    /// categorical columns and alias outputs.
    pub fn groupby_columns(&self) -> Result<Vec<String>, ConfigError> {
        let mut columns = self.groupings.clone();
        for column in &self.categorical_columns {
            if !columns.contains(column) {
                columns.push(column.clone());
            }
        }
        for rules in self.rule_sets()? {
            let target = rules.target().map_err(|e| ConfigError::Invalid(e.to_string()))?;
            if !columns.contains(&target.output_column) {
                columns.push(target.output_column);
            }
        }
        Ok(columns)
    }

    /// `None` or "Article Count" counts entities; a weight column sums it.
    pub fn aggregate_definition(
        &self,
        groupby: &str,
        weighting: Option<&str>,
    ) -> Result<AggregateDefinition, ConfigError> {
        if !self.groupby_columns()?.iter().any(|c| c == groupby) {
            return Err(ConfigError::Invalid(format!("'{}' is not a grouping", groupby)));
        }

        let year_column = self.year_column();
        let mut definition = match weighting {
            None | Some(ARTICLE_COUNT) => AggregateDefinition::count(year_column, groupby),
            Some(column) if self.weight_columns.iter().any(|w| w == column) => {
                AggregateDefinition::sum(year_column, column, groupby)
            }
            Some(column) => {
                return Err(ConfigError::Invalid(format!(
                    "'{}' is not a configured weighting",
                    column
                )))
            }
        };
        definition.id_column = self.id_column.clone();
        Ok(definition)
    }

    /// A filter searching `column`, or the first text column when `None`.
    pub fn search_filter(
        &self,
        text: &str,
        column: Option<&str>,
    ) -> Result<FilterDefinition, ConfigError> {
        let column = match column {
            Some(column) if self.text_columns.iter().any(|c| c == column) => column,
            Some(column) => {
                return Err(ConfigError::Invalid(format!("'{}' is not a text column", column)))
            }
            None => self
                .text_columns
                .first()
                .map(String::as_str)
                .ok_or_else(|| ConfigError::Invalid("no text_columns configured".to_string()))?,
        };
        Ok(FilterDefinition::new().with_search(text, column))
    }

    /// Bins `date_column` into reporting years using `year_start` and
    /// `min_year`. The year column is named after the date column with
    /// "Date" replaced by "Year". Returns the table and the name used.
    pub fn with_reporting_year(
        &self,
        table: &Table,
        date_column: &str,
    ) -> Result<(Table, String), ConfigError> {
        let year_column = date_column.replace("Date", "Year");
        add_year_column(table, date_column, &year_column, self.year_start()?, self.min_year)
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

/// Reads, parses and validates a configuration file.
pub fn load_config(path: impl AsRef<Path>) -> Result<DashboardConfig, ConfigError> {
    let path = path.as_ref();
    let yaml = std::fs::read_to_string(path)?;
    let config = DashboardConfig::from_yaml_str(&yaml)?;
    log::info!(
        target: "CONFIG",
        "loaded {}: {} groupings, {} rule sets",
        path.display(),
        config.groupings.len(),
        config.new_categories.len()
    );
    Ok(config)
}
