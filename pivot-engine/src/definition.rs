//! FILENAME: pivot-engine/src/definition.rs
//! Pipeline Definitions - The serializable configuration.
//!
//! This module contains all the types needed to DESCRIBE a recategorization
//! or an aggregation. These structures are designed to be:
//! - Serializable (so they can be hashed into cache keys)
//! - Built from the dashboard configuration
//! - Immutable snapshots of user intent

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use engine::{EngineError, EngineResult, FilterDefinition};

/// Resolved value for entities no rule or single-category baseline claims.
pub const OTHER_CATEGORY: &str = "Other";

/// Default name of the entity id column.
pub const DEFAULT_ID_COLUMN: &str = "id";

// ============================================================================
// RECATEGORIZATION
// ============================================================================

/// One user-defined category: a new name and the rule that claims entities for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryRule {
    pub name: String,
    pub expression: String,
}

impl CategoryRule {
    pub fn new(name: impl Into<String>, expression: impl Into<String>) -> Self {
        CategoryRule {
            name: name.into(),
            expression: expression.into(),
        }
    }
}

/// The ordered rules for one grouping column.
///
/// `grouping` is either a column name ("Press Types") or an alias of the
/// form "New Column [Base Column]", which reads categories from the base
/// column and writes the result to a new column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupingRules {
    pub grouping: String,
    pub rules: Vec<CategoryRule>,
}

impl GroupingRules {
    pub fn new(grouping: impl Into<String>) -> Self {
        GroupingRules {
            grouping: grouping.into(),
            rules: Vec::new(),
        }
    }

    pub fn with_rule(mut self, name: impl Into<String>, expression: impl Into<String>) -> Self {
        self.rules.push(CategoryRule::new(name, expression));
        self
    }

    /// Splits the grouping key into (output column, source column).
    pub fn target(&self) -> EngineResult<GroupingTarget> {
        GroupingTarget::parse(&self.grouping)
    }
}

/// Where a grouping's categories are read from and written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupingTarget {
    pub output_column: String,
    pub source_column: String,
}

/// "New Column [Base Column]", with exactly one bracketed section.
static ALIAS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*?)\s\[([^\[\]]+)\]$").expect("valid alias pattern"));

/// A space followed by an opening bracket marks an attempted alias.
static ALIAS_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s\[").expect("valid alias pattern"));

impl GroupingTarget {
    /// Splits a grouping key. Keys without a " [" are plain column names,
    /// brackets included ("A[B]").
    pub fn parse(key: &str) -> EngineResult<Self> {
        if let Some(caps) = ALIAS.captures(key) {
            if !caps[1].contains('[') && !caps[1].contains(']') {
                return Ok(GroupingTarget {
                    output_column: caps[1].to_string(),
                    source_column: caps[2].to_string(),
                });
            }
        }

        if ALIAS_START.is_match(key) {
            return Err(EngineError::Configuration(format!(
                "grouping '{}' must look like 'New Column [Base Column]' with one set of brackets",
                key
            )));
        }

        Ok(GroupingTarget {
            output_column: key.to_string(),
            source_column: key.to_string(),
        })
    }
}

/// Everything `recategorize` needs besides the table itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecategorizeDefinition {
    pub id_column: String,

    /// Applied in order; each grouping resolves independently.
    pub rule_sets: Vec<GroupingRules>,

    /// When false, recategorization is the identity.
    pub enabled: bool,

    /// When true, entities with a single base category get no baseline
    /// and fall to "Other" unless a rule claims them.
    pub combine_single_categories: bool,
}

impl RecategorizeDefinition {
    pub fn new(rule_sets: Vec<GroupingRules>) -> Self {
        RecategorizeDefinition {
            id_column: DEFAULT_ID_COLUMN.to_string(),
            rule_sets,
            enabled: true,
            combine_single_categories: false,
        }
    }

    pub fn disabled() -> Self {
        RecategorizeDefinition {
            enabled: false,
            ..Self::new(Vec::new())
        }
    }
}

// ============================================================================
// AGGREGATION
// ============================================================================

/// Supported aggregations for the per-year table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregationMode {
    /// Distinct entity ids.
    Count,
    /// Sum of a weight column, deduplicated per entity.
    Sum,
}

impl Default for AggregationMode {
    fn default() -> Self {
        AggregationMode::Count
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggregateDefinition {
    pub id_column: String,
    pub year_column: String,
    /// Weight column. Required for `Sum`, ignored for `Count`.
    pub value_column: Option<String>,
    pub groupby_column: String,
    pub mode: AggregationMode,
}

impl AggregateDefinition {
    pub fn count(year_column: impl Into<String>, groupby_column: impl Into<String>) -> Self {
        AggregateDefinition {
            id_column: DEFAULT_ID_COLUMN.to_string(),
            year_column: year_column.into(),
            value_column: None,
            groupby_column: groupby_column.into(),
            mode: AggregationMode::Count,
        }
    }

    pub fn sum(
        year_column: impl Into<String>,
        value_column: impl Into<String>,
        groupby_column: impl Into<String>,
    ) -> Self {
        AggregateDefinition {
            id_column: DEFAULT_ID_COLUMN.to_string(),
            year_column: year_column.into(),
            value_column: Some(value_column.into()),
            groupby_column: groupby_column.into(),
            mode: AggregationMode::Sum,
        }
    }
}

// ============================================================================
// PIPELINE REQUEST
// ============================================================================

/// Post-processing applied to the aggregated result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ViewOptions {
    /// Running sums down the years.
    pub cumulative: bool,
}

/// One full recategorize -> filter -> aggregate request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRequest {
    pub recategorize: RecategorizeDefinition,
    pub filter: FilterDefinition,
    pub aggregate: AggregateDefinition,
    #[serde(default)]
    pub view: ViewOptions,
}
