//! FILENAME: pivot-engine/src/recategorize.rs
//! Recategorizer - Collapses multi-valued categories into one category per entity.
//!
//! Input is an exploded table: one row per (entity, category value) in a
//! grouping column. Output is one row per entity where each grouping with
//! rules holds exactly one resolved category.
//!
//! Algorithm, per grouping:
//! 1. Collect the base categories (distinct values, sorted) and build a
//!    per-entity membership vector, rejecting duplicate memberships
//! 2. Baseline: entities with exactly one base category keep it
//!    (skipped when `combine_single_categories` is set)
//! 3. Apply rules in declaration order; a later match overrides
//! 4. Everything left resolves to "Other"

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use engine::{EngineError, EngineResult, Row, Table, Value, ValueKey};
use rule_parser::CategoryPredicate;

use crate::definition::{GroupingRules, RecategorizeDefinition, OTHER_CATEGORY};

// ============================================================================
// ENTITY INDEX
// ============================================================================

/// Entities in first-appearance order, with the rows that belong to each.
struct EntityIndex<'t> {
    /// First row of every entity, in order of first appearance.
    first_rows: Vec<&'t Row>,
    /// Entity position for every row of the input table.
    row_entity: Vec<usize>,
}

impl<'t> EntityIndex<'t> {
    fn build(table: &'t Table, id_col: usize) -> Self {
        let mut positions: FxHashMap<ValueKey, usize> = FxHashMap::default();
        let mut first_rows = Vec::new();
        let mut row_entity = Vec::with_capacity(table.len());

        for row in table.rows() {
            let next = first_rows.len();
            let entity = *positions.entry(row.get(id_col).key()).or_insert(next);
            if entity == next {
                first_rows.push(row);
            }
            row_entity.push(entity);
        }

        EntityIndex {
            first_rows,
            row_entity,
        }
    }

    fn len(&self) -> usize {
        self.first_rows.len()
    }
}

// ============================================================================
// MEMBERSHIP MATRIX
// ============================================================================

/// Per-entity boolean membership over a grouping's base categories.
struct Membership {
    base_categories: Vec<String>,
    /// One flag vector per entity, indexed like `base_categories`.
    flags: Vec<Vec<bool>>,
    /// Base category indices carried by each entity.
    carried: Vec<SmallVec<[usize; 4]>>,
}

impl Membership {
    fn build(
        table: &Table,
        entities: &EntityIndex<'_>,
        id_col: usize,
        source_col: usize,
        grouping: &str,
    ) -> EngineResult<Self> {
        let mut base_categories: Vec<String> = table
            .rows()
            .iter()
            .map(|r| r.get(source_col))
            .filter(|v| !v.is_empty())
            .map(Value::display)
            .collect();
        base_categories.sort();
        base_categories.dedup();

        let lookup: FxHashMap<&str, usize> = base_categories
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect();

        let mut flags = vec![vec![false; base_categories.len()]; entities.len()];
        let mut carried: Vec<SmallVec<[usize; 4]>> = vec![SmallVec::new(); entities.len()];

        for (row, &entity) in table.rows().iter().zip(&entities.row_entity) {
            let cell = row.get(source_col);
            if cell.is_empty() {
                continue;
            }
            let category = cell.display();
            let Some(&idx) = lookup.get(category.as_str()) else {
                continue;
            };

            if flags[entity][idx] {
                return Err(EngineError::DataIntegrity {
                    id: row.get(id_col).display(),
                    grouping: grouping.to_string(),
                    category,
                });
            }
            flags[entity][idx] = true;
            carried[entity].push(idx);
        }

        Ok(Membership {
            base_categories,
            flags,
            carried,
        })
    }
}

// ============================================================================
// RESOLUTION
// ============================================================================

/// Resolves one grouping to a category name per entity.
fn resolve_grouping(
    membership: &Membership,
    rules: &GroupingRules,
    combine_single_categories: bool,
) -> EngineResult<Vec<String>> {
    let mut resolved = vec![OTHER_CATEGORY.to_string(); membership.flags.len()];

    if !combine_single_categories {
        for (entity, carried) in membership.carried.iter().enumerate() {
            if let [only] = carried.as_slice() {
                resolved[entity] = membership.base_categories[*only].clone();
            }
        }
    }

    for rule in &rules.rules {
        let predicate = rule_parser::compile(&rule.expression, &membership.base_categories)
            .map_err(|e| {
                EngineError::Configuration(format!(
                    "rule '{}' for '{}': {}",
                    rule.name, rules.grouping, e
                ))
            })?;

        let claimed = apply_rule(&predicate, &membership.flags, &rule.name, &mut resolved);
        log::debug!(
            target: "RECAT",
            "'{}' / '{}' claimed {} entities",
            rules.grouping,
            rule.name,
            claimed
        );
    }

    Ok(resolved)
}

fn apply_rule(
    predicate: &CategoryPredicate,
    flags: &[Vec<bool>],
    name: &str,
    resolved: &mut [String],
) -> usize {
    let mut claimed = 0;
    for (entity, entity_flags) in flags.iter().enumerate() {
        if predicate.matches(entity_flags) {
            resolved[entity] = name.to_string();
            claimed += 1;
        }
    }
    claimed
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Recategorizes an exploded table into one row per entity.
///
/// Disabled definitions return the input unchanged. Otherwise every row
/// of the result is the first row seen for its id, with each grouping's
/// output column set to the resolved category.
pub fn recategorize(table: &Table, definition: &RecategorizeDefinition) -> EngineResult<Table> {
    if !definition.enabled {
        return Ok(table.clone());
    }

    let id_col = table.column_index(&definition.id_column)?;
    let entities = EntityIndex::build(table, id_col);

    let mut columns = table.columns().to_vec();
    let mut values: Vec<Vec<Value>> = entities
        .first_rows
        .iter()
        .map(|r| r.values.clone())
        .collect();

    for rules in &definition.rule_sets {
        let target = rules.target()?;
        let source_col = table.column_index(&target.source_column)?;

        let membership = Membership::build(table, &entities, id_col, source_col, &rules.grouping)?;
        log::debug!(
            target: "RECAT",
            "grouping '{}': {} entities, {} base categories, {} rules",
            rules.grouping,
            entities.len(),
            membership.base_categories.len(),
            rules.rules.len()
        );

        let resolved = resolve_grouping(&membership, rules, definition.combine_single_categories)?;

        let out_col = match columns.iter().position(|c| *c == target.output_column) {
            Some(col) => col,
            None => {
                columns.push(target.output_column.clone());
                for row in &mut values {
                    row.push(Value::Empty);
                }
                columns.len() - 1
            }
        };

        for (row, category) in values.iter_mut().zip(resolved) {
            if row.len() <= out_col {
                row.resize(out_col + 1, Value::Empty);
            }
            row[out_col] = Value::Text(category);
        }
    }

    let rows = entities
        .first_rows
        .iter()
        .zip(values)
        .map(|(first, values)| Row {
            index: first.index,
            values,
        })
        .collect();

    Ok(Table::from_rows(columns, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::GroupingRules;
    use std::collections::HashMap;

    const INCLUSIVE: &str = "'Northwestern Press' | ('Northwestern Press' & 'CIERA Press')";

    /// Entities {1: [NU, CIERA], 2: [External, CIERA], 3: [CIERA]}.
    fn press_exploded() -> Table {
        let mut table = Table::new(["id", "Press Types", "Year"]);
        let rows = [
            (1, "Northwestern Press", 2015),
            (1, "CIERA Press", 2015),
            (2, "External Press", 2014),
            (2, "CIERA Press", 2014),
            (3, "CIERA Press", 2015),
        ];
        for (id, press, year) in rows {
            table.push_row(vec![Value::from(id), Value::from(press), Value::from(year)]);
        }
        table
    }

    fn resolved(table: &Table, column: &str) -> HashMap<String, String> {
        let id_col = table.column_index("id").unwrap();
        let col = table.column_index(column).unwrap();
        table
            .rows()
            .iter()
            .map(|r| (r.get(id_col).display(), r.get(col).display()))
            .collect()
    }

    fn inclusive_rules() -> RecategorizeDefinition {
        RecategorizeDefinition::new(vec![
            GroupingRules::new("Press Types").with_rule("Northwestern Press (Inclusive)", INCLUSIVE)
        ])
    }

    #[test]
    fn test_inclusive_press_scenario() {
        let out = recategorize(&press_exploded(), &inclusive_rules()).unwrap();

        assert_eq!(out.len(), 3);
        let got = resolved(&out, "Press Types");
        assert_eq!(got["1"], "Northwestern Press (Inclusive)");
        assert_eq!(got["2"], "Other");
        assert_eq!(got["3"], "CIERA Press");
    }

    #[test]
    fn test_keeps_first_row_per_entity() {
        let out = recategorize(&press_exploded(), &inclusive_rules()).unwrap();

        assert_eq!(out.row_indices(), vec![0, 2, 4]);
        assert_eq!(out.columns(), press_exploded().columns());
        let year_col = out.column_index("Year").unwrap();
        assert_eq!(out.rows()[1].get(year_col), &Value::from(2014));
    }

    #[test]
    fn test_disabled_is_identity() {
        let table = press_exploded();
        let mut def = inclusive_rules();
        def.enabled = false;
        assert_eq!(recategorize(&table, &def).unwrap(), table);

        def.combine_single_categories = true;
        assert_eq!(recategorize(&table, &def).unwrap(), table);
    }

    #[test]
    fn test_combine_singles_sends_singles_to_other() {
        let mut def = inclusive_rules();
        def.combine_single_categories = true;
        let out = recategorize(&press_exploded(), &def).unwrap();

        let got = resolved(&out, "Press Types");
        assert_eq!(got["1"], "Northwestern Press (Inclusive)");
        assert_eq!(got["3"], "Other");
    }

    #[test]
    fn test_rule_overrides_single_baseline() {
        let def = RecategorizeDefinition::new(vec![
            GroupingRules::new("Press Types").with_rule("Anything CIERA", "'CIERA Press'")
        ]);
        let out = recategorize(&press_exploded(), &def).unwrap();

        let got = resolved(&out, "Press Types");
        assert!(got.values().all(|c| c == "Anything CIERA"));
    }

    #[test]
    fn test_last_rule_wins() {
        let def = RecategorizeDefinition::new(vec![GroupingRules::new("Press Types")
            .with_rule("First", "'CIERA Press'")
            .with_rule("Second", "'External Press'")]);
        let out = recategorize(&press_exploded(), &def).unwrap();

        let got = resolved(&out, "Press Types");
        assert_eq!(got["1"], "First");
        assert_eq!(got["2"], "Second");
        assert_eq!(got["3"], "First");
    }

    #[test]
    fn test_only_rule() {
        let mut def = RecategorizeDefinition::new(vec![
            GroupingRules::new("Press Types").with_rule("Pure CIERA", "only 'CIERA Press'")
        ]);
        def.combine_single_categories = true;
        let out = recategorize(&press_exploded(), &def).unwrap();

        let got = resolved(&out, "Press Types");
        assert_eq!(got["1"], "Other");
        assert_eq!(got["2"], "Other");
        assert_eq!(got["3"], "Pure CIERA");
    }

    #[test]
    fn test_overlapping_category_names() {
        let mut table = Table::new(["id", "Press Types"]);
        table.push_row(vec![Value::from(1), Value::from("Press")]);
        table.push_row(vec![Value::from(1), Value::from("CIERA Press")]);
        table.push_row(vec![Value::from(2), Value::from("CIERA Press")]);
        table.push_row(vec![Value::from(2), Value::from("External Press")]);

        let def = RecategorizeDefinition::new(vec![
            GroupingRules::new("Press Types").with_rule("Plain Press", "'Press'")
        ]);
        let out = recategorize(&table, &def).unwrap();

        let got = resolved(&out, "Press Types");
        assert_eq!(got["1"], "Plain Press");
        assert_eq!(got["2"], "Other");
    }

    #[test]
    fn test_duplicate_membership_is_integrity_error() {
        let mut table = press_exploded();
        table.push_row(vec![Value::from(3), Value::from("CIERA Press"), Value::from(2015)]);

        let err = recategorize(&table, &inclusive_rules()).unwrap_err();
        assert_eq!(
            err,
            EngineError::DataIntegrity {
                id: "3".to_string(),
                grouping: "Press Types".to_string(),
                category: "CIERA Press".to_string(),
            }
        );
    }

    #[test]
    fn test_unknown_category_is_configuration_error() {
        let def = RecategorizeDefinition::new(vec![
            GroupingRules::new("Press Types").with_rule("Bad", "'Daily Planet'")
        ]);
        let err = recategorize(&press_exploded(), &def).unwrap_err();
        match err {
            EngineError::Configuration(msg) => assert!(msg.contains("Daily Planet")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_rule_is_configuration_error() {
        let def = RecategorizeDefinition::new(vec![
            GroupingRules::new("Press Types").with_rule("Bad", "'CIERA Press' &")
        ]);
        assert!(matches!(
            recategorize(&press_exploded(), &def),
            Err(EngineError::Configuration(_))
        ));
    }

    #[test]
    fn test_alias_grouping_adds_column() {
        let def = RecategorizeDefinition::new(vec![GroupingRules::new(
            "Press (Simplified) [Press Types]",
        )
        .with_rule("Northwestern Press (Inclusive)", INCLUSIVE)]);
        let out = recategorize(&press_exploded(), &def).unwrap();

        assert_eq!(out.columns().last().unwrap(), "Press (Simplified)");
        let simplified = resolved(&out, "Press (Simplified)");
        let original = resolved(&out, "Press Types");
        assert_eq!(simplified["1"], "Northwestern Press (Inclusive)");
        assert_eq!(original["1"], "Northwestern Press");
    }

    #[test]
    fn test_multiple_groupings_resolve_independently() {
        let mut table = Table::new(["id", "Press Types", "Research Topics"]);
        table.push_row(vec![Value::from(1), Value::from("CIERA Press"), Value::from("Exoplanets")]);
        table.push_row(vec![Value::from(1), Value::from("External Press"), Value::from("Galaxies")]);
        table.push_row(vec![Value::from(2), Value::from("CIERA Press"), Value::from("Galaxies")]);

        let def = RecategorizeDefinition::new(vec![
            GroupingRules::new("Press Types").with_rule("Both", "'CIERA Press' & 'External Press'"),
            GroupingRules::new("Research Topics"),
        ]);
        let out = recategorize(&table, &def).unwrap();

        let press = resolved(&out, "Press Types");
        let topics = resolved(&out, "Research Topics");
        assert_eq!(press["1"], "Both");
        assert_eq!(press["2"], "CIERA Press");
        assert_eq!(topics["1"], "Other");
        assert_eq!(topics["2"], "Galaxies");
    }

    #[test]
    fn test_cross_exploded_groupings_are_rejected() {
        // Exploding two groupings against each other repeats categories per id.
        let mut table = Table::new(["id", "Press Types", "Research Topics"]);
        table.push_row(vec![Value::from(1), Value::from("CIERA Press"), Value::from("Exoplanets")]);
        table.push_row(vec![Value::from(1), Value::from("External Press"), Value::from("Exoplanets")]);

        let def = RecategorizeDefinition::new(vec![
            GroupingRules::new("Press Types"),
            GroupingRules::new("Research Topics"),
        ]);
        assert!(matches!(
            recategorize(&table, &def),
            Err(EngineError::DataIntegrity { .. })
        ));
    }

    #[test]
    fn test_every_entity_resolves_exactly_once() {
        let mut table = Table::new(["id", "Research Topics"]);
        let topics = ["Compact Objects", "Exoplanets", "Galaxies & Cosmology", "N/A"];
        for id in 0..40i64 {
            for (j, topic) in topics.iter().enumerate() {
                if (id as usize + j) % 3 == 0 || j == id as usize % 4 {
                    table.push_row(vec![Value::from(id), Value::from(*topic)]);
                }
            }
        }

        let def = RecategorizeDefinition::new(vec![GroupingRules::new("Research Topics")
            .with_rule("Compact", "'Compact Objects' only")
            .with_rule("Planets+", "'Exoplanets' & ~'N/A'")]);
        let out = recategorize(&table, &def).unwrap();

        assert_eq!(out.len(), 40);
        let col = out.column_index("Research Topics").unwrap();
        for row in out.rows() {
            assert!(matches!(row.get(col), Value::Text(s) if !s.is_empty()));
        }
    }

    #[test]
    fn test_missing_columns_are_reported() {
        let def = RecategorizeDefinition::new(vec![GroupingRules::new("Categories")]);
        assert_eq!(
            recategorize(&press_exploded(), &def).unwrap_err(),
            EngineError::ColumnNotFound("Categories".to_string())
        );

        let mut def = inclusive_rules();
        def.id_column = "Article ID".to_string();
        assert_eq!(
            recategorize(&press_exploded(), &def).unwrap_err(),
            EngineError::ColumnNotFound("Article ID".to_string())
        );
    }

    #[test]
    fn test_empty_cells_carry_no_membership() {
        let mut table = Table::new(["id", "Press Types"]);
        table.push_row(vec![Value::from(1), Value::Empty]);
        table.push_row(vec![Value::from(2), Value::from("CIERA Press")]);

        let out = recategorize(&table, &RecategorizeDefinition::new(vec![GroupingRules::new(
            "Press Types",
        )]))
        .unwrap();
        let got = resolved(&out, "Press Types");
        assert_eq!(got["1"], "Other");
        assert_eq!(got["2"], "CIERA Press");
    }
}
