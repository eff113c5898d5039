//! Unique constraint classification.

use super::{Entity, Unique};
use crate::models::Table;
use std::collections::BTreeSet;
use tracing::debug;

/// Turns a table's unique indexes into [`Unique`] constraints on its entity.
pub struct UniqueClassifier;

impl UniqueClassifier {
    /// Classifies the unique indexes of `table` against `entity`.
    ///
    /// Non-unique indexes, indexes over exactly the primary key columns and
    /// repeated column lists are skipped. An index naming an unmapped column
    /// is skipped with a warning.
    pub fn classify(entity: &Entity, table: &Table, warnings: &mut Vec<String>) -> Vec<Unique> {
        let primary_key: BTreeSet<usize> = entity.primary_key.iter().copied().collect();
        let mut seen: BTreeSet<Vec<usize>> = BTreeSet::new();
        let mut uniques = Vec::new();

        for index in table.indexes.iter().filter(|i| i.unique) {
            let mut attributes = Vec::with_capacity(index.columns.len());
            let mut unmapped = None;
            for column in &index.columns {
                match entity.attribute_index(column) {
                    Some(attribute) => attributes.push(attribute),
                    None => {
                        unmapped = Some(column);
                        break;
                    }
                }
            }

            if let Some(column) = unmapped {
                warnings.push(format!(
                    "{}: unique index '{}' references unknown column '{}', skipped",
                    table.name, index.name, column
                ));
                continue;
            }
            if attributes.is_empty() {
                continue;
            }

            let column_set: BTreeSet<usize> = attributes.iter().copied().collect();
            if column_set == primary_key {
                debug!("{}: unique index '{}' duplicates the primary key", table.name, index.name);
                continue;
            }
            if !seen.insert(attributes.clone()) {
                continue;
            }

            uniques.push(if attributes.len() == 1 {
                Unique::Simple {
                    name: index.name.clone(),
                    attribute: attributes[0],
                }
            } else {
                Unique::Composite {
                    name: index.name.clone(),
                    attributes,
                }
            });
        }

        uniques
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attribute, naming};
    use crate::models::{Column, Index};
    use crate::types::JdbcType;

    fn fixture() -> (Entity, Table) {
        let mut table = Table::new("staff");
        table
            .columns
            .push(Column::new("staff_id", Some(JdbcType::Integer)).not_null());
        table
            .columns
            .push(Column::new("username", Some(JdbcType::VarChar)).not_null());
        table
            .columns
            .push(Column::new("email", Some(JdbcType::VarChar)));
        table.primary_keys.push("staff_id".to_string());

        let attributes = table
            .columns
            .iter()
            .map(|c| Attribute {
                column_name: c.name.clone(),
                namer: naming::namer_for(&c.name),
                data_type: c.data_type,
                type_name: c.type_name.clone(),
                nullable: c.nullable,
                primary_key: table.is_primary_key(&c.name),
                foreign_key: false,
                auto_increment: false,
                enum_values: Vec::new(),
                size: None,
                decimal_digits: None,
                remarks: None,
            })
            .collect();
        let entity = Entity {
            table_name: "staff".to_string(),
            schema: None,
            namer: naming::namer_for("staff"),
            remarks: None,
            attributes,
            primary_key: vec![0],
            uniques: Vec::new(),
            relations: Vec::new(),
        };
        (entity, table)
    }

    fn index(name: &str, unique: bool, columns: &[&str]) -> Index {
        Index {
            name: name.to_string(),
            unique,
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn test_simple_and_composite() {
        let (entity, mut table) = fixture();
        table.indexes.push(index("uk_username", true, &["username"]));
        table
            .indexes
            .push(index("uk_login", true, &["username", "email"]));
        let mut warnings = Vec::new();

        let uniques = UniqueClassifier::classify(&entity, &table, &mut warnings);
        assert_eq!(uniques.len(), 2);
        assert!(matches!(&uniques[0], Unique::Simple { attribute: 1, .. }));
        assert_eq!(uniques[1].attributes(), &[1, 2]);
        assert!(uniques[1].is_composite());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_skips_non_unique_and_primary_key_indexes() {
        let (entity, mut table) = fixture();
        table.indexes.push(index("idx_email", false, &["email"]));
        table.indexes.push(index("staff_pkey", true, &["staff_id"]));
        table
            .indexes
            .push(index("uk_username", true, &["username"]));
        table
            .indexes
            .push(index("uk_username_again", true, &["username"]));
        let mut warnings = Vec::new();

        let uniques = UniqueClassifier::classify(&entity, &table, &mut warnings);
        assert_eq!(uniques.len(), 1);
        assert_eq!(uniques[0].name(), "uk_username");
    }

    #[test]
    fn test_unknown_column_warns() {
        let (entity, mut table) = fixture();
        table.indexes.push(index("uk_ghost", true, &["ghost"]));
        let mut warnings = Vec::new();

        assert!(UniqueClassifier::classify(&entity, &table, &mut warnings).is_empty());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("ghost"));
    }
}
