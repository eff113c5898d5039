//! Per-entity and per-relation override documents.
//!
//! A model configuration is a JSON document keyed by table name. It renames
//! entities and attributes, overrides column nullability and names relation
//! accessors. Documents can include secondary documents; paths are resolved
//! relative to the including document.
//!
//! # Example
//! ```json
//! {
//!   "conventions": { "fk_suffixes": ["Id", "Fk"] },
//!   "includes": [ { "path": "shared.json", "optional": true } ],
//!   "entities": {
//!     "book": {
//!       "entity_name": "Volume",
//!       "columns": { "isbn": { "nullable": false } },
//!       "relations": { "author_id": { "var": "writer", "inverse_vars": "writtenBooks" } }
//!     }
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Naming conventions applied when no explicit override exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingConventions {
    /// Suffixes stripped from a foreign-key attribute's camel-cased name to
    /// name the relation (`authorId` -> `author`). Tried in order.
    pub fk_suffixes: Vec<String>,
}

impl Default for NamingConventions {
    fn default() -> Self {
        Self {
            fk_suffixes: vec!["Id".to_string()],
        }
    }
}

/// Column overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub field_name: Option<String>,
    pub nullable: Option<bool>,
}

/// Relation accessor overrides.
///
/// An empty string is an explicit blank, which differs from an absent value:
/// blanking both inverse names removes the inverse accessor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationConfig {
    pub var: Option<String>,
    pub vars: Option<String>,
    pub inverse_var: Option<String>,
    pub inverse_vars: Option<String>,
    /// `Some(false)` disables inverse navigation
    pub inverse: Option<bool>,
}

/// Entity overrides for one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityConfig {
    pub entity_name: Option<String>,
    pub var: Option<String>,
    pub vars: Option<String>,
    pub columns: BTreeMap<String, ColumnConfig>,
    /// Keyed by the first foreign-key column, or by the junction table name
    /// for many-to-many relations
    pub relations: BTreeMap<String, RelationConfig>,
}

/// Reference to a secondary configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludeRef {
    pub path: PathBuf,
    #[serde(default)]
    pub optional: bool,
}

/// Model derivation overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub conventions: Option<NamingConventions>,
    pub entities: BTreeMap<String, EntityConfig>,
    pub includes: Vec<IncludeRef>,
}

impl ModelConfig {
    /// Effective naming conventions.
    pub fn conventions(&self) -> NamingConventions {
        self.conventions.clone().unwrap_or_default()
    }

    /// Overrides for a table, exact name first, then case-insensitive.
    pub fn entity(&self, table_name: &str) -> Option<&EntityConfig> {
        self.entities.get(table_name).or_else(|| {
            self.entities
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(table_name))
                .map(|(_, config)| config)
        })
    }

    /// Overrides for a column of a table.
    pub fn column(&self, table_name: &str, column_name: &str) -> Option<&ColumnConfig> {
        let entity = self.entity(table_name)?;
        entity.columns.get(column_name).or_else(|| {
            entity
                .columns
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(column_name))
                .map(|(_, config)| config)
        })
    }

    /// Overrides for a relation of a table.
    pub fn relation(&self, table_name: &str, key: &str) -> Option<&RelationConfig> {
        let entity = self.entity(table_name)?;
        entity.relations.get(key).or_else(|| {
            entity
                .relations
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(key))
                .map(|(_, config)| config)
        })
    }

    /// Parses a configuration document without resolving includes.
    ///
    /// # Errors
    /// Returns a serialization error for malformed JSON.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            crate::error::DbModelerError::serialization("Failed to parse model configuration", e)
        })
    }

    /// Loads a configuration document and its includes.
    ///
    /// Included documents act as defaults: values set by the including
    /// document win. A missing optional include is skipped with a warning;
    /// any other failure is an error naming the absolute path.
    ///
    /// # Errors
    /// Returns a configuration file error when the primary document or a
    /// required include cannot be read or parsed.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let mut visited = BTreeSet::new();
        Self::load_document(path, false, &mut visited).map(Option::unwrap_or_default)
    }

    fn load_document(
        path: &Path,
        optional: bool,
        visited: &mut BTreeSet<PathBuf>,
    ) -> crate::Result<Option<Self>> {
        let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

        if !visited.insert(absolute.clone()) {
            tracing::warn!(
                "Configuration '{}' included more than once, skipping",
                absolute.display()
            );
            return Ok(None);
        }

        let content = match std::fs::read_to_string(&absolute) {
            Ok(content) => content,
            Err(e) if optional && e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    "Optional configuration '{}' not found, skipping",
                    absolute.display()
                );
                return Ok(None);
            }
            Err(e) => {
                return Err(crate::error::DbModelerError::configuration_file(
                    &absolute,
                    e.to_string(),
                ));
            }
        };

        let mut config: Self = serde_json::from_str(&content).map_err(|e| {
            crate::error::DbModelerError::configuration_file(&absolute, e.to_string())
        })?;
        tracing::debug!("Loaded model configuration '{}'", absolute.display());

        let base_dir = absolute.parent().map(Path::to_path_buf).unwrap_or_default();
        let includes = std::mem::take(&mut config.includes);
        let mut merged = Self::default();
        for include in &includes {
            let include_path = base_dir.join(&include.path);
            if let Some(included) = Self::load_document(&include_path, include.optional, visited)? {
                merged.merge(included);
            }
        }
        merged.merge(config);
        merged.includes = includes;
        Ok(Some(merged))
    }

    /// Merges `other` over `self`; values set in `other` win.
    pub fn merge(&mut self, other: Self) {
        if other.conventions.is_some() {
            self.conventions = other.conventions;
        }
        for (table, entity) in other.entities {
            self.entities.entry(table).or_default().merge(entity);
        }
    }
}

impl EntityConfig {
    fn merge(&mut self, other: Self) {
        merge_option(&mut self.entity_name, other.entity_name);
        merge_option(&mut self.var, other.var);
        merge_option(&mut self.vars, other.vars);
        for (column, config) in other.columns {
            let target = self.columns.entry(column).or_default();
            merge_option(&mut target.field_name, config.field_name);
            merge_option(&mut target.nullable, config.nullable);
        }
        for (key, config) in other.relations {
            let target = self.relations.entry(key).or_default();
            merge_option(&mut target.var, config.var);
            merge_option(&mut target.vars, config.vars);
            merge_option(&mut target.inverse_var, config.inverse_var);
            merge_option(&mut target.inverse_vars, config.inverse_vars);
            merge_option(&mut target.inverse, config.inverse);
        }
    }
}

fn merge_option<T>(target: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *target = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_parse_document() {
        let config = ModelConfig::from_json(
            r#"{
                "conventions": { "fk_suffixes": ["Id", "Fk"] },
                "entities": {
                    "book": {
                        "entity_name": "Volume",
                        "columns": { "isbn": { "nullable": false } },
                        "relations": { "author_id": { "var": "writer", "inverse_vars": "" } }
                    }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.conventions().fk_suffixes, vec!["Id", "Fk"]);
        assert_eq!(
            config.entity("BOOK").and_then(|e| e.entity_name.as_deref()),
            Some("Volume")
        );
        assert_eq!(
            config.column("book", "ISBN").and_then(|c| c.nullable),
            Some(false)
        );
        let relation = config.relation("book", "author_id").unwrap();
        assert_eq!(relation.var.as_deref(), Some("writer"));
        assert_eq!(relation.inverse_vars.as_deref(), Some(""));
        assert_eq!(relation.inverse_var, None);
    }

    #[test]
    fn test_default_conventions() {
        let config = ModelConfig::default();
        assert_eq!(config.conventions().fk_suffixes, vec!["Id"]);
        assert!(config.entity("book").is_none());
    }

    #[test]
    fn test_load_with_includes_primary_wins() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("shared.json"),
            r#"{ "entities": { "book": { "entity_name": "Shared", "var": "tome" } } }"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("model.json"),
            r#"{
                "includes": [
                    { "path": "shared.json" },
                    { "path": "missing.json", "optional": true }
                ],
                "entities": { "book": { "entity_name": "Volume" } }
            }"#,
        )
        .unwrap();

        let config = ModelConfig::load(&dir.path().join("model.json")).unwrap();
        let book = config.entity("book").unwrap();
        assert_eq!(book.entity_name.as_deref(), Some("Volume"));
        assert_eq!(book.var.as_deref(), Some("tome"));
        assert_eq!(config.includes.len(), 2);
    }

    #[test]
    fn test_missing_required_include_names_absolute_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("model.json"),
            r#"{ "includes": [ { "path": "required.json" } ] }"#,
        )
        .unwrap();

        let error = ModelConfig::load(&dir.path().join("model.json")).unwrap_err();
        let message = error.to_string();
        let expected = dir.path().join("required.json");
        assert!(
            message.contains(&expected.display().to_string()),
            "unexpected message: {}",
            message
        );
    }

    #[test]
    fn test_malformed_optional_include_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        fs::write(
            dir.path().join("model.json"),
            r#"{ "includes": [ { "path": "broken.json", "optional": true } ] }"#,
        )
        .unwrap();

        assert!(ModelConfig::load(&dir.path().join("model.json")).is_err());
    }

    #[test]
    fn test_include_cycle_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("a.json"),
            r#"{ "includes": [ { "path": "b.json" } ], "entities": { "a": { "var": "alpha" } } }"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("b.json"),
            r#"{ "includes": [ { "path": "a.json" } ], "entities": { "b": { "var": "beta" } } }"#,
        )
        .unwrap();

        let config = ModelConfig::load(&dir.path().join("a.json")).unwrap();
        assert!(config.entity("a").is_some());
        assert!(config.entity("b").is_some());
    }

    #[test]
    fn test_missing_primary_document_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ModelConfig::load(&dir.path().join("nope.json")).is_err());
    }
}
