//! Raw catalog metadata extracted from a database.
//!
//! These structures mirror what the introspection interface reports, plus
//! the facts added by vendor extensions. They are serializable so that an
//! extraction can be persisted as a catalog document (see
//! [`crate::catalog`]) and derived into a domain model later.

use crate::config::JdbcConnectivity;
use crate::types::JdbcType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current catalog document format version.
pub const FORMAT_VERSION: &str = "1.0";

/// Database product information reported by the introspection source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    pub product_name: String,
    pub product_version: Option<String>,
    pub driver_name: Option<String>,
}

impl DatabaseInfo {
    /// Creates database info for the given product name.
    pub fn new(product_name: impl Into<String>) -> Self {
        Self {
            product_name: product_name.into(),
            product_version: None,
            driver_name: None,
        }
    }

    /// Case-insensitive product name comparison.
    pub fn is_product(&self, product_name: &str) -> bool {
        self.product_name.eq_ignore_ascii_case(product_name)
    }
}

/// A table column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    /// Resolved type; `None` when neither code nor name could be resolved
    pub data_type: Option<JdbcType>,
    /// Type name as spelled by the vendor
    pub type_name: String,
    pub size: Option<u32>,
    pub decimal_digits: Option<u32>,
    pub nullable: bool,
    pub ordinal_position: u32,
    pub auto_increment: bool,
    pub remarks: Option<String>,
    #[serde(default)]
    pub enum_values: Vec<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl Column {
    /// Creates a nullable column with the given resolved type.
    pub fn new(name: impl Into<String>, data_type: Option<JdbcType>) -> Self {
        let type_name = data_type.map(|t| t.name().to_string()).unwrap_or_default();
        Self {
            name: name.into(),
            data_type,
            type_name,
            size: None,
            decimal_digits: None,
            nullable: true,
            ordinal_position: 0,
            auto_increment: false,
            remarks: None,
            enum_values: Vec::new(),
            attributes: BTreeMap::new(),
        }
    }

    /// Builder-style nullability setter.
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// True when the column holds character data.
    pub fn is_string_like(&self) -> bool {
        self.data_type.is_some_and(JdbcType::is_string_like)
    }
}

/// One column pair of a foreign key, in key sequence order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyColumnPair {
    pub fk_column: String,
    pub pk_column: String,
}

/// A foreign key viewed from the referencing table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedKey {
    pub name: Option<String>,
    pub pk_table: String,
    pub pk_schema: Option<String>,
    pub columns: Vec<KeyColumnPair>,
}

impl ImportedKey {
    /// Referencing column names in key order.
    pub fn fk_columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.fk_column.as_str())
    }

    /// Referenced column names in key order.
    pub fn pk_columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.pk_column.as_str())
    }

    /// True for keys spanning more than one column.
    pub fn is_composite(&self) -> bool {
        self.columns.len() > 1
    }
}

/// A simple or composite index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub unique: bool,
    pub columns: Vec<String>,
}

/// A table (or view) with its columns, keys and indexes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub schema: Option<String>,
    pub catalog: Option<String>,
    pub table_type: String,
    pub remarks: Option<String>,
    pub columns: Vec<Column>,
    /// Primary key column names in key sequence order
    #[serde(default)]
    pub primary_keys: Vec<String>,
    #[serde(default)]
    pub imported_keys: Vec<ImportedKey>,
    #[serde(default)]
    pub indexes: Vec<Index>,
}

impl Table {
    /// Creates an empty base table.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            catalog: None,
            table_type: "TABLE".to_string(),
            remarks: None,
            columns: Vec::new(),
            primary_keys: Vec::new(),
            imported_keys: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Looks a column up by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Mutable column lookup, case-insensitive (vendor catalogs disagree on case).
    pub fn column_mut_ignore_case(&mut self, name: &str) -> Option<&mut Column> {
        self.columns
            .iter_mut()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// True when the table declares a primary key.
    pub fn has_primary_key(&self) -> bool {
        !self.primary_keys.is_empty()
    }

    /// True when the column is part of the primary key.
    pub fn is_primary_key(&self, column: &str) -> bool {
        self.primary_keys.iter().any(|pk| pk == column)
    }

    /// True when the column participates in any imported key.
    pub fn is_foreign_key(&self, column: &str) -> bool {
        self.imported_keys
            .iter()
            .any(|fk| fk.fk_columns().any(|c| c == column))
    }
}

/// Facts about the extraction run itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionInfo {
    pub extracted_at: chrono::DateTime<chrono::Utc>,
    pub extraction_duration_ms: u64,
    pub extractor_version: String,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl Default for ExtractionInfo {
    fn default() -> Self {
        Self {
            extracted_at: chrono::Utc::now(),
            extraction_duration_ms: 0,
            extractor_version: env!("CARGO_PKG_VERSION").to_string(),
            warnings: Vec::new(),
        }
    }
}

/// Root aggregate of an extraction run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    pub format_version: String,
    pub database_info: DatabaseInfo,
    pub connectivity: JdbcConnectivity,
    /// Tables in extraction order
    pub tables: Vec<Table>,
    pub extraction: ExtractionInfo,
}

/// Element counts used to compare two metadata graphs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetadataCounts {
    pub tables: usize,
    pub columns: usize,
    pub primary_keys: usize,
    pub imported_keys: usize,
    pub indexes: usize,
    pub enum_values: usize,
}

impl Metadata {
    /// Creates empty metadata for a database product.
    pub fn new(database_info: DatabaseInfo, connectivity: JdbcConnectivity) -> Self {
        Self {
            format_version: FORMAT_VERSION.to_string(),
            database_info,
            connectivity,
            tables: Vec::new(),
            extraction: ExtractionInfo::default(),
        }
    }

    /// Appends a table. Returns `false` (and leaves metadata untouched) when
    /// a table with the same name already exists.
    pub fn add_table(&mut self, table: Table) -> bool {
        if self.table(&table.name).is_some() {
            return false;
        }
        self.tables.push(table);
        true
    }

    /// Looks a table up by name.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Mutable table lookup, case-insensitive.
    pub fn table_mut_ignore_case(&mut self, name: &str) -> Option<&mut Table> {
        self.tables
            .iter_mut()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Adds a warning to the extraction info.
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.extraction.warnings.push(warning.into());
    }

    /// Counts tables, columns, keys, indexes and enum values.
    pub fn counts(&self) -> MetadataCounts {
        let mut counts = MetadataCounts {
            tables: self.tables.len(),
            ..MetadataCounts::default()
        };
        for table in &self.tables {
            counts.columns += table.columns.len();
            counts.primary_keys += table.primary_keys.len();
            counts.imported_keys += table.imported_keys.len();
            counts.indexes += table.indexes.len();
            counts.enum_values += table
                .columns
                .iter()
                .map(|c| c.enum_values.len())
                .sum::<usize>();
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Table {
        let mut table = Table::new("film");
        table
            .columns
            .push(Column::new("film_id", Some(JdbcType::Integer)).not_null());
        table
            .columns
            .push(Column::new("language_id", Some(JdbcType::Integer)).not_null());
        let mut rating = Column::new("rating", Some(JdbcType::VarChar));
        rating.enum_values = vec!["G".to_string(), "PG".to_string()];
        table.columns.push(rating);
        table.primary_keys.push("film_id".to_string());
        table.imported_keys.push(ImportedKey {
            name: Some("fk_film_language".to_string()),
            pk_table: "language".to_string(),
            pk_schema: None,
            columns: vec![KeyColumnPair {
                fk_column: "language_id".to_string(),
                pk_column: "language_id".to_string(),
            }],
        });
        table
    }

    #[test]
    fn test_table_key_lookups() {
        let table = sample_table();
        assert!(table.has_primary_key());
        assert!(table.is_primary_key("film_id"));
        assert!(!table.is_primary_key("rating"));
        assert!(table.is_foreign_key("language_id"));
        assert!(!table.is_foreign_key("film_id"));
        assert!(table.column("rating").is_some_and(Column::is_string_like));
    }

    #[test]
    fn test_duplicate_table_rejected() {
        let mut metadata = Metadata::new(DatabaseInfo::new("H2"), JdbcConnectivity::default());
        assert!(metadata.add_table(sample_table()));
        assert!(!metadata.add_table(Table::new("film")));
        assert_eq!(metadata.tables.len(), 1);
    }

    #[test]
    fn test_counts() {
        let mut metadata = Metadata::new(DatabaseInfo::new("H2"), JdbcConnectivity::default());
        metadata.add_table(sample_table());
        metadata.add_table(Table::new("language"));

        let counts = metadata.counts();
        assert_eq!(counts.tables, 2);
        assert_eq!(counts.columns, 3);
        assert_eq!(counts.primary_keys, 1);
        assert_eq!(counts.imported_keys, 1);
        assert_eq!(counts.indexes, 0);
        assert_eq!(counts.enum_values, 2);
    }

    #[test]
    fn test_product_comparison_ignores_case() {
        let info = DatabaseInfo::new("PostgreSQL");
        assert!(info.is_product("postgresql"));
        assert!(!info.is_product("MySQL"));
    }

    #[test]
    fn test_case_insensitive_mutation() {
        let mut metadata = Metadata::new(DatabaseInfo::new("Oracle"), JdbcConnectivity::default());
        metadata.add_table(sample_table());
        let table = metadata.table_mut_ignore_case("FILM").unwrap();
        let column = table.column_mut_ignore_case("RATING").unwrap();
        column.attributes.insert("check".to_string(), "x".to_string());
        assert_eq!(
            metadata.table("film").unwrap().column("rating").unwrap().attributes["check"],
            "x"
        );
    }
}
