//! Introspection adapters: the boundary between a live database catalog
//! and the metadata extractor.
//!
//! An adapter answers the questions a JDBC `DatabaseMetaData` answers
//! (tables, columns, primary keys, imported keys, indexes) plus a generic
//! catalog query used by vendor extensions for facts the generic calls
//! cannot provide. Adapters never read row data.
//!
//! # Module Structure
//! - `helpers`: row decoding shared by the sqlx-backed adapters
//! - `memory`: in-memory catalog for fixtures and offline replays
//! - `sqlite`, `postgres`: sqlx-backed adapters (feature-gated)
//!
//! # Concurrency
//! The extractor drives an adapter strictly sequentially; most catalog
//! interfaces are not safe for concurrent cursors on one connection.

#[cfg(any(feature = "postgresql", feature = "sqlite"))]
pub mod helpers;
pub mod memory;
#[cfg(feature = "postgresql")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use crate::Result;
use crate::models::{DatabaseInfo, ImportedKey, Index};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A table as listed by the catalog, before its columns are read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTable {
    pub name: String,
    pub schema: Option<String>,
    pub catalog: Option<String>,
    /// JDBC style table type (`TABLE`, `VIEW`, `SYNONYM`, ...)
    pub table_type: String,
    pub remarks: Option<String>,
}

impl RawTable {
    /// Creates a base table entry.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            catalog: None,
            table_type: "TABLE".to_string(),
            remarks: None,
        }
    }

    /// Schema-qualified name for log and error messages.
    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.name),
            None => self.name.clone(),
        }
    }
}

/// A column as reported by the catalog, before type resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawColumn {
    pub name: String,
    /// JDBC type code when the adapter could map the vendor type
    pub type_code: Option<i32>,
    pub type_name: String,
    pub size: Option<u32>,
    pub decimal_digits: Option<u32>,
    pub nullable: bool,
    pub ordinal_position: u32,
    pub auto_increment: bool,
    pub remarks: Option<String>,
}

impl RawColumn {
    /// Creates a nullable column with the given vendor type.
    pub fn new(name: impl Into<String>, type_code: Option<i32>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_code,
            type_name: type_name.into(),
            size: None,
            decimal_digits: None,
            nullable: true,
            ordinal_position: 0,
            auto_increment: false,
            remarks: None,
        }
    }

    /// Builder-style nullability setter.
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// One row of a generic catalog query, values rendered as text.
///
/// Column lookups ignore case because vendors disagree on identifier case
/// in their catalog views.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRow {
    values: BTreeMap<String, Option<String>>,
}

impl QueryRow {
    /// Creates an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style value setter.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(column, Some(value.into()));
        self
    }

    /// Sets a value; `None` is SQL NULL.
    pub fn insert(&mut self, column: impl Into<String>, value: Option<String>) {
        self.values.insert(column.into().to_lowercase(), value);
    }

    /// Returns a non-null value.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values
            .get(&column.to_lowercase())
            .and_then(|v| v.as_deref())
    }
}

/// Read-only access to a database catalog.
///
/// # Object Safety
/// This trait is object-safe; the extractor and vendor extensions work
/// against `&dyn CatalogAdapter`.
#[async_trait]
pub trait CatalogAdapter: Send + Sync {
    /// Database product name and version.
    ///
    /// # Errors
    /// Returns an error when the catalog cannot be queried.
    async fn database_info(&self) -> Result<DatabaseInfo>;

    /// Lists tables of every type in the given catalog/schema.
    ///
    /// # Errors
    /// Returns an error when the catalog cannot be queried.
    async fn tables(&self, catalog: Option<&str>, schema: Option<&str>) -> Result<Vec<RawTable>>;

    /// Lists the columns of a table in ordinal order.
    ///
    /// # Errors
    /// Returns an error when the catalog cannot be queried.
    async fn columns(&self, table: &RawTable) -> Result<Vec<RawColumn>>;

    /// Primary key column names in key sequence order.
    ///
    /// # Errors
    /// Returns an error when the catalog cannot be queried.
    async fn primary_keys(&self, table: &RawTable) -> Result<Vec<String>>;

    /// Foreign keys declared on the table.
    ///
    /// # Errors
    /// Returns an error when the catalog cannot be queried.
    async fn imported_keys(&self, table: &RawTable) -> Result<Vec<ImportedKey>>;

    /// Indexes of the table, excluding the primary key index.
    ///
    /// # Errors
    /// Returns an error when the catalog cannot be queried.
    async fn indexes(&self, table: &RawTable, unique_only: bool) -> Result<Vec<Index>>;

    /// Runs a vendor-specific catalog query with positional text parameters.
    ///
    /// # Errors
    /// Returns an error when the query fails.
    async fn query(&self, sql: &str, params: &[&str]) -> Result<Vec<QueryRow>>;

    /// Called when a vendor extension opens a session on this adapter.
    fn session_opened(&self, _extension: &str) {}

    /// Called when a vendor extension session is released.
    fn session_released(&self, _extension: &str) {}
}

/// Creates an adapter for a connection url.
///
/// # Errors
/// Returns an error when the url scheme is unknown, the matching feature is
/// not compiled in, or the connection fails.
pub async fn create_adapter(url: &str) -> Result<Box<dyn CatalogAdapter>> {
    let scheme = url.split(':').next().unwrap_or_default().to_lowercase();

    match scheme.as_str() {
        #[cfg(feature = "postgresql")]
        "postgres" | "postgresql" => Ok(Box::new(postgres::PostgresAdapter::connect(url).await?)),
        #[cfg(feature = "sqlite")]
        "sqlite" => Ok(Box::new(sqlite::SqliteAdapter::connect(url).await?)),
        #[cfg(feature = "sqlite")]
        _ if is_sqlite_file(url) => Ok(Box::new(
            sqlite::SqliteAdapter::connect(&format!("sqlite://{}", url)).await?,
        )),
        _ => Err(crate::error::DbModelerError::unsupported_feature(
            format!("Connection scheme '{}'", scheme),
            crate::error::redact_database_url(url),
        )),
    }
}

#[cfg(feature = "sqlite")]
fn is_sqlite_file(url: &str) -> bool {
    [".db", ".sqlite", ".sqlite3"]
        .iter()
        .any(|extension| url.ends_with(extension))
}
