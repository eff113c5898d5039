//! In-memory catalog adapter.
//!
//! Serves a fixed catalog description and canned results for vendor
//! queries. Used for fixtures, for replaying a catalog captured elsewhere,
//! and for exercising vendor extensions without the vendor's database.

use super::{CatalogAdapter, QueryRow, RawColumn, RawTable};
use crate::Result;
use crate::models::{DatabaseInfo, ImportedKey, Index};
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// One table of an in-memory catalog.
#[derive(Debug, Clone)]
pub struct MemoryTable {
    pub table: RawTable,
    pub columns: Vec<RawColumn>,
    pub primary_keys: Vec<String>,
    pub imported_keys: Vec<ImportedKey>,
    pub indexes: Vec<Index>,
}

impl MemoryTable {
    /// Creates a base table without columns.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            table: RawTable::new(name),
            columns: Vec::new(),
            primary_keys: Vec::new(),
            imported_keys: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Adds a column; ordinal positions follow insertion order.
    pub fn column(mut self, mut column: RawColumn) -> Self {
        column.ordinal_position = u32::try_from(self.columns.len())
            .unwrap_or(u32::MAX)
            .saturating_add(1);
        self.columns.push(column);
        self
    }

    /// Declares the primary key columns.
    pub fn primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_keys = columns.iter().map(|c| (*c).to_string()).collect();
        self
    }

    /// Adds a single or composite foreign key to `pk_table`.
    pub fn foreign_key(mut self, name: &str, pk_table: &str, pairs: &[(&str, &str)]) -> Self {
        self.imported_keys.push(ImportedKey {
            name: Some(name.to_string()),
            pk_table: pk_table.to_string(),
            pk_schema: None,
            columns: pairs
                .iter()
                .map(|(fk, pk)| crate::models::KeyColumnPair {
                    fk_column: (*fk).to_string(),
                    pk_column: (*pk).to_string(),
                })
                .collect(),
        });
        self
    }

    /// Adds an index.
    pub fn index(mut self, name: &str, unique: bool, columns: &[&str]) -> Self {
        self.indexes.push(Index {
            name: name.to_string(),
            unique,
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
        });
        self
    }

    /// Sets the table type.
    pub fn table_type(mut self, table_type: &str) -> Self {
        self.table.table_type = table_type.to_string();
        self
    }
}

#[derive(Debug)]
enum CannedResult {
    Rows(Vec<QueryRow>),
    Failure(String),
}

/// Catalog adapter backed by in-memory tables.
///
/// Vendor queries are answered by the first canned result whose key is a
/// case-insensitive substring of the SQL text; unmatched queries return no
/// rows.
#[derive(Debug)]
pub struct MemoryAdapter {
    info: DatabaseInfo,
    tables: Vec<MemoryTable>,
    canned: Vec<(String, CannedResult)>,
    executed: Mutex<Vec<String>>,
    open_sessions: AtomicUsize,
    total_sessions: AtomicUsize,
}

impl MemoryAdapter {
    /// Creates an empty catalog for a database product.
    pub fn new(info: DatabaseInfo) -> Self {
        Self {
            info,
            tables: Vec::new(),
            canned: Vec::new(),
            executed: Mutex::new(Vec::new()),
            open_sessions: AtomicUsize::new(0),
            total_sessions: AtomicUsize::new(0),
        }
    }

    /// Adds a table.
    pub fn with_table(mut self, table: MemoryTable) -> Self {
        self.tables.push(table);
        self
    }

    /// Answers queries containing `sql_fragment` with `rows`.
    pub fn with_query_result(mut self, sql_fragment: &str, rows: Vec<QueryRow>) -> Self {
        self.canned
            .push((sql_fragment.to_lowercase(), CannedResult::Rows(rows)));
        self
    }

    /// Fails queries containing `sql_fragment`.
    pub fn with_query_failure(mut self, sql_fragment: &str, message: &str) -> Self {
        self.canned.push((
            sql_fragment.to_lowercase(),
            CannedResult::Failure(message.to_string()),
        ));
        self
    }

    /// SQL text of every generic query executed so far.
    pub fn executed_queries(&self) -> Vec<String> {
        self.executed
            .lock()
            .map(|queries| queries.clone())
            .unwrap_or_default()
    }

    /// Number of extension sessions currently open.
    pub fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::SeqCst)
    }

    /// Number of extension sessions opened over the adapter's lifetime.
    pub fn total_sessions(&self) -> usize {
        self.total_sessions.load(Ordering::SeqCst)
    }

    fn find(&self, table: &RawTable) -> Option<&MemoryTable> {
        self.tables.iter().find(|t| t.table.name == table.name)
    }
}

#[async_trait]
impl CatalogAdapter for MemoryAdapter {
    async fn database_info(&self) -> Result<DatabaseInfo> {
        Ok(self.info.clone())
    }

    async fn tables(&self, _catalog: Option<&str>, schema: Option<&str>) -> Result<Vec<RawTable>> {
        Ok(self
            .tables
            .iter()
            .filter(|t| match (schema, t.table.schema.as_deref()) {
                (Some(wanted), Some(actual)) => wanted.eq_ignore_ascii_case(actual),
                _ => true,
            })
            .map(|t| t.table.clone())
            .collect())
    }

    async fn columns(&self, table: &RawTable) -> Result<Vec<RawColumn>> {
        Ok(self.find(table).map(|t| t.columns.clone()).unwrap_or_default())
    }

    async fn primary_keys(&self, table: &RawTable) -> Result<Vec<String>> {
        Ok(self
            .find(table)
            .map(|t| t.primary_keys.clone())
            .unwrap_or_default())
    }

    async fn imported_keys(&self, table: &RawTable) -> Result<Vec<ImportedKey>> {
        Ok(self
            .find(table)
            .map(|t| t.imported_keys.clone())
            .unwrap_or_default())
    }

    async fn indexes(&self, table: &RawTable, unique_only: bool) -> Result<Vec<Index>> {
        Ok(self
            .find(table)
            .map(|t| {
                t.indexes
                    .iter()
                    .filter(|index| index.unique || !unique_only)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn query(&self, sql: &str, _params: &[&str]) -> Result<Vec<QueryRow>> {
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(sql.to_string());
        }

        let lowered = sql.to_lowercase();
        match self
            .canned
            .iter()
            .find(|(fragment, _)| lowered.contains(fragment.as_str()))
        {
            Some((_, CannedResult::Rows(rows))) => Ok(rows.clone()),
            Some((_, CannedResult::Failure(message))) => Err(
                crate::error::DbModelerError::introspection_failed(
                    "Canned query failure",
                    std::io::Error::other(message.clone()),
                ),
            ),
            None => Ok(Vec::new()),
        }
    }

    fn session_opened(&self, _extension: &str) {
        self.open_sessions.fetch_add(1, Ordering::SeqCst);
        self.total_sessions.fetch_add(1, Ordering::SeqCst);
    }

    fn session_released(&self, _extension: &str) {
        self.open_sessions.fetch_sub(1, Ordering::SeqCst);
    }
}
