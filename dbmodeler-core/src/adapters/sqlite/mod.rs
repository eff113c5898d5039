//! SQLite catalog adapter.
//!
//! # Module Structure
//! - `type_mapping`: declared type names to JDBC type codes
//!
//! # SQLite-Specific Behavior
//! - Tables come from `sqlite_master`; columns, keys and indexes from PRAGMA
//!   commands
//! - Foreign keys declared without target columns reference the primary key
//!   of the target table
//! - SQLite has neither schemas nor catalogs; both arguments are ignored
//! - File databases are opened read-only

pub mod type_mapping;

pub use type_mapping::{SqliteType, map_sqlite_type};

use super::helpers::{RowExt, quote_literal, render_sqlite_row};
use super::{CatalogAdapter, QueryRow, RawColumn, RawTable};
use crate::Result;
use crate::error::DbModelerError;
use crate::models::{DatabaseInfo, ImportedKey, Index, KeyColumnPair};
use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Catalog adapter over a SQLite connection pool.
pub struct SqliteAdapter {
    pool: SqlitePool,
}

impl std::fmt::Debug for SqliteAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteAdapter").finish_non_exhaustive()
    }
}

impl SqliteAdapter {
    /// Opens a SQLite database.
    ///
    /// # Connection String Formats
    /// - `sqlite:///path/to/database.db` - Absolute file path
    /// - `sqlite://./relative/path.db` - Relative file path
    /// - `sqlite::memory:` or `:memory:` - In-memory database
    ///
    /// # Errors
    /// Returns an error when the url is malformed or the database cannot be
    /// opened.
    pub async fn connect(connection_string: &str) -> Result<Self> {
        let normalized = normalize_connection_string(connection_string);
        let mut options = SqliteConnectOptions::from_str(&normalized).map_err(|e| {
            DbModelerError::configuration(format!("Invalid SQLite connection string: {}", e))
        })?;

        if !is_in_memory(&normalized) {
            options = options.read_only(true);
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(DbModelerError::connection_failed)?;

        tracing::debug!("Opened SQLite database");
        Ok(Self { pool })
    }

    /// Wraps an existing pool.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, sql: &str, context: impl Into<String>) -> Result<Vec<sqlx::sqlite::SqliteRow>> {
        sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DbModelerError::introspection_failed(context, e))
    }
}

fn is_in_memory(connection_string: &str) -> bool {
    connection_string.contains(":memory:") || connection_string.contains("mode=memory")
}

fn normalize_connection_string(connection_string: &str) -> String {
    if connection_string == ":memory:" {
        return "sqlite::memory:".to_string();
    }
    if connection_string.starts_with("sqlite:") {
        return connection_string.to_string();
    }
    format!("sqlite://{}", connection_string)
}

#[async_trait]
impl CatalogAdapter for SqliteAdapter {
    async fn database_info(&self) -> Result<DatabaseInfo> {
        let version: String = sqlx::query_scalar("SELECT sqlite_version()")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DbModelerError::introspection_failed("Failed to read SQLite version", e))?;

        Ok(DatabaseInfo {
            product_name: "SQLite".to_string(),
            product_version: Some(version),
            driver_name: Some("sqlx-sqlite".to_string()),
        })
    }

    async fn tables(&self, _catalog: Option<&str>, _schema: Option<&str>) -> Result<Vec<RawTable>> {
        let rows = self
            .fetch(
                "SELECT name, type FROM sqlite_master \
                 WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%' \
                 ORDER BY name",
                "Failed to enumerate tables",
            )
            .await?;

        let mut tables = Vec::with_capacity(rows.len());
        for row in &rows {
            let name: String = row.get_field("name", None)?;
            let kind: String = row.get_field("type", Some(&name))?;
            let mut table = RawTable::new(name);
            table.table_type = kind.to_uppercase();
            tables.push(table);
        }
        Ok(tables)
    }

    async fn columns(&self, table: &RawTable) -> Result<Vec<RawColumn>> {
        let rows = self
            .fetch(
                &format!("PRAGMA table_info({})", quote_literal(&table.name)),
                format!("Failed to collect columns for table '{}'", table.name),
            )
            .await?;

        let pk_count = rows
            .iter()
            .filter(|row| row.get_field::<i64>("pk", None).unwrap_or(0) > 0)
            .count();

        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let cid: i64 = row.get_field("cid", Some(&table.name))?;
            let name: String = row.get_field("name", Some(&table.name))?;
            let declared: String = row
                .get_field::<Option<String>>("type", Some(&table.name))?
                .unwrap_or_default();
            let notnull: i64 = row.get_field("notnull", Some(&table.name))?;
            let pk: i64 = row.get_field("pk", Some(&table.name))?;

            let mapped = map_sqlite_type(&declared);
            // INTEGER PRIMARY KEY aliases the rowid
            let auto_increment =
                pk > 0 && pk_count == 1 && declared.trim().eq_ignore_ascii_case("INTEGER");

            let mut column = RawColumn::new(name, mapped.jdbc_type.map(|t| t.code()), declared);
            column.size = mapped.size;
            column.decimal_digits = mapped.decimal_digits;
            column.nullable = notnull == 0 && pk == 0;
            column.ordinal_position = u32::try_from(cid + 1).unwrap_or(0);
            column.auto_increment = auto_increment;
            columns.push(column);
        }
        Ok(columns)
    }

    async fn primary_keys(&self, table: &RawTable) -> Result<Vec<String>> {
        let rows = self
            .fetch(
                &format!("PRAGMA table_info({})", quote_literal(&table.name)),
                format!("Failed to collect primary key for table '{}'", table.name),
            )
            .await?;

        let mut keyed = Vec::new();
        for row in &rows {
            let pk: i64 = row.get_field("pk", Some(&table.name))?;
            if pk > 0 {
                let name: String = row.get_field("name", Some(&table.name))?;
                keyed.push((pk, name));
            }
        }
        keyed.sort_by_key(|(seq, _)| *seq);
        Ok(keyed.into_iter().map(|(_, name)| name).collect())
    }

    async fn imported_keys(&self, table: &RawTable) -> Result<Vec<ImportedKey>> {
        let rows = self
            .fetch(
                &format!("PRAGMA foreign_key_list({})", quote_literal(&table.name)),
                format!("Failed to collect foreign keys for table '{}'", table.name),
            )
            .await?;

        // Composite keys share an id; seq orders their columns
        let mut grouped: BTreeMap<i64, (String, Vec<(i64, String, Option<String>)>)> =
            BTreeMap::new();
        for row in &rows {
            let id: i64 = row.get_field("id", Some(&table.name))?;
            let seq: i64 = row.get_field("seq", Some(&table.name))?;
            let target: String = row.get_field("table", Some(&table.name))?;
            let from: String = row.get_field("from", Some(&table.name))?;
            let to: Option<String> = row.get_field("to", Some(&table.name))?;
            grouped
                .entry(id)
                .or_insert_with(|| (target, Vec::new()))
                .1
                .push((seq, from, to));
        }

        let mut keys = Vec::with_capacity(grouped.len());
        for (_, (target, mut pairs)) in grouped {
            pairs.sort_by_key(|(seq, _, _)| *seq);

            let needs_target_pk = pairs.iter().any(|(_, _, to)| to.is_none());
            let target_pk = if needs_target_pk {
                self.primary_keys(&RawTable::new(target.clone())).await?
            } else {
                Vec::new()
            };

            let columns = pairs
                .into_iter()
                .enumerate()
                .map(|(position, (_, from, to))| KeyColumnPair {
                    pk_column: to
                        .or_else(|| target_pk.get(position).cloned())
                        .unwrap_or_else(|| from.clone()),
                    fk_column: from,
                })
                .collect();

            keys.push(ImportedKey {
                name: None,
                pk_table: target,
                pk_schema: None,
                columns,
            });
        }
        Ok(keys)
    }

    async fn indexes(&self, table: &RawTable, unique_only: bool) -> Result<Vec<Index>> {
        let rows = self
            .fetch(
                &format!("PRAGMA index_list({})", quote_literal(&table.name)),
                format!("Failed to collect indexes for table '{}'", table.name),
            )
            .await?;

        let mut indexes = Vec::new();
        for row in &rows {
            let name: String = row.get_field("name", Some(&table.name))?;
            let unique: i64 = row.get_field("unique", Some(&table.name))?;
            let origin: String = row.get_field("origin", Some(&table.name))?;

            if origin == "pk" || (unique_only && unique == 0) {
                continue;
            }

            let column_rows = self
                .fetch(
                    &format!("PRAGMA index_info({})", quote_literal(&name)),
                    format!("Failed to collect index columns for '{}'", name),
                )
                .await?;

            let mut columns = Vec::with_capacity(column_rows.len());
            for column_row in &column_rows {
                let seqno: i64 = column_row.get_field("seqno", Some(&table.name))?;
                // Expression index members have no name
                if let Some(column) = column_row.get_field::<Option<String>>("name", Some(&table.name))? {
                    columns.push((seqno, column));
                }
            }
            columns.sort_by_key(|(seqno, _)| *seqno);

            indexes.push(Index {
                name,
                unique: unique != 0,
                columns: columns.into_iter().map(|(_, column)| column).collect(),
            });
        }
        Ok(indexes)
    }

    async fn query(&self, sql: &str, params: &[&str]) -> Result<Vec<QueryRow>> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = query.bind(*param);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DbModelerError::introspection_failed("Catalog query failed", e))?;
        Ok(rows.iter().map(render_sqlite_row).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn adapter_with(ddl: &[&str]) -> SqliteAdapter {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        for statement in ddl {
            sqlx::query(statement).execute(&pool).await.unwrap();
        }
        SqliteAdapter::from_pool(pool)
    }

    #[test]
    fn test_normalize_connection_string() {
        assert_eq!(normalize_connection_string(":memory:"), "sqlite::memory:");
        assert_eq!(
            normalize_connection_string("sqlite:///path/db.sqlite"),
            "sqlite:///path/db.sqlite"
        );
        assert_eq!(
            normalize_connection_string("/path/to/db.sqlite"),
            "sqlite:///path/to/db.sqlite"
        );
    }

    #[tokio::test]
    async fn test_sqlite_tables_and_columns() {
        let adapter = adapter_with(&[
            "CREATE TABLE film (film_id INTEGER PRIMARY KEY, title VARCHAR(255) NOT NULL, rating TEXT)",
            "CREATE VIEW film_titles AS SELECT title FROM film",
        ])
        .await;

        let tables = adapter.tables(None, None).await.unwrap();
        let names: Vec<_> = tables.iter().map(|t| (t.name.as_str(), t.table_type.as_str())).collect();
        assert_eq!(names, vec![("film", "TABLE"), ("film_titles", "VIEW")]);

        let columns = adapter.columns(&tables[0]).await.unwrap();
        assert_eq!(columns.len(), 3);
        assert!(columns[0].auto_increment);
        assert!(!columns[0].nullable);
        assert_eq!(columns[0].ordinal_position, 1);
        assert_eq!(columns[1].size, Some(255));
        assert!(!columns[1].nullable);
        assert!(columns[2].nullable);
    }

    #[tokio::test]
    async fn test_sqlite_composite_primary_key_order() {
        let adapter = adapter_with(&[
            "CREATE TABLE film_actor (actor_id INTEGER, film_id INTEGER, PRIMARY KEY (film_id, actor_id))",
        ])
        .await;

        let pk = adapter
            .primary_keys(&RawTable::new("film_actor"))
            .await
            .unwrap();
        assert_eq!(pk, vec!["film_id", "actor_id"]);
    }

    #[tokio::test]
    async fn test_sqlite_foreign_key_defaults_to_target_pk() {
        let adapter = adapter_with(&[
            "CREATE TABLE language (language_id INTEGER PRIMARY KEY, name TEXT)",
            "CREATE TABLE film (film_id INTEGER PRIMARY KEY, language_id INTEGER REFERENCES language)",
        ])
        .await;

        let keys = adapter.imported_keys(&RawTable::new("film")).await.unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].pk_table, "language");
        assert_eq!(keys[0].columns[0].fk_column, "language_id");
        assert_eq!(keys[0].columns[0].pk_column, "language_id");
    }

    #[tokio::test]
    async fn test_sqlite_indexes_skip_primary_key() {
        let adapter = adapter_with(&[
            "CREATE TABLE customer (id TEXT PRIMARY KEY, email TEXT UNIQUE, last_name TEXT)",
            "CREATE INDEX idx_last_name ON customer (last_name)",
        ])
        .await;
        let table = RawTable::new("customer");

        let all = adapter.indexes(&table, false).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|i| !i.columns.contains(&"id".to_string())));

        let unique = adapter.indexes(&table, true).await.unwrap();
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].columns, vec!["email"]);
    }

    #[tokio::test]
    async fn test_sqlite_generic_query() {
        let adapter = adapter_with(&["CREATE TABLE t (x INTEGER CHECK (x IN (1, 2)))"]).await;
        let rows = adapter
            .query("SELECT sql FROM sqlite_master WHERE name = ?", &["t"])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].get("SQL").is_some_and(|sql| sql.contains("IN (1, 2)")));
    }
}
