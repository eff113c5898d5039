//! PostgreSQL catalog adapter.
//!
//! # Module Structure
//! - `type_mapping`: `information_schema` types to JDBC type codes
//!
//! # Catalog Sources
//! - `information_schema.tables` / `columns` for tables and columns
//! - `information_schema.table_constraints` for primary keys
//! - `pg_constraint` for foreign keys, paired positionally via
//!   `array_position(conkey)` / `array_position(confkey)`
//! - `pg_index` for indexes
//!
//! Every connection runs with `default_transaction_read_only = on`.

pub mod type_mapping;

pub use type_mapping::map_postgres_type;

use super::helpers::{RowExt, render_pg_row};
use super::{CatalogAdapter, QueryRow, RawColumn, RawTable};
use crate::Result;
use crate::error::DbModelerError;
use crate::models::{DatabaseInfo, ImportedKey, Index, KeyColumnPair};
use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgRow;

const DEFAULT_SCHEMA: &str = "public";

/// Catalog adapter over a PostgreSQL connection pool.
pub struct PostgresAdapter {
    pool: PgPool,
}

impl std::fmt::Debug for PostgresAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Pool options carry credentials
        f.debug_struct("PostgresAdapter").finish_non_exhaustive()
    }
}

impl PostgresAdapter {
    /// Connects to a PostgreSQL database.
    ///
    /// # Security
    /// - Sessions are read-only
    /// - The connection string never appears in errors or logs
    ///
    /// # Errors
    /// Returns an error when the connection cannot be established.
    pub async fn connect(connection_string: &str) -> Result<Self> {
        use sqlx::Executor;

        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(std::time::Duration::from_secs(10))
            .test_before_acquire(true)
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    conn.execute("SET default_transaction_read_only = on").await?;
                    let app_name = format!("dbmodeler-{}", env!("CARGO_PKG_VERSION"));
                    conn.execute(format!("SET application_name = '{}'", app_name).as_str())
                        .await?;
                    Ok(())
                })
            })
            .connect(connection_string)
            .await
            .map_err(DbModelerError::connection_failed)?;

        tracing::debug!(
            "Connected to PostgreSQL at {}",
            crate::error::redact_database_url(connection_string)
        );
        Ok(Self { pool })
    }

    /// Wraps an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_for_table(
        &self,
        sql: &str,
        table: &RawTable,
        what: &str,
    ) -> Result<Vec<PgRow>> {
        let schema = table.schema.as_deref().unwrap_or(DEFAULT_SCHEMA);
        sqlx::query(sql)
            .bind(&table.name)
            .bind(schema)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                DbModelerError::introspection_failed(
                    format!("Failed to collect {} for table '{}.{}'", what, schema, table.name),
                    e,
                )
            })
    }
}

/// JDBC spelling of `information_schema.tables.table_type`.
fn jdbc_table_type(table_type: &str) -> String {
    match table_type {
        "BASE TABLE" => "TABLE".to_string(),
        "FOREIGN" => "FOREIGN TABLE".to_string(),
        other => other.to_string(),
    }
}

fn is_auto_increment(is_identity: &str, column_default: Option<&str>) -> bool {
    is_identity == "YES" || column_default.is_some_and(|default| default.starts_with("nextval("))
}

#[async_trait]
impl CatalogAdapter for PostgresAdapter {
    async fn database_info(&self) -> Result<DatabaseInfo> {
        let version: String = sqlx::query_scalar("SELECT current_setting('server_version')")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                DbModelerError::introspection_failed("Failed to read PostgreSQL version", e)
            })?;

        Ok(DatabaseInfo {
            product_name: "PostgreSQL".to_string(),
            product_version: Some(version),
            driver_name: Some("sqlx-postgres".to_string()),
        })
    }

    async fn tables(&self, _catalog: Option<&str>, schema: Option<&str>) -> Result<Vec<RawTable>> {
        tracing::debug!("Starting table enumeration for PostgreSQL database");

        let tables_query = r#"
            SELECT
                t.table_name::text AS table_name,
                t.table_schema::text AS table_schema,
                t.table_catalog::text AS table_catalog,
                t.table_type::text AS table_type,
                obj_description(format('%I.%I', t.table_schema, t.table_name)::regclass, 'pg_class') AS remarks
            FROM information_schema.tables t
            WHERE t.table_schema NOT IN ('information_schema', 'pg_catalog', 'pg_toast')
            AND ($1::text IS NULL OR t.table_schema = $1)
            ORDER BY t.table_schema, t.table_name
        "#;

        let rows = sqlx::query(tables_query)
            .bind(schema)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DbModelerError::introspection_failed("Failed to enumerate tables", e))?;

        let mut tables = Vec::with_capacity(rows.len());
        for row in &rows {
            let name: String = row.get_field("table_name", None)?;
            let table_type: String = row.get_field("table_type", Some(&name))?;
            tables.push(RawTable {
                schema: row.get_field("table_schema", Some(&name))?,
                catalog: row.get_field("table_catalog", Some(&name))?,
                table_type: jdbc_table_type(&table_type),
                remarks: row.get_field("remarks", Some(&name))?,
                name,
            });
        }
        Ok(tables)
    }

    async fn columns(&self, table: &RawTable) -> Result<Vec<RawColumn>> {
        let columns_query = r#"
            SELECT
                c.column_name::text AS column_name,
                c.data_type::text AS data_type,
                c.udt_name::text AS udt_name,
                c.character_maximum_length::integer AS character_maximum_length,
                c.numeric_precision::integer AS numeric_precision,
                c.numeric_scale::integer AS numeric_scale,
                c.is_nullable::text AS is_nullable,
                c.column_default::text AS column_default,
                c.ordinal_position::integer AS ordinal_position,
                c.is_identity::text AS is_identity,
                col_description(
                    format('%I.%I', c.table_schema, c.table_name)::regclass,
                    c.ordinal_position::integer
                ) AS remarks
            FROM information_schema.columns c
            WHERE c.table_name = $1
            AND c.table_schema = $2
            ORDER BY c.ordinal_position
        "#;

        let rows = self.fetch_for_table(columns_query, table, "columns").await?;
        let context = Some(table.name.as_str());

        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let name: String = row.get_field("column_name", context)?;
            let data_type: String = row.get_field("data_type", context)?;
            let udt_name: String = row.get_field("udt_name", context)?;
            let max_length: Option<i32> = row.get_field("character_maximum_length", context)?;
            let precision: Option<i32> = row.get_field("numeric_precision", context)?;
            let scale: Option<i32> = row.get_field("numeric_scale", context)?;
            let is_nullable: String = row.get_field("is_nullable", context)?;
            let column_default: Option<String> = row.get_field("column_default", context)?;
            let ordinal_position: i32 = row.get_field("ordinal_position", context)?;
            let is_identity: Option<String> = row.get_field("is_identity", context)?;

            let jdbc_type = map_postgres_type(&data_type, &udt_name);
            let mut column = RawColumn::new(name, jdbc_type.map(|t| t.code()), udt_name);
            column.size = max_length
                .or(precision)
                .and_then(|size| u32::try_from(size).ok());
            column.decimal_digits = scale.and_then(|digits| u32::try_from(digits).ok());
            column.nullable = is_nullable == "YES";
            column.ordinal_position = u32::try_from(ordinal_position).unwrap_or(0);
            column.auto_increment =
                is_auto_increment(is_identity.as_deref().unwrap_or("NO"), column_default.as_deref());
            column.remarks = row.get_field("remarks", context)?;
            columns.push(column);
        }
        Ok(columns)
    }

    async fn primary_keys(&self, table: &RawTable) -> Result<Vec<String>> {
        let pk_query = r#"
            SELECT kcu.column_name::text AS column_name
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
                AND tc.table_name = kcu.table_name
            WHERE tc.constraint_type = 'PRIMARY KEY'
            AND tc.table_name = $1
            AND tc.table_schema = $2
            ORDER BY kcu.ordinal_position
        "#;

        let rows = self.fetch_for_table(pk_query, table, "primary key").await?;
        rows.iter()
            .map(|row| row.get_field("column_name", Some(&table.name)))
            .collect()
    }

    async fn imported_keys(&self, table: &RawTable) -> Result<Vec<ImportedKey>> {
        let fk_query = r#"
            SELECT
                con.conname::text AS constraint_name,
                a.attname::text AS column_name,
                fns.nspname::text AS referenced_table_schema,
                fcl.relname::text AS referenced_table_name,
                fa.attname::text AS referenced_column_name
            FROM pg_constraint con
            JOIN pg_class cl ON con.conrelid = cl.oid
            JOIN pg_namespace ns ON cl.relnamespace = ns.oid
            JOIN pg_class fcl ON con.confrelid = fcl.oid
            JOIN pg_namespace fns ON fcl.relnamespace = fns.oid
            JOIN pg_attribute a ON a.attrelid = con.conrelid
            JOIN pg_attribute fa ON fa.attrelid = con.confrelid
            WHERE con.contype = 'f'
            AND cl.relname = $1
            AND ns.nspname = $2
            AND a.attnum = ANY(con.conkey)
            AND fa.attnum = ANY(con.confkey)
            AND array_position(con.conkey, a.attnum) = array_position(con.confkey, fa.attnum)
            ORDER BY con.conname, array_position(con.conkey, a.attnum)
        "#;

        let rows = self.fetch_for_table(fk_query, table, "foreign keys").await?;
        let context = Some(table.name.as_str());

        // Rows arrive ordered by constraint, then key sequence
        let mut keys: Vec<ImportedKey> = Vec::new();
        for row in &rows {
            let name: String = row.get_field("constraint_name", context)?;
            let pair = KeyColumnPair {
                fk_column: row.get_field("column_name", context)?,
                pk_column: row.get_field("referenced_column_name", context)?,
            };

            match keys.last_mut() {
                Some(key) if key.name.as_deref() == Some(name.as_str()) => key.columns.push(pair),
                _ => {
                    let pk_schema: Option<String> =
                        row.get_field("referenced_table_schema", context)?;
                    keys.push(ImportedKey {
                        name: Some(name),
                        pk_table: row.get_field("referenced_table_name", context)?,
                        pk_schema: pk_schema.filter(|s| s != DEFAULT_SCHEMA),
                        columns: vec![pair],
                    });
                }
            }
        }
        Ok(keys)
    }

    async fn indexes(&self, table: &RawTable, unique_only: bool) -> Result<Vec<Index>> {
        let idx_query = r#"
            SELECT
                i.relname::text AS index_name,
                ix.indisunique AS is_unique,
                string_agg(a.attname::text, ',' ORDER BY array_position(ix.indkey, a.attnum)) AS columns
            FROM pg_index ix
            JOIN pg_class t ON t.oid = ix.indrelid
            JOIN pg_class i ON i.oid = ix.indexrelid
            JOIN pg_namespace n ON n.oid = t.relnamespace
            JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(ix.indkey)
            WHERE t.relname = $1
            AND n.nspname = $2
            AND NOT ix.indisprimary
            GROUP BY i.relname, ix.indisunique
            ORDER BY i.relname
        "#;

        let rows = self.fetch_for_table(idx_query, table, "indexes").await?;
        let context = Some(table.name.as_str());

        let mut indexes = Vec::with_capacity(rows.len());
        for row in &rows {
            let unique: bool = row.get_field("is_unique", context)?;
            if unique_only && !unique {
                continue;
            }
            let columns: String = row.get_field("columns", context)?;
            indexes.push(Index {
                name: row.get_field("index_name", context)?,
                unique,
                columns: columns.split(',').map(|c| c.trim().to_string()).collect(),
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
        Ok(rows.iter().map(render_pg_row).collect())
    }
}
