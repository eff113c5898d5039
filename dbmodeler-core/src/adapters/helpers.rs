//! Helper utilities shared by the sqlx-backed adapters.
//!
//! Provides typed field extraction with consistent error context and the
//! text rendering used by generic catalog queries.

use super::QueryRow;
use crate::{Result, error::DbModelerError};
use sqlx::{Column, Row};

/// Extension trait for extracting typed values from catalog rows
/// with consistent error handling.
///
/// # Example
/// ```rust,ignore
/// use dbmodeler_core::adapters::helpers::RowExt;
///
/// let name: String = row.get_field("column_name", Some("my_table"))?;
/// let size: Option<i32> = row.get_field("character_maximum_length", None)?;
/// ```
pub trait RowExt: Row {
    /// Extracts a typed field from the row with proper error context.
    ///
    /// # Errors
    /// Returns an introspection error naming the field and table.
    fn get_field<'r, T>(&'r self, field_name: &str, table_context: Option<&str>) -> Result<T>
    where
        T: sqlx::Decode<'r, Self::Database> + sqlx::Type<Self::Database>;
}

impl<R> RowExt for R
where
    R: Row,
    for<'a> &'a str: sqlx::ColumnIndex<R>,
{
    fn get_field<'r, T>(&'r self, field_name: &str, table_context: Option<&str>) -> Result<T>
    where
        T: sqlx::Decode<'r, Self::Database> + sqlx::Type<Self::Database>,
    {
        self.try_get(field_name)
            .map_err(|e| DbModelerError::parse_field(field_name, table_context, e))
    }
}

/// Renders a SQLite row as text values.
#[cfg(feature = "sqlite")]
pub(crate) fn render_sqlite_row(row: &sqlx::sqlite::SqliteRow) -> QueryRow {
    let mut rendered = QueryRow::new();
    for (index, column) in row.columns().iter().enumerate() {
        let value = row
            .try_get::<Option<String>, _>(index)
            .or_else(|_| {
                row.try_get::<Option<i64>, _>(index)
                    .map(|v| v.map(|v| v.to_string()))
            })
            .or_else(|_| {
                row.try_get::<Option<f64>, _>(index)
                    .map(|v| v.map(|v| v.to_string()))
            })
            .unwrap_or_else(|e| {
                tracing::trace!("Unrenderable value in column '{}': {}", column.name(), e);
                None
            });
        rendered.insert(column.name(), value);
    }
    rendered
}

/// Renders a PostgreSQL row as text values.
///
/// Catalog queries should cast to `::text`; integer and boolean columns are
/// rendered as a fallback.
#[cfg(feature = "postgresql")]
pub(crate) fn render_pg_row(row: &sqlx::postgres::PgRow) -> QueryRow {
    let mut rendered = QueryRow::new();
    for (index, column) in row.columns().iter().enumerate() {
        let value = row
            .try_get::<Option<String>, _>(index)
            .or_else(|_| {
                row.try_get::<Option<i64>, _>(index)
                    .map(|v| v.map(|v| v.to_string()))
            })
            .or_else(|_| {
                row.try_get::<Option<i32>, _>(index)
                    .map(|v| v.map(|v| v.to_string()))
            })
            .or_else(|_| {
                row.try_get::<Option<bool>, _>(index)
                    .map(|v| v.map(|v| v.to_string()))
            })
            .unwrap_or_else(|e| {
                tracing::trace!("Unrenderable value in column '{}': {}", column.name(), e);
                None
            });
        rendered.insert(column.name(), value);
    }
    rendered
}

/// Quotes an identifier for use inside a SQLite PRAGMA argument.
pub(crate) fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
