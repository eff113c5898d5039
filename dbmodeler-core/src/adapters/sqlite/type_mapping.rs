//! SQLite declared types to JDBC type codes.
//!
//! SQLite determines type affinity from declared type names; a JDBC driver
//! maps the declared name to the closest JDBC type. Names that match no
//! affinity rule and no well-known spelling stay unresolved so that the
//! validator reports them.
//!
//! # Affinity Rules
//! 1. Contains "INT" -> INTEGER family
//! 2. Contains "CHAR", "CLOB", or "TEXT" -> character family
//! 3. Contains "BLOB" -> BLOB
//! 4. Contains "REAL", "FLOA", or "DOUB" -> floating point family

use crate::types::JdbcType;

/// Resolved SQLite column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqliteType {
    pub jdbc_type: Option<JdbcType>,
    pub size: Option<u32>,
    pub decimal_digits: Option<u32>,
}

/// Maps a SQLite declared type to a JDBC type.
///
/// # Example
/// ```rust
/// use dbmodeler_core::adapters::sqlite::map_sqlite_type;
/// use dbmodeler_core::types::JdbcType;
///
/// let mapped = map_sqlite_type("VARCHAR(255)");
/// assert_eq!(mapped.jdbc_type, Some(JdbcType::VarChar));
/// assert_eq!(mapped.size, Some(255));
/// ```
pub fn map_sqlite_type(declared: &str) -> SqliteType {
    let type_upper = declared.trim().to_uppercase();
    let (base_type, size, decimal_digits) = parse_type_with_length(&type_upper);

    SqliteType {
        jdbc_type: map_base_type(&base_type),
        size,
        decimal_digits,
    }
}

fn map_base_type(base_type: &str) -> Option<JdbcType> {
    if base_type.is_empty() {
        return None;
    }

    if base_type.contains("INT") {
        return Some(match base_type {
            "TINYINT" => JdbcType::TinyInt,
            "SMALLINT" | "INT2" => JdbcType::SmallInt,
            "BIGINT" | "INT8" | "UNSIGNED BIG INT" => JdbcType::BigInt,
            _ => JdbcType::Integer,
        });
    }

    if base_type.contains("CLOB") {
        return Some(if base_type.starts_with('N') {
            JdbcType::NClob
        } else {
            JdbcType::Clob
        });
    }

    if base_type.contains("CHAR") || base_type.contains("TEXT") {
        return Some(match base_type {
            "CHAR" | "CHARACTER" => JdbcType::Char,
            "NCHAR" | "NATIVE CHARACTER" => JdbcType::NChar,
            "NVARCHAR" | "VARYING NCHARACTER" => JdbcType::NVarChar,
            _ => JdbcType::VarChar,
        });
    }

    if base_type.contains("BLOB") {
        return Some(JdbcType::Blob);
    }

    if base_type == "FLOAT" {
        return Some(JdbcType::Float);
    }
    if base_type.contains("DOUB") {
        return Some(JdbcType::Double);
    }
    if base_type.contains("REAL") || base_type.contains("FLOA") {
        return Some(JdbcType::Real);
    }

    match base_type {
        "BOOLEAN" | "BOOL" => Some(JdbcType::Boolean),
        "BIT" => Some(JdbcType::Bit),
        "DATE" => Some(JdbcType::Date),
        "TIME" => Some(JdbcType::Time),
        "DATETIME" | "TIMESTAMP" => Some(JdbcType::Timestamp),
        "NUMERIC" | "NUMBER" => Some(JdbcType::Numeric),
        "DECIMAL" => Some(JdbcType::Decimal),
        "BINARY" => Some(JdbcType::Binary),
        "VARBINARY" => Some(JdbcType::VarBinary),
        _ => None,
    }
}

/// Splits a declared type into base name, size and decimal digits.
///
/// # Examples
/// - "VARCHAR(255)" -> ("VARCHAR", Some(255), None)
/// - "DECIMAL(10,2)" -> ("DECIMAL", Some(10), Some(2))
/// - "INTEGER" -> ("INTEGER", None, None)
fn parse_type_with_length(type_str: &str) -> (String, Option<u32>, Option<u32>) {
    let Some(paren_pos) = type_str.find('(') else {
        return (type_str.to_string(), None, None);
    };

    let base = type_str[..paren_pos].trim().to_string();
    let params = type_str[paren_pos + 1..].trim_end_matches(')');
    let mut parts = params.split(',').map(|p| p.trim().parse::<u32>().ok());

    let size = parts.next().flatten();
    let decimal_digits = parts.next().flatten();
    (base, size, decimal_digits)
}
