//! PostgreSQL types to JDBC type codes.
//!
//! Mirrors the mapping the PostgreSQL JDBC driver reports: user-defined
//! enum types surface as `VARCHAR`, arrays as `ARRAY`, and anything the
//! driver would report as `OTHER` (json, uuid, geometric types) keeps that
//! code.

use crate::types::JdbcType;

/// Maps an `information_schema.columns` type to a JDBC type.
///
/// # Arguments
/// * `data_type` - `data_type` column (`character varying`, `USER-DEFINED`, ...)
/// * `udt_name` - underlying type name (`varchar`, `mpaa_rating`, `_int4`, ...)
pub fn map_postgres_type(data_type: &str, udt_name: &str) -> Option<JdbcType> {
    let mapped = match data_type.to_lowercase().as_str() {
        "character varying" | "varchar" => JdbcType::VarChar,
        "character" | "char" => JdbcType::Char,
        "text" | "name" | "citext" => JdbcType::VarChar,
        "smallint" | "int2" => JdbcType::SmallInt,
        "integer" | "int" | "int4" => JdbcType::Integer,
        "bigint" | "int8" => JdbcType::BigInt,
        "real" | "float4" => JdbcType::Real,
        "double precision" | "float8" => JdbcType::Double,
        "numeric" | "decimal" => JdbcType::Numeric,
        "money" => JdbcType::Double,
        "boolean" | "bool" => JdbcType::Bit,
        "bit" | "bit varying" => JdbcType::Bit,
        "bytea" => JdbcType::Binary,
        "date" => JdbcType::Date,
        "time without time zone" | "time" => JdbcType::Time,
        "time with time zone" | "timetz" => JdbcType::Time,
        "timestamp without time zone" | "timestamp" => JdbcType::Timestamp,
        "timestamp with time zone" | "timestamptz" => JdbcType::Timestamp,
        "xml" => JdbcType::SqlXml,
        "array" => JdbcType::Array,
        "oid" => JdbcType::BigInt,
        "user-defined" => return map_user_defined(udt_name),
        "json" | "jsonb" | "uuid" | "interval" | "inet" | "cidr" | "macaddr" | "tsvector"
        | "point" | "line" | "lseg" | "box" | "path" | "polygon" | "circle" => JdbcType::Other,
        _ => return None,
    };
    Some(mapped)
}

/// User-defined types: enums read as text, domains and composites are opaque.
fn map_user_defined(udt_name: &str) -> Option<JdbcType> {
    match udt_name.to_lowercase().as_str() {
        "geometry" | "geography" | "hstore" => Some(JdbcType::Other),
        _ => Some(JdbcType::VarChar),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_types() {
        assert_eq!(map_postgres_type("character varying", "varchar"), Some(JdbcType::VarChar));
        assert_eq!(map_postgres_type("integer", "int4"), Some(JdbcType::Integer));
        assert_eq!(map_postgres_type("numeric", "numeric"), Some(JdbcType::Numeric));
        assert_eq!(
            map_postgres_type("timestamp without time zone", "timestamp"),
            Some(JdbcType::Timestamp)
        );
        assert_eq!(map_postgres_type("boolean", "bool"), Some(JdbcType::Bit));
    }

    #[test]
    fn test_enum_types_read_as_varchar() {
        assert_eq!(map_postgres_type("USER-DEFINED", "mpaa_rating"), Some(JdbcType::VarChar));
    }

    #[test]
    fn test_arrays_and_opaque_types() {
        assert_eq!(map_postgres_type("ARRAY", "_text"), Some(JdbcType::Array));
        assert_eq!(map_postgres_type("jsonb", "jsonb"), Some(JdbcType::Other));
        assert_eq!(map_postgres_type("tsvector", "tsvector"), Some(JdbcType::Other));
    }

    #[test]
    fn test_unknown_type() {
        assert_eq!(map_postgres_type("pg_lsn_custom", "pg_lsn_custom"), None);
    }
}
