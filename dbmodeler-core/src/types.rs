//! Vendor-neutral column type catalog.
//!
//! Every introspection source reports column types as JDBC type codes (the
//! `java.sql.Types` numbering that most database drivers agree on), falling
//! back to a type name. This module is the fixed mapping between codes,
//! canonical names and the semantic categories the model derivation relies
//! on (string-like, numeric, temporal).
//!
//! Resolution never fails hard: an unknown code or name yields `None`, the
//! caller logs a warning and keeps going so that the validator can report
//! the column as an error for the whole schema at once.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A vendor-neutral column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JdbcType {
    Array,
    BigInt,
    Binary,
    Bit,
    Blob,
    Boolean,
    Char,
    Clob,
    Datalink,
    Date,
    Decimal,
    Distinct,
    Double,
    Float,
    Integer,
    JavaObject,
    LongNVarChar,
    LongVarBinary,
    LongVarChar,
    NChar,
    NClob,
    Null,
    Numeric,
    NVarChar,
    Other,
    Real,
    Ref,
    RowId,
    SmallInt,
    SqlXml,
    Struct,
    Time,
    TimeWithTimezone,
    Timestamp,
    TimestampWithTimezone,
    TinyInt,
    VarBinary,
    VarChar,
}

impl JdbcType {
    /// Every type known to the catalog, in code order.
    pub const ALL: [JdbcType; 38] = [
        JdbcType::LongNVarChar,
        JdbcType::NChar,
        JdbcType::NVarChar,
        JdbcType::RowId,
        JdbcType::Bit,
        JdbcType::TinyInt,
        JdbcType::BigInt,
        JdbcType::LongVarBinary,
        JdbcType::VarBinary,
        JdbcType::Binary,
        JdbcType::LongVarChar,
        JdbcType::Null,
        JdbcType::Char,
        JdbcType::Numeric,
        JdbcType::Decimal,
        JdbcType::Integer,
        JdbcType::SmallInt,
        JdbcType::Float,
        JdbcType::Real,
        JdbcType::Double,
        JdbcType::VarChar,
        JdbcType::Boolean,
        JdbcType::Datalink,
        JdbcType::Date,
        JdbcType::Time,
        JdbcType::Timestamp,
        JdbcType::Other,
        JdbcType::JavaObject,
        JdbcType::Distinct,
        JdbcType::Struct,
        JdbcType::Array,
        JdbcType::Blob,
        JdbcType::Clob,
        JdbcType::Ref,
        JdbcType::SqlXml,
        JdbcType::NClob,
        JdbcType::TimeWithTimezone,
        JdbcType::TimestampWithTimezone,
    ];

    /// Returns the JDBC type code.
    pub const fn code(self) -> i32 {
        match self {
            JdbcType::LongNVarChar => -16,
            JdbcType::NChar => -15,
            JdbcType::NVarChar => -9,
            JdbcType::RowId => -8,
            JdbcType::Bit => -7,
            JdbcType::TinyInt => -6,
            JdbcType::BigInt => -5,
            JdbcType::LongVarBinary => -4,
            JdbcType::VarBinary => -3,
            JdbcType::Binary => -2,
            JdbcType::LongVarChar => -1,
            JdbcType::Null => 0,
            JdbcType::Char => 1,
            JdbcType::Numeric => 2,
            JdbcType::Decimal => 3,
            JdbcType::Integer => 4,
            JdbcType::SmallInt => 5,
            JdbcType::Float => 6,
            JdbcType::Real => 7,
            JdbcType::Double => 8,
            JdbcType::VarChar => 12,
            JdbcType::Boolean => 16,
            JdbcType::Datalink => 70,
            JdbcType::Date => 91,
            JdbcType::Time => 92,
            JdbcType::Timestamp => 93,
            JdbcType::Other => 1111,
            JdbcType::JavaObject => 2000,
            JdbcType::Distinct => 2001,
            JdbcType::Struct => 2002,
            JdbcType::Array => 2003,
            JdbcType::Blob => 2004,
            JdbcType::Clob => 2005,
            JdbcType::Ref => 2006,
            JdbcType::SqlXml => 2009,
            JdbcType::NClob => 2011,
            JdbcType::TimeWithTimezone => 2013,
            JdbcType::TimestampWithTimezone => 2014,
        }
    }

    /// Returns the canonical type name.
    pub const fn name(self) -> &'static str {
        match self {
            JdbcType::LongNVarChar => "LONGNVARCHAR",
            JdbcType::NChar => "NCHAR",
            JdbcType::NVarChar => "NVARCHAR",
            JdbcType::RowId => "ROWID",
            JdbcType::Bit => "BIT",
            JdbcType::TinyInt => "TINYINT",
            JdbcType::BigInt => "BIGINT",
            JdbcType::LongVarBinary => "LONGVARBINARY",
            JdbcType::VarBinary => "VARBINARY",
            JdbcType::Binary => "BINARY",
            JdbcType::LongVarChar => "LONGVARCHAR",
            JdbcType::Null => "NULL",
            JdbcType::Char => "CHAR",
            JdbcType::Numeric => "NUMERIC",
            JdbcType::Decimal => "DECIMAL",
            JdbcType::Integer => "INTEGER",
            JdbcType::SmallInt => "SMALLINT",
            JdbcType::Float => "FLOAT",
            JdbcType::Real => "REAL",
            JdbcType::Double => "DOUBLE",
            JdbcType::VarChar => "VARCHAR",
            JdbcType::Boolean => "BOOLEAN",
            JdbcType::Datalink => "DATALINK",
            JdbcType::Date => "DATE",
            JdbcType::Time => "TIME",
            JdbcType::Timestamp => "TIMESTAMP",
            JdbcType::Other => "OTHER",
            JdbcType::JavaObject => "JAVA_OBJECT",
            JdbcType::Distinct => "DISTINCT",
            JdbcType::Struct => "STRUCT",
            JdbcType::Array => "ARRAY",
            JdbcType::Blob => "BLOB",
            JdbcType::Clob => "CLOB",
            JdbcType::Ref => "REF",
            JdbcType::SqlXml => "SQLXML",
            JdbcType::NClob => "NCLOB",
            JdbcType::TimeWithTimezone => "TIME_WITH_TIMEZONE",
            JdbcType::TimestampWithTimezone => "TIMESTAMP_WITH_TIMEZONE",
        }
    }

    /// Resolves a JDBC type code.
    ///
    /// # Example
    /// ```rust
    /// use dbmodeler_core::types::JdbcType;
    ///
    /// assert_eq!(JdbcType::from_code(12), Some(JdbcType::VarChar));
    /// assert_eq!(JdbcType::from_code(4242), None);
    /// ```
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.code() == code)
    }

    /// Resolves a canonical type name, ignoring case and surrounding whitespace.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(name))
    }

    /// Character data, including enumerations backed by a char column.
    pub const fn is_string_like(self) -> bool {
        matches!(
            self,
            JdbcType::Char
                | JdbcType::VarChar
                | JdbcType::LongVarChar
                | JdbcType::NChar
                | JdbcType::NVarChar
                | JdbcType::LongNVarChar
                | JdbcType::Clob
                | JdbcType::NClob
        )
    }

    /// Integral and decimal numbers.
    pub const fn is_numeric(self) -> bool {
        matches!(
            self,
            JdbcType::TinyInt
                | JdbcType::SmallInt
                | JdbcType::Integer
                | JdbcType::BigInt
                | JdbcType::Float
                | JdbcType::Real
                | JdbcType::Double
                | JdbcType::Numeric
                | JdbcType::Decimal
        )
    }

    /// Dates, times and timestamps.
    pub const fn is_temporal(self) -> bool {
        matches!(
            self,
            JdbcType::Date
                | JdbcType::Time
                | JdbcType::Timestamp
                | JdbcType::TimeWithTimezone
                | JdbcType::TimestampWithTimezone
        )
    }
}

impl std::fmt::Display for JdbcType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for JdbcType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for JdbcType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        JdbcType::from_name(&name)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown column type '{}'", name)))
    }
}

/// Resolves a column type from an optional code and a type name.
///
/// The code wins when it is known; otherwise the name is tried. Returns
/// `None` (after logging a warning) when neither resolves.
pub fn resolve_type(code: Option<i32>, type_name: &str, context: &str) -> Option<JdbcType> {
    if let Some(resolved) = code.and_then(JdbcType::from_code) {
        return Some(resolved);
    }
    if let Some(resolved) = JdbcType::from_name(type_name) {
        return Some(resolved);
    }
    tracing::warn!(
        "Unable to resolve type of {} (code: {:?}, name: '{}')",
        context,
        code,
        type_name
    );
    None
}
