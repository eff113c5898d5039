//! Connection and extraction settings.
//!
//! `JdbcConnectivity` carries everything the extractor needs to know about
//! where to connect and what to reverse: the table-type set, table name
//! patterns, and the index options that bound the cost of a run on large
//! populated schemas.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use zeroize::Zeroizing;

/// Connection parameters and extraction options.
///
/// # Security
/// The password is never serialized and never printed by `Debug` or
/// `Display`; the url is redacted whenever it is shown.
///
/// # Example
/// ```rust
/// use dbmodeler_core::config::JdbcConnectivity;
///
/// let connectivity = JdbcConnectivity::new("sqlite::memory:")
///     .with_table_pattern("app_*")
///     .with_reverse_indexes(true);
///
/// assert!(connectivity.validate().is_ok());
/// assert!(connectivity.table_types.contains("TABLE"));
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct JdbcConnectivity {
    pub catalog: Option<String>,
    pub schema_name: Option<String>,
    pub driver: Option<String>,
    pub user: Option<String>,
    #[serde(skip)]
    pub password: Option<Zeroizing<String>>,
    #[serde(serialize_with = "serialize_redacted_url")]
    pub url: String,
    /// Table types to reverse (`TABLE`, `VIEW`, ...)
    pub table_types: BTreeSet<String>,
    /// Glob patterns on table names; empty means every table
    #[serde(default)]
    pub table_name_patterns: Vec<String>,
    pub reverse_indexes: bool,
    pub reverse_only_unique_indexes: bool,
    #[serde(default)]
    pub oracle_retrieve_remarks: bool,
    #[serde(default)]
    pub oracle_retrieve_synonyms: bool,
}

impl Default for JdbcConnectivity {
    fn default() -> Self {
        Self {
            catalog: None,
            schema_name: None,
            driver: None,
            user: None,
            password: None,
            url: String::new(),
            table_types: BTreeSet::from(["TABLE".to_string()]),
            table_name_patterns: Vec::new(),
            reverse_indexes: true,
            reverse_only_unique_indexes: false,
            oracle_retrieve_remarks: false,
            oracle_retrieve_synonyms: false,
        }
    }
}

impl std::fmt::Debug for JdbcConnectivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JdbcConnectivity")
            .field("catalog", &self.catalog)
            .field("schema_name", &self.schema_name)
            .field("driver", &self.driver)
            .field("user", &self.user)
            .field("url", &crate::error::redact_database_url(&self.url))
            .field("table_types", &self.table_types)
            .field("table_name_patterns", &self.table_name_patterns)
            .field("reverse_indexes", &self.reverse_indexes)
            .field(
                "reverse_only_unique_indexes",
                &self.reverse_only_unique_indexes,
            )
            .field("oracle_retrieve_remarks", &self.oracle_retrieve_remarks)
            .field("oracle_retrieve_synonyms", &self.oracle_retrieve_synonyms)
            // password intentionally omitted
            .finish_non_exhaustive()
    }
}

impl std::fmt::Display for JdbcConnectivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "JdbcConnectivity({}{})",
            crate::error::redact_database_url(&self.url),
            self.schema_name
                .as_ref()
                .map_or_else(String::new, |s| format!(" schema={}", s))
        )
    }
}

impl JdbcConnectivity {
    /// Creates settings for the given connection url.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Sets the schema to reverse.
    pub fn with_schema(mut self, schema_name: impl Into<String>) -> Self {
        self.schema_name = Some(schema_name.into());
        self
    }

    /// Sets the catalog to reverse.
    pub fn with_catalog(mut self, catalog: impl Into<String>) -> Self {
        self.catalog = Some(catalog.into());
        self
    }

    /// Sets the user name (the password is handled separately).
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Sets the password; it is zeroized on drop.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(Zeroizing::new(password.into()));
        self
    }

    /// Adds a table type to reverse.
    pub fn with_table_type(mut self, table_type: impl Into<String>) -> Self {
        self.table_types.insert(table_type.into().to_uppercase());
        self
    }

    /// Adds a table name glob pattern.
    pub fn with_table_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.table_name_patterns.push(pattern.into());
        self
    }

    /// Enables or disables index reversal.
    pub fn with_reverse_indexes(mut self, reverse_indexes: bool) -> Self {
        self.reverse_indexes = reverse_indexes;
        self
    }

    /// Restricts index reversal to unique indexes.
    pub fn with_only_unique_indexes(mut self, only_unique: bool) -> Self {
        self.reverse_only_unique_indexes = only_unique;
        self
    }

    /// Validates the settings.
    ///
    /// # Errors
    /// Returns a configuration error when no table type is selected or a
    /// table name pattern is not a valid glob.
    pub fn validate(&self) -> crate::Result<()> {
        if self.table_types.is_empty() {
            return Err(crate::error::DbModelerError::configuration(
                "at least one table type must be selected",
            ));
        }
        self.table_filter().map(|_| ())
    }

    /// Compiles the table name patterns.
    ///
    /// # Errors
    /// Returns a configuration error for an invalid glob.
    pub fn table_filter(&self) -> crate::Result<TableFilter> {
        TableFilter::new(&self.table_name_patterns)
    }

    /// True when a reported table type is selected (case-insensitive).
    pub fn accepts_table_type(&self, table_type: &str) -> bool {
        self.table_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(table_type))
    }
}

// Only urls carrying credentials are rewritten; file paths are kept verbatim.
#[allow(clippy::ptr_arg)]
fn serialize_redacted_url<S>(url: &String, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    if url.contains('@') {
        serializer.serialize_str(&crate::error::redact_database_url(url))
    } else {
        serializer.serialize_str(url)
    }
}

/// Case-insensitive table name filter built from glob patterns.
#[derive(Debug, Clone)]
pub struct TableFilter {
    globs: Option<GlobSet>,
}

impl TableFilter {
    /// Compiles the patterns; an empty list accepts every table.
    ///
    /// # Errors
    /// Returns a configuration error for an invalid glob.
    pub fn new(patterns: &[String]) -> crate::Result<Self> {
        if patterns.is_empty() {
            return Ok(Self { globs: None });
        }

        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = GlobBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| {
                    crate::error::DbModelerError::configuration(format!(
                        "Invalid table name pattern '{}': {}",
                        pattern, e
                    ))
                })?;
            builder.add(glob);
        }

        let globs = builder.build().map_err(|e| {
            crate::error::DbModelerError::configuration(format!(
                "Invalid table name patterns: {}",
                e
            ))
        })?;
        Ok(Self { globs: Some(globs) })
    }

    /// True when the table name matches at least one pattern.
    pub fn accepts(&self, table_name: &str) -> bool {
        self.globs
            .as_ref()
            .is_none_or(|globs| globs.is_match(table_name))
    }
}
