//! Post-extraction consistency rules.
//!
//! Two independent checks run over every table and accumulate every
//! violation instead of stopping at the first:
//! - every column must have a resolved type
//! - every table must have a primary key; tables without one are excluded
//!   from model derivation
//!
//! Nothing here fails: the caller inspects the [`RuleReport`] and decides
//! whether to abort.

use crate::models::Metadata;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Accumulated rule violations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleReport {
    /// Blocking problems
    pub errors: Vec<String>,
    /// Non-blocking problems
    pub warnings: Vec<String>,
    /// Tables to leave out of model derivation
    pub excluded_tables: BTreeSet<String>,
}

impl RuleReport {
    /// True when at least one blocking error was recorded.
    pub fn has_error_messages(&self) -> bool {
        !self.errors.is_empty()
    }

    /// True when at least one warning was recorded.
    pub fn has_warning_messages(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// True when the table is excluded from model derivation.
    pub fn is_excluded(&self, table_name: &str) -> bool {
        self.excluded_tables.contains(table_name)
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

impl std::fmt::Display for RuleReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for error in &self.errors {
            writeln!(f, "ERROR   {}", error)?;
        }
        for warning in &self.warnings {
            writeln!(f, "WARNING {}", warning)?;
        }
        write!(
            f,
            "{} errors, {} warnings, {} excluded tables",
            self.errors.len(),
            self.warnings.len(),
            self.excluded_tables.len()
        )
    }
}

/// Runs the consistency rules over extracted metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataValidator;

impl MetadataValidator {
    /// Validates every table; extraction warnings carry over as report
    /// warnings.
    pub fn validate(metadata: &Metadata) -> RuleReport {
        let mut report = RuleReport::default();

        for table in &metadata.tables {
            for column in table.columns.iter().filter(|c| c.data_type.is_none()) {
                report.add_error(format!(
                    "{}.{}: unresolved type '{}'",
                    table.name, column.name, column.type_name
                ));
            }

            if !table.has_primary_key() {
                report.add_error(format!(
                    "{}: no primary key, table excluded from model derivation",
                    table.name
                ));
                report.excluded_tables.insert(table.name.clone());
            }
        }

        for warning in &metadata.extraction.warnings {
            report.add_warning(warning.clone());
        }

        tracing::info!(
            "Validated {} tables: {} errors, {} warnings",
            metadata.tables.len(),
            report.errors.len(),
            report.warnings.len()
        );
        report
    }
}
