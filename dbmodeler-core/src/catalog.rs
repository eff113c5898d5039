//! Catalog documents: persisted [`Metadata`] as JSON.
//!
//! Extraction and model derivation can run as separate steps: `extract`
//! writes a catalog document, `model` reads it back. The read path checks
//! the document against an embedded JSON Schema before deserializing, so a
//! hand-edited or foreign document fails with field-level messages instead
//! of a bare serde error.
//!
//! # Security Guarantees
//! - The connectivity section never carries a password field
//! - Urls carrying credentials are rejected unless the password is redacted

use crate::error::DbModelerError;
use crate::models::{FORMAT_VERSION, Metadata};
use crate::Result;
use jsonschema::Validator;
use serde_json::Value;
use std::path::Path;
use std::sync::OnceLock;

/// Supported format versions
const SUPPORTED_VERSIONS: &[&str] = &[FORMAT_VERSION];

/// Embedded JSON Schema for v1.0 catalog documents
const SCHEMA_V1_0: &str = r#"{
  "$schema": "https://json-schema.org/draft/2020-12/schema",
  "title": "dbmodeler Metadata Catalog Format v1.0",
  "type": "object",
  "required": ["format_version", "database_info", "connectivity", "tables", "extraction"],
  "properties": {
    "format_version": { "type": "string", "pattern": "^1\\.0$" },
    "database_info": {
      "type": "object",
      "required": ["product_name"],
      "properties": {
        "product_name": { "type": "string", "minLength": 1 },
        "product_version": { "type": ["string", "null"] },
        "driver_name": { "type": ["string", "null"] }
      }
    },
    "connectivity": {
      "type": "object",
      "required": ["url", "table_types", "reverse_indexes", "reverse_only_unique_indexes"],
      "not": { "required": ["password"] },
      "properties": {
        "url": { "type": "string" },
        "table_types": { "type": "array", "items": { "type": "string" }, "minItems": 1 },
        "table_name_patterns": { "type": "array", "items": { "type": "string" } },
        "reverse_indexes": { "type": "boolean" },
        "reverse_only_unique_indexes": { "type": "boolean" }
      }
    },
    "tables": {
      "type": "array",
      "items": {
        "type": "object",
        "required": ["name", "table_type", "columns"],
        "properties": {
          "name": { "type": "string", "minLength": 1 },
          "table_type": { "type": "string" },
          "columns": {
            "type": "array",
            "items": {
              "type": "object",
              "required": ["name", "data_type", "type_name", "nullable", "ordinal_position"],
              "properties": {
                "name": { "type": "string", "minLength": 1 },
                "data_type": { "type": ["string", "null"] },
                "type_name": { "type": "string" },
                "size": { "type": ["integer", "null"], "minimum": 0 },
                "decimal_digits": { "type": ["integer", "null"], "minimum": 0 },
                "nullable": { "type": "boolean" },
                "ordinal_position": { "type": "integer", "minimum": 0 },
                "enum_values": { "type": "array", "items": { "type": "string" } },
                "attributes": { "type": "object", "additionalProperties": { "type": "string" } }
              }
            }
          },
          "primary_keys": { "type": "array", "items": { "type": "string" } },
          "imported_keys": {
            "type": "array",
            "items": {
              "type": "object",
              "required": ["pk_table", "columns"],
              "properties": {
                "pk_table": { "type": "string", "minLength": 1 },
                "columns": {
                  "type": "array",
                  "minItems": 1,
                  "items": {
                    "type": "object",
                    "required": ["fk_column", "pk_column"],
                    "properties": {
                      "fk_column": { "type": "string" },
                      "pk_column": { "type": "string" }
                    }
                  }
                }
              }
            }
          },
          "indexes": {
            "type": "array",
            "items": {
              "type": "object",
              "required": ["name", "unique", "columns"],
              "properties": {
                "name": { "type": "string" },
                "unique": { "type": "boolean" },
                "columns": { "type": "array", "items": { "type": "string" } }
              }
            }
          }
        }
      }
    },
    "extraction": {
      "type": "object",
      "required": ["extracted_at", "extraction_duration_ms", "extractor_version"],
      "properties": {
        "extracted_at": { "type": "string", "format": "date-time" },
        "extraction_duration_ms": { "type": "integer", "minimum": 0 },
        "extractor_version": { "type": "string", "minLength": 1 },
        "warnings": { "type": "array", "items": { "type": "string" } }
      }
    }
  }
}"#;

/// Compiled JSON Schema instance (initialized once)
static COMPILED_SCHEMA: OnceLock<Validator> = OnceLock::new();

fn schema_validator() -> Result<&'static Validator> {
    if let Some(validator) = COMPILED_SCHEMA.get() {
        return Ok(validator);
    }

    let schema_json: Value = serde_json::from_str(SCHEMA_V1_0)
        .map_err(|e| DbModelerError::serialization("Failed to parse embedded catalog schema", e))?;
    let compiled = jsonschema::validator_for(&schema_json).map_err(|e| {
        DbModelerError::configuration(format!("Catalog schema compilation error: {}", e))
    })?;

    // Another caller may have won the race; either instance is equivalent
    let _ = COMPILED_SCHEMA.set(compiled);
    COMPILED_SCHEMA
        .get()
        .ok_or_else(|| DbModelerError::configuration("Catalog schema validator unavailable"))
}

/// Validates a catalog document.
///
/// Checks the format version first, then the JSON Schema (collecting every
/// violation), then the credential rules.
///
/// # Errors
/// Returns [`DbModelerError::Validation`] listing every violation.
pub fn validate_metadata_document(document: &Value) -> Result<()> {
    validate_format_version(document)?;

    let errors: Vec<String> = schema_validator()?
        .iter_errors(document)
        .map(|e| e.to_string())
        .collect();
    if !errors.is_empty() {
        return Err(DbModelerError::Validation {
            error_count: errors.len(),
            errors,
        });
    }

    validate_no_credentials(document)
}

fn validate_format_version(document: &Value) -> Result<()> {
    let version = document
        .get("format_version")
        .and_then(|v| v.as_str())
        .ok_or_else(|| DbModelerError::Validation {
            error_count: 1,
            errors: vec!["Missing required field 'format_version'".to_string()],
        })?;

    if !SUPPORTED_VERSIONS.contains(&version) {
        return Err(DbModelerError::Validation {
            error_count: 1,
            errors: vec![format!(
                "Unsupported format version '{}'. Supported versions: {:?}",
                version, SUPPORTED_VERSIONS
            )],
        });
    }
    Ok(())
}

fn validate_no_credentials(document: &Value) -> Result<()> {
    let Some(url) = document
        .get("connectivity")
        .and_then(|c| c.get("url"))
        .and_then(|u| u.as_str())
    else {
        return Ok(());
    };

    let exposed = url::Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.password().map(|p| p != "****"))
        .unwrap_or(false);
    if exposed {
        return Err(DbModelerError::Validation {
            error_count: 1,
            errors: vec!["connectivity.url carries an unredacted password".to_string()],
        });
    }
    Ok(())
}

/// Writes metadata as a pretty-printed catalog document.
///
/// # Errors
/// Returns an error when serialization or the write fails.
pub fn write_metadata(metadata: &Metadata, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(metadata)
        .map_err(|e| DbModelerError::serialization("Failed to serialize metadata", e))?;
    std::fs::write(path, json)
        .map_err(|e| DbModelerError::io(format!("Failed to write '{}'", path.display()), e))?;

    tracing::info!(
        "Wrote catalog document with {} tables to {}",
        metadata.tables.len(),
        path.display()
    );
    Ok(())
}

/// Reads and validates a catalog document.
///
/// # Errors
/// Returns an error when the file cannot be read, is not JSON, or fails
/// validation.
pub fn read_metadata(path: &Path) -> Result<Metadata> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| DbModelerError::io(format!("Failed to read '{}'", path.display()), e))?;
    parse_metadata(&json)
}

/// Parses and validates a catalog document from a string.
///
/// # Errors
/// Returns an error when the text is not JSON or fails validation.
pub fn parse_metadata(json: &str) -> Result<Metadata> {
    let document: Value = serde_json::from_str(json)
        .map_err(|e| DbModelerError::serialization("Catalog document is not valid JSON", e))?;
    validate_metadata_document(&document)?;

    let metadata: Metadata = serde_json::from_value(document)
        .map_err(|e| DbModelerError::serialization("Failed to deserialize catalog document", e))?;
    tracing::debug!("Loaded catalog document with {} tables", metadata.tables.len());
    Ok(metadata)
}
