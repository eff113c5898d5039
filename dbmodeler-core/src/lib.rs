//! Core library for dbmodeler.
//!
//! dbmodeler reads a relational schema through a catalog introspection
//! source, enriches it with vendor-specific facts and derives a domain
//! model of entities, attributes, unique constraints and named
//! bidirectional relations from it.
//!
//! # Pipeline
//! 1. [`extract::MetadataExtractor`] walks a [`adapters::CatalogAdapter`]
//!    into [`models::Metadata`], running every applicable
//!    [`vendor::VendorExtension`]
//! 2. [`catalog`] persists the metadata as a versioned JSON document
//! 3. [`validation::MetadataValidator`] checks the metadata and produces a
//!    [`validation::RuleReport`]
//! 4. [`model::DomainModelAssembler`] derives the [`model::DomainModel`]
//!
//! # Security Guarantees
//! - Passwords are never serialized and URLs are redacted in documents and logs
//! - Database sessions are opened read-only where the vendor supports it

pub mod adapters;
pub mod catalog;
pub mod config;
pub mod enum_values;
pub mod error;
pub mod extract;
pub mod logging;
pub mod model;
pub mod models;
pub mod types;
pub mod validation;
pub mod vendor;

// Re-export commonly used types
pub use adapters::{CatalogAdapter, QueryRow, RawColumn, RawTable, create_adapter};
pub use config::{JdbcConnectivity, ModelConfig};
pub use error::{DbModelerError, Result};
pub use extract::MetadataExtractor;
pub use model::{DomainModel, DomainModelAssembler};
pub use models::{Column, DatabaseInfo, Metadata, Table};
pub use types::JdbcType;
pub use validation::{MetadataValidator, RuleReport};
pub use vendor::{VendorExtension, VendorRegistry};
