//! Configuration types.
//!
//! - `JdbcConnectivity`: connection parameters and extraction options
//! - `ModelConfig`: per-entity and per-relation naming overrides
//!
//! # Security
//! Passwords are held in zeroizing buffers and are never serialized.

mod connectivity;
mod model;

pub use connectivity::{JdbcConnectivity, TableFilter};
pub use model::{
    ColumnConfig, EntityConfig, IncludeRef, ModelConfig, NamingConventions, RelationConfig,
};
