//! Metadata extraction: one sequential pass over a catalog adapter.
//!
//! Walks tables (filtered by type and name pattern), then per table its
//! columns, primary key, imported keys and, when enabled, indexes. Every
//! applyable vendor extension runs last.

use crate::Result;
use crate::adapters::{CatalogAdapter, RawColumn, RawTable};
use crate::config::JdbcConnectivity;
use crate::models::{Column, Metadata, Table};
use crate::types::resolve_type;
use crate::vendor::VendorRegistry;
use std::time::Instant;

/// Builds [`Metadata`] from a catalog adapter.
#[derive(Debug, Default)]
pub struct MetadataExtractor {
    registry: VendorRegistry,
}

impl MetadataExtractor {
    /// Extractor with the built-in vendor extensions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Extractor with a custom extension registry.
    pub fn with_registry(registry: VendorRegistry) -> Self {
        Self { registry }
    }

    /// Extracts the catalog described by `connectivity`.
    ///
    /// Unresolved column types and failing vendor extensions do not fail
    /// the extraction; the former are left for the validator, the latter
    /// are recorded as warnings.
    ///
    /// # Errors
    /// Returns an error when the settings are invalid or a catalog call
    /// fails.
    pub async fn extract(
        &self,
        adapter: &dyn CatalogAdapter,
        connectivity: &JdbcConnectivity,
    ) -> Result<Metadata> {
        connectivity.validate()?;
        let filter = connectivity.table_filter()?;
        let started = Instant::now();

        let database_info = adapter.database_info().await?;
        tracing::info!(
            "Extracting metadata from {} {}",
            database_info.product_name,
            database_info.product_version.as_deref().unwrap_or("")
        );

        let accept_synonyms =
            database_info.is_product("Oracle") && connectivity.oracle_retrieve_synonyms;
        let mut metadata = Metadata::new(database_info, connectivity.clone());

        let raw_tables = adapter
            .tables(
                connectivity.catalog.as_deref(),
                connectivity.schema_name.as_deref(),
            )
            .await?;

        for raw in raw_tables {
            let type_selected = connectivity.accepts_table_type(&raw.table_type)
                || (accept_synonyms && raw.table_type.eq_ignore_ascii_case("SYNONYM"));
            if !type_selected || !filter.accepts(&raw.name) {
                tracing::trace!("Skipping {} ({})", raw.qualified_name(), raw.table_type);
                continue;
            }

            let table = self.extract_table(adapter, connectivity, raw).await?;
            tracing::debug!(
                "Extracted table '{}' with {} columns, {} imported keys, {} indexes",
                table.name,
                table.columns.len(),
                table.imported_keys.len(),
                table.indexes.len()
            );

            let name = table.name.clone();
            if !metadata.add_table(table) {
                tracing::warn!("Duplicate table '{}' ignored", name);
                metadata.add_warning(format!("Duplicate table '{}' ignored", name));
            }
        }

        let applied = self.registry.apply_all(adapter, &mut metadata).await;

        metadata.extraction.extraction_duration_ms =
            u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let counts = metadata.counts();
        tracing::info!(
            "Extracted {} tables, {} columns, {} indexes ({} vendor extensions applied) in {}ms",
            counts.tables,
            counts.columns,
            counts.indexes,
            applied,
            metadata.extraction.extraction_duration_ms
        );
        Ok(metadata)
    }

    async fn extract_table(
        &self,
        adapter: &dyn CatalogAdapter,
        connectivity: &JdbcConnectivity,
        raw: RawTable,
    ) -> Result<Table> {
        let mut raw_columns = adapter.columns(&raw).await?;
        raw_columns.sort_by_key(|c| c.ordinal_position);

        let columns = raw_columns
            .into_iter()
            .map(|column| resolve_column(&raw.name, column))
            .collect();
        let primary_keys = adapter.primary_keys(&raw).await?;
        let imported_keys = adapter.imported_keys(&raw).await?;
        let indexes = if connectivity.reverse_indexes {
            adapter
                .indexes(&raw, connectivity.reverse_only_unique_indexes)
                .await?
        } else {
            Vec::new()
        };

        Ok(Table {
            name: raw.name,
            schema: raw.schema,
            catalog: raw.catalog,
            table_type: raw.table_type,
            remarks: raw.remarks,
            columns,
            primary_keys,
            imported_keys,
            indexes,
        })
    }
}

fn resolve_column(table: &str, raw: RawColumn) -> Column {
    let context = format!("{}.{}", table, raw.name);
    let data_type = resolve_type(raw.type_code, &raw.type_name, &context);
    Column {
        data_type,
        name: raw.name,
        type_name: raw.type_name,
        size: raw.size,
        decimal_digits: raw.decimal_digits,
        nullable: raw.nullable,
        ordinal_position: raw.ordinal_position,
        auto_increment: raw.auto_increment,
        remarks: raw.remarks,
        enum_values: Vec::new(),
        attributes: Default::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::QueryRow;
    use crate::adapters::memory::{MemoryAdapter, MemoryTable};
    use crate::models::DatabaseInfo;
    use crate::types::JdbcType;

    fn int(name: &str) -> RawColumn {
        RawColumn::new(name, Some(JdbcType::Integer.code()), "INTEGER").not_null()
    }

    fn catalog(product: &str) -> MemoryAdapter {
        MemoryAdapter::new(DatabaseInfo::new(product))
            .with_table(
                MemoryTable::new("film")
                    .column(int("film_id"))
                    .column(RawColumn::new("rating", None, "varchar"))
                    .column(RawColumn::new("location", None, "GEOMETRY"))
                    .column(int("language_id"))
                    .primary_key(&["film_id"])
                    .foreign_key("fk_film_language", "language", &[("language_id", "language_id")])
                    .index("uk_film_rating", true, &["rating"])
                    .index("ix_film_language", false, &["language_id"]),
            )
            .with_table(
                MemoryTable::new("language")
                    .column(int("language_id"))
                    .primary_key(&["language_id"]),
            )
            .with_table(MemoryTable::new("film_list").table_type("VIEW"))
            .with_table(MemoryTable::new("film_syn").table_type("SYNONYM"))
    }

    #[tokio::test]
    async fn test_extracts_tables_and_resolves_types() {
        let adapter = catalog("H2");
        let metadata = MetadataExtractor::new()
            .extract(&adapter, &JdbcConnectivity::default())
            .await
            .unwrap();

        let names: Vec<_> = metadata.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["film", "language"]);

        let film = metadata.table("film").unwrap();
        assert_eq!(film.column("rating").unwrap().data_type, Some(JdbcType::VarChar));
        assert_eq!(film.column("location").unwrap().data_type, None);
        assert_eq!(film.column("location").unwrap().type_name, "GEOMETRY");
        assert_eq!(film.primary_keys, vec!["film_id"]);
        assert_eq!(film.imported_keys.len(), 1);
        assert_eq!(film.indexes.len(), 2);
        assert!(metadata.extraction.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_index_reversal_switches() {
        let adapter = catalog("H2");

        let unique_only = JdbcConnectivity::default().with_only_unique_indexes(true);
        let metadata = MetadataExtractor::new().extract(&adapter, &unique_only).await.unwrap();
        assert_eq!(metadata.table("film").unwrap().indexes.len(), 1);

        let disabled = JdbcConnectivity::default().with_reverse_indexes(false);
        let metadata = MetadataExtractor::new().extract(&adapter, &disabled).await.unwrap();
        assert!(metadata.table("film").unwrap().indexes.is_empty());
    }

    #[tokio::test]
    async fn test_table_type_and_pattern_filters() {
        let adapter = catalog("H2");
        let connectivity = JdbcConnectivity::default()
            .with_table_type("VIEW")
            .with_table_pattern("FILM*");
        let metadata = MetadataExtractor::new().extract(&adapter, &connectivity).await.unwrap();

        let names: Vec<_> = metadata.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["film", "film_list"]);
    }

    #[tokio::test]
    async fn test_oracle_synonyms_are_opt_in() {
        let adapter = catalog("Oracle");
        let mut connectivity = JdbcConnectivity::default();
        let metadata = MetadataExtractor::new().extract(&adapter, &connectivity).await.unwrap();
        assert!(metadata.table("film_syn").is_none());

        connectivity.oracle_retrieve_synonyms = true;
        let metadata = MetadataExtractor::new().extract(&adapter, &connectivity).await.unwrap();
        assert!(metadata.table("film_syn").is_some());
    }

    #[tokio::test]
    async fn test_failing_extension_recorded_as_warning() {
        let adapter = catalog("H2").with_query_failure("information_schema.constraints", "denied");
        let metadata = MetadataExtractor::new()
            .extract(&adapter, &JdbcConnectivity::default())
            .await
            .unwrap();

        assert_eq!(metadata.tables.len(), 2);
        assert_eq!(metadata.extraction.warnings.len(), 1);
        assert!(metadata.extraction.warnings[0].contains("h2"));
        assert_eq!(adapter.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_vendor_enum_values_applied() {
        let adapter = catalog("H2").with_query_result(
            "information_schema.constraints",
            vec![
                QueryRow::new()
                    .with("TABLE_NAME", "FILM")
                    .with("COLUMN_LIST", "RATING")
                    .with("CHECK_EXPRESSION", "RATING IN('G','PG','R')"),
            ],
        );
        let metadata = MetadataExtractor::new()
            .extract(&adapter, &JdbcConnectivity::default())
            .await
            .unwrap();

        assert_eq!(
            metadata.table("film").unwrap().column("rating").unwrap().enum_values,
            vec!["G", "PG", "R"]
        );
        assert_eq!(metadata.counts().enum_values, 3);
    }
}
