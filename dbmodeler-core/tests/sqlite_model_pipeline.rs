//! End-to-end pipeline over an in-memory SQLite database.
//!
//! Covers extraction through sqlx, the SQLite `CHECK (... IN (...))` enum
//! extension, validation and domain model derivation.
//!
//! Note: in-memory databases only, no containers needed.

#![cfg(feature = "sqlite")]

use dbmodeler_core::{
    DomainModelAssembler, JdbcConnectivity, JdbcType, MetadataExtractor, MetadataValidator,
    ModelConfig, Result, adapters::sqlite::SqliteAdapter, model::RelationKind,
};
use sqlx::sqlite::SqlitePoolOptions;

const SCHEMA: &[&str] = &[
    "CREATE TABLE language (
        language_id INTEGER PRIMARY KEY,
        name VARCHAR(20) NOT NULL
    )",
    "CREATE TABLE film (
        film_id INTEGER PRIMARY KEY,
        title VARCHAR(255) NOT NULL,
        language_id INTEGER NOT NULL REFERENCES language(language_id),
        original_language_id INTEGER REFERENCES language(language_id),
        rating VARCHAR(10) DEFAULT 'G' CHECK (rating IN ('G','PG','PG-13','R','NC-17')),
        last_update TIMESTAMP NOT NULL
    )",
    "CREATE TABLE actor (
        actor_id INTEGER PRIMARY KEY,
        first_name VARCHAR(45) NOT NULL,
        last_name VARCHAR(45) NOT NULL
    )",
    "CREATE TABLE film_actor (
        actor_id INTEGER NOT NULL REFERENCES actor(actor_id),
        film_id INTEGER NOT NULL REFERENCES film(film_id),
        last_update TIMESTAMP,
        PRIMARY KEY (actor_id, film_id)
    )",
    "CREATE TABLE staff (
        staff_id INTEGER PRIMARY KEY,
        email VARCHAR(50) NOT NULL UNIQUE,
        manager_id INTEGER REFERENCES staff(staff_id)
    )",
    "CREATE TABLE audit_log (message TEXT, logged_at TIMESTAMP)",
    "CREATE VIEW film_list AS SELECT title FROM film",
    "CREATE INDEX idx_actor_last_name ON actor(last_name)",
];

async fn sakila() -> SqliteAdapter {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database");
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(&pool)
            .await
            .expect("Failed to create schema");
    }
    SqliteAdapter::from_pool(pool)
}

#[tokio::test]
async fn test_sqlite_extraction_reads_check_enum() -> Result<()> {
    let adapter = sakila().await;
    let metadata = MetadataExtractor::new()
        .extract(&adapter, &JdbcConnectivity::new("sqlite::memory:"))
        .await?;

    let names: Vec<&str> = metadata.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["actor", "audit_log", "film", "film_actor", "language", "staff"]
    );

    let film = metadata.table("film").expect("film extracted");
    let rating = film.column("rating").expect("rating column");
    assert_eq!(rating.enum_values, vec!["G", "PG", "PG-13", "R", "NC-17"]);
    assert_eq!(rating.data_type, Some(JdbcType::VarChar));
    assert_eq!(rating.size, Some(10));
    assert_eq!(film.primary_keys, vec!["film_id"]);
    assert_eq!(film.imported_keys.len(), 2);

    let film_actor = metadata.table("film_actor").expect("film_actor extracted");
    assert_eq!(film_actor.primary_keys, vec!["actor_id", "film_id"]);

    let actor = metadata.table("actor").expect("actor extracted");
    assert!(
        actor
            .indexes
            .iter()
            .any(|i| i.name == "idx_actor_last_name" && !i.unique)
    );
    assert_eq!(metadata.counts().enum_values, 5);
    Ok(())
}

#[tokio::test]
async fn test_sqlite_unique_indexes_only() -> Result<()> {
    let adapter = sakila().await;
    let connectivity = JdbcConnectivity::new("sqlite::memory:").with_only_unique_indexes(true);
    let metadata = MetadataExtractor::new()
        .extract(&adapter, &connectivity)
        .await?;

    assert!(metadata.tables.iter().flat_map(|t| &t.indexes).all(|i| i.unique));
    let staff = metadata.table("staff").expect("staff extracted");
    assert_eq!(staff.indexes.len(), 1);
    assert_eq!(staff.indexes[0].columns, vec!["email"]);
    Ok(())
}

#[tokio::test]
async fn test_sqlite_views_on_request() -> Result<()> {
    let adapter = sakila().await;
    let connectivity = JdbcConnectivity::new("sqlite::memory:")
        .with_table_type("VIEW")
        .with_table_pattern("film*");
    let metadata = MetadataExtractor::new()
        .extract(&adapter, &connectivity)
        .await?;

    let names: Vec<&str> = metadata.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["film", "film_actor", "film_list"]);
    Ok(())
}

#[tokio::test]
async fn test_sqlite_pipeline_derives_model() -> Result<()> {
    let adapter = sakila().await;
    let metadata = MetadataExtractor::new()
        .extract(&adapter, &JdbcConnectivity::new("sqlite::memory:"))
        .await?;

    let report = MetadataValidator::validate(&metadata);
    assert_eq!(report.errors.len(), 1, "{}", report);
    assert!(report.is_excluded("audit_log"));

    let model = DomainModelAssembler::assemble(&metadata, &report, &ModelConfig::default());
    let types: Vec<&str> = model
        .entities
        .iter()
        .map(|e| e.namer.type_name.as_str())
        .collect();
    assert_eq!(types, vec!["Actor", "Film", "Language", "Staff"]);

    let film = model.entity_id("film").expect("film entity");
    let language = model.entity_id("language").expect("language entity");
    let actor = model.entity_id("actor").expect("actor entity");
    let staff = model.entity_id("staff").expect("staff entity");

    let to_language = model
        .relation_named(film, "language")
        .expect("film.language");
    assert_eq!(to_language.kind, RelationKind::ManyToOne);
    assert!(to_language.mandatory);
    assert!(
        !model
            .relation_named(film, "originalLanguage")
            .expect("film.originalLanguage")
            .mandatory
    );
    assert!(model.relation_named(language, "films").is_some());
    assert!(model.relation_named(language, "films2").is_some());

    let films = model.relation_named(actor, "films").expect("actor.films");
    assert_eq!(films.kind, RelationKind::ManyToMany);
    assert_eq!(
        films.via_table.as_ref().map(|v| v.name.as_str()),
        Some("film_actor")
    );
    assert!(model.relation_named(film, "actors").is_some());

    assert!(model.relation_named(staff, "manager").is_some());
    assert!(model.relation_named(staff, "staffs").is_some());

    let staff_entity = &model.entities[staff];
    assert_eq!(staff_entity.uniques.len(), 1);
    assert!(staff_entity.uniques[0].is_good_business_key_candidate(staff_entity));

    let rating = model.entities[film]
        .attribute("rating")
        .expect("rating attribute");
    assert_eq!(rating.enum_values.len(), 5);
    Ok(())
}
