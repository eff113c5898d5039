//! Schema reverse-engineering tool.
//!
//! Extracts catalog metadata from a database into a versioned JSON
//! document, checks it against the consistency rules and derives a domain
//! model from it.
//!
//! # Security Guarantees
//! - Read-only catalog queries only
//! - Passwords are never written to documents or logs

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use dbmodeler_core::{
    DomainModelAssembler, JdbcConnectivity, MetadataExtractor, MetadataValidator, ModelConfig,
    RuleReport, catalog, create_adapter, error::redact_database_url, logging::init_logging,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use zeroize::Zeroizing;

#[derive(Parser)]
#[command(name = "dbmodeler")]
#[command(about = "Reverse a relational schema into a domain model")]
#[command(version)]
#[command(long_about = "
dbmodeler - relational schema to domain model

Extracts tables, columns, keys, indexes and vendor enum values from a
database, validates the result and derives entities and named
bidirectional relations from it.

SUPPORTED DATABASES:
- PostgreSQL (postgres://)
- SQLite (sqlite:// or .db/.sqlite files)

EXAMPLES:
  dbmodeler extract --database-url sqlite://sakila.db --output metadata.json
  dbmodeler validate metadata.json
  dbmodeler model metadata.json --config overrides.json --output model.json
")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true, help = "Suppress all output except errors")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Extract catalog metadata from a database
    Extract(ExtractArgs),
    /// Check a metadata document against the consistency rules
    Validate(ValidateArgs),
    /// Derive the domain model from a metadata document
    Model(ModelArgs),
}

#[derive(Args)]
struct ExtractArgs {
    /// Database connection URL
    #[arg(
        long,
        env = "DATABASE_URL",
        help = "Database connection string (credentials will be sanitized in logs)"
    )]
    database_url: String,

    /// Database password, overriding any password in the url
    #[arg(long, env = "DBMODELER_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Prompt for the database password
    #[arg(long, conflicts_with = "password")]
    ask_password: bool,

    /// Schema to reverse
    #[arg(long)]
    schema: Option<String>,

    /// Catalog to reverse
    #[arg(long)]
    catalog: Option<String>,

    /// Table types to reverse
    #[arg(long = "table-type", value_delimiter = ',', default_value = "TABLE")]
    table_types: Vec<String>,

    /// Table name glob patterns
    #[arg(long = "table-pattern", value_delimiter = ',')]
    table_patterns: Vec<String>,

    /// Skip index reversal (no one-to-one promotion or unique keys)
    #[arg(long)]
    no_reverse_indexes: bool,

    /// Only reverse unique indexes
    #[arg(long, conflicts_with = "no_reverse_indexes")]
    unique_indexes_only: bool,

    /// Read Oracle table and column comments
    #[arg(long)]
    oracle_remarks: bool,

    /// Reverse Oracle synonyms
    #[arg(long)]
    oracle_synonyms: bool,

    /// Output file path
    #[arg(short, long, default_value = "metadata.json")]
    output: PathBuf,
}

#[derive(Args)]
struct ValidateArgs {
    /// Metadata document
    input: PathBuf,
}

#[derive(Args)]
struct ModelArgs {
    /// Metadata document
    input: PathBuf,

    /// Model configuration overrides
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output file path
    #[arg(short, long, default_value = "model.json")]
    output: PathBuf,

    /// Derive the model even when the rule report has errors
    #[arg(long)]
    force: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.global.verbose, cli.global.quiet)?;

    match cli.command {
        Command::Extract(args) => extract(args).await,
        Command::Validate(args) => {
            let report = validate(&args.input)?;
            if report.has_error_messages() {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Model(args) => model(&args),
    }
}

/// Reads the password from the environment, a flag or a prompt.
fn read_password(args: &ExtractArgs) -> anyhow::Result<Option<Zeroizing<String>>> {
    if args.ask_password {
        eprint!("Database password: ");
        let password = rpassword::read_password().context("Failed to read password")?;
        return Ok(Some(Zeroizing::new(password)));
    }
    Ok(args.password.clone().map(Zeroizing::new))
}

/// Puts the password into the connection url.
fn url_with_password(database_url: &str, password: &str) -> anyhow::Result<Zeroizing<String>> {
    let mut url = url::Url::parse(database_url)
        .with_context(|| format!("Invalid database url '{}'", redact_database_url(database_url)))?;
    if url.set_password(Some(password)).is_err() {
        bail!(
            "Database url '{}' cannot carry a password",
            redact_database_url(database_url)
        );
    }
    Ok(Zeroizing::new(url.to_string()))
}

fn connectivity(args: &ExtractArgs, password: Option<&Zeroizing<String>>) -> JdbcConnectivity {
    let mut connectivity = JdbcConnectivity::new(args.database_url.clone());
    connectivity.table_types.clear();
    for table_type in &args.table_types {
        connectivity = connectivity.with_table_type(table_type.as_str());
    }
    for pattern in &args.table_patterns {
        connectivity = connectivity.with_table_pattern(pattern.as_str());
    }
    if let Some(schema) = &args.schema {
        connectivity = connectivity.with_schema(schema.as_str());
    }
    if let Some(catalog) = &args.catalog {
        connectivity = connectivity.with_catalog(catalog.as_str());
    }
    if let Ok(url) = url::Url::parse(&args.database_url)
        && !url.username().is_empty()
    {
        connectivity = connectivity.with_user(url.username());
    }
    if let Some(password) = password {
        connectivity = connectivity.with_password(password.as_str());
    }
    connectivity.oracle_retrieve_remarks = args.oracle_remarks;
    connectivity.oracle_retrieve_synonyms = args.oracle_synonyms;
    connectivity
        .with_reverse_indexes(!args.no_reverse_indexes)
        .with_only_unique_indexes(args.unique_indexes_only)
}

async fn extract(args: ExtractArgs) -> anyhow::Result<()> {
    info!("Target: {}", redact_database_url(&args.database_url));
    let password = read_password(&args)?;
    let connection_url = match &password {
        Some(password) => url_with_password(&args.database_url, password)?,
        None => Zeroizing::new(args.database_url.clone()),
    };
    let connectivity = connectivity(&args, password.as_ref());

    let adapter = create_adapter(&connection_url)
        .await
        .context("Failed to connect")?;
    let metadata = MetadataExtractor::new()
        .extract(adapter.as_ref(), &connectivity)
        .await
        .context("Metadata extraction failed")?;

    catalog::write_metadata(&metadata, &args.output)
        .with_context(|| format!("Failed to write '{}'", args.output.display()))?;

    let counts = metadata.counts();
    println!("Output: {}", args.output.display());
    println!("Tables: {}", counts.tables);
    println!("Columns: {}", counts.columns);
    println!("Indexes: {}", counts.indexes);
    println!("Enum values: {}", counts.enum_values);
    for warning in &metadata.extraction.warnings {
        warn!("{}", warning);
    }
    Ok(())
}

fn validate(input: &Path) -> anyhow::Result<RuleReport> {
    let metadata = catalog::read_metadata(input)
        .with_context(|| format!("Failed to read '{}'", input.display()))?;
    let report = MetadataValidator::validate(&metadata);
    println!("{}", report);
    Ok(report)
}

fn model(args: &ModelArgs) -> anyhow::Result<()> {
    let metadata = catalog::read_metadata(&args.input)
        .with_context(|| format!("Failed to read '{}'", args.input.display()))?;
    let config = match &args.config {
        Some(path) => ModelConfig::load(path)?,
        None => ModelConfig::default(),
    };

    let report = MetadataValidator::validate(&metadata);
    if report.has_error_messages() {
        eprintln!("{}", report);
        if !args.force {
            bail!(
                "Metadata has {} rule violations, rerun with --force to derive anyway",
                report.errors.len()
            );
        }
    }

    let model = DomainModelAssembler::assemble(&metadata, &report, &config);
    let json = serde_json::to_string_pretty(&model).context("Failed to serialize model")?;
    std::fs::write(&args.output, json)
        .with_context(|| format!("Failed to write '{}'", args.output.display()))?;

    println!("Output: {}", args.output.display());
    println!("Entities: {}", model.entities.len());
    println!("Relations: {}", model.relations.len());
    for warning in &model.warnings {
        println!("WARNING {}", warning);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract_args(extra: &[&str]) -> ExtractArgs {
        let mut argv = vec!["dbmodeler", "extract", "--database-url", "postgres://app@db/shop"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Extract(args) => args,
            _ => panic!("expected extract"),
        }
    }

    #[test]
    fn test_password_injected_into_url() {
        let url = url_with_password("postgres://app@db/shop", "s3cret").unwrap();
        assert_eq!(url.as_str(), "postgres://app:s3cret@db/shop");
        assert!(url_with_password("sqlite::memory:", "x").is_err());
    }

    #[test]
    fn test_connectivity_from_flags() {
        let args = extract_args(&[
            "--schema",
            "public",
            "--table-type",
            "table,view",
            "--table-pattern",
            "film*",
            "--unique-indexes-only",
        ]);
        let connectivity = connectivity(&args, None);

        assert_eq!(connectivity.schema_name.as_deref(), Some("public"));
        assert_eq!(connectivity.user.as_deref(), Some("app"));
        assert!(connectivity.accepts_table_type("VIEW"));
        assert!(connectivity.reverse_indexes);
        assert!(connectivity.reverse_only_unique_indexes);
        assert_eq!(connectivity.table_name_patterns, vec!["film*"]);
        assert!(connectivity.password.is_none());
    }

    #[test]
    fn test_credential_never_in_serialized_connectivity() {
        let args = extract_args(&["--password", "s3cret"]);
        let password = read_password(&args).unwrap();
        let connectivity = connectivity(&args, password.as_ref());
        assert!(connectivity.password.is_some());

        let json = serde_json::to_string(&connectivity).unwrap();
        assert!(!json.contains("s3cret"));
    }

    #[test]
    fn test_index_reversal_defaults_to_library_setting() {
        let args = extract_args(&[]);
        let connectivity = connectivity(&args, None);
        assert_eq!(
            connectivity.reverse_indexes,
            JdbcConnectivity::default().reverse_indexes
        );
        assert!(connectivity.reverse_indexes);
        assert!(!connectivity.reverse_only_unique_indexes);

        let args = extract_args(&["--no-reverse-indexes"]);
        assert!(!super::connectivity(&args, None).reverse_indexes);
    }

    #[test]
    fn test_unique_only_conflicts_with_no_reverse_indexes() {
        let argv = [
            "dbmodeler",
            "extract",
            "--database-url",
            "sqlite::memory:",
            "--no-reverse-indexes",
            "--unique-indexes-only",
        ];
        assert!(Cli::try_parse_from(argv).is_err());
    }
}
