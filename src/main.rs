use nl2sql_crafter::config::CrafterConfig;
use nl2sql_crafter::db::{lazy_pool, PgIntrospector};
use nl2sql_crafter::schema::{JsonSchemaFile, SchemaCache, SchemaIntrospector, SchemaSource};
use nl2sql_crafter::validation::{SqlValidator, ValidatorOptions};
use nl2sql_crafter::{CraftingResult, QueryCrafter};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nl2sql")]
#[command(about = "Turn natural-language questions into validated SQL")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct SchemaArgs {
    /// JSON schema description to use instead of a live database
    #[arg(long, conflicts_with = "database_url")]
    schema_file: Option<PathBuf>,

    /// PostgreSQL connection string (or set DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Craft a SQL statement for a question
    Craft {
        /// The question in natural language
        question: String,

        #[command(flatten)]
        schema: SchemaArgs,

        /// Maximum LLM attempts (or set NL2SQL_MAX_ATTEMPTS)
        #[arg(long)]
        max_attempts: Option<u32>,

        /// Accept INSERT/UPDATE/DELETE candidates
        #[arg(long)]
        allow_writes: bool,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the introspected schema as JSON
    Schema {
        #[command(flatten)]
        schema: SchemaArgs,
    },
    /// Validate a SQL statement against a schema file
    Validate {
        /// The SQL statement to check
        sql: String,

        /// JSON schema description
        #[arg(long)]
        schema_file: PathBuf,

        /// Accept INSERT/UPDATE/DELETE statements
        #[arg(long)]
        allow_writes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = CrafterConfig::from_env().context("Invalid configuration")?;

    match cli.command {
        Commands::Craft {
            question,
            schema,
            max_attempts,
            allow_writes,
            json,
        } => {
            if let Some(max) = max_attempts {
                if max == 0 {
                    bail!("--max-attempts must be at least 1");
                }
                config.max_attempts = max;
            }
            if allow_writes {
                config.read_only = false;
            }
            let result = run_craft(config, &question, schema).await?;
            print_result(&result, json)?;
            if !result.is_success() {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Schema { schema } => {
            let source = schema_cache(&config, schema)?;
            let snapshot = source.snapshot().await?;
            if snapshot.is_empty() {
                warn!("Schema source returned no tables");
            }
            println!("{}", serde_json::to_string_pretty(snapshot.as_ref())?);
            Ok(())
        }
        Commands::Validate {
            sql,
            schema_file,
            allow_writes,
        } => {
            if allow_writes {
                config.read_only = false;
            }
            let schema = JsonSchemaFile::new(&schema_file).load()?;
            let outcome = SqlValidator::new(ValidatorOptions::from(&config)).validate(&sql, &schema);
            if outcome.is_valid() {
                println!("OK");
                return Ok(());
            }
            for violation in outcome.violations() {
                println!("- {}", violation);
            }
            std::process::exit(1);
        }
    }
}

async fn run_craft(config: CrafterConfig, question: &str, schema: SchemaArgs) -> Result<CraftingResult> {
    let source = schema_cache(&config, schema)?;
    let crafter = QueryCrafter::from_config(config);

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling session");
            on_ctrl_c.cancel();
        }
    });

    let result = crafter.craft_with_cancel(question, &source, &cancel).await?;
    Ok(result)
}

fn schema_cache(config: &CrafterConfig, args: SchemaArgs) -> Result<SchemaCache> {
    let introspector: Arc<dyn SchemaIntrospector> = match (args.schema_file, args.database_url) {
        (Some(path), _) => {
            info!("Using schema file {:?}", path);
            Arc::new(JsonSchemaFile::new(path))
        }
        (None, url) => {
            let Some(url) = url.or_else(|| config.database_url.clone()) else {
                bail!("No schema source: pass --schema-file or --database-url (or set DATABASE_URL)");
            };
            let pool = lazy_pool(&url, config.introspection_timeout)
                .context("Invalid database URL")?;
            Arc::new(PgIntrospector::new(
                pool,
                config.database_schema.clone(),
                config.introspection_timeout,
            ))
        }
    };
    Ok(SchemaCache::new(
        introspector,
        config.schema_ttl,
        config.introspection_timeout,
    ))
}

fn print_result(result: &CraftingResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    match &result.sql {
        Some(sql) => {
            println!("{}", sql);
            info!("Crafted in {} attempt(s)", result.attempts);
        }
        None => {
            if let Some(message) = &result.message {
                println!("{}", message);
            }
            for violation in &result.violations {
                println!("- {}", violation);
            }
            for note in &result.notes {
                println!("  {}", note);
            }
        }
    }
    Ok(())
}
