mod check;
mod inspect;
mod items;
mod notify;
mod schedule;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use pricewatch_core::AppConfig;
use tracing_subscriber::EnvFilter;

use crate::items::ItemsCommands;
use crate::notify::build_notifier;

#[derive(Debug, Parser)]
#[command(name = "pricewatch")]
#[command(about = "Track product prices across online shops")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database utilities
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Manage tracked items
    Items {
        #[command(subcommand)]
        command: ItemsCommands,
    },
    /// Check prices now for one item or all items
    Check {
        /// Only check this item
        #[arg(long)]
        item: Option<i64>,
    },
    /// Extract a price from a page or local HTML file and print it as JSON
    Extract {
        /// Page to fetch
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        url: Option<String>,

        /// Local HTML file to read instead of fetching
        #[arg(long)]
        file: Option<PathBuf>,

        /// CSS selector or XPath query that points at the price
        #[arg(long)]
        locator: Option<String>,

        /// How to read `--locator`: css or xpath
        #[arg(long, default_value = "css")]
        locator_kind: String,
    },
    /// Print the name that would be given to a page
    DetectName { url: String },
    /// Check all items now and then on the configured cron schedule
    Watch,
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Verify the database is reachable
    Ping,
    /// Apply pending migrations
    Migrate,
}

fn init_tracing(log_level: &str) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

async fn connect(config: &AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = pricewatch_db::PoolConfig::from_app_config(config);
    let pool = pricewatch_db::connect_pool(&config.database_url, pool_config).await?;
    let applied = pricewatch_db::run_migrations(&pool).await?;
    if applied > 0 {
        tracing::info!(applied, "database migrations applied");
    }
    Ok(pool)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = pricewatch_core::load_app_config();
    init_tracing(config.as_ref().map_or("info", |c| c.log_level.as_str()))?;

    match cli.command {
        Commands::Extract {
            url,
            file,
            locator,
            locator_kind,
        } => {
            let source = match (&url, &file) {
                (Some(url), _) => inspect::Source::Url(url),
                (None, Some(file)) => inspect::Source::File(file),
                (None, None) => anyhow::bail!("either --url or --file is required"),
            };
            let config = config.ok();
            inspect::run_extract(config.as_ref(), source, locator.as_deref(), &locator_kind).await
        }
        Commands::DetectName { url } => {
            let config = config.ok();
            inspect::run_detect_name(config.as_ref(), &url).await
        }
        Commands::Db { command } => {
            let config = config?;
            run_db(command, &config).await
        }
        Commands::Items { command } => {
            let config = config?;
            let pool = connect(&config).await?;
            let notifier = build_notifier(&config)?;
            items::run_items(&pool, &config, command, &notifier).await
        }
        Commands::Check { item } => {
            let config = config?;
            let pool = connect(&config).await?;
            let notifier = build_notifier(&config)?;
            check::run_check_command(&pool, &config, item, &notifier).await
        }
        Commands::Watch => {
            let config = Arc::new(config?);
            tracing::debug!(config = ?config, "configuration loaded");
            let pool = connect(&config).await?;
            let notifier: Arc<dyn notify::Notifier> = Arc::new(build_notifier(&config)?);
            schedule::run_watch(pool, config, notifier).await
        }
    }
}

async fn run_db(command: DbCommands, config: &AppConfig) -> anyhow::Result<()> {
    let pool_config = pricewatch_db::PoolConfig::from_app_config(config);
    let pool = pricewatch_db::connect_pool(&config.database_url, pool_config).await?;
    match command {
        DbCommands::Ping => {
            pricewatch_db::ping(&pool).await?;
            println!("database reachable");
        }
        DbCommands::Migrate => {
            let applied = pricewatch_db::run_migrations(&pool).await?;
            println!("applied {applied} migrations");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests;
