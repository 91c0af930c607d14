//! `items` sub-commands: add, list, show, set-locator, remove.

use std::str::FromStr;

use anyhow::Context;
use clap::Subcommand;
use pricewatch_core::{AppConfig, LocatorKind};
use pricewatch_db::{DbError, NewItem};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::check::{build_page_client, run_checks};
use crate::notify::{format_amount, Notifier};

const UNTITLED_ITEM: &str = "Untitled item";
const DEFAULT_HISTORY_LIMIT: i64 = 20;

/// Sub-commands available under `items`.
#[derive(Debug, Subcommand)]
pub enum ItemsCommands {
    /// Start tracking a product page and run a first check
    Add {
        /// Product page URL
        url: String,

        /// Display name; detected from the page when omitted
        #[arg(long)]
        name: Option<String>,

        /// CSS selector or XPath query that points at the price
        #[arg(long)]
        locator: Option<String>,

        /// How to read `--locator`: css or xpath
        #[arg(long, default_value = "css")]
        locator_kind: String,
    },
    /// List tracked items with their latest and lowest price
    List,
    /// Show an item's recent checks and price statistics
    Show {
        id: i64,

        /// Number of checks to show, newest first
        #[arg(long, default_value_t = DEFAULT_HISTORY_LIMIT)]
        limit: i64,
    },
    /// Set an item's locator; an empty query restores automatic detection
    SetLocator {
        id: i64,

        query: String,

        /// How to read the query: css or xpath
        #[arg(long, default_value = "css")]
        locator_kind: String,

        /// Run a check right after saving
        #[arg(long)]
        check: bool,
    },
    /// Stop tracking an item and delete its history
    Remove { id: i64 },
}

fn parse_kind(kind: &str) -> anyhow::Result<LocatorKind> {
    LocatorKind::from_str(kind).map_err(|e| anyhow::anyhow!("{e}"))
}

fn not_found(id: i64) -> impl FnOnce(DbError) -> anyhow::Error {
    move |e| match e {
        DbError::NotFound => anyhow::anyhow!("item {id} not found"),
        other => other.into(),
    }
}

fn price_or_dash(currency: &str, price: Option<Decimal>) -> String {
    price.map_or_else(|| "-".to_string(), |p| format_amount(currency, p))
}

pub(crate) async fn run_items(
    pool: &PgPool,
    config: &AppConfig,
    command: ItemsCommands,
    notifier: &dyn Notifier,
) -> anyhow::Result<()> {
    match command {
        ItemsCommands::Add {
            url,
            name,
            locator,
            locator_kind,
        } => {
            add_item(
                pool,
                config,
                &url,
                name.as_deref(),
                locator.as_deref().unwrap_or_default(),
                &locator_kind,
                notifier,
            )
            .await
        }
        ItemsCommands::List => list(pool).await,
        ItemsCommands::Show { id, limit } => show(pool, id, limit).await,
        ItemsCommands::SetLocator {
            id,
            query,
            locator_kind,
            check,
        } => {
            let kind = parse_kind(&locator_kind)?;
            pricewatch_db::update_item_locator(pool, id, &query, kind)
                .await
                .map_err(not_found(id))?;
            if query.trim().is_empty() {
                println!("item {id}: locator cleared, using automatic detection");
            } else {
                println!("item {id}: locator set ({kind})");
            }
            if check {
                report_single_check(pool, config, id, notifier).await?;
            }
            Ok(())
        }
        ItemsCommands::Remove { id } => {
            pricewatch_db::delete_item(pool, id)
                .await
                .map_err(not_found(id))?;
            println!("item {id} removed");
            Ok(())
        }
    }
}

async fn add_item(
    pool: &PgPool,
    config: &AppConfig,
    url: &str,
    name: Option<&str>,
    locator: &str,
    locator_kind: &str,
    notifier: &dyn Notifier,
) -> anyhow::Result<()> {
    let kind = parse_kind(locator_kind)?;
    let target = pricewatch_scraper::client::page_url(url)?;

    let name = match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => name.to_owned(),
        None => {
            let client = build_page_client(config)?;
            client
                .detect_name(target.as_str())
                .await
                .unwrap_or_else(|| UNTITLED_ITEM.to_owned())
        }
    };

    let item = pricewatch_db::create_item(
        pool,
        &NewItem {
            name: &name,
            url: target.as_str(),
            locator,
            locator_kind: kind,
        },
    )
    .await
    .context("failed to store item")?;
    tracing::info!(item_id = item.id, url = %item.url, "item added");
    println!("added item {}: {}", item.id, item.name);

    report_single_check(pool, config, item.id, notifier).await
}

async fn report_single_check(
    pool: &PgPool,
    config: &AppConfig,
    id: i64,
    notifier: &dyn Notifier,
) -> anyhow::Result<()> {
    let totals = run_checks(pool, config, Some(id), notifier).await?;
    let latest = pricewatch_db::get_item_history(pool, id, 1).await?;
    let item = pricewatch_db::get_item(pool, id).await.map_err(not_found(id))?;
    match latest.first() {
        Some(check) if check.success => {
            println!("current price: {}", price_or_dash(&item.currency, check.price));
        }
        Some(check) => println!(
            "check failed: {}",
            check.error.as_deref().unwrap_or("unknown error")
        ),
        None => println!("no check recorded"),
    }
    if totals.db_errors > 0 {
        anyhow::bail!("check result for item {id} could not be recorded");
    }
    Ok(())
}

async fn list(pool: &PgPool) -> anyhow::Result<()> {
    let items = pricewatch_db::list_items_with_stats(pool).await?;
    if items.is_empty() {
        println!("no items tracked yet; add one with `pricewatch items add <url>`");
        return Ok(());
    }
    for item in &items {
        let checked = item
            .latest_checked_at
            .map_or_else(|| "never".to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string());
        println!(
            "{:>4}  {:<40}  latest {:>12}  lowest {:>12}  checked {}",
            item.id,
            item.name,
            price_or_dash(&item.currency, item.latest_price),
            price_or_dash(&item.currency, item.lowest_price),
            checked
        );
    }
    Ok(())
}

async fn show(pool: &PgPool, id: i64, limit: i64) -> anyhow::Result<()> {
    let item = pricewatch_db::get_item(pool, id)
        .await
        .map_err(not_found(id))?;
    let stats = pricewatch_db::get_item_stats(pool, id).await?;
    let history = pricewatch_db::get_item_history(pool, id, limit).await?;

    println!("{} (#{})", item.name, item.id);
    println!("url:      {}", item.url);
    if item.locator.is_empty() {
        println!("locator:  automatic");
    } else {
        println!("locator:  {} ({})", item.locator, item.locator_kind);
    }
    println!(
        "checks:   {} ({} successful)",
        stats.check_count, stats.success_count
    );
    println!(
        "price:    latest {}  lowest {}  highest {}",
        price_or_dash(&item.currency, stats.latest_price),
        price_or_dash(&item.currency, stats.lowest_price),
        price_or_dash(&item.currency, stats.highest_price)
    );

    for check in &history {
        let when = check.checked_at.format("%Y-%m-%d %H:%M");
        if check.success {
            println!("  {when}  {}", price_or_dash(&item.currency, check.price));
        } else {
            println!(
                "  {when}  failed: {}",
                check.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
    Ok(())
}
