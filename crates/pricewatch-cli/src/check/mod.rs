//! `check` command and the shared entry point used by `items` and the
//! scheduler.

mod runner;

use std::time::Duration;

use anyhow::Context;
use pricewatch_core::AppConfig;
use pricewatch_scraper::{Extractor, PageClient};
use sqlx::PgPool;

use crate::notify::{notify_best_effort, Notifier};

pub(crate) use runner::{CheckTotals, PriceChange};
use runner::{run_price_checks, CheckContext};

pub(crate) fn build_page_client(config: &AppConfig) -> anyhow::Result<PageClient> {
    PageClient::new(config.request_timeout_secs, &config.user_agent)
        .context("failed to build page client")
}

/// Checks one item (`item_filter`) or every item, records the results, and
/// sends any price changes to `notifier`.
///
/// # Errors
///
/// Returns an error if the items cannot be loaded or the page client cannot
/// be built. Per-item failures are counted in the totals instead.
pub(crate) async fn run_checks(
    pool: &PgPool,
    config: &AppConfig,
    item_filter: Option<i64>,
    notifier: &dyn Notifier,
) -> anyhow::Result<CheckTotals> {
    let items = match item_filter {
        Some(id) => vec![pricewatch_db::get_item(pool, id)
            .await
            .with_context(|| format!("item {id} not found"))?],
        None => pricewatch_db::list_items(pool).await?,
    };
    if items.is_empty() {
        tracing::info!("no items to check");
        return Ok(CheckTotals::default());
    }

    let client = build_page_client(config)?;
    let extractor = Extractor::default();
    let ctx = CheckContext {
        pool,
        client: &client,
        extractor: &extractor,
        item_timeout: Duration::from_secs(config.item_timeout_secs),
    };

    let totals = run_price_checks(&ctx, &items, config.max_concurrent_checks).await;
    notify_best_effort(notifier, &totals.changes).await;
    Ok(totals)
}

/// Handler for `pricewatch check`.
pub(crate) async fn run_check_command(
    pool: &PgPool,
    config: &AppConfig,
    item_filter: Option<i64>,
    notifier: &dyn Notifier,
) -> anyhow::Result<()> {
    let totals = run_checks(pool, config, item_filter, notifier).await?;
    println!(
        "checked {} items: {} succeeded, {} failed, {} price changes",
        totals.checked,
        totals.succeeded,
        totals.failed,
        totals.changes.len()
    );
    if !totals.changes.is_empty() {
        println!("{}", crate::notify::render_plain_text(&totals.changes));
    }
    Ok(())
}
