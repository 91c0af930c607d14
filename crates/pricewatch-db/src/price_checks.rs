//! Database operations for the `price_checks` table.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::items::truncate_currency;
use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `price_checks` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PriceCheckRow {
    pub id: i64,
    pub item_id: i64,
    /// Set exactly when `success` is true.
    pub price: Option<Decimal>,
    pub raw_text: Option<String>,
    pub success: bool,
    /// User-facing failure message.
    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
}

/// Outcome of one check, ready to be recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewPriceCheck {
    pub price: Option<Decimal>,
    pub raw_text: Option<String>,
    pub success: bool,
    pub error: Option<String>,
}

/// Aggregates over an item's check history.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ItemStats {
    pub check_count: i64,
    pub success_count: i64,
    pub lowest_price: Option<Decimal>,
    pub highest_price: Option<Decimal>,
    pub latest_price: Option<Decimal>,
    pub latest_checked_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Records a check for `item_id` and returns the stored row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails, including when the item
/// does not exist or a successful check carries no price.
pub async fn insert_price_check(
    pool: &PgPool,
    item_id: i64,
    check: &NewPriceCheck,
) -> Result<PriceCheckRow, DbError> {
    let row = sqlx::query_as::<_, PriceCheckRow>(
        "INSERT INTO price_checks (item_id, price, raw_text, success, error) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id, item_id, price, raw_text, success, error, checked_at",
    )
    .bind(item_id)
    .bind(check.price)
    .bind(&check.raw_text)
    .bind(check.success)
    .bind(&check.error)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Records a check and, when `currency` is given, stores it on the item.
///
/// Both writes run in one transaction so a check is never kept without its
/// currency update.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the item does not exist, or
/// [`DbError::Sqlx`] if either write fails.
pub async fn record_price_check(
    pool: &PgPool,
    item_id: i64,
    check: &NewPriceCheck,
    currency: Option<&str>,
) -> Result<PriceCheckRow, DbError> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, PriceCheckRow>(
        "INSERT INTO price_checks (item_id, price, raw_text, success, error) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id, item_id, price, raw_text, success, error, checked_at",
    )
    .bind(item_id)
    .bind(check.price)
    .bind(&check.raw_text)
    .bind(check.success)
    .bind(&check.error)
    .fetch_one(&mut *tx)
    .await?;

    if let Some(currency) = currency {
        let rows_affected = sqlx::query("UPDATE items SET currency = $1 WHERE id = $2")
            .bind(truncate_currency(currency))
            .bind(item_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if rows_affected == 0 {
            return Err(DbError::NotFound);
        }
    }

    tx.commit().await?;
    Ok(row)
}

/// Returns the price of the most recent successful check, if any.
///
/// Ordered by `checked_at DESC, id DESC` so that the first row is always the
/// latest, even when multiple checks share the same timestamp.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_latest_successful_price(
    pool: &PgPool,
    item_id: i64,
) -> Result<Option<Decimal>, DbError> {
    let price = sqlx::query_scalar::<_, Option<Decimal>>(
        "SELECT price \
         FROM price_checks \
         WHERE item_id = $1 AND success \
         ORDER BY checked_at DESC, id DESC \
         LIMIT 1",
    )
    .bind(item_id)
    .fetch_optional(pool)
    .await?
    .flatten();

    Ok(price)
}

/// Returns up to `limit` checks for an item, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_item_history(
    pool: &PgPool,
    item_id: i64,
    limit: i64,
) -> Result<Vec<PriceCheckRow>, DbError> {
    let rows = sqlx::query_as::<_, PriceCheckRow>(
        "SELECT id, item_id, price, raw_text, success, error, checked_at \
         FROM price_checks \
         WHERE item_id = $1 \
         ORDER BY checked_at DESC, id DESC \
         LIMIT $2",
    )
    .bind(item_id)
    .bind(limit.max(0))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns check counts and price extremes for an item. An item without
/// checks yields zero counts and no prices.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_item_stats(pool: &PgPool, item_id: i64) -> Result<ItemStats, DbError> {
    let stats = sqlx::query_as::<_, ItemStats>(
        "SELECT COUNT(*) AS check_count, \
                COUNT(*) FILTER (WHERE success) AS success_count, \
                MIN(price) FILTER (WHERE success) AS lowest_price, \
                MAX(price) FILTER (WHERE success) AS highest_price, \
                ( \
                    SELECT price FROM price_checks \
                    WHERE item_id = $1 AND success \
                    ORDER BY checked_at DESC, id DESC \
                    LIMIT 1 \
                ) AS latest_price, \
                MAX(checked_at) FILTER (WHERE success) AS latest_checked_at \
         FROM price_checks \
         WHERE item_id = $1",
    )
    .bind(item_id)
    .fetch_one(pool)
    .await?;

    Ok(stats)
}
