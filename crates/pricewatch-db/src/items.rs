//! Database operations for the `items` table.

use chrono::{DateTime, Utc};
use pricewatch_core::LocatorKind;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

/// Width of the `items.currency` column.
pub const MAX_CURRENCY_CHARS: usize = 8;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `items` table.
///
/// `locator` is empty when the item relies on automatic detection.
/// `locator_kind` is stored as text and validated when a check runs.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ItemRow {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub locator: String,
    pub locator_kind: String,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

/// An item joined with its latest successful and lowest recorded price.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ItemSummaryRow {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub locator: String,
    pub locator_kind: String,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub latest_price: Option<Decimal>,
    pub latest_checked_at: Option<DateTime<Utc>>,
    pub lowest_price: Option<Decimal>,
}

/// Fields for a new item.
#[derive(Debug, Clone, Copy)]
pub struct NewItem<'a> {
    pub name: &'a str,
    pub url: &'a str,
    pub locator: &'a str,
    pub locator_kind: LocatorKind,
}

const ITEM_COLUMNS: &str = "id, name, url, locator, locator_kind, currency, created_at";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Inserts an item and returns the stored row. The currency starts at the
/// column default until a successful check detects one.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_item(pool: &PgPool, item: &NewItem<'_>) -> Result<ItemRow, DbError> {
    let row = sqlx::query_as::<_, ItemRow>(&format!(
        "INSERT INTO items (name, url, locator, locator_kind) \
         VALUES ($1, $2, $3, $4) \
         RETURNING {ITEM_COLUMNS}"
    ))
    .bind(item.name)
    .bind(item.url)
    .bind(item.locator.trim())
    .bind(item.locator_kind.as_str())
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Returns a single item by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no item has that id, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_item(pool: &PgPool, item_id: i64) -> Result<ItemRow, DbError> {
    sqlx::query_as::<_, ItemRow>(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = $1"))
        .bind(item_id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// Returns all items, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_items(pool: &PgPool) -> Result<Vec<ItemRow>, DbError> {
    let rows = sqlx::query_as::<_, ItemRow>(&format!(
        "SELECT {ITEM_COLUMNS} FROM items ORDER BY id"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns all items with their latest successful price and the lowest
/// price ever recorded, oldest item first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_items_with_stats(pool: &PgPool) -> Result<Vec<ItemSummaryRow>, DbError> {
    let rows = sqlx::query_as::<_, ItemSummaryRow>(
        "SELECT i.id, i.name, i.url, i.locator, i.locator_kind, i.currency, i.created_at, \
                latest.price AS latest_price, latest.checked_at AS latest_checked_at, \
                lowest.price AS lowest_price \
         FROM items i \
         LEFT JOIN LATERAL ( \
             SELECT pc.price, pc.checked_at \
             FROM price_checks pc \
             WHERE pc.item_id = i.id AND pc.success \
             ORDER BY pc.checked_at DESC, pc.id DESC \
             LIMIT 1 \
         ) latest ON TRUE \
         LEFT JOIN LATERAL ( \
             SELECT MIN(pc.price) AS price \
             FROM price_checks pc \
             WHERE pc.item_id = i.id AND pc.success \
         ) lowest ON TRUE \
         ORDER BY i.id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Replaces an item's locator and its kind. An empty `locator` switches the
/// item back to automatic detection.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no item has that id, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_item_locator(
    pool: &PgPool,
    item_id: i64,
    locator: &str,
    locator_kind: LocatorKind,
) -> Result<(), DbError> {
    let rows_affected = sqlx::query(
        "UPDATE items \
         SET locator = $1, locator_kind = $2 \
         WHERE id = $3",
    )
    .bind(locator.trim())
    .bind(locator_kind.as_str())
    .bind(item_id)
    .execute(pool)
    .await?
    .rows_affected();

    if rows_affected == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Stores the currency detected by a check, cut to the column width.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no item has that id, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_item_currency(
    pool: &PgPool,
    item_id: i64,
    currency: &str,
) -> Result<(), DbError> {
    let rows_affected = sqlx::query("UPDATE items SET currency = $1 WHERE id = $2")
        .bind(truncate_currency(currency))
        .bind(item_id)
        .execute(pool)
        .await?
        .rows_affected();

    if rows_affected == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Deletes an item; its price checks go with it.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no item has that id, or
/// [`DbError::Sqlx`] if the delete fails.
pub async fn delete_item(pool: &PgPool, item_id: i64) -> Result<(), DbError> {
    let rows_affected = sqlx::query("DELETE FROM items WHERE id = $1")
        .bind(item_id)
        .execute(pool)
        .await?
        .rows_affected();

    if rows_affected == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

pub(crate) fn truncate_currency(currency: &str) -> String {
    currency.trim().chars().take(MAX_CURRENCY_CHARS).collect()
}
