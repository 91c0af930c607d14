use std::time::Duration;

use chrono::Utc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;

fn item(url: &str, locator: &str) -> ItemRow {
    ItemRow {
        id: 7,
        name: "Desk Lamp".to_string(),
        url: url.to_string(),
        locator: locator.to_string(),
        locator_kind: "css".to_string(),
        currency: "$".to_string(),
        created_at: Utc::now(),
    }
}

fn found(cents: i64, currency: Option<&str>) -> ExtractionResult {
    ExtractionResult::found(
        Decimal::new(cents, 2),
        format!("{cents}"),
        currency.map(str::to_owned),
    )
}

// ---------------------------------------------------------------------------
// detect_change
// ---------------------------------------------------------------------------

#[test]
fn lower_price_is_a_change() {
    let change = detect_change(
        &item("https://shop.example.com/lamp", ""),
        Some(Decimal::new(4990, 2)),
        &found(3999, Some("EUR")),
    )
    .expect("expected a change");
    assert_eq!(change.direction, PriceDirection::Lower);
    assert_eq!(change.previous, Decimal::new(4990, 2));
    assert_eq!(change.current, Decimal::new(3999, 2));
    assert_eq!(change.currency, "EUR");
}

#[test]
fn item_currency_is_used_when_none_detected() {
    let change = detect_change(
        &item("https://shop.example.com/lamp", ""),
        Some(Decimal::new(100, 2)),
        &found(200, None),
    )
    .unwrap();
    assert_eq!(change.direction, PriceDirection::Higher);
    assert_eq!(change.currency, "$");
}

#[test]
fn no_change_without_history_or_movement() {
    let lamp = item("https://shop.example.com/lamp", "");
    assert_eq!(detect_change(&lamp, None, &found(3999, None)), None);
    assert_eq!(
        detect_change(&lamp, Some(Decimal::new(3999, 2)), &found(3999, None)),
        None
    );
    // Below the change threshold.
    let nearly = ExtractionResult::found(Decimal::new(39_990_000_000_001, 12), String::new(), None);
    assert_eq!(detect_change(&lamp, Some(Decimal::new(3999, 2)), &nearly), None);
}

#[test]
fn failed_check_is_never_a_change() {
    let failed = ExtractionResult::failed(ExtractError::NoPriceFound, None);
    assert_eq!(
        detect_change(
            &item("https://shop.example.com/lamp", ""),
            Some(Decimal::ONE),
            &failed
        ),
        None
    );
}

// ---------------------------------------------------------------------------
// to_new_price_check
// ---------------------------------------------------------------------------

#[test]
fn failed_result_records_message_and_raw_text() {
    let result =
        ExtractionResult::failed(ExtractError::UnparsablePrice, Some("Sold out".to_string()));
    let row = to_new_price_check(&result);
    assert!(!row.success);
    assert_eq!(row.price, None);
    assert_eq!(row.raw_text.as_deref(), Some("Sold out"));
    assert_eq!(
        row.error.as_deref(),
        Some("Could not parse numeric price from matched content.")
    );
}

#[test]
fn successful_result_records_price() {
    let row = to_new_price_check(&found(1250, Some("USD")));
    assert!(row.success);
    assert_eq!(row.price, Some(Decimal::new(1250, 2)));
    assert_eq!(row.error, None);
}

// ---------------------------------------------------------------------------
// check_page
// ---------------------------------------------------------------------------

fn test_client() -> PageClient {
    PageClient::new(5, "pricewatch-test/0.1").expect("failed to build test PageClient")
}

#[tokio::test]
async fn check_page_uses_item_locator() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/lamp"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><span class="price">$10.00</span><b id="deal">$8.50</b></body></html>"#,
        ))
        .mount(&server)
        .await;

    let lamp = item(&format!("{}/lamp", server.uri()), "#deal");
    let result = check_page(
        &test_client(),
        &Extractor::default(),
        &lamp,
        Duration::from_secs(5),
    )
    .await;
    assert_eq!(result.price, Some(Decimal::new(850, 2)));
}

#[tokio::test]
async fn slow_page_becomes_fetch_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<span class=\"price\">$1.00</span>")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let lamp = item(&server.uri(), "");
    let result = check_page(
        &test_client(),
        &Extractor::default(),
        &lamp,
        Duration::from_secs(1),
    )
    .await;
    assert!(!result.success);
    assert!(
        matches!(&result.error, Some(ExtractError::Fetch(m)) if m.contains("timed out")),
        "unexpected error: {:?}",
        result.error
    );
}

// ---------------------------------------------------------------------------
// run_price_checks (database)
// ---------------------------------------------------------------------------

async fn add_item(pool: &PgPool, name: &str, url: &str) -> i64 {
    pricewatch_db::create_item(
        pool,
        &pricewatch_db::NewItem {
            name,
            url,
            locator: "",
            locator_kind: pricewatch_core::LocatorKind::Css,
        },
    )
    .await
    .unwrap_or_else(|e| panic!("create_item failed for '{name}': {e}"))
    .id
}

async fn mount_lamp_page(server: &MockServer, price: &str) {
    Mock::given(method("GET"))
        .and(path("/lamp"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<html><body><span class="price">${price}</span></body></html>"#
        )))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
}

async fn stored_checks(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM price_checks")
        .fetch_one(pool)
        .await
        .unwrap()
}

#[sqlx::test(migrations = "../../migrations")]
async fn batch_records_every_item_and_reports_changes(pool: PgPool) {
    let server = MockServer::start().await;
    mount_lamp_page(&server, "10.00").await;

    let lamp = add_item(&pool, "Desk Lamp", &format!("{}/lamp", server.uri())).await;
    add_item(&pool, "Old Kettle", &format!("{}/gone", server.uri())).await;
    let items = pricewatch_db::list_items(&pool).await.unwrap();

    let client = test_client();
    let extractor = Extractor::default();
    let ctx = CheckContext {
        pool: &pool,
        client: &client,
        extractor: &extractor,
        item_timeout: Duration::from_secs(5),
    };

    let first = run_price_checks(&ctx, &items, 2).await;
    assert_eq!(first.checked, 2);
    assert_eq!(first.succeeded, 1);
    assert_eq!(first.failed, 1);
    assert_eq!(first.db_errors, 0);
    assert!(first.changes.is_empty());
    assert_eq!(stored_checks(&pool).await, 2);

    server.reset().await;
    mount_lamp_page(&server, "12.50").await;

    let second = run_price_checks(&ctx, &items, 1).await;
    assert_eq!(second.succeeded, 1);
    assert_eq!(second.failed, 1);
    assert_eq!(second.changes.len(), 1);
    let change = &second.changes[0];
    assert_eq!(change.item_id, lamp);
    assert_eq!(change.previous, Decimal::new(1000, 2));
    assert_eq!(change.current, Decimal::new(1250, 2));
    assert_eq!(change.direction, PriceDirection::Higher);
    assert_eq!(stored_checks(&pool).await, 4);
}

#[sqlx::test(migrations = "../../migrations")]
async fn unrecordable_item_is_counted_and_batch_continues(pool: PgPool) {
    let server = MockServer::start().await;
    mount_lamp_page(&server, "10.00").await;

    add_item(&pool, "Desk Lamp", &format!("{}/lamp", server.uri())).await;
    let removed = add_item(&pool, "Spare Lamp", &format!("{}/lamp", server.uri())).await;
    let items = pricewatch_db::list_items(&pool).await.unwrap();
    pricewatch_db::delete_item(&pool, removed).await.unwrap();

    let client = test_client();
    let extractor = Extractor::default();
    let ctx = CheckContext {
        pool: &pool,
        client: &client,
        extractor: &extractor,
        item_timeout: Duration::from_secs(5),
    };

    let totals = run_price_checks(&ctx, &items, 2).await;
    assert_eq!(totals.checked, 2);
    assert_eq!(totals.succeeded, 1);
    assert_eq!(totals.failed, 1);
    assert_eq!(totals.db_errors, 1);
    assert_eq!(stored_checks(&pool).await, 1);
}
