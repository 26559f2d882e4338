use axum::http::StatusCode;
use proxybid::api::{self, AppState};
use proxybid::config::Config;
use proxybid::db::init_db;
use proxybid::domain::{Amount, TimeMs, UserId};
use proxybid::notify::OutboxNotifier;
use proxybid::orchestration::{Auctioneer, ListingLocks, SettlementSweeper};
use proxybid::Repository;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

fn amt(s: &str) -> Amount {
    Amount::from_str_canonical(s).unwrap()
}

fn test_config() -> Config {
    Config {
        port: 0,
        database_path: ":memory:".to_string(),
        bid_increment: amt("5"),
        sweep_interval_secs: 0,
        storage_timeout_ms: 5000,
        lock_wait_ms: 2000,
        retry_max_elapsed_ms: 500,
    }
}

async fn setup_test_app() -> (axum::Router, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();

    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(Repository::new(pool));
    let notifier = Arc::new(OutboxNotifier::new(repo.clone()));
    let locks = Arc::new(ListingLocks::new());
    let config = test_config();
    let auctioneer = Arc::new(Auctioneer::new(
        repo.clone(),
        notifier.clone(),
        locks.clone(),
        &config,
    ));
    let sweeper = Arc::new(SettlementSweeper::new(
        repo.clone(),
        notifier.clone(),
        locks,
        &config,
    ));
    let state = AppState {
        repo,
        auctioneer,
        sweeper,
        notifier,
    };

    (api::create_router(state), temp_dir)
}

async fn request(app: axum::Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let request = axum::http::Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    (status, body.to_vec())
}

async fn post_json(app: axum::Router, uri: &str, body: &Value) -> (StatusCode, Vec<u8>) {
    let request = axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(axum::body::Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    (status, body.to_vec())
}

async fn create_listing(
    app: &axum::Router,
    seller: UserId,
    price: &str,
    expires_at_ms: i64,
) -> Value {
    let (status, body) = post_json(
        app.clone(),
        "/v1/listings",
        &json!({
            "sellerId": seller,
            "title": "Cast iron skillet",
            "price": amt(price),
            "expiresAtMs": expires_at_ms,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_slice(&body).unwrap()
}

async fn submit_bid(app: &axum::Router, listing_id: &Value, bidder: UserId, maximum: f64) {
    let (status, _) = post_json(
        app.clone(),
        "/v1/bids",
        &json!({"listingId": listing_id, "bidderId": bidder, "maximumBid": maximum}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

async fn sweep_at(app: &axum::Router, now_ms: i64) -> Value {
    let (status, body) = post_json(app.clone(), "/v1/sweep", &json!({"nowMs": now_ms})).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_sweep_with_no_candidates_is_empty() {
    let (app, _temp) = setup_test_app().await;

    let report = sweep_at(&app, TimeMs::now().as_ms()).await;

    assert_eq!(report["sold"], json!(0));
    assert_eq!(report["expiredNoBids"], json!(0));
    assert_eq!(report["alreadySettled"], json!(0));
    assert_eq!(report["failed"], json!(0));
    assert_eq!(report["outcomes"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_unbid_listing_expires() {
    let (app, _temp) = setup_test_app().await;
    let seller = UserId::new();
    let expiry = TimeMs::now().as_ms() + 60_000;
    let listing = create_listing(&app, seller, "100", expiry).await;

    let report = sweep_at(&app, expiry + 1_000).await;

    assert_eq!(report["expiredNoBids"], json!(1));
    let outcomes = report["outcomes"].as_array().unwrap();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0]["listingId"], listing["id"]);
    assert_eq!(outcomes[0]["disposition"], json!("expired_no_bids"));

    let uri = format!("/v1/listings/{}", listing["id"].as_str().unwrap());
    let (_, body) = request(app.clone(), &uri).await;
    let fetched: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(fetched["status"], json!("expired"));
    assert!(fetched.get("saleBuyerId").is_none());
}

#[tokio::test]
async fn test_winner_pays_visible_price_not_ceiling() {
    let (app, _temp) = setup_test_app().await;
    let seller = UserId::new();
    let alice = UserId::new();
    let bob = UserId::new();
    let expiry = TimeMs::now().as_ms() + 60_000;
    let listing = create_listing(&app, seller, "100", expiry).await;

    // alice's 120 absorbs bob's 105; the price stops at 110
    submit_bid(&app, &listing["id"], alice, 120.0).await;
    submit_bid(&app, &listing["id"], bob, 105.0).await;

    let settle_time = expiry + 1_000;
    let report = sweep_at(&app, settle_time).await;

    assert_eq!(report["sold"], json!(1));
    assert_eq!(report["sweptAt"], json!(settle_time));
    let outcomes = report["outcomes"].as_array().unwrap();
    assert_eq!(outcomes[0]["disposition"], json!("sold"));
    assert_eq!(outcomes[0]["buyerId"], json!(alice));
    assert_eq!(outcomes[0]["amount"], json!(110.0));

    let uri = format!("/v1/listings/{}", listing["id"].as_str().unwrap());
    let (_, body) = request(app.clone(), &uri).await;
    let fetched: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(fetched["status"], json!("sold"));
    assert_eq!(fetched["saleBuyerId"], json!(alice));
    assert_eq!(fetched["saleAmount"], json!(110.0));
    assert_eq!(fetched["saleDateMs"], json!(settle_time));
    // settled rows are terminal, so the public ledger shows none
    assert_eq!(fetched["bids"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_second_sweep_changes_nothing() {
    let (app, _temp) = setup_test_app().await;
    let seller = UserId::new();
    let alice = UserId::new();
    let expiry = TimeMs::now().as_ms() + 60_000;
    let listing = create_listing(&app, seller, "100", expiry).await;
    submit_bid(&app, &listing["id"], alice, 120.0).await;

    let first = expiry + 1_000;
    let report = sweep_at(&app, first).await;
    assert_eq!(report["sold"], json!(1));

    // the listing is no longer active, so a later sweep has no candidates
    let report = sweep_at(&app, first + 60_000).await;
    assert_eq!(report["sold"], json!(0));
    assert_eq!(report["outcomes"].as_array().unwrap().len(), 0);

    let uri = format!("/v1/listings/{}", listing["id"].as_str().unwrap());
    let (_, body) = request(app.clone(), &uri).await;
    let fetched: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(fetched["saleDateMs"], json!(first));
}

#[tokio::test]
async fn test_sweep_settles_each_listing_independently() {
    let (app, _temp) = setup_test_app().await;
    let seller = UserId::new();
    let alice = UserId::new();
    let expiry = TimeMs::now().as_ms() + 60_000;
    let with_bid = create_listing(&app, seller, "100", expiry).await;
    let without_bid = create_listing(&app, seller, "80", expiry).await;
    let still_open = create_listing(&app, seller, "50", expiry + 3_600_000).await;
    submit_bid(&app, &with_bid["id"], alice, 150.0).await;

    let report = sweep_at(&app, expiry + 1_000).await;

    assert_eq!(report["sold"], json!(1));
    assert_eq!(report["expiredNoBids"], json!(1));
    assert_eq!(report["outcomes"].as_array().unwrap().len(), 2);

    // the listing that has not expired yet is untouched
    let uri = format!("/v1/listings/{}", still_open["id"].as_str().unwrap());
    let (_, body) = request(app.clone(), &uri).await;
    let fetched: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(fetched["status"], json!("active"));
    let _ = without_bid;
}

#[tokio::test]
async fn test_outbox_collects_and_acknowledges_notifications() {
    let (app, _temp) = setup_test_app().await;
    let seller = UserId::new();
    let alice = UserId::new();
    let expiry = TimeMs::now().as_ms() + 60_000;
    let listing = create_listing(&app, seller, "100", expiry).await;
    submit_bid(&app, &listing["id"], alice, 120.0).await;
    sweep_at(&app, expiry + 1_000).await;

    let (status, body) = request(app.clone(), "/v1/outbox").await;
    assert_eq!(status, StatusCode::OK);
    let entries: Value = serde_json::from_slice(&body).unwrap();
    let entries = entries.as_array().unwrap();
    let kinds: Vec<&str> = entries
        .iter()
        .map(|entry| entry["kind"].as_str().unwrap())
        .collect();
    assert!(kinds.contains(&"new_bid"));
    assert!(kinds.contains(&"auction_sold"));
    assert!(kinds.contains(&"auction_won"));

    let won = entries
        .iter()
        .find(|entry| entry["kind"] == json!("auction_won"))
        .unwrap();
    assert_eq!(won["userId"], json!(alice));
    assert_eq!(won["metadata"]["listingId"], listing["id"]);

    // acknowledge one entry; the second acknowledgement finds nothing
    let first_id = entries[0]["id"].as_i64().unwrap();
    let uri = format!("/v1/outbox/{}/sent", first_id);
    let (status, body) = post_json(app.clone(), &uri, &json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let ack: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(ack["acknowledged"], json!(true));

    let (status, _) = post_json(app.clone(), &uri, &json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = request(app.clone(), "/v1/outbox").await;
    let remaining: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(remaining.as_array().unwrap().len(), entries.len() - 1);
}

#[tokio::test]
async fn test_sweep_accepts_empty_body() {
    let (app, _temp) = setup_test_app().await;

    // no body at all: the sweeper falls back to the wall clock
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/v1/sweep")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
