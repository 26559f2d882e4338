pub mod bids;
pub mod health;
pub mod listings;
pub mod outbox;
pub mod sweep;

use crate::db::Repository;
use crate::notify::Notifier;
use crate::orchestration::{Auctioneer, SettlementSweeper};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub auctioneer: Arc<Auctioneer>,
    pub sweeper: Arc<SettlementSweeper>,
    pub notifier: Arc<dyn Notifier>,
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/bids", post(bids::submit_bid))
        .route("/v1/listings", post(listings::create_listing))
        .route("/v1/listings/:id", get(listings::get_listing))
        .route("/v1/listings/:id/relist", post(listings::relist_listing))
        .route(
            "/v1/listings/:id/reconcile",
            post(listings::reconcile_listing),
        )
        .route("/v1/sweep", post(sweep::run_sweep))
        .route("/v1/outbox", get(outbox::get_unsent))
        .route("/v1/outbox/:id/sent", post(outbox::mark_sent))
        .layer(cors)
        .with_state(state)
}
