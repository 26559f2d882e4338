use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::domain::{Amount, ListingId, UserId};
use crate::error::BidError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBidRequest {
    pub listing_id: ListingId,
    pub bidder_id: UserId,
    /// The bidder's private ceiling, not the amount shown on the listing.
    pub maximum_bid: Amount,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBidResponse {
    pub visible_bid: Amount,
    pub is_now_highest_bidder: bool,
}

pub async fn submit_bid(
    State(state): State<AppState>,
    Json(req): Json<SubmitBidRequest>,
) -> Result<Json<SubmitBidResponse>, BidError> {
    let receipt = state
        .auctioneer
        .submit_bid(req.listing_id, req.bidder_id, req.maximum_bid)
        .await?;

    Ok(Json(SubmitBidResponse {
        visible_bid: receipt.visible_bid,
        is_now_highest_bidder: receipt.is_now_highest_bidder,
    }))
}
