use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::domain::{
    Amount, Bid, ChangeEvent, ChangeKind, Listing, ListingId, ListingStatus, TimeMs, UserId,
};
use crate::engine::CacheAudit;
use crate::error::{AppError, ReconcileError, RelistError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateListingRequest {
    pub seller_id: UserId,
    pub title: String,
    pub price: Amount,
    pub expires_at_ms: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelistRequest {
    pub seller_id: UserId,
    pub expires_at_ms: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelistResponse {
    pub new_listing_id: ListingId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingDto {
    pub id: ListingId,
    pub seller_id: UserId,
    pub title: String,
    pub price: Amount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_bid: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highest_bidder_id: Option<UserId>,
    pub expires_at_ms: i64,
    pub status: ListingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale_buyer_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale_amount: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale_date_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relisted_from: Option<ListingId>,
    pub created_at_ms: i64,
}

impl From<&Listing> for ListingDto {
    fn from(listing: &Listing) -> Self {
        ListingDto {
            id: listing.id,
            seller_id: listing.seller_id,
            title: listing.title.clone(),
            price: listing.price,
            current_bid: listing.current_bid,
            highest_bidder_id: listing.highest_bidder_id,
            expires_at_ms: listing.expires_at.as_ms(),
            status: listing.status,
            sale_buyer_id: listing.sale_buyer_id,
            sale_amount: listing.sale_amount,
            sale_date_ms: listing.sale_date.map(|t| t.as_ms()),
            relisted_from: listing.relisted_from,
            created_at_ms: listing.created_at.as_ms(),
        }
    }
}

/// Bid row as anyone may see it. Private maxima stay private: there is no
/// ceiling field here at all.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicBidDto {
    pub bidder_id: UserId,
    pub amount: Amount,
    pub created_at_ms: i64,
}

impl From<&Bid> for PublicBidDto {
    fn from(bid: &Bid) -> Self {
        PublicBidDto {
            bidder_id: bid.bidder_id,
            amount: bid.amount,
            created_at_ms: bid.created_at.as_ms(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingResponse {
    #[serde(flatten)]
    pub listing: ListingDto,
    /// Active bids, best-ranked first.
    pub bids: Vec<PublicBidDto>,
}

pub async fn create_listing(
    State(state): State<AppState>,
    Json(req): Json<CreateListingRequest>,
) -> Result<Json<ListingDto>, AppError> {
    let title = req.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::BadRequest("title must not be empty".into()));
    }
    if !req.price.is_positive() {
        return Err(AppError::BadRequest("price must be greater than zero".into()));
    }
    let now = TimeMs::now();
    if req.expires_at_ms <= now.as_ms() {
        return Err(AppError::BadRequest("expiresAtMs must be in the future".into()));
    }

    let listing = Listing::new(
        req.seller_id,
        title,
        req.price,
        TimeMs::new(req.expires_at_ms),
        now,
    );
    state.repo.insert_listing(&listing).await?;
    state
        .notifier
        .publish_change(ChangeEvent::listing(ChangeKind::Insert, listing.id));

    tracing::info!(listing_id = %listing.id, seller_id = %listing.seller_id, "listing created");
    Ok(Json(ListingDto::from(&listing)))
}

pub async fn get_listing(
    State(state): State<AppState>,
    Path(id): Path<ListingId>,
) -> Result<Json<ListingResponse>, AppError> {
    let listing = state
        .repo
        .get_listing(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Listing {} not found", id)))?;

    let bids = state
        .repo
        .active_bids_for_listing(id)
        .await?
        .iter()
        .map(PublicBidDto::from)
        .collect();

    Ok(Json(ListingResponse {
        listing: ListingDto::from(&listing),
        bids,
    }))
}

pub async fn relist_listing(
    State(state): State<AppState>,
    Path(id): Path<ListingId>,
    Json(req): Json<RelistRequest>,
) -> Result<Json<RelistResponse>, RelistError> {
    let new_listing_id = state
        .auctioneer
        .relist(id, req.seller_id, TimeMs::new(req.expires_at_ms))
        .await?;

    Ok(Json(RelistResponse { new_listing_id }))
}

pub async fn reconcile_listing(
    State(state): State<AppState>,
    Path(id): Path<ListingId>,
) -> Result<Json<CacheAudit>, ReconcileError> {
    let audit = state.auctioneer.reconcile(id).await?;
    Ok(Json(audit))
}
