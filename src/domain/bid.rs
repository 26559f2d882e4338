//! Bid type: one ledger row per (listing, bidder) maximum bid.

use crate::domain::{Amount, BidId, ListingId, TimeMs, UserId};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a bid row.
///
/// A row leaves `Active` exactly once, at settlement or relist, and never
/// returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BidStatus {
    /// Bid participates in the live auction.
    Active,
    /// Bid won settlement.
    Won,
    /// Bid lost settlement.
    Lost,
    /// Bid was voided because the seller relisted.
    CancelledDueToRelist,
}

impl BidStatus {
    /// Canonical string form, as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            BidStatus::Active => "active",
            BidStatus::Won => "won",
            BidStatus::Lost => "lost",
            BidStatus::CancelledDueToRelist => "cancelled_due_to_relist",
        }
    }

    /// Parse the canonical string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(BidStatus::Active),
            "won" => Some(BidStatus::Won),
            "lost" => Some(BidStatus::Lost),
            "cancelled_due_to_relist" => Some(BidStatus::CancelledDueToRelist),
            _ => None,
        }
    }
}

impl std::fmt::Display for BidStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One bidder's standing in one auction.
///
/// `amount` is what the proxy engine has revealed of this bidder's ceiling;
/// it never exceeds `maximum_bid`. Re-bidding updates the row in place, so a
/// (listing, bidder) pair holds at most one active row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    /// Stable unique identifier.
    pub id: BidId,
    /// Auction this bid belongs to.
    pub listing_id: ListingId,
    /// Who placed it.
    pub bidder_id: UserId,
    /// Visible contribution of this row.
    pub amount: Amount,
    /// Private ceiling. Strictly increases across accepted re-bids.
    pub maximum_bid: Amount,
    /// Increment in force when the row was written.
    pub bid_increment: Amount,
    /// Lifecycle status.
    pub status: BidStatus,
    /// First acceptance time. Immutable; breaks maximum-bid ties.
    pub created_at: TimeMs,
    /// Last accepted re-bid.
    pub updated_at: TimeMs,
}

impl Bid {
    /// Create a fresh active bid row.
    pub fn new(
        listing_id: ListingId,
        bidder_id: UserId,
        amount: Amount,
        maximum_bid: Amount,
        bid_increment: Amount,
        created_at: TimeMs,
    ) -> Self {
        Bid {
            id: BidId::new(),
            listing_id,
            bidder_id,
            amount,
            maximum_bid,
            bid_increment,
            status: BidStatus::Active,
            created_at,
            updated_at: created_at,
        }
    }
}
