//! Denormalized-cache auditing.
//!
//! `listings.current_bid` / `listings.highest_bidder_id` are a cache of the
//! bid ledger. This module recomputes what they should be so drift can be
//! detected and repaired.

use crate::domain::{leader, Amount, Bid, Listing, ListingId, UserId};
use serde::{Deserialize, Serialize};

/// What the listing cache should hold, derived from active ledger rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExpectedCache {
    pub current_bid: Option<Amount>,
    pub highest_bidder_id: Option<UserId>,
}

impl ExpectedCache {
    /// Derive the expected cache from a listing's active bids.
    pub fn from_active_bids(active_bids: &[Bid]) -> Self {
        match leader(active_bids) {
            Some(top) => ExpectedCache {
                current_bid: Some(top.amount),
                highest_bidder_id: Some(top.bidder_id),
            },
            None => ExpectedCache::default(),
        }
    }
}

/// Outcome of comparing a listing row against its ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheAudit {
    pub listing_id: ListingId,
    /// True when the stored cache already matched the ledger.
    pub consistent: bool,
    pub expected_current_bid: Option<Amount>,
    pub expected_highest_bidder_id: Option<UserId>,
    pub found_current_bid: Option<Amount>,
    pub found_highest_bidder_id: Option<UserId>,
}

/// Compare a listing's stored cache with what its active bids imply.
pub fn audit_cache(listing: &Listing, active_bids: &[Bid]) -> CacheAudit {
    let expected = ExpectedCache::from_active_bids(active_bids);
    let consistent = listing.current_bid == expected.current_bid
        && listing.highest_bidder_id == expected.highest_bidder_id;

    CacheAudit {
        listing_id: listing.id,
        consistent,
        expected_current_bid: expected.current_bid,
        expected_highest_bidder_id: expected.highest_bidder_id,
        found_current_bid: listing.current_bid,
        found_highest_bidder_id: listing.highest_bidder_id,
    }
}
