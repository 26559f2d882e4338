//! Stable bid ranking for deterministic auction resolution.

use crate::domain::Bid;
use std::cmp::Reverse;

/// Stable ranking key for active bids.
///
/// Ensures deterministic resolution when maxima collide.
/// Ordering: maximum_bid (descending) -> created_at -> bid id
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct BidRank {
    /// Private ceiling, highest first (primary sort).
    pub ceiling: Reverse<crate::domain::Amount>,
    /// First acceptance time, earliest first (tie-break).
    pub created_at: crate::domain::TimeMs,
    /// Bid id (final stable tie-break).
    pub id: crate::domain::BidId,
}

impl BidRank {
    /// Create a ranking key from a Bid.
    pub fn from_bid(bid: &Bid) -> Self {
        BidRank {
            ceiling: Reverse(bid.maximum_bid),
            created_at: bid.created_at,
            id: bid.id,
        }
    }

    /// Compare two bids for rank.
    ///
    /// Returns true if `a` outranks `b` (would beat it at settlement).
    pub fn outranks(a: &Bid, b: &Bid) -> bool {
        Self::from_bid(a) < Self::from_bid(b)
    }
}

/// Sort bids best-ranked first.
pub fn sort_bids_by_rank(bids: &mut [Bid]) {
    bids.sort_by_key(BidRank::from_bid);
}

/// The best-ranked bid of a slice, if any.
pub fn leader(bids: &[Bid]) -> Option<&Bid> {
    bids.iter().min_by_key(|bid| BidRank::from_bid(bid))
}
