//! Pure computation engine for proxy-bid pricing and cache auditing.

use crate::domain::{Amount, BidId, UserId};

pub mod cache;
pub mod pricer;

pub use cache::{audit_cache, CacheAudit, ExpectedCache};
pub use pricer::ProxyPricer;

/// How an accepted bid changed the auction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementKind {
    /// Leader raised their own ceiling; visible price unchanged.
    CeilingRaise,
    /// First bid of the auction; visible price lands on the listing price.
    OpeningBid,
    /// Submitter's ceiling beat the incumbent's; lead changes hands.
    LeadTaken,
    /// Incumbent's ceiling absorbed the challenge; lead defended.
    LeadDefended,
}

/// Everything the ledger must write for one accepted bid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub kind: PlacementKind,
    /// The listing's visible price after this bid.
    pub visible_bid: Amount,
    /// `amount` to record on the submitting bidder's row. Never exceeds
    /// the ceiling they submitted.
    pub bidder_row_amount: Amount,
    /// Whether the submitter leads once the write lands.
    pub is_now_highest_bidder: bool,
    /// Leader after this bid.
    pub leader_id: UserId,
    /// When the lead is defended, the incumbent's row is raised to the new
    /// visible price: (their bid id, new amount).
    pub leader_row_raise: Option<(BidId, Amount)>,
    /// Previous leader displaced by this bid, owed an outbid notification.
    pub outbid: Option<UserId>,
}

/// Read-only pricing summary for an auction in its current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    /// Publicly visible price (listing price until the first bid).
    pub current_visible_bid: Amount,
    /// Smallest maximum bid the next submission must carry.
    pub minimum_acceptable: Amount,
    /// Current leader, if the auction has bids.
    pub leading_bidder: Option<UserId>,
}
