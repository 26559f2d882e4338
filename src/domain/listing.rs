//! Listing type: the auction-facing subset of a marketplace listing.

use crate::domain::{Amount, ListingId, TimeMs, UserId};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a listing.
///
/// `Sold`, `Expired` and `Relisted` are terminal; only `Active` listings
/// accept bids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    /// Auction is open.
    Active,
    /// Auction ended with a winning bid.
    Sold,
    /// Auction ended with no bids.
    Expired,
    /// Listing was replaced by a relist; its bids were voided.
    Relisted,
}

impl ListingStatus {
    /// Canonical string form, as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Active => "active",
            ListingStatus::Sold => "sold",
            ListingStatus::Expired => "expired",
            ListingStatus::Relisted => "relisted",
        }
    }

    /// Parse the canonical string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(ListingStatus::Active),
            "sold" => Some(ListingStatus::Sold),
            "expired" => Some(ListingStatus::Expired),
            "relisted" => Some(ListingStatus::Relisted),
            _ => None,
        }
    }

    /// Returns true once the listing can never accept another bid.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ListingStatus::Active)
    }
}

impl std::fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A listing as the auction engine sees it.
///
/// `current_bid` and `highest_bidder_id` are a denormalized cache of the bid
/// ledger, maintained in lockstep with accepted bids and settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    /// Stable unique identifier.
    pub id: ListingId,
    /// Owner of the listing. A seller never bids on their own listing.
    pub seller_id: UserId,
    /// Title, carried into notification messages.
    pub title: String,
    /// Starting/reserve price. Immutable after creation.
    pub price: Amount,
    /// Visible auction price (unset until the first bid).
    pub current_bid: Option<Amount>,
    /// Current leader (unset until the first bid).
    pub highest_bidder_id: Option<UserId>,
    /// Fixed auction deadline. Immutable; extending requires a relist.
    pub expires_at: TimeMs,
    /// Lifecycle status.
    pub status: ListingStatus,
    /// Winner, populated once by settlement of a sold auction.
    pub sale_buyer_id: Option<UserId>,
    /// Final visible price, populated once by settlement.
    pub sale_amount: Option<Amount>,
    /// Settlement time, populated once by settlement.
    pub sale_date: Option<TimeMs>,
    /// The listing this one replaced, when created by a relist.
    pub relisted_from: Option<ListingId>,
    /// Creation time.
    pub created_at: TimeMs,
}

impl Listing {
    /// Create a fresh active listing.
    pub fn new(
        seller_id: UserId,
        title: String,
        price: Amount,
        expires_at: TimeMs,
        created_at: TimeMs,
    ) -> Self {
        Listing {
            id: ListingId::new(),
            seller_id,
            title,
            price,
            current_bid: None,
            highest_bidder_id: None,
            expires_at,
            status: ListingStatus::Active,
            sale_buyer_id: None,
            sale_amount: None,
            sale_date: None,
            relisted_from: None,
            created_at,
        }
    }

    /// Build the replacement listing for a relist: same seller, title and
    /// price, fresh id and deadline, no bids, back-reference to this one.
    pub fn relist_successor(&self, new_expires_at: TimeMs, now: TimeMs) -> Self {
        Listing {
            id: ListingId::new(),
            seller_id: self.seller_id,
            title: self.title.clone(),
            price: self.price,
            current_bid: None,
            highest_bidder_id: None,
            expires_at: new_expires_at,
            status: ListingStatus::Active,
            sale_buyer_id: None,
            sale_amount: None,
            sale_date: None,
            relisted_from: Some(self.id),
            created_at: now,
        }
    }

    /// Whether a bid can be accepted right now: active and not yet expired.
    ///
    /// The deadline check matters between expiry and the next settlement
    /// sweep, when the row still reads `active`.
    pub fn is_biddable(&self, now: TimeMs) -> bool {
        self.status == ListingStatus::Active && now < self.expires_at
    }
}
