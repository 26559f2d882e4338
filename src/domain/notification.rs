//! Notification payloads produced by the auction engine.
//!
//! The engine only enqueues these into the outbox; rendering channels
//! (email, push) and delivery belong to a separate consumer.

use crate::domain::{Amount, ListingId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// A notification owed to one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// Someone else now leads an auction this user was leading.
    Outbid {
        user_id: UserId,
        listing_id: ListingId,
        listing_title: String,
        current_bid: Amount,
    },
    /// A bid was accepted on the seller's auction.
    NewBid {
        user_id: UserId,
        listing_id: ListingId,
        listing_title: String,
        visible_bid: Amount,
    },
    /// The user won a settled auction.
    AuctionWon {
        user_id: UserId,
        listing_id: ListingId,
        listing_title: String,
        sale_amount: Amount,
    },
    /// The seller's auction settled with a winner.
    AuctionSold {
        user_id: UserId,
        listing_id: ListingId,
        listing_title: String,
        sale_amount: Amount,
        buyer_id: UserId,
    },
    /// The seller's auction expired without a single bid.
    AuctionEndedNoBids {
        user_id: UserId,
        listing_id: ListingId,
        listing_title: String,
    },
    /// The seller relisted; this user's active bid was voided.
    ListingRelisted {
        user_id: UserId,
        listing_id: ListingId,
        listing_title: String,
        new_listing_id: ListingId,
    },
}

impl Notification {
    /// Stable kind tag, as stored in the outbox.
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::Outbid { .. } => "outbid",
            Notification::NewBid { .. } => "new_bid",
            Notification::AuctionWon { .. } => "auction_won",
            Notification::AuctionSold { .. } => "auction_sold",
            Notification::AuctionEndedNoBids { .. } => "auction_ended_no_bids",
            Notification::ListingRelisted { .. } => "listing_relisted",
        }
    }

    /// The user this notification is addressed to.
    pub fn recipient(&self) -> UserId {
        match self {
            Notification::Outbid { user_id, .. }
            | Notification::NewBid { user_id, .. }
            | Notification::AuctionWon { user_id, .. }
            | Notification::AuctionSold { user_id, .. }
            | Notification::AuctionEndedNoBids { user_id, .. }
            | Notification::ListingRelisted { user_id, .. } => *user_id,
        }
    }

    /// The listing the notification is about.
    pub fn listing_id(&self) -> ListingId {
        match self {
            Notification::Outbid { listing_id, .. }
            | Notification::NewBid { listing_id, .. }
            | Notification::AuctionWon { listing_id, .. }
            | Notification::AuctionSold { listing_id, .. }
            | Notification::AuctionEndedNoBids { listing_id, .. }
            | Notification::ListingRelisted { listing_id, .. } => *listing_id,
        }
    }

    /// Human-readable message body.
    pub fn message(&self) -> String {
        match self {
            Notification::Outbid {
                listing_title,
                current_bid,
                ..
            } => format!(
                "You have been outbid on \"{}\". The price is now {}.",
                listing_title, current_bid
            ),
            Notification::NewBid {
                listing_title,
                visible_bid,
                ..
            } => format!("New bid of {} on \"{}\".", visible_bid, listing_title),
            Notification::AuctionWon {
                listing_title,
                sale_amount,
                ..
            } => format!(
                "You won the auction for \"{}\" at {}.",
                listing_title, sale_amount
            ),
            Notification::AuctionSold {
                listing_title,
                sale_amount,
                ..
            } => format!(
                "Your auction \"{}\" sold for {}.",
                listing_title, sale_amount
            ),
            Notification::AuctionEndedNoBids { listing_title, .. } => {
                format!("Your auction \"{}\" ended without bids.", listing_title)
            }
            Notification::ListingRelisted { listing_title, .. } => format!(
                "\"{}\" was relisted by the seller; your bid was cancelled.",
                listing_title
            ),
        }
    }

    /// Structured payload for downstream renderers, camelCase keys.
    pub fn metadata(&self) -> serde_json::Value {
        match self {
            Notification::Outbid {
                listing_id,
                listing_title,
                current_bid,
                ..
            } => json!({
                "listingId": listing_id,
                "listingTitle": listing_title,
                "currentBid": current_bid,
            }),
            Notification::NewBid {
                listing_id,
                listing_title,
                visible_bid,
                ..
            } => json!({
                "listingId": listing_id,
                "listingTitle": listing_title,
                "visibleBid": visible_bid,
            }),
            Notification::AuctionWon {
                listing_id,
                listing_title,
                sale_amount,
                ..
            } => json!({
                "listingId": listing_id,
                "listingTitle": listing_title,
                "saleAmount": sale_amount,
            }),
            Notification::AuctionSold {
                listing_id,
                listing_title,
                sale_amount,
                buyer_id,
                ..
            } => json!({
                "listingId": listing_id,
                "listingTitle": listing_title,
                "saleAmount": sale_amount,
                "buyerId": buyer_id,
            }),
            Notification::AuctionEndedNoBids {
                listing_id,
                listing_title,
                ..
            } => json!({
                "listingId": listing_id,
                "listingTitle": listing_title,
            }),
            Notification::ListingRelisted {
                listing_id,
                listing_title,
                new_listing_id,
                ..
            } => json!({
                "listingId": listing_id,
                "listingTitle": listing_title,
                "newListingId": new_listing_id,
            }),
        }
    }
}
