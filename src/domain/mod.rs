//! Domain types for the proxy bidding engine.
//!
//! This module provides:
//! - Lossless money handling via the Amount wrapper
//! - Domain primitives: TimeMs, ListingId, UserId, BidId
//! - Listing and Bid ledger records with canonical JSON serialization
//! - Stable bid ranking helper for deterministic auction resolution
//! - Notification and realtime change event payloads

pub mod bid;
pub mod events;
pub mod listing;
pub mod money;
pub mod notification;
pub mod ordering;
pub mod primitives;

pub use bid::{Bid, BidStatus};
pub use events::{ChangeEvent, ChangeKind, ChangeTable};
pub use listing::{Listing, ListingStatus};
pub use money::Amount;
pub use notification::Notification;
pub use ordering::{leader, sort_bids_by_rank, BidRank};
pub use primitives::{BidId, ListingId, TimeMs, UserId};
