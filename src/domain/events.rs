//! Realtime change events published to subscribed frontends.

use crate::domain::ListingId;
use serde::{Deserialize, Serialize};

/// Table a change happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeTable {
    Listings,
    Bids,
}

impl ChangeTable {
    /// Canonical string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeTable::Listings => "listings",
            ChangeTable::Bids => "bids",
        }
    }
}

/// Kind of row change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
}

impl ChangeKind {
    /// Canonical string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Insert => "insert",
            ChangeKind::Update => "update",
        }
    }
}

/// A change notification, coarse enough for clients to re-fetch by listing.
///
/// Delivery is at-most-once in process; clients needing stronger guarantees
/// resubscribe and re-read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    /// Which table changed.
    pub table: ChangeTable,
    /// Insert or update.
    #[serde(rename = "eventType")]
    pub kind: ChangeKind,
    /// The listing whose auction state is affected.
    pub listing_id: ListingId,
}

impl ChangeEvent {
    /// A listings-table change.
    pub fn listing(kind: ChangeKind, listing_id: ListingId) -> Self {
        ChangeEvent {
            table: ChangeTable::Listings,
            kind,
            listing_id,
        }
    }

    /// A bids-table change.
    pub fn bid(kind: ChangeKind, listing_id: ListingId) -> Self {
        ChangeEvent {
            table: ChangeTable::Bids,
            kind,
            listing_id,
        }
    }
}
