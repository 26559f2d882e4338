//! Repository layer for database operations.
//!
//! This module provides the `Repository` struct for all database operations.
//! Methods are organized across submodules by aggregate:
//! - `listings.rs` - listing rows, settlement claims, relist
//! - `bids.rs` - bid ledger rows and placement writes
//! - `outbox.rs` - notification outbox rows

mod bids;
mod listings;
mod outbox;

use crate::domain::{Amount, Bid, BidId, BidStatus, Listing, ListingId, ListingStatus, TimeMs, UserId};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use tracing::warn;

/// A notification owed to a user, as stored in the outbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxRow {
    pub id: i64,
    pub user_id: UserId,
    pub kind: String,
    pub message: String,
    /// Kind-specific payload, JSON-encoded.
    pub metadata: String,
    pub created_at: TimeMs,
    pub sent_at: Option<TimeMs>,
}

/// Repository for database operations.
#[derive(Debug)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    /// Cheap storage liveness check for readiness probes.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn decode_err(column: &str, message: impl std::fmt::Display) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: message.to_string().into(),
    }
}

/// Parse a stored canonical amount. Malformed values are logged and read as
/// zero rather than failing the whole query, matching how other stored
/// decimals degrade.
fn parse_amount(column: &str, raw: &str) -> Amount {
    Amount::from_str_canonical(raw).unwrap_or_else(|e| {
        warn!(
            column = column,
            value = raw,
            error = %e,
            "failed to parse stored amount, using zero"
        );
        Amount::zero()
    })
}

fn parse_listing_id(column: &str, raw: &str) -> Result<ListingId, sqlx::Error> {
    ListingId::parse(raw).map_err(|e| decode_err(column, e))
}

fn parse_user_id(column: &str, raw: &str) -> Result<UserId, sqlx::Error> {
    UserId::parse(raw).map_err(|e| decode_err(column, e))
}

fn parse_bid_id(column: &str, raw: &str) -> Result<BidId, sqlx::Error> {
    BidId::parse(raw).map_err(|e| decode_err(column, e))
}

fn listing_from_row(row: &SqliteRow) -> Result<Listing, sqlx::Error> {
    let id: String = row.get("id");
    let seller_id: String = row.get("seller_id");
    let price: String = row.get("price");
    let current_bid: Option<String> = row.get("current_bid");
    let highest_bidder_id: Option<String> = row.get("highest_bidder_id");
    let status: String = row.get("status");
    let sale_buyer_id: Option<String> = row.get("sale_buyer_id");
    let sale_amount: Option<String> = row.get("sale_amount");
    let sale_date: Option<i64> = row.get("sale_date");
    let relisted_from: Option<String> = row.get("relisted_from");

    Ok(Listing {
        id: parse_listing_id("id", &id)?,
        seller_id: parse_user_id("seller_id", &seller_id)?,
        title: row.get("title"),
        price: parse_amount("price", &price),
        current_bid: current_bid
            .as_deref()
            .map(|raw| parse_amount("current_bid", raw)),
        highest_bidder_id: highest_bidder_id
            .as_deref()
            .map(|raw| parse_user_id("highest_bidder_id", raw))
            .transpose()?,
        expires_at: TimeMs::new(row.get("expires_at")),
        status: ListingStatus::parse(&status)
            .ok_or_else(|| decode_err("status", format!("unknown listing status: {}", status)))?,
        sale_buyer_id: sale_buyer_id
            .as_deref()
            .map(|raw| parse_user_id("sale_buyer_id", raw))
            .transpose()?,
        sale_amount: sale_amount
            .as_deref()
            .map(|raw| parse_amount("sale_amount", raw)),
        sale_date: sale_date.map(TimeMs::new),
        relisted_from: relisted_from
            .as_deref()
            .map(|raw| parse_listing_id("relisted_from", raw))
            .transpose()?,
        created_at: TimeMs::new(row.get("created_at")),
    })
}

fn bid_from_row(row: &SqliteRow) -> Result<Bid, sqlx::Error> {
    let id: String = row.get("id");
    let listing_id: String = row.get("listing_id");
    let bidder_id: String = row.get("bidder_id");
    let amount: String = row.get("amount");
    let maximum_bid: String = row.get("maximum_bid");
    let bid_increment: String = row.get("bid_increment");
    let status: String = row.get("status");

    Ok(Bid {
        id: parse_bid_id("id", &id)?,
        listing_id: parse_listing_id("listing_id", &listing_id)?,
        bidder_id: parse_user_id("bidder_id", &bidder_id)?,
        amount: parse_amount("amount", &amount),
        maximum_bid: parse_amount("maximum_bid", &maximum_bid),
        bid_increment: parse_amount("bid_increment", &bid_increment),
        status: BidStatus::parse(&status)
            .ok_or_else(|| decode_err("status", format!("unknown bid status: {}", status)))?,
        created_at: TimeMs::new(row.get("created_at")),
        updated_at: TimeMs::new(row.get("updated_at")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::init_db;
    use crate::domain::Notification;
    use crate::engine::{Placement, PlacementKind};
    use tempfile::TempDir;

    async fn setup_test_db() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (Repository::new(pool), temp_dir)
    }

    fn amt(s: &str) -> Amount {
        Amount::from_str_canonical(s).unwrap()
    }

    fn sample_listing() -> Listing {
        Listing::new(
            UserId::new(),
            "Vintage camera".to_string(),
            amt("100"),
            TimeMs::new(100_000),
            TimeMs::new(1_000),
        )
    }

    fn opening_placement(bidder_id: UserId, visible: &str) -> Placement {
        Placement {
            kind: PlacementKind::OpeningBid,
            visible_bid: amt(visible),
            bidder_row_amount: amt(visible),
            is_now_highest_bidder: true,
            leader_id: bidder_id,
            leader_row_raise: None,
            outbid: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_listing_roundtrip() {
        let (repo, _temp) = setup_test_db().await;
        let listing = sample_listing();

        repo.insert_listing(&listing).await.expect("insert failed");
        let fetched = repo
            .get_listing(listing.id)
            .await
            .expect("query failed")
            .expect("listing missing");

        assert_eq!(fetched, listing);
    }

    #[tokio::test]
    async fn test_get_listing_missing_returns_none() {
        let (repo, _temp) = setup_test_db().await;
        let fetched = repo.get_listing(ListingId::new()).await.expect("query failed");
        assert!(fetched.is_none());
    }

    #[tokio::test]
    async fn test_apply_placement_creates_and_updates_row() {
        let (repo, _temp) = setup_test_db().await;
        let listing = sample_listing();
        repo.insert_listing(&listing).await.unwrap();

        let bidder = UserId::new();
        let landed = repo
            .apply_placement_atomic(
                listing.id,
                bidder,
                amt("120"),
                amt("5"),
                &opening_placement(bidder, "100"),
                TimeMs::new(2_000),
            )
            .await
            .unwrap();
        assert!(landed);

        let bids = repo.active_bids_for_listing(listing.id).await.unwrap();
        assert_eq!(bids.len(), 1);
        assert_eq!(bids[0].amount, amt("100"));
        assert_eq!(bids[0].maximum_bid, amt("120"));
        assert_eq!(bids[0].created_at, TimeMs::new(2_000));

        // Re-bid by the same bidder updates the row in place, keeping id
        // and created_at.
        let raise = Placement {
            kind: PlacementKind::CeilingRaise,
            visible_bid: amt("100"),
            bidder_row_amount: amt("100"),
            is_now_highest_bidder: true,
            leader_id: bidder,
            leader_row_raise: None,
            outbid: None,
        };
        let landed = repo
            .apply_placement_atomic(listing.id, bidder, amt("200"), amt("5"), &raise, TimeMs::new(3_000))
            .await
            .unwrap();
        assert!(landed);

        let rebids = repo.active_bids_for_listing(listing.id).await.unwrap();
        assert_eq!(rebids.len(), 1);
        assert_eq!(rebids[0].id, bids[0].id);
        assert_eq!(rebids[0].created_at, TimeMs::new(2_000));
        assert_eq!(rebids[0].updated_at, TimeMs::new(3_000));
        assert_eq!(rebids[0].maximum_bid, amt("200"));

        let fetched = repo.get_listing(listing.id).await.unwrap().unwrap();
        assert_eq!(fetched.current_bid, Some(amt("100")));
        assert_eq!(fetched.highest_bidder_id, Some(bidder));
    }

    #[tokio::test]
    async fn test_apply_placement_refuses_settled_listing() {
        let (repo, _temp) = setup_test_db().await;
        let listing = sample_listing();
        repo.insert_listing(&listing).await.unwrap();
        let claimed = repo.mark_listing_expired(listing.id).await.unwrap();
        assert!(claimed);

        let bidder = UserId::new();
        let landed = repo
            .apply_placement_atomic(
                listing.id,
                bidder,
                amt("120"),
                amt("5"),
                &opening_placement(bidder, "100"),
                TimeMs::new(60_000),
            )
            .await
            .unwrap();
        assert!(!landed, "write against a settled listing must not land");

        let bids = repo.active_bids_for_listing(listing.id).await.unwrap();
        assert!(bids.is_empty(), "rolled-back bid must not persist");
    }

    #[tokio::test]
    async fn test_settlement_claim_is_single_shot() {
        let (repo, _temp) = setup_test_db().await;
        let listing = sample_listing();
        repo.insert_listing(&listing).await.unwrap();

        let first = repo.mark_listing_expired(listing.id).await.unwrap();
        let second = repo.mark_listing_expired(listing.id).await.unwrap();

        assert!(first);
        assert!(!second, "a settled listing must not be claimable again");

        let fetched = repo.get_listing(listing.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, ListingStatus::Expired);
    }

    #[tokio::test]
    async fn test_outbox_roundtrip_and_ack() {
        let (repo, _temp) = setup_test_db().await;
        let user = UserId::new();
        let notification = Notification::AuctionEndedNoBids {
            user_id: user,
            listing_id: ListingId::new(),
            listing_title: "Vintage camera".to_string(),
        };

        let id = repo
            .enqueue_notification(&notification, TimeMs::new(1_000))
            .await
            .expect("enqueue failed");

        let unsent = repo.unsent_notifications(10).await.unwrap();
        assert_eq!(unsent.len(), 1);
        assert_eq!(unsent[0].id, id);
        assert_eq!(unsent[0].user_id, user);
        assert_eq!(unsent[0].kind, "auction_ended_no_bids");
        assert!(unsent[0].message.contains("Vintage camera"));
        assert_eq!(unsent[0].sent_at, None);

        let acked = repo
            .mark_notification_sent(id, TimeMs::new(2_000))
            .await
            .unwrap();
        assert!(acked);
        let again = repo
            .mark_notification_sent(id, TimeMs::new(3_000))
            .await
            .unwrap();
        assert!(!again, "ack is single-shot");

        let unsent = repo.unsent_notifications(10).await.unwrap();
        assert!(unsent.is_empty());
    }
}
