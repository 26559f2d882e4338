//! Bid ledger operations.

use crate::domain::{sort_bids_by_rank, Amount, Bid, BidId, ListingId, TimeMs, UserId};
use crate::engine::Placement;

use super::{bid_from_row, Repository};

impl Repository {
    /// Active bids for a listing, best-ranked first (highest ceiling, then
    /// earliest acceptance, then id).
    ///
    /// Amounts are stored as canonical decimal strings, so ranking happens
    /// here rather than in ORDER BY, which would compare text.
    pub async fn active_bids_for_listing(
        &self,
        listing_id: ListingId,
    ) -> Result<Vec<Bid>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM bids
            WHERE listing_id = ? AND status = 'active'
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(listing_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut bids = rows
            .iter()
            .map(bid_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        sort_bids_by_rank(&mut bids);
        Ok(bids)
    }

    /// Every bid ever accepted on a listing, terminal rows included, oldest
    /// first.
    pub async fn bids_for_listing(&self, listing_id: ListingId) -> Result<Vec<Bid>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM bids
            WHERE listing_id = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(listing_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(bid_from_row).collect()
    }

    /// Apply one accepted placement: raise the defending incumbent's row
    /// when required, upsert the submitter's row and refresh the listing
    /// cache, all in one transaction.
    ///
    /// A re-bid hits the (listing_id, bidder_id) conflict and updates the
    /// existing row in place, preserving its id and created_at. The cache
    /// update carries a `status = 'active'` guard; returns false (writing
    /// nothing) when the listing settled underneath the caller.
    pub async fn apply_placement_atomic(
        &self,
        listing_id: ListingId,
        bidder_id: UserId,
        maximum_bid: Amount,
        increment: Amount,
        placement: &Placement,
        now: TimeMs,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        if let Some((leader_bid_id, raised_to)) = &placement.leader_row_raise {
            sqlx::query(
                r#"
                UPDATE bids SET amount = ?, updated_at = ?
                WHERE id = ? AND status = 'active'
                "#,
            )
            .bind(raised_to.to_canonical_string())
            .bind(now.as_ms())
            .bind(leader_bid_id.to_string())
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO bids (
                id, listing_id, bidder_id, amount, maximum_bid, bid_increment,
                status, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, 'active', ?, ?)
            ON CONFLICT(listing_id, bidder_id) DO UPDATE SET
                amount = excluded.amount,
                maximum_bid = excluded.maximum_bid,
                bid_increment = excluded.bid_increment,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(BidId::new().to_string())
        .bind(listing_id.to_string())
        .bind(bidder_id.to_string())
        .bind(placement.bidder_row_amount.to_canonical_string())
        .bind(maximum_bid.to_canonical_string())
        .bind(increment.to_canonical_string())
        .bind(now.as_ms())
        .bind(now.as_ms())
        .execute(&mut *tx)
        .await?;

        let cache = sqlx::query(
            r#"
            UPDATE listings SET current_bid = ?, highest_bidder_id = ?
            WHERE id = ? AND status = 'active'
            "#,
        )
        .bind(placement.visible_bid.to_canonical_string())
        .bind(placement.leader_id.to_string())
        .bind(listing_id.to_string())
        .execute(&mut *tx)
        .await?;

        if cache.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }
}
