//! Listing operations: rows, settlement claims, relist.

use crate::domain::{Amount, Listing, ListingId, TimeMs, UserId};
use crate::engine::ExpectedCache;
use sqlx::Row;

use super::{listing_from_row, parse_user_id, Repository};

impl Repository {
    /// Insert a listing row.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_listing(&self, listing: &Listing) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO listings (
                id, seller_id, title, price, current_bid, highest_bidder_id,
                expires_at, status, sale_buyer_id, sale_amount, sale_date,
                relisted_from, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(listing.id.to_string())
        .bind(listing.seller_id.to_string())
        .bind(listing.title.as_str())
        .bind(listing.price.to_canonical_string())
        .bind(listing.current_bid.map(|a| a.to_canonical_string()))
        .bind(listing.highest_bidder_id.map(|u| u.to_string()))
        .bind(listing.expires_at.as_ms())
        .bind(listing.status.as_str())
        .bind(listing.sale_buyer_id.map(|u| u.to_string()))
        .bind(listing.sale_amount.map(|a| a.to_canonical_string()))
        .bind(listing.sale_date.map(|t| t.as_ms()))
        .bind(listing.relisted_from.map(|l| l.to_string()))
        .bind(listing.created_at.as_ms())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetch a listing by id.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn get_listing(&self, id: ListingId) -> Result<Option<Listing>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM listings WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(listing_from_row).transpose()
    }

    /// Active listings whose deadline has passed, oldest deadline first.
    ///
    /// These are the settlement candidates; each is then claimed
    /// individually so racing sweeps stay disjoint.
    pub async fn find_expired_active(&self, now: TimeMs) -> Result<Vec<Listing>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM listings
            WHERE status = 'active' AND expires_at <= ?
            ORDER BY expires_at ASC, id ASC
            "#,
        )
        .bind(now.as_ms())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(listing_from_row).collect()
    }

    /// Claim an expired no-bid listing by flipping it to `expired`.
    ///
    /// The `status = 'active'` guard makes the transition single-shot:
    /// returns false when another sweep (or process) got there first.
    pub async fn mark_listing_expired(&self, id: ListingId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE listings SET status = 'expired'
            WHERE id = ? AND status = 'active'
            "#,
        )
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Settle a sold auction: claim the listing, record the sale and flip
    /// every active bid to `won` / `lost`, all in one transaction.
    ///
    /// Returns false (and writes nothing) when the listing was no longer
    /// active, i.e. a racing sweep already settled it.
    pub async fn settle_listing_sold_atomic(
        &self,
        listing_id: ListingId,
        winner_bid_id: crate::domain::BidId,
        buyer_id: UserId,
        sale_amount: Amount,
        now: TimeMs,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let claimed = sqlx::query(
            r#"
            UPDATE listings SET
                status = 'sold',
                sale_buyer_id = ?,
                sale_amount = ?,
                sale_date = ?,
                current_bid = ?,
                highest_bidder_id = ?
            WHERE id = ? AND status = 'active'
            "#,
        )
        .bind(buyer_id.to_string())
        .bind(sale_amount.to_canonical_string())
        .bind(now.as_ms())
        .bind(sale_amount.to_canonical_string())
        .bind(buyer_id.to_string())
        .bind(listing_id.to_string())
        .execute(&mut *tx)
        .await?;

        if claimed.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            r#"
            UPDATE bids SET status = 'won', updated_at = ?
            WHERE id = ? AND status = 'active'
            "#,
        )
        .bind(now.as_ms())
        .bind(winner_bid_id.to_string())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE bids SET status = 'lost', updated_at = ?
            WHERE listing_id = ? AND status = 'active' AND id != ?
            "#,
        )
        .bind(now.as_ms())
        .bind(listing_id.to_string())
        .bind(winner_bid_id.to_string())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Relist: void all active bids, retire the original listing and insert
    /// its replacement, all in one transaction.
    ///
    /// Returns the bidders whose bids were voided (for notifications), or
    /// None (writing nothing) when the original was neither active nor sold.
    pub async fn relist_listing_atomic(
        &self,
        original_id: ListingId,
        replacement: &Listing,
        now: TimeMs,
    ) -> Result<Option<Vec<UserId>>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let retired = sqlx::query(
            r#"
            UPDATE listings SET status = 'relisted'
            WHERE id = ? AND status IN ('active', 'sold')
            "#,
        )
        .bind(original_id.to_string())
        .execute(&mut *tx)
        .await?;

        if retired.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let rows = sqlx::query("SELECT bidder_id FROM bids WHERE listing_id = ? AND status = 'active'")
            .bind(original_id.to_string())
            .fetch_all(&mut *tx)
            .await?;
        let voided = rows
            .iter()
            .map(|row| {
                let bidder_id: String = row.get("bidder_id");
                parse_user_id("bidder_id", &bidder_id)
            })
            .collect::<Result<Vec<_>, _>>()?;

        sqlx::query(
            r#"
            UPDATE bids SET status = 'cancelled_due_to_relist', updated_at = ?
            WHERE listing_id = ? AND status = 'active'
            "#,
        )
        .bind(now.as_ms())
        .bind(original_id.to_string())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO listings (
                id, seller_id, title, price, current_bid, highest_bidder_id,
                expires_at, status, sale_buyer_id, sale_amount, sale_date,
                relisted_from, created_at
            ) VALUES (?, ?, ?, ?, NULL, NULL, ?, 'active', NULL, NULL, NULL, ?, ?)
            "#,
        )
        .bind(replacement.id.to_string())
        .bind(replacement.seller_id.to_string())
        .bind(replacement.title.as_str())
        .bind(replacement.price.to_canonical_string())
        .bind(replacement.expires_at.as_ms())
        .bind(original_id.to_string())
        .bind(replacement.created_at.as_ms())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(voided))
    }

    /// Overwrite a listing's denormalized cache with the ledger-derived
    /// truth. Only active listings are repaired.
    pub async fn repair_listing_cache(
        &self,
        id: ListingId,
        expected: &ExpectedCache,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE listings SET current_bid = ?, highest_bidder_id = ?
            WHERE id = ? AND status = 'active'
            "#,
        )
        .bind(expected.current_bid.map(|a| a.to_canonical_string()))
        .bind(expected.highest_bidder_id.map(|u| u.to_string()))
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
