//! Coordinates auction mutations: lock, validate, write, notify.

use crate::config::Config;
use crate::db::Repository;
use crate::domain::{
    Amount, ChangeEvent, ChangeKind, Listing, ListingId, ListingStatus, Notification, TimeMs,
    UserId,
};
use crate::engine::{audit_cache, CacheAudit, ExpectedCache, Placement, ProxyPricer};
use crate::error::{BidError, ReconcileError, RelistError};
use crate::notify::Notifier;
use crate::orchestration::locks::ListingLocks;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use std::sync::Arc;
use std::time::Duration;

/// What a bidder learns when their submission is accepted. The private
/// ceiling is echoed nowhere; only the resulting public state comes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BidReceipt {
    pub visible_bid: Amount,
    pub is_now_highest_bidder: bool,
}

#[derive(Clone)]
pub struct Auctioneer {
    repo: Arc<Repository>,
    notifier: Arc<dyn Notifier>,
    locks: Arc<ListingLocks>,
    pricer: ProxyPricer,
    lock_wait: Duration,
    storage_timeout: Duration,
    retry_max_elapsed: Duration,
}

impl Auctioneer {
    pub fn new(
        repo: Arc<Repository>,
        notifier: Arc<dyn Notifier>,
        locks: Arc<ListingLocks>,
        config: &Config,
    ) -> Self {
        Self {
            repo,
            notifier,
            locks,
            pricer: ProxyPricer::new(config.bid_increment),
            lock_wait: Duration::from_millis(config.lock_wait_ms),
            storage_timeout: Duration::from_millis(config.storage_timeout_ms),
            retry_max_elapsed: Duration::from_millis(config.retry_max_elapsed_ms),
        }
    }

    /// Place or raise a proxy bid.
    ///
    /// Lost races (`ConcurrencyConflict`) are retried with exponential
    /// backoff inside a bounded elapsed budget; each attempt re-reads state
    /// and re-validates. `Timeout` is returned as-is: the caller may retry
    /// safely for the same reason.
    pub async fn submit_bid(
        &self,
        listing_id: ListingId,
        bidder_id: UserId,
        maximum_bid: Amount,
    ) -> Result<BidReceipt, BidError> {
        let backoff = ExponentialBackoff {
            initial_interval: Duration::from_millis(25),
            max_elapsed_time: Some(self.retry_max_elapsed),
            ..Default::default()
        };

        retry(backoff, || async {
            match self.submit_bid_once(listing_id, bidder_id, maximum_bid).await {
                Ok(receipt) => Ok(receipt),
                Err(BidError::ConcurrencyConflict) => {
                    Err(backoff::Error::transient(BidError::ConcurrencyConflict))
                }
                Err(other) => Err(backoff::Error::permanent(other)),
            }
        })
        .await
    }

    async fn submit_bid_once(
        &self,
        listing_id: ListingId,
        bidder_id: UserId,
        maximum_bid: Amount,
    ) -> Result<BidReceipt, BidError> {
        let _guard = self
            .locks
            .acquire(listing_id, self.lock_wait)
            .await
            .ok_or(BidError::ConcurrencyConflict)?;

        let (listing, placement) = tokio::time::timeout(self.storage_timeout, async {
            let now = TimeMs::now();
            let listing = self
                .repo
                .get_listing(listing_id)
                .await?
                .ok_or(BidError::ListingNotBiddable)?;
            let active_bids = self.repo.active_bids_for_listing(listing_id).await?;

            let placement =
                self.pricer
                    .evaluate(&listing, &active_bids, bidder_id, maximum_bid, now)?;

            let applied = self
                .repo
                .apply_placement_atomic(
                    listing_id,
                    bidder_id,
                    maximum_bid,
                    self.pricer.increment(),
                    &placement,
                    now,
                )
                .await?;
            if !applied {
                // listing left 'active' between validation and write
                return Err(BidError::ConcurrencyConflict);
            }

            Ok((listing, placement))
        })
        .await
        .map_err(|_| BidError::Timeout)??;

        self.emit_bid_side_effects(&listing, &placement).await;

        tracing::info!(
            listing_id = %listing_id,
            bidder_id = %bidder_id,
            visible_bid = %placement.visible_bid,
            leads = placement.is_now_highest_bidder,
            "bid accepted"
        );

        Ok(BidReceipt {
            visible_bid: placement.visible_bid,
            is_now_highest_bidder: placement.is_now_highest_bidder,
        })
    }

    async fn emit_bid_side_effects(&self, listing: &Listing, placement: &Placement) {
        if let Some(displaced) = placement.outbid {
            self.notify(Notification::Outbid {
                user_id: displaced,
                listing_id: listing.id,
                listing_title: listing.title.clone(),
                current_bid: placement.visible_bid,
            })
            .await;
        }
        self.notify(Notification::NewBid {
            user_id: listing.seller_id,
            listing_id: listing.id,
            listing_title: listing.title.clone(),
            visible_bid: placement.visible_bid,
        })
        .await;

        self.notifier
            .publish_change(ChangeEvent::bid(ChangeKind::Update, listing.id));
        self.notifier
            .publish_change(ChangeEvent::listing(ChangeKind::Update, listing.id));
    }

    /// Retire a listing and carry its auction over to a fresh one.
    ///
    /// All active bids on the original are voided; their owners are told
    /// where the auction went. The only operation that ever voids bids.
    pub async fn relist(
        &self,
        listing_id: ListingId,
        seller_id: UserId,
        new_expires_at: TimeMs,
    ) -> Result<ListingId, RelistError> {
        let _guard = self
            .locks
            .acquire(listing_id, self.lock_wait)
            .await
            .ok_or(RelistError::ConcurrencyConflict)?;

        let (listing, replacement, voided) = tokio::time::timeout(self.storage_timeout, async {
            let now = TimeMs::now();
            let listing = self
                .repo
                .get_listing(listing_id)
                .await?
                .ok_or(RelistError::ListingNotFound)?;
            if listing.seller_id != seller_id {
                return Err(RelistError::NotSeller);
            }
            if !matches!(listing.status, ListingStatus::Active | ListingStatus::Sold) {
                return Err(RelistError::NotRelistable);
            }
            if new_expires_at <= now {
                return Err(RelistError::ExpiryNotInFuture);
            }

            let replacement = listing.relist_successor(new_expires_at, now);
            let voided = self
                .repo
                .relist_listing_atomic(listing_id, &replacement, now)
                .await?
                // status moved under us between the read and the write
                .ok_or(RelistError::ConcurrencyConflict)?;

            Ok((listing, replacement, voided))
        })
        .await
        .map_err(|_| RelistError::Timeout)??;

        for bidder in &voided {
            self.notify(Notification::ListingRelisted {
                user_id: *bidder,
                listing_id,
                listing_title: listing.title.clone(),
                new_listing_id: replacement.id,
            })
            .await;
        }
        self.notifier
            .publish_change(ChangeEvent::listing(ChangeKind::Update, listing_id));
        self.notifier
            .publish_change(ChangeEvent::listing(ChangeKind::Insert, replacement.id));

        tracing::info!(
            listing_id = %listing_id,
            new_listing_id = %replacement.id,
            voided_bids = voided.len(),
            "listing relisted"
        );

        Ok(replacement.id)
    }

    /// Audit one listing's denormalized price cache against its ledger and
    /// repair it if it drifted.
    pub async fn reconcile(&self, listing_id: ListingId) -> Result<CacheAudit, ReconcileError> {
        let _guard = self
            .locks
            .acquire(listing_id, self.lock_wait)
            .await
            .ok_or(ReconcileError::ConcurrencyConflict)?;

        let audit = tokio::time::timeout(self.storage_timeout, async {
            let listing = self
                .repo
                .get_listing(listing_id)
                .await?
                .ok_or(ReconcileError::ListingNotFound)?;

            // Settled listings freeze their cache at the sale outcome; only
            // an active auction can drift from its ledger.
            if listing.status != ListingStatus::Active {
                return Ok(CacheAudit {
                    listing_id,
                    consistent: true,
                    expected_current_bid: listing.current_bid,
                    expected_highest_bidder_id: listing.highest_bidder_id,
                    found_current_bid: listing.current_bid,
                    found_highest_bidder_id: listing.highest_bidder_id,
                });
            }

            let active_bids = self.repo.active_bids_for_listing(listing_id).await?;
            let audit = audit_cache(&listing, &active_bids);
            if !audit.consistent {
                tracing::warn!(
                    listing_id = %listing_id,
                    expected = ?audit.expected_current_bid,
                    found = ?audit.found_current_bid,
                    "listing cache drifted from ledger, repairing"
                );
                let expected = ExpectedCache::from_active_bids(&active_bids);
                if self.repo.repair_listing_cache(listing_id, &expected).await? {
                    self.notifier
                        .publish_change(ChangeEvent::listing(ChangeKind::Update, listing_id));
                }
            }

            Ok::<_, ReconcileError>(audit)
        })
        .await
        .map_err(|_| ReconcileError::Timeout)??;

        Ok(audit)
    }

    async fn notify(&self, notification: Notification) {
        if let Err(e) = self.notifier.enqueue(&notification).await {
            tracing::warn!(
                kind = notification.kind(),
                error = %e,
                "failed to enqueue notification"
            );
        }
    }
}
