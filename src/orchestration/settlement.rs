//! Settlement of expired auctions.
//!
//! Candidates are swept concurrently, each under its own listing lock, and
//! each terminal transition is claimed with a conditional update so a
//! re-sweep or a racing sweep settles every listing at most once.

use crate::config::Config;
use crate::db::Repository;
use crate::domain::{
    Amount, ChangeEvent, ChangeKind, Listing, ListingId, Notification, TimeMs, UserId,
};
use crate::notify::Notifier;
use crate::orchestration::locks::ListingLocks;
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// How one candidate listing came out of a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "disposition", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Disposition {
    /// Settled with a winner at the visible price.
    Sold { buyer_id: UserId, amount: Amount },
    /// Expired with no bids at all.
    ExpiredNoBids,
    /// Another sweep (or a relist) got there first.
    AlreadySettled,
    /// This listing failed; it stays active for the next run.
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingOutcome {
    pub listing_id: ListingId,
    #[serde(flatten)]
    pub disposition: Disposition,
}

/// Summary of one sweep run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementReport {
    pub swept_at: TimeMs,
    pub sold: usize,
    pub expired_no_bids: usize,
    pub already_settled: usize,
    pub failed: usize,
    pub outcomes: Vec<ListingOutcome>,
}

impl SettlementReport {
    fn new(swept_at: TimeMs, outcomes: Vec<ListingOutcome>) -> Self {
        let mut report = SettlementReport {
            swept_at,
            sold: 0,
            expired_no_bids: 0,
            already_settled: 0,
            failed: 0,
            outcomes,
        };
        for outcome in &report.outcomes {
            match outcome.disposition {
                Disposition::Sold { .. } => report.sold += 1,
                Disposition::ExpiredNoBids => report.expired_no_bids += 1,
                Disposition::AlreadySettled => report.already_settled += 1,
                Disposition::Failed { .. } => report.failed += 1,
            }
        }
        report
    }
}

#[derive(Clone)]
pub struct SettlementSweeper {
    repo: Arc<Repository>,
    notifier: Arc<dyn Notifier>,
    locks: Arc<ListingLocks>,
    lock_wait: Duration,
}

impl SettlementSweeper {
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
            lock_wait: Duration::from_millis(config.lock_wait_ms),
        }
    }

    /// Settle every active listing whose expiry has passed as of `now`.
    ///
    /// Listings are independent; one listing's failure lands in the report
    /// without touching the others.
    pub async fn sweep(&self, now: TimeMs) -> Result<SettlementReport, sqlx::Error> {
        let candidates = self.repo.find_expired_active(now).await?;
        if candidates.is_empty() {
            return Ok(SettlementReport::new(now, Vec::new()));
        }

        tracing::info!(candidates = candidates.len(), "settlement sweep started");
        let outcomes = join_all(
            candidates
                .iter()
                .map(|listing| self.settle_listing(listing, now)),
        )
        .await;

        let report = SettlementReport::new(now, outcomes);
        tracing::info!(
            sold = report.sold,
            expired_no_bids = report.expired_no_bids,
            already_settled = report.already_settled,
            failed = report.failed,
            "settlement sweep finished"
        );
        Ok(report)
    }

    /// Run `sweep` forever on a fixed interval. Returns `None` when the
    /// interval is zero, leaving settlement to the HTTP trigger.
    pub fn spawn_interval(self, interval_secs: u64) -> Option<tokio::task::JoinHandle<()>> {
        if interval_secs == 0 {
            tracing::info!("background settlement sweeper disabled");
            return None;
        }

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.sweep(TimeMs::now()).await {
                    tracing::error!(error = %e, "settlement sweep failed");
                }
            }
        }))
    }

    async fn settle_listing(&self, listing: &Listing, now: TimeMs) -> ListingOutcome {
        let disposition = match self.try_settle(listing, now).await {
            Ok(disposition) => disposition,
            Err(e) => {
                tracing::warn!(
                    listing_id = %listing.id,
                    error = %e,
                    "settlement failed, listing stays active for the next sweep"
                );
                Disposition::Failed {
                    error: e.to_string(),
                }
            }
        };
        ListingOutcome {
            listing_id: listing.id,
            disposition,
        }
    }

    async fn try_settle(&self, listing: &Listing, now: TimeMs) -> Result<Disposition, sqlx::Error> {
        let Some(_guard) = self.locks.acquire(listing.id, self.lock_wait).await else {
            return Ok(Disposition::Failed {
                error: "timed out waiting for the listing lock".to_string(),
            });
        };

        // ledger order: best ceiling first, earliest bid breaking ties
        let bids = self.repo.active_bids_for_listing(listing.id).await?;

        match bids.first() {
            None => {
                if !self.repo.mark_listing_expired(listing.id).await? {
                    return Ok(Disposition::AlreadySettled);
                }
                self.notify(Notification::AuctionEndedNoBids {
                    user_id: listing.seller_id,
                    listing_id: listing.id,
                    listing_title: listing.title.clone(),
                })
                .await;
                self.notifier
                    .publish_change(ChangeEvent::listing(ChangeKind::Update, listing.id));
                Ok(Disposition::ExpiredNoBids)
            }
            Some(winner) => {
                // the winner pays the visible price, never the private ceiling
                let claimed = self
                    .repo
                    .settle_listing_sold_atomic(
                        listing.id,
                        winner.id,
                        winner.bidder_id,
                        winner.amount,
                        now,
                    )
                    .await?;
                if !claimed {
                    return Ok(Disposition::AlreadySettled);
                }

                self.notify(Notification::AuctionSold {
                    user_id: listing.seller_id,
                    listing_id: listing.id,
                    listing_title: listing.title.clone(),
                    sale_amount: winner.amount,
                    buyer_id: winner.bidder_id,
                })
                .await;
                self.notify(Notification::AuctionWon {
                    user_id: winner.bidder_id,
                    listing_id: listing.id,
                    listing_title: listing.title.clone(),
                    sale_amount: winner.amount,
                })
                .await;
                self.notifier
                    .publish_change(ChangeEvent::listing(ChangeKind::Update, listing.id));
                self.notifier
                    .publish_change(ChangeEvent::bid(ChangeKind::Update, listing.id));

                tracing::info!(
                    listing_id = %listing.id,
                    buyer_id = %winner.bidder_id,
                    sale_amount = %winner.amount,
                    "auction settled"
                );
                Ok(Disposition::Sold {
                    buyer_id: winner.bidder_id,
                    amount: winner.amount,
                })
            }
        }
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
