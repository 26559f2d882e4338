pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod notify;
pub mod orchestration;

pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{
    Amount, Bid, BidStatus, Listing, ListingId, ListingStatus, Notification, TimeMs, UserId,
};
pub use error::{AppError, BidError, ReconcileError, RelistError};
pub use notify::{MockNotifier, Notifier, OutboxNotifier};
pub use orchestration::{
    Auctioneer, BidReceipt, ListingLocks, SettlementReport, SettlementSweeper,
};
