//! Coordination layer: per-listing locking, bid intake, settlement.

pub mod auctioneer;
pub mod locks;
pub mod settlement;

pub use auctioneer::{Auctioneer, BidReceipt};
pub use locks::ListingLocks;
pub use settlement::{Disposition, ListingOutcome, SettlementReport, SettlementSweeper};
