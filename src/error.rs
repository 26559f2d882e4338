use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::domain::Amount;

/// Why a bid submission was refused.
///
/// The first four variants are validation outcomes and mutate nothing.
/// The last three are transient or infrastructural; callers may retry them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BidError {
    #[error("listing does not exist or is not accepting bids")]
    ListingNotBiddable,
    #[error("sellers may not bid on their own listings")]
    SelfBidForbidden,
    #[error("maximum bid must be at least {minimum}")]
    BidTooLow { minimum: Amount },
    #[error("new maximum must exceed your previous maximum of {current_maximum}")]
    MustIncreasePreviousMaximum { current_maximum: Amount },
    #[error("the auction is busy, try again")]
    ConcurrencyConflict,
    #[error("storage timed out")]
    Timeout,
    #[error("storage unavailable")]
    StorageUnavailable,
}

impl BidError {
    /// Stable machine-readable code carried in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            BidError::ListingNotBiddable => "LISTING_NOT_BIDDABLE",
            BidError::SelfBidForbidden => "SELF_BID_FORBIDDEN",
            BidError::BidTooLow { .. } => "BID_TOO_LOW",
            BidError::MustIncreasePreviousMaximum { .. } => "MUST_INCREASE_MAXIMUM",
            BidError::ConcurrencyConflict => "CONCURRENCY_CONFLICT",
            BidError::Timeout => "TIMEOUT",
            BidError::StorageUnavailable => "STORAGE_UNAVAILABLE",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            BidError::ListingNotBiddable => StatusCode::CONFLICT,
            BidError::SelfBidForbidden => StatusCode::FORBIDDEN,
            BidError::BidTooLow { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            BidError::MustIncreasePreviousMaximum { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            BidError::ConcurrencyConflict => StatusCode::SERVICE_UNAVAILABLE,
            BidError::Timeout => StatusCode::SERVICE_UNAVAILABLE,
            BidError::StorageUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for BidError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut => BidError::Timeout,
            sqlx::Error::Database(db) => {
                // SQLITE_BUSY (5) and SQLITE_LOCKED (6), including their
                // extended codes, mean another writer held the database.
                let base = db
                    .code()
                    .and_then(|code| code.parse::<i64>().ok())
                    .map(|code| code & 0xff);
                match base {
                    Some(5) | Some(6) => BidError::ConcurrencyConflict,
                    _ => {
                        tracing::error!(error = %err, "storage failure");
                        BidError::StorageUnavailable
                    }
                }
            }
            _ => {
                tracing::error!(error = %err, "storage failure");
                BidError::StorageUnavailable
            }
        }
    }
}

impl IntoResponse for BidError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = json!({
            "error": self.to_string(),
            "code": self.code(),
        });
        match &self {
            BidError::BidTooLow { minimum } => {
                body["minimumBid"] = json!(minimum);
            }
            BidError::MustIncreasePreviousMaximum { current_maximum } => {
                body["currentMaximum"] = json!(current_maximum);
            }
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}

/// Why a relist was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelistError {
    #[error("listing not found")]
    ListingNotFound,
    #[error("only the seller may relist a listing")]
    NotSeller,
    #[error("listing can no longer be relisted")]
    NotRelistable,
    #[error("new expiry must be in the future")]
    ExpiryNotInFuture,
    #[error("the listing is busy, try again")]
    ConcurrencyConflict,
    #[error("storage timed out")]
    Timeout,
    #[error("storage unavailable")]
    StorageUnavailable,
}

impl RelistError {
    /// Stable machine-readable code carried in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            RelistError::ListingNotFound => "LISTING_NOT_FOUND",
            RelistError::NotSeller => "NOT_SELLER",
            RelistError::NotRelistable => "NOT_RELISTABLE",
            RelistError::ExpiryNotInFuture => "EXPIRY_NOT_IN_FUTURE",
            RelistError::ConcurrencyConflict => "CONCURRENCY_CONFLICT",
            RelistError::Timeout => "TIMEOUT",
            RelistError::StorageUnavailable => "STORAGE_UNAVAILABLE",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            RelistError::ListingNotFound => StatusCode::NOT_FOUND,
            RelistError::NotSeller => StatusCode::FORBIDDEN,
            RelistError::NotRelistable => StatusCode::CONFLICT,
            RelistError::ExpiryNotInFuture => StatusCode::UNPROCESSABLE_ENTITY,
            RelistError::ConcurrencyConflict => StatusCode::SERVICE_UNAVAILABLE,
            RelistError::Timeout => StatusCode::SERVICE_UNAVAILABLE,
            RelistError::StorageUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for RelistError {
    fn from(err: sqlx::Error) -> Self {
        match BidError::from(err) {
            BidError::ConcurrencyConflict => RelistError::ConcurrencyConflict,
            BidError::Timeout => RelistError::Timeout,
            _ => RelistError::StorageUnavailable,
        }
    }
}

impl IntoResponse for RelistError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.to_string(),
            "code": self.code(),
        }));

        (self.status(), body).into_response()
    }
}

/// Why a cache reconciliation could not run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error("listing not found")]
    ListingNotFound,
    #[error("the listing is busy, try again")]
    ConcurrencyConflict,
    #[error("storage timed out")]
    Timeout,
    #[error("storage unavailable")]
    StorageUnavailable,
}

impl From<sqlx::Error> for ReconcileError {
    fn from(err: sqlx::Error) -> Self {
        match BidError::from(err) {
            BidError::ConcurrencyConflict => ReconcileError::ConcurrencyConflict,
            BidError::Timeout => ReconcileError::Timeout,
            _ => ReconcileError::StorageUnavailable,
        }
    }
}

impl IntoResponse for ReconcileError {
    fn into_response(self) -> Response {
        let status = match self {
            ReconcileError::ListingNotFound => StatusCode::NOT_FOUND,
            ReconcileError::ConcurrencyConflict => StatusCode::SERVICE_UNAVAILABLE,
            ReconcileError::Timeout => StatusCode::SERVICE_UNAVAILABLE,
            ReconcileError::StorageUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
