//! # Real-Time Errors
//!
//! Error types for the change feed.

use thiserror::Error;

/// Result type for change-feed operations
pub type RealtimeResult<T> = Result<T, RealtimeError>;

/// Change-feed errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RealtimeError {
    /// Subscription not found
    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(String),

    /// Too many subscriptions on one collection
    #[error("Too many subscriptions (max: {0})")]
    TooManySubscriptions(usize),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RealtimeError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            RealtimeError::SubscriptionNotFound(_) => "RTM_FEED_SUBSCRIPTION_NOT_FOUND",
            RealtimeError::TooManySubscriptions(_) => "RTM_FEED_TOO_MANY_SUBSCRIPTIONS",
            RealtimeError::Internal(_) => "RTM_FEED_INTERNAL",
        }
    }
}
