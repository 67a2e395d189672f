//! Error types for the engine.

use refsync_protocol::EventKind;
use refsync_store::StoreError;
use thiserror::Error;

/// Result type for notification channel operations.
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Result type for merge operations.
pub type MergeResult<T> = Result<T, MergeError>;

/// Errors reported by the notification channel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// A request needs an open connection.
    #[error("not connected to server")]
    NotConnected,

    /// The server did not acknowledge in time.
    #[error("operation timed out")]
    TimedOut,

    /// The outgoing message could not be encoded.
    #[error("cannot encode message: {0}")]
    CannotEncodeMessage(String),

    /// A request waiting for the same response kind is already outstanding.
    #[error("a request awaiting {0} is already pending")]
    RequestPending(EventKind),

    /// The operation does not apply to the current connection state.
    #[error("invalid state for this operation: {0}")]
    InvalidState(String),

    /// The operation was superseded by a teardown.
    #[error("operation cancelled")]
    Cancelled,

    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The channel task has stopped.
    #[error("notification channel closed")]
    Closed,
}

impl ChannelError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            ChannelError::Transport { retryable, .. } => *retryable,
            ChannelError::TimedOut | ChannelError::NotConnected => true,
            _ => false,
        }
    }
}

/// Errors that abort a merge batch.
///
/// Conflicts are not errors; they are returned in the merge outcome.
#[derive(Error, Debug)]
pub enum MergeError {
    /// Store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A snapshot is structurally invalid.
    #[error("invalid snapshot {key:?}: {reason}")]
    InvalidSnapshot {
        /// Key of the snapshot.
        key: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A snapshot belongs to a different library than its batch.
    #[error("snapshot {key} belongs to library {found}, batch is for {expected}")]
    LibraryMismatch {
        /// Key of the snapshot.
        key: String,
        /// Library of the batch.
        expected: String,
        /// Library of the snapshot.
        found: String,
    },
}

impl MergeError {
    /// Creates an invalid snapshot error.
    pub fn invalid_snapshot(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSnapshot {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(ChannelError::transport_retryable("connection lost").is_retryable());
        assert!(!ChannelError::transport_fatal("invalid certificate").is_retryable());
        assert!(ChannelError::TimedOut.is_retryable());
        assert!(!ChannelError::Cancelled.is_retryable());
        assert!(!ChannelError::RequestPending(EventKind::Connected).is_retryable());
    }

    #[test]
    fn error_display() {
        assert_eq!(ChannelError::NotConnected.to_string(), "not connected to server");
        assert_eq!(
            ChannelError::RequestPending(EventKind::SubscriptionCreated).to_string(),
            "a request awaiting subscriptionCreated is already pending"
        );

        let err = MergeError::LibraryMismatch {
            key: "ABCD2345".into(),
            expected: "u1".into(),
            found: "g2".into(),
        };
        assert!(err.to_string().contains("g2"));
    }
}
