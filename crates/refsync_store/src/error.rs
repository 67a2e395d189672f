//! Error types for the refsync store.

use crate::types::EntityKey;
use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error while loading or persisting the graph.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The persisted graph could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Item not found.
    #[error("item not found: {key}")]
    ItemNotFound {
        /// The key that was looked up.
        key: EntityKey,
    },

    /// Collection not found.
    #[error("collection not found: {key}")]
    CollectionNotFound {
        /// The key that was looked up.
        key: EntityKey,
    },

    /// A child entity referenced a parent that must already exist.
    #[error("missing parent {parent} for {child}")]
    MissingParent {
        /// The parent that could not be found.
        parent: EntityKey,
        /// Key of the entity being created.
        child: String,
    },

    /// Invalid item type schema.
    #[error("invalid schema: {message}")]
    InvalidSchema {
        /// Description of the problem.
        message: String,
    },

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },
}

impl StoreError {
    /// Creates an item not found error.
    pub fn item_not_found(key: &EntityKey) -> Self {
        Self::ItemNotFound { key: key.clone() }
    }

    /// Creates a collection not found error.
    pub fn collection_not_found(key: &EntityKey) -> Self {
        Self::CollectionNotFound { key: key.clone() }
    }

    /// Creates an invalid schema error.
    pub fn invalid_schema(message: impl Into<String>) -> Self {
        Self::InvalidSchema {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LibraryId;

    #[test]
    fn error_display() {
        let key = EntityKey::new(LibraryId::new("u1"), "AAAA2222");
        assert_eq!(
            StoreError::item_not_found(&key).to_string(),
            "item not found: u1/AAAA2222"
        );

        let err = StoreError::MissingParent {
            parent: key,
            child: "BBBB3333".into(),
        };
        assert!(err.to_string().contains("BBBB3333"));
    }
}
