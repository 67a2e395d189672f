//! Protocol errors.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while encoding or decoding protocol payloads.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The payload is not a JSON object with a string `event` field.
    #[error("missing event field")]
    MissingEvent,

    /// The `event` field names a kind this client does not understand.
    #[error("unknown event: {0}")]
    UnknownEvent(String),

    /// The payload names a known event but its body does not match.
    #[error("malformed {event} payload: {source}")]
    Malformed {
        /// Event name from the envelope.
        event: String,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },

    /// The payload is not valid JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// A message could not be encoded.
    #[error("cannot encode message: {0}")]
    Encode(#[source] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(ProtocolError::MissingEvent.to_string(), "missing event field");
        assert_eq!(
            ProtocolError::UnknownEvent("ping".into()).to_string(),
            "unknown event: ping"
        );
    }
}
