//! Notification channel envelopes.
//!
//! Every frame is a JSON object whose `event` field names the message kind.

use crate::error::{ProtocolError, ProtocolResult};
use refsync_store::LibraryId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A message sent by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Starts a subscription for the key's libraries.
    Subscribe {
        /// API key to authenticate with.
        #[serde(rename = "apiKey")]
        api_key: String,
    },
    /// Ends the subscription of an API key.
    Unsubscribe {
        /// API key whose subscription is deleted.
        #[serde(rename = "apiKey")]
        api_key: String,
    },
}

impl ClientMessage {
    /// Encodes the message as a JSON text frame.
    pub fn encode(&self) -> ProtocolResult<String> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }

    /// Returns the server event that acknowledges this message.
    #[must_use]
    pub fn response_kind(&self) -> EventKind {
        match self {
            ClientMessage::Subscribe { .. } => EventKind::SubscriptionCreated,
            ClientMessage::Unsubscribe { .. } => EventKind::SubscriptionDeleted,
        }
    }
}

/// A subscription accepted by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionInfo {
    /// API key of the subscription.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Topics the subscription covers.
    #[serde(default)]
    pub topics: Vec<String>,
}

/// A subscription the server refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionError {
    /// API key the error refers to.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Topic the error refers to.
    #[serde(default)]
    pub topic: Option<String>,
    /// Server-provided reason.
    pub error: String,
}

/// A message sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ServerMessage {
    /// The connection is open and ready for a subscription.
    Connected {
        /// Reconnect delay suggested by the server, in milliseconds.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        retry: Option<u64>,
    },
    /// Acknowledges `subscribe`.
    SubscriptionCreated {
        /// Accepted subscriptions.
        #[serde(default)]
        subscriptions: Vec<SubscriptionInfo>,
        /// Partial failures.
        #[serde(default)]
        errors: Vec<SubscriptionError>,
    },
    /// Acknowledges `unsubscribe`.
    SubscriptionDeleted,
    /// The key gained access to a library.
    #[serde(rename_all = "camelCase")]
    TopicAdded {
        /// Affected library.
        #[serde(default)]
        library_id: Option<LibraryId>,
        /// Library version after the change.
        #[serde(default)]
        version: Option<u64>,
    },
    /// The key lost access to a library.
    #[serde(rename_all = "camelCase")]
    TopicRemoved {
        /// Affected library.
        #[serde(default)]
        library_id: Option<LibraryId>,
        /// Library version after the change.
        #[serde(default)]
        version: Option<u64>,
    },
    /// A library's content changed.
    #[serde(rename_all = "camelCase")]
    TopicUpdated {
        /// Affected library.
        #[serde(default)]
        library_id: Option<LibraryId>,
        /// Library version after the change.
        #[serde(default)]
        version: Option<u64>,
    },
}

impl ServerMessage {
    /// Decodes a JSON text frame.
    ///
    /// Distinguishes frames without an event, frames with an unknown event,
    /// and known events with a malformed body.
    pub fn decode(text: &str) -> ProtocolResult<Self> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(ProtocolError::InvalidJson)?;
        let event = value
            .get("event")
            .and_then(serde_json::Value::as_str)
            .ok_or(ProtocolError::MissingEvent)?
            .to_string();

        if EventKind::from_wire(&event).is_none() {
            return Err(ProtocolError::UnknownEvent(event));
        }

        serde_json::from_value(value).map_err(|source| ProtocolError::Malformed { event, source })
    }

    /// Encodes the message as a JSON text frame.
    pub fn encode(&self) -> ProtocolResult<String> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }

    /// Returns the kind of this message.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            ServerMessage::Connected { .. } => EventKind::Connected,
            ServerMessage::SubscriptionCreated { .. } => EventKind::SubscriptionCreated,
            ServerMessage::SubscriptionDeleted => EventKind::SubscriptionDeleted,
            ServerMessage::TopicAdded { .. } => EventKind::TopicAdded,
            ServerMessage::TopicRemoved { .. } => EventKind::TopicRemoved,
            ServerMessage::TopicUpdated { .. } => EventKind::TopicUpdated,
        }
    }

    /// Returns the library change carried by a topic event.
    #[must_use]
    pub fn library_change(&self) -> Option<(LibraryChange, Option<&LibraryId>, Option<u64>)> {
        match self {
            ServerMessage::TopicAdded {
                library_id,
                version,
            } => Some((LibraryChange::Added, library_id.as_ref(), *version)),
            ServerMessage::TopicRemoved {
                library_id,
                version,
            } => Some((LibraryChange::Removed, library_id.as_ref(), *version)),
            ServerMessage::TopicUpdated {
                library_id,
                version,
            } => Some((LibraryChange::Updated, library_id.as_ref(), *version)),
            _ => None,
        }
    }
}

/// Server event kinds.
///
/// Outstanding requests are keyed by the kind of the response they wait for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    /// `connected`
    Connected,
    /// `subscriptionCreated`
    SubscriptionCreated,
    /// `subscriptionDeleted`
    SubscriptionDeleted,
    /// `topicAdded`
    TopicAdded,
    /// `topicRemoved`
    TopicRemoved,
    /// `topicUpdated`
    TopicUpdated,
}

impl EventKind {
    /// Returns the wire name of the event.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            EventKind::Connected => "connected",
            EventKind::SubscriptionCreated => "subscriptionCreated",
            EventKind::SubscriptionDeleted => "subscriptionDeleted",
            EventKind::TopicAdded => "topicAdded",
            EventKind::TopicRemoved => "topicRemoved",
            EventKind::TopicUpdated => "topicUpdated",
        }
    }

    /// Parses a wire name.
    #[must_use]
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "connected" => Some(EventKind::Connected),
            "subscriptionCreated" => Some(EventKind::SubscriptionCreated),
            "subscriptionDeleted" => Some(EventKind::SubscriptionDeleted),
            "topicAdded" => Some(EventKind::TopicAdded),
            "topicRemoved" => Some(EventKind::TopicRemoved),
            "topicUpdated" => Some(EventKind::TopicUpdated),
            _ => None,
        }
    }

    /// Returns true for kinds that acknowledge a client request.
    #[must_use]
    pub const fn is_acknowledgement(self) -> bool {
        matches!(
            self,
            EventKind::Connected | EventKind::SubscriptionCreated | EventKind::SubscriptionDeleted
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to a library, as reported by a topic event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LibraryChange {
    /// Access granted.
    Added,
    /// Access revoked.
    Removed,
    /// Content changed.
    Updated,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_encoding() {
        let msg = ClientMessage::Subscribe {
            api_key: "k1".into(),
        };
        assert_eq!(msg.encode().unwrap(), r#"{"event":"subscribe","apiKey":"k1"}"#);
        assert_eq!(msg.response_kind(), EventKind::SubscriptionCreated);
    }

    #[test]
    fn test_decode_acknowledgements() {
        let msg = ServerMessage::decode(r#"{"event":"connected","retry":10000}"#).unwrap();
        assert_eq!(msg, ServerMessage::Connected { retry: Some(10000) });

        let msg = ServerMessage::decode(r#"{"event":"subscriptionCreated"}"#).unwrap();
        assert_eq!(msg.kind(), EventKind::SubscriptionCreated);

        let msg = ServerMessage::decode(r#"{"event":"subscriptionDeleted"}"#).unwrap();
        assert_eq!(msg, ServerMessage::SubscriptionDeleted);
    }

    #[test]
    fn test_decode_topic() {
        let msg =
            ServerMessage::decode(r#"{"event":"topicUpdated","libraryId":"L1","version":42}"#)
                .unwrap();
        let (change, library, version) = msg.library_change().unwrap();
        assert_eq!(change, LibraryChange::Updated);
        assert_eq!(library, Some(&LibraryId::new("L1")));
        assert_eq!(version, Some(42));

        let msg = ServerMessage::decode(r#"{"event":"topicRemoved"}"#).unwrap();
        let (change, library, _) = msg.library_change().unwrap();
        assert_eq!(change, LibraryChange::Removed);
        assert!(library.is_none());
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(
            ServerMessage::decode("not json"),
            Err(ProtocolError::InvalidJson(_))
        ));
        assert!(matches!(
            ServerMessage::decode(r#"{"libraryId":"L1"}"#),
            Err(ProtocolError::MissingEvent)
        ));
        assert!(matches!(
            ServerMessage::decode(r#"{"event":"ping"}"#),
            Err(ProtocolError::UnknownEvent(name)) if name == "ping"
        ));
        assert!(matches!(
            ServerMessage::decode(r#"{"event":"topicUpdated","version":"x"}"#),
            Err(ProtocolError::Malformed { .. })
        ));
    }

    #[test]
    fn test_event_kind_wire_names() {
        for kind in [
            EventKind::Connected,
            EventKind::SubscriptionCreated,
            EventKind::SubscriptionDeleted,
            EventKind::TopicAdded,
            EventKind::TopicRemoved,
            EventKind::TopicUpdated,
        ] {
            assert_eq!(EventKind::from_wire(kind.as_str()), Some(kind));
        }
        assert!(EventKind::Connected.is_acknowledgement());
        assert!(!EventKind::TopicUpdated.is_acknowledgement());
    }

    proptest::proptest! {
        #[test]
        fn decode_never_panics(text in ".*") {
            let _ = ServerMessage::decode(&text);
        }

        #[test]
        fn topic_library_id_survives(id in "[A-Za-z0-9]{1,12}", version in 0u64..1_000_000) {
            let frame = format!(r#"{{"event":"topicAdded","libraryId":"{id}","version":{version}}}"#);
            let msg = ServerMessage::decode(&frame).unwrap();
            let (_, library, v) = msg.library_change().unwrap();
            proptest::prop_assert_eq!(library.map(LibraryId::as_str), Some(id.as_str()));
            proptest::prop_assert_eq!(v, Some(version));
        }
    }
}
