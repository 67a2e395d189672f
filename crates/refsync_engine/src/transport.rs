//! Transport abstraction for the notification channel.
//!
//! A [`Connector`] opens duplex text connections. The channel never awaits
//! the network: a connector returns a [`Socket`] immediately and reports
//! everything that happens on the connection through [`SocketEvents`].

use crate::error::{ChannelError, ChannelResult};
use refsync_protocol::ServerMessage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Something that happened on a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// The connection handshake completed.
    Opened,
    /// A text frame arrived.
    Message(String),
    /// The peer closed the connection.
    Closed {
        /// Close reason, if the peer gave one.
        reason: Option<String>,
    },
    /// The connection failed.
    Error(String),
}

/// Sink for the events of one connection.
///
/// Each connection gets its own id so events from a replaced connection can
/// be recognized and ignored.
#[derive(Debug, Clone)]
pub struct SocketEvents {
    connection: u64,
    tx: mpsc::UnboundedSender<(u64, SocketEvent)>,
}

impl SocketEvents {
    pub(crate) fn new(connection: u64, tx: mpsc::UnboundedSender<(u64, SocketEvent)>) -> Self {
        Self { connection, tx }
    }

    /// Returns the connection id.
    pub fn connection(&self) -> u64 {
        self.connection
    }

    /// Reports an event. Returns false if the channel has stopped.
    pub fn emit(&self, event: SocketEvent) -> bool {
        self.tx.send((self.connection, event)).is_ok()
    }
}

/// An open (or opening) connection.
pub trait Socket: Send {
    /// Queues a text frame.
    fn send(&mut self, text: String) -> ChannelResult<()>;

    /// Closes the connection. Further sends fail.
    fn close(&mut self);
}

/// Opens connections.
pub trait Connector: Send + Sync + 'static {
    /// Starts connecting to `url`, reporting progress through `events`.
    ///
    /// Fails up front only when the attempt cannot even start; a
    /// non-retryable error stops the channel from trying again.
    fn connect(&self, url: &str, events: SocketEvents) -> ChannelResult<Box<dyn Socket>>;
}

/// In-process connector for tests.
///
/// Every `connect` call hands a [`MockConnection`] to the paired
/// [`MockServer`], which plays the server side.
#[derive(Debug, Clone)]
pub struct MockConnector {
    accepts: mpsc::UnboundedSender<MockConnection>,
}

impl MockConnector {
    /// Creates a connector and the server end that observes its connections.
    pub fn new() -> (Self, MockServer) {
        let (accepts, incoming) = mpsc::unbounded_channel();
        (Self { accepts }, MockServer { incoming })
    }
}

impl Connector for MockConnector {
    fn connect(&self, url: &str, events: SocketEvents) -> ChannelResult<Box<dyn Socket>> {
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        let fail_sends = Arc::new(AtomicBool::new(false));

        let connection = MockConnection {
            url: url.to_string(),
            events,
            sent: sent_rx,
            closed: Arc::clone(&closed),
            fail_sends: Arc::clone(&fail_sends),
        };
        // A dropped server end just means nobody answers.
        let _ = self.accepts.send(connection);

        Ok(Box::new(MockSocket {
            sent: sent_tx,
            closed,
            fail_sends,
        }))
    }
}

/// Server side of a [`MockConnector`].
#[derive(Debug)]
pub struct MockServer {
    incoming: mpsc::UnboundedReceiver<MockConnection>,
}

impl MockServer {
    /// Waits for the next connection attempt.
    pub async fn accept(&mut self) -> Option<MockConnection> {
        self.incoming.recv().await
    }

    /// Returns a pending connection attempt without waiting.
    pub fn try_accept(&mut self) -> Option<MockConnection> {
        self.incoming.try_recv().ok()
    }
}

/// Server-side view of one mock connection.
#[derive(Debug)]
pub struct MockConnection {
    url: String,
    events: SocketEvents,
    sent: mpsc::UnboundedReceiver<String>,
    closed: Arc<AtomicBool>,
    fail_sends: Arc<AtomicBool>,
}

impl MockConnection {
    /// URL the client connected to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Completes the handshake.
    pub fn open(&self) {
        self.events.emit(SocketEvent::Opened);
    }

    /// Delivers a raw text frame to the client.
    pub fn deliver(&self, text: impl Into<String>) {
        self.events.emit(SocketEvent::Message(text.into()));
    }

    /// Delivers a server message to the client.
    pub fn send_message(&self, message: &ServerMessage) {
        if let Ok(text) = message.encode() {
            self.deliver(text);
        }
    }

    /// Closes the connection from the server side.
    pub fn drop_connection(&self, reason: Option<&str>) {
        self.closed.store(true, Ordering::SeqCst);
        self.events.emit(SocketEvent::Closed {
            reason: reason.map(str::to_string),
        });
    }

    /// Fails the connection with a transport error.
    pub fn fail(&self, error: impl Into<String>) {
        self.closed.store(true, Ordering::SeqCst);
        self.events.emit(SocketEvent::Error(error.into()));
    }

    /// Makes subsequent client sends fail.
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Waits for the next frame the client sent.
    pub async fn next_sent(&mut self) -> Option<String> {
        self.sent.recv().await
    }

    /// Returns the next frame the client sent, without waiting.
    pub fn try_next_sent(&mut self) -> Option<String> {
        self.sent.try_recv().ok()
    }

    /// Returns true once either side closed the connection.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct MockSocket {
    sent: mpsc::UnboundedSender<String>,
    closed: Arc<AtomicBool>,
    fail_sends: Arc<AtomicBool>,
}

impl Socket for MockSocket {
    fn send(&mut self, text: String) -> ChannelResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ChannelError::NotConnected);
        }
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(ChannelError::transport_retryable("send failed"));
        }
        self.sent
            .send(text)
            .map_err(|_| ChannelError::transport_retryable("peer gone"))
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_round_trip() {
        let (connector, mut server) = MockConnector::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut socket = connector
            .connect("ws://mock", SocketEvents::new(3, tx))
            .unwrap();
        let mut conn = server.accept().await.unwrap();
        assert_eq!(conn.url(), "ws://mock");

        socket.send("hello".into()).unwrap();
        assert_eq!(conn.next_sent().await.as_deref(), Some("hello"));

        conn.deliver(r#"{"event":"connected"}"#);
        let (id, event) = rx.recv().await.unwrap();
        assert_eq!(id, 3);
        assert_eq!(event, SocketEvent::Message(r#"{"event":"connected"}"#.into()));

        socket.close();
        assert!(conn.is_closed());
        assert_eq!(socket.send("late".into()), Err(ChannelError::NotConnected));
    }

    #[tokio::test]
    async fn failing_sends() {
        let (connector, mut server) = MockConnector::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        let mut socket = connector
            .connect("ws://mock", SocketEvents::new(1, tx))
            .unwrap();
        let conn = server.accept().await.unwrap();
        conn.fail_sends(true);

        assert!(matches!(
            socket.send("x".into()),
            Err(ChannelError::Transport { retryable: true, .. })
        ));
    }
}
