//! WebSocket transport over `tokio-tungstenite`.

use crate::error::{ChannelError, ChannelResult};
use crate::transport::{Connector, Socket, SocketEvent, SocketEvents};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::debug;
use url::Url;

/// Connector that opens real WebSocket connections.
///
/// Each connection runs on its own task; must be used inside a tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    /// Creates a connector.
    pub fn new() -> Self {
        Self
    }
}

impl Connector for WebSocketConnector {
    fn connect(&self, url: &str, events: SocketEvents) -> ChannelResult<Box<dyn Socket>> {
        let url = parse_stream_url(url)?;
        let (outgoing, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_connection(url, events, rx));
        Ok(Box::new(WebSocket {
            outgoing: Some(outgoing),
            task,
        }))
    }
}

/// Parses a `ws://` or `wss://` URL. Anything else can never connect.
fn parse_stream_url(url: &str) -> ChannelResult<Url> {
    let parsed = Url::parse(url)
        .map_err(|e| ChannelError::transport_fatal(format!("invalid url {url}: {e}")))?;
    match parsed.scheme() {
        "ws" | "wss" => Ok(parsed),
        scheme => Err(ChannelError::transport_fatal(format!(
            "unsupported url scheme {scheme:?} in {url}"
        ))),
    }
}

struct WebSocket {
    outgoing: Option<mpsc::UnboundedSender<String>>,
    task: JoinHandle<()>,
}

impl Socket for WebSocket {
    fn send(&mut self, text: String) -> ChannelResult<()> {
        let outgoing = self.outgoing.as_ref().ok_or(ChannelError::NotConnected)?;
        outgoing
            .send(text)
            .map_err(|_| ChannelError::transport_retryable("connection task stopped"))
    }

    fn close(&mut self) {
        // Dropping the sender makes the task send a close frame and exit.
        self.outgoing = None;
    }
}

impl Drop for WebSocket {
    fn drop(&mut self) {
        if self.outgoing.is_some() {
            self.task.abort();
        }
    }
}

async fn run_connection(
    url: Url,
    events: SocketEvents,
    mut outgoing: mpsc::UnboundedReceiver<String>,
) {
    let stream = match connect_async(url.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(e) => {
            events.emit(SocketEvent::Error(e.to_string()));
            return;
        }
    };
    debug!(url = %url, connection = events.connection(), "websocket open");
    events.emit(SocketEvent::Opened);

    let (mut write, mut read) = stream.split();
    loop {
        tokio::select! {
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    events.emit(SocketEvent::Message(text));
                }
                Some(Ok(Message::Close(frame))) => {
                    events.emit(SocketEvent::Closed {
                        reason: frame.map(|f| f.reason.to_string()),
                    });
                    return;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    events.emit(SocketEvent::Error(e.to_string()));
                    return;
                }
                None => {
                    events.emit(SocketEvent::Closed { reason: None });
                    return;
                }
            },
            text = outgoing.recv() => match text {
                Some(text) => {
                    if let Err(e) = write.send(Message::Text(text)).await {
                        events.emit(SocketEvent::Error(e.to_string()));
                        return;
                    }
                }
                None => {
                    let _ = write.close().await;
                    return;
                }
            },
        }
    }
}
