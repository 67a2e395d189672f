//! The notification channel.
//!
//! One actor task owns the connection state. Public calls enqueue commands;
//! socket events and timer firings arrive on internal queues drained by the
//! same task, so no state is ever shared across threads.
//!
//! ```text
//!  Disconnected ──connect──▶ Connecting ──connected──▶ Subscribing
//!       ▲                        │                          │
//!       │  timeout (retry)       │                 subscriptionCreated
//!       ├────────────────────────┴──────────────────────────┤
//!       │                                                   ▼
//!       └──── drop in any state (reconnect) / teardown ◀── Connected
//! ```

use crate::config::ChannelConfig;
use crate::error::{ChannelError, ChannelResult};
use crate::transport::{Connector, Socket, SocketEvent, SocketEvents};
use refsync_protocol::{ClientMessage, EventKind, LibraryChange, ServerMessage};
use refsync_store::LibraryId;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Connection state of the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No connection. A reconnect may be scheduled.
    Disconnected,
    /// Socket opening, waiting for `connected`.
    Connecting,
    /// `subscribe` sent, waiting for `subscriptionCreated`.
    Subscribing,
    /// Subscribed and receiving topic events.
    Connected,
}

impl ConnectionState {
    /// Returns true while a connection attempt is in flight.
    pub fn is_attempting(self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Subscribing)
    }
}

/// Observable channel status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelStatus {
    /// Current connection state.
    pub state: ConnectionState,
    /// Failed attempts since the last successful subscription.
    pub retry_count: usize,
}

impl ChannelStatus {
    const fn initial() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            retry_count: 0,
        }
    }
}

/// A library changed on the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryChanged {
    /// The affected library, when the server named one.
    pub library: Option<LibraryId>,
    /// What happened.
    pub change: LibraryChange,
    /// Library version after the change.
    pub version: Option<u64>,
}

/// Completion of a `connect` or `disconnect` call.
///
/// Resolves exactly once. Dropping it does not cancel the operation.
#[derive(Debug)]
#[must_use = "the result of the operation is only observable through this future"]
pub struct Settled {
    rx: oneshot::Receiver<ChannelResult<()>>,
}

impl Future for Settled {
    type Output = ChannelResult<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.unwrap_or(Err(ChannelError::Closed)))
    }
}

type Reply = oneshot::Sender<ChannelResult<()>>;

enum Command {
    Connect { api_key: String, reply: Reply },
    Disconnect { api_key: Option<String>, reply: Reply },
}

#[derive(Debug, Clone, Copy)]
enum TimerPurpose {
    Response(EventKind),
    Reconnect,
}

#[derive(Debug)]
struct TimerFired {
    token: u64,
    purpose: TimerPurpose,
}

struct Timer {
    token: u64,
    handle: JoinHandle<()>,
}

impl Timer {
    fn cancel(self) {
        self.handle.abort();
    }
}

/// Handle to a running notification channel.
///
/// Cheap to clone. The actor stops and tears the connection down when the
/// last handle is dropped.
#[derive(Clone)]
pub struct NotificationChannel {
    commands: mpsc::UnboundedSender<Command>,
    events: broadcast::Sender<LibraryChanged>,
    status: watch::Receiver<ChannelStatus>,
}

impl NotificationChannel {
    /// Starts the channel actor on the current tokio runtime.
    pub fn spawn<C: Connector>(config: ChannelConfig, connector: C) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (socket_tx, socket_rx) = mpsc::unbounded_channel();
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let (status_tx, status) = watch::channel(ChannelStatus::initial());

        let actor = Actor {
            config,
            connector: Arc::new(connector),
            state: ConnectionState::Disconnected,
            retry_count: 0,
            api_key: None,
            socket: None,
            connection: 0,
            socket_tx,
            timer_tx,
            next_token: 0,
            pending: HashMap::new(),
            reconnect: None,
            connect_reply: None,
            disconnect_replies: Vec::new(),
            events: events.clone(),
            status: status_tx,
        };
        tokio::spawn(actor.run(command_rx, socket_rx, timer_rx));

        Self {
            commands,
            events,
            status,
        }
    }

    /// Connects and subscribes with `api_key`.
    ///
    /// Resolves `Ok` once subscribed, or with the error of the first attempt
    /// that times out. Dropped connections are retried without settling. The
    /// channel keeps retrying in the background either way.
    pub fn connect(&self, api_key: impl Into<String>) -> Settled {
        let (reply, rx) = oneshot::channel();
        let _ = self.commands.send(Command::Connect {
            api_key: api_key.into(),
            reply,
        });
        Settled { rx }
    }

    /// Disconnects, unsubscribing first when `api_key` is given.
    pub fn disconnect(&self, api_key: Option<String>) -> Settled {
        let (reply, rx) = oneshot::channel();
        let _ = self.commands.send(Command::Disconnect { api_key, reply });
        Settled { rx }
    }

    /// Returns a stream of library change events.
    pub fn subscribe(&self) -> broadcast::Receiver<LibraryChanged> {
        self.events.subscribe()
    }

    /// Returns the current status.
    pub fn status(&self) -> ChannelStatus {
        *self.status.borrow()
    }

    /// Returns a receiver that observes status changes.
    pub fn watch_status(&self) -> watch::Receiver<ChannelStatus> {
        self.status.clone()
    }
}

impl std::fmt::Debug for NotificationChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationChannel")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

struct Actor {
    config: ChannelConfig,
    connector: Arc<dyn Connector>,
    state: ConnectionState,
    retry_count: usize,
    api_key: Option<String>,
    socket: Option<Box<dyn Socket>>,
    connection: u64,
    socket_tx: mpsc::UnboundedSender<(u64, SocketEvent)>,
    timer_tx: mpsc::UnboundedSender<TimerFired>,
    next_token: u64,
    pending: HashMap<EventKind, Timer>,
    reconnect: Option<Timer>,
    connect_reply: Option<Reply>,
    disconnect_replies: Vec<Reply>,
    events: broadcast::Sender<LibraryChanged>,
    status: watch::Sender<ChannelStatus>,
}

impl Actor {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut socket_rx: mpsc::UnboundedReceiver<(u64, SocketEvent)>,
        mut timer_rx: mpsc::UnboundedReceiver<TimerFired>,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some((connection, event)) = socket_rx.recv() => {
                    self.handle_socket_event(connection, event);
                }
                Some(fired) = timer_rx.recv() => self.handle_timer(fired),
            }
        }

        debug!("all channel handles dropped");
        self.teardown();
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect { api_key, reply } => self.connect(api_key, reply),
            Command::Disconnect { api_key, reply } => self.disconnect(api_key, reply),
        }
    }

    fn connect(&mut self, api_key: String, reply: Reply) {
        if self.state != ConnectionState::Disconnected {
            warn!(state = ?self.state, "connect ignored: channel is not disconnected");
            let _ = reply.send(Err(ChannelError::InvalidState(format!(
                "cannot connect while {:?}",
                self.state
            ))));
            return;
        }

        if let Some(timer) = self.reconnect.take() {
            timer.cancel();
        }
        if let Some(previous) = self.connect_reply.replace(reply) {
            let _ = previous.send(Err(ChannelError::Cancelled));
        }
        self.api_key = Some(api_key);
        info!(url = %self.config.url, "connecting");
        self.open_socket();
    }

    fn disconnect(&mut self, api_key: Option<String>, reply: Reply) {
        if self.state == ConnectionState::Disconnected && self.reconnect.is_none() {
            let _ = reply.send(Ok(()));
            return;
        }

        match api_key {
            Some(_) if self.pending.contains_key(&EventKind::SubscriptionDeleted) => {
                debug!("unsubscribe already in flight");
                self.disconnect_replies.push(reply);
            }
            Some(api_key) if self.state == ConnectionState::Connected => {
                match self.request(ClientMessage::Unsubscribe { api_key }) {
                    Ok(()) => {
                        self.api_key = None;
                        self.disconnect_replies.push(reply);
                    }
                    Err(err) => {
                        warn!(error = %err, "unsubscribe failed, tearing down");
                        self.disconnect_replies.push(reply);
                        self.teardown();
                    }
                }
            }
            _ => {
                self.disconnect_replies.push(reply);
                self.teardown();
            }
        }
    }

    fn open_socket(&mut self) {
        self.close_socket();
        self.cancel_waiters();
        self.set_state(ConnectionState::Connecting);

        self.connection += 1;
        let events = SocketEvents::new(self.connection, self.socket_tx.clone());
        match self.connector.connect(&self.config.url, events) {
            Ok(socket) => self.socket = Some(socket),
            Err(err) if err.is_retryable() => {
                self.connection_lost(err);
                return;
            }
            Err(err) => {
                self.give_up(err);
                return;
            }
        }

        if let Err(err) = self.await_response(EventKind::Connected) {
            self.fail_attempt(err);
        }
    }

    /// Sends a request and arms a waiter for its acknowledgement.
    fn request(&mut self, message: ClientMessage) -> ChannelResult<()> {
        let kind = message.response_kind();
        if self.pending.contains_key(&kind) {
            return Err(ChannelError::RequestPending(kind));
        }

        let text = message
            .encode()
            .map_err(|e| ChannelError::CannotEncodeMessage(e.to_string()))?;
        let socket = self.socket.as_mut().ok_or(ChannelError::NotConnected)?;
        socket.send(text)?;
        debug!(awaiting = %kind, "request sent");

        self.await_response(kind)
    }

    fn await_response(&mut self, kind: EventKind) -> ChannelResult<()> {
        if self.pending.contains_key(&kind) {
            return Err(ChannelError::RequestPending(kind));
        }
        let timer = self.start_timer(self.config.response_timeout, TimerPurpose::Response(kind));
        self.pending.insert(kind, timer);
        Ok(())
    }

    fn start_timer(&mut self, delay: Duration, purpose: TimerPurpose) -> Timer {
        self.next_token += 1;
        let token = self.next_token;
        let tx = self.timer_tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(TimerFired { token, purpose });
        });
        Timer { token, handle }
    }

    fn schedule_reconnect(&mut self, delay: Duration) {
        if let Some(timer) = self.reconnect.take() {
            timer.cancel();
        }
        debug!(?delay, retry_count = self.retry_count, "reconnect scheduled");
        self.reconnect = Some(self.start_timer(delay, TimerPurpose::Reconnect));
    }

    fn handle_timer(&mut self, fired: TimerFired) {
        match fired.purpose {
            TimerPurpose::Reconnect => {
                if self.reconnect.as_ref().map(|t| t.token) != Some(fired.token) {
                    return;
                }
                self.reconnect = None;
                if self.api_key.is_some() && self.state == ConnectionState::Disconnected {
                    info!(retry_count = self.retry_count, "reconnecting");
                    self.open_socket();
                }
            }
            TimerPurpose::Response(kind) => {
                if self.pending.get(&kind).map(|t| t.token) != Some(fired.token) {
                    return;
                }
                self.pending.remove(&kind);
                warn!(awaiting = %kind, state = ?self.state, "response timed out");
                match kind {
                    EventKind::Connected | EventKind::SubscriptionCreated => {
                        self.fail_attempt(ChannelError::TimedOut);
                    }
                    _ => self.teardown(),
                }
            }
        }
    }

    fn handle_socket_event(&mut self, connection: u64, event: SocketEvent) {
        if connection != self.connection || self.socket.is_none() {
            debug!(connection, ?event, "ignoring event from stale connection");
            return;
        }

        match event {
            SocketEvent::Opened => debug!(connection, "socket open"),
            SocketEvent::Message(text) => self.handle_message(&text),
            SocketEvent::Closed { reason } => {
                let reason = reason.unwrap_or_else(|| "connection closed".to_string());
                self.connection_lost(ChannelError::transport_retryable(reason));
            }
            SocketEvent::Error(error) => {
                self.connection_lost(ChannelError::transport_retryable(error));
            }
        }
    }

    fn handle_message(&mut self, text: &str) {
        let message = match ServerMessage::decode(text) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "dropping malformed message");
                return;
            }
        };

        let kind = message.kind();
        if let Some(timer) = self.pending.remove(&kind) {
            timer.cancel();
            self.on_response(message);
            return;
        }

        if let Some((change, library, version)) = message.library_change() {
            let event = LibraryChanged {
                library: library.cloned(),
                change,
                version,
            };
            debug!(?event, "library changed");
            // No receivers is fine.
            let _ = self.events.send(event);
            return;
        }

        debug!(event = %kind, "dropping unsolicited acknowledgement");
    }

    fn on_response(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::Connected { .. } => {
                self.set_state(ConnectionState::Subscribing);
                let Some(api_key) = self.api_key.clone() else {
                    self.teardown();
                    return;
                };
                match self.request(ClientMessage::Subscribe { api_key }) {
                    Ok(()) => {}
                    Err(err) if err.is_retryable() => self.connection_lost(err),
                    Err(err) => self.fail_attempt(err),
                }
            }
            ServerMessage::SubscriptionCreated { errors, .. } => {
                for error in &errors {
                    warn!(topic = ?error.topic, error = %error.error, "subscription error");
                }
                if let Some(timer) = self.reconnect.take() {
                    timer.cancel();
                }
                self.retry_count = 0;
                self.set_state(ConnectionState::Connected);
                info!("subscribed");
                if let Some(reply) = self.connect_reply.take() {
                    let _ = reply.send(Ok(()));
                }
            }
            ServerMessage::SubscriptionDeleted => {
                info!("unsubscribed");
                self.teardown();
            }
            other => debug!(event = %other.kind(), "unexpected response"),
        }
    }

    /// Handles a dropped or refused connection in any state.
    ///
    /// The reconnect waits the quiescence delay rather than the retry
    /// schedule, and a pending `connect` stays unsettled until an attempt
    /// succeeds or times out.
    fn connection_lost(&mut self, err: ChannelError) {
        if self.state == ConnectionState::Disconnected {
            return;
        }
        if self.api_key.is_none() {
            self.teardown();
            return;
        }
        warn!(error = %err, state = ?self.state, "connection lost");
        self.close_socket();
        self.cancel_waiters();
        self.set_state(ConnectionState::Disconnected);
        self.schedule_reconnect(self.config.reconnect_delay);
    }

    /// Stops after an error that retrying cannot fix.
    fn give_up(&mut self, err: ChannelError) {
        warn!(error = %err, "connection failed permanently");
        if let Some(reply) = self.connect_reply.take() {
            let _ = reply.send(Err(err));
        }
        self.teardown();
    }

    /// Ends a failed connection attempt and schedules the next one.
    fn fail_attempt(&mut self, err: ChannelError) {
        warn!(error = %err, retry_count = self.retry_count, "connection attempt failed");
        self.close_socket();
        self.cancel_waiters();

        let delay = self.config.retry.delay_for_attempt(self.retry_count);
        self.retry_count += 1;
        self.set_state(ConnectionState::Disconnected);
        self.schedule_reconnect(delay);

        // Only the first failure reaches the caller.
        if let Some(reply) = self.connect_reply.take() {
            let _ = reply.send(Err(err));
        }
    }

    fn teardown(&mut self) {
        if let Some(timer) = self.reconnect.take() {
            timer.cancel();
        }
        self.cancel_waiters();
        self.close_socket();
        self.api_key = None;
        self.retry_count = 0;
        self.set_state(ConnectionState::Disconnected);

        if let Some(reply) = self.connect_reply.take() {
            let _ = reply.send(Err(ChannelError::Cancelled));
        }
        for reply in self.disconnect_replies.drain(..) {
            let _ = reply.send(Ok(()));
        }
        info!("disconnected");
    }

    fn cancel_waiters(&mut self) {
        for (_, timer) in self.pending.drain() {
            timer.cancel();
        }
    }

    fn close_socket(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            socket.close();
        }
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            debug!(from = ?self.state, to = ?state, "state transition");
        }
        self.state = state;
        self.status.send_replace(ChannelStatus {
            state,
            retry_count: self.retry_count,
        });
    }
}
