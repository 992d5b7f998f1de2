//! WebSocket connection and event loop.
//!
//! This module handles the persistent socket to the browser's debugger,
//! including request/response correlation and readiness tracking.
//!
//! # Event Loop
//!
//! The connection spawns a tokio task that handles:
//!
//! - Incoming frames from the browser (responses, notifications)
//! - Outgoing commands from the Rust API
//! - Request/response correlation by command id
//! - Connection-state transitions
//!
//! # Readiness
//!
//! Opening the socket is not enough to issue commands. The connection
//! sends the `Network.enable` handshake immediately after the socket
//! opens, and only flips to [`ConnectionState::Connected`] once a
//! `Network.loadingFinished` notification is observed. Until then, sends
//! wait in a short-delay poll loop rather than fail.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::{Value, to_string};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::{CommandId, CommandIdSequence};
use crate::protocol::{Command, CommandFrame, InboundMessage};

// ============================================================================
// Constants
// ============================================================================

/// Delay between readiness polls while a send waits in `Connecting`.
const SEND_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Notification that marks the connection as ready for commands.
const READY_METHOD: &str = "Network.loadingFinished";

// ============================================================================
// Types
// ============================================================================

/// The socket type produced by the client handshake.
type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Map of command IDs to response channels.
type CorrelationMap = FxHashMap<CommandId, oneshot::Sender<Result<Value>>>;

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle states of the debugger connection.
///
/// Transitions: `Idle → Connecting → Connected → Closed`, with an error
/// path from `Connecting`/`Connected` straight to `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection attempt has started.
    Idle,
    /// Socket is open and the handshake is sent; readiness not yet observed.
    Connecting,
    /// Readiness notification observed; commands may be transmitted.
    Connected,
    /// Socket closed, intentionally or not. Terminal.
    Closed,
}

// ============================================================================
// LoopCommand
// ============================================================================

/// Internal commands for the event loop.
enum LoopCommand {
    /// Transmit a frame and route its response to `response_tx`.
    Send {
        frame: CommandFrame,
        response_tx: oneshot::Sender<Result<Value>>,
    },
    /// Remove a correlation entry whose caller gave up on the deadline.
    Discard(CommandId),
    /// Close the socket and stop the loop.
    Shutdown,
}

// ============================================================================
// Connection
// ============================================================================

/// Persistent connection to the browser's debugger socket.
///
/// Handles request/response correlation and readiness tracking. The
/// connection spawns an internal event loop task.
///
/// # Thread Safety
///
/// `Connection` is `Send + Sync` and can be shared across tasks. All
/// operations are non-blocking; senders suspend on their pending slot.
#[derive(Clone)]
pub struct Connection {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<LoopCommand>,
    /// Correlation map (shared with event loop).
    correlation: Arc<Mutex<CorrelationMap>>,
    /// Monotonic command-id allocator, starts at 1.
    ids: Arc<CommandIdSequence>,
    /// Connection state published by the event loop.
    state_rx: watch::Receiver<ConnectionState>,
    /// Set when the caller begins intentional shutdown.
    closing: Arc<AtomicBool>,
    /// Optional per-command deadline. `None` waits indefinitely.
    deadline: Option<Duration>,
}

impl Connection {
    /// Opens the socket and spawns the event loop.
    ///
    /// The `Network.enable` handshake is sent immediately; the returned
    /// connection is in [`ConnectionState::Connecting`] until the
    /// readiness notification arrives.
    ///
    /// # Arguments
    ///
    /// * `ws_url` - Debugger socket endpoint from discovery
    /// * `deadline` - Optional per-command response deadline
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the socket cannot be established.
    pub async fn open(ws_url: &Url, deadline: Option<Duration>) -> Result<Self> {
        let (socket, _) = tokio_tungstenite::connect_async(ws_url.as_str())
            .await
            .map_err(|e| Error::connection(format!("WebSocket connect failed: {e}")))?;

        debug!(url = %ws_url, "Debugger socket open");

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let correlation = Arc::new(Mutex::new(CorrelationMap::default()));
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let closing = Arc::new(AtomicBool::new(false));

        tokio::spawn(Self::run_event_loop(
            socket,
            command_rx,
            Arc::clone(&correlation),
            state_tx,
            Arc::clone(&closing),
        ));

        let connection = Self {
            command_tx,
            correlation,
            ids: Arc::new(CommandIdSequence::new()),
            state_rx,
            closing,
            deadline,
        };

        // Handshake bypasses the readiness gate; its ack is logged when
        // the browser answers.
        let (_, ack) = connection.dispatch(Command::NetworkEnable)?;
        tokio::spawn(async move {
            match ack.await {
                Ok(Ok(_)) => debug!("Network event reporting enabled"),
                Ok(Err(e)) => warn!(error = %e, "Handshake rejected"),
                Err(_) => debug!("Handshake ack never arrived"),
            }
        });

        Ok(connection)
    }

    /// Returns the current connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Returns the number of pending commands.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.correlation.lock().len()
    }

    /// Waits until the readiness notification has been observed.
    ///
    /// # Errors
    ///
    /// Returns the close error if the connection reaches `Closed` without
    /// ever becoming ready.
    pub async fn wait_connected(&self) -> Result<()> {
        let mut state_rx = self.state_rx.clone();
        let state = state_rx
            .wait_for(|s| matches!(*s, ConnectionState::Connected | ConnectionState::Closed))
            .await
            .map_err(|_| self.close_error())?;

        match *state {
            ConnectionState::Connected => Ok(()),
            _ => Err(self.close_error()),
        }
    }

    /// Sends a command and waits for its response payload.
    ///
    /// While the connection is still `Connecting`, the send waits in a
    /// fixed-delay poll loop; it never fails on timing alone. Without a
    /// configured deadline a command with no response waits indefinitely.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] / [`Error::ConnectionLost`] if the
    ///   socket went away (intentionally or not)
    /// - [`Error::CommandFailed`] if the browser rejected the command
    /// - [`Error::CommandDeadline`] if a configured deadline elapsed
    pub async fn send(&self, command: Command) -> Result<Value> {
        self.wait_until_sendable().await?;
        let (id, response_rx) = self.dispatch(command)?;

        match self.deadline {
            None => response_rx.await.map_err(|_| self.close_error())?,
            Some(deadline) => match timeout(deadline, response_rx).await {
                Ok(Ok(result)) => result,
                Ok(Err(_)) => Err(self.close_error()),
                Err(_) => {
                    let _ = self.command_tx.send(LoopCommand::Discard(id));
                    Err(Error::command_deadline(id, deadline.as_millis() as u64))
                }
            },
        }
    }

    /// Shuts down the connection.
    ///
    /// Asks the event loop to close the socket and stop. Pair with
    /// [`Connection::wait_closed`] to observe completion.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(LoopCommand::Shutdown);
    }

    /// Marks the upcoming close as intentional.
    ///
    /// After this call a socket close settles pending commands with
    /// [`Error::ConnectionClosed`] instead of the fatal
    /// [`Error::ConnectionLost`].
    #[inline]
    pub fn begin_shutdown(&self) {
        self.closing.store(true, Ordering::SeqCst);
    }

    /// Waits until the event loop has released the socket.
    ///
    /// Always completes, including when the loop already exited or the
    /// connection never became ready.
    pub async fn wait_closed(&self) {
        let mut state_rx = self.state_rx.clone();
        // An error here means the loop dropped its sender, which only
        // happens after the Closed state was published or the task died;
        // either way the socket is gone.
        let _ = state_rx
            .wait_for(|s| matches!(*s, ConnectionState::Closed))
            .await;
    }
}

// ============================================================================
// Connection - Internal
// ============================================================================

impl Connection {
    /// Allocates an id, registers the pending slot, and hands the frame
    /// to the event loop. Does not gate on readiness.
    fn dispatch(&self, command: Command) -> Result<(CommandId, oneshot::Receiver<Result<Value>>)> {
        let id = self.ids.next();
        let frame = CommandFrame::new(id, command);
        let (response_tx, response_rx) = oneshot::channel();

        self.command_tx
            .send(LoopCommand::Send { frame, response_tx })
            .map_err(|_| self.close_error())?;

        Ok((id, response_rx))
    }

    /// Blocks a send until the connection can transmit.
    ///
    /// Explicit poll loop with a short fixed delay; replaces unbounded
    /// recursive retry. Only fails if the connection closes first.
    async fn wait_until_sendable(&self) -> Result<()> {
        loop {
            match self.state() {
                ConnectionState::Connected => return Ok(()),
                ConnectionState::Closed => return Err(self.close_error()),
                ConnectionState::Idle | ConnectionState::Connecting => {
                    sleep(SEND_RETRY_DELAY).await;
                }
            }
        }
    }

    /// Returns the error a dead socket produces right now.
    fn close_error(&self) -> Error {
        if self.closing.load(Ordering::SeqCst) {
            Error::ConnectionClosed
        } else {
            Error::ConnectionLost
        }
    }

    /// Event loop that owns the socket.
    async fn run_event_loop(
        socket: Socket,
        mut command_rx: mpsc::UnboundedReceiver<LoopCommand>,
        correlation: Arc<Mutex<CorrelationMap>>,
        state_tx: watch::Sender<ConnectionState>,
        closing: Arc<AtomicBool>,
    ) {
        let (mut ws_write, mut ws_read) = socket.split();

        loop {
            tokio::select! {
                // Incoming frames from the browser
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            Self::handle_incoming_frame(&text, &correlation, &state_tx);
                        }

                        Some(Ok(Message::Close(_))) => {
                            debug!("Socket closed by browser");
                            break;
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "Socket error");
                            break;
                        }

                        None => {
                            debug!("Socket stream ended");
                            break;
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                // Commands from the Rust API
                command = command_rx.recv() => {
                    match command {
                        Some(LoopCommand::Send { frame, response_tx }) => {
                            Self::handle_send_command(
                                frame,
                                response_tx,
                                &mut ws_write,
                                &correlation,
                            ).await;
                        }

                        Some(LoopCommand::Discard(id)) => {
                            correlation.lock().remove(&id);
                            debug!(%id, "Discarded expired correlation");
                        }

                        Some(LoopCommand::Shutdown) => {
                            debug!("Shutdown command received");
                            let _ = ws_write.close().await;
                            break;
                        }

                        None => {
                            debug!("Command channel closed");
                            break;
                        }
                    }
                }
            }
        }

        let intentional = closing.load(Ordering::SeqCst);
        Self::fail_pending_commands(&correlation, intentional);

        if !intentional {
            error!("Connection lost while session was in use");
        }

        let _ = state_tx.send(ConnectionState::Closed);
        debug!("Event loop terminated");
    }

    /// Demultiplexes one inbound text frame.
    ///
    /// A frame with a `method` field is a notification and feeds the
    /// state machine; otherwise it is a response routed by id. Responses
    /// with no pending slot are dropped as protocol noise.
    fn handle_incoming_frame(
        text: &str,
        correlation: &Arc<Mutex<CorrelationMap>>,
        state_tx: &watch::Sender<ConnectionState>,
    ) {
        match InboundMessage::parse(text) {
            Ok(InboundMessage::Notification(event)) => {
                trace!(method = %event.method, "Notification");
                if event.method == READY_METHOD
                    && *state_tx.borrow() == ConnectionState::Connecting
                {
                    debug!("Readiness notification observed");
                    let _ = state_tx.send(ConnectionState::Connected);
                }
            }

            Ok(InboundMessage::Response(response)) => {
                let slot = correlation.lock().remove(&response.id);
                match slot {
                    Some(tx) => {
                        let _ = tx.send(response.into_result());
                    }
                    None => {
                        debug!(id = %response.id, "Response for unknown command, ignored");
                    }
                }
            }

            Err(e) => {
                warn!(error = %e, frame = %text, "Unparseable frame");
            }
        }
    }

    /// Serializes and transmits one frame, registering its slot first.
    async fn handle_send_command(
        frame: CommandFrame,
        response_tx: oneshot::Sender<Result<Value>>,
        ws_write: &mut SplitSink<Socket, Message>,
        correlation: &Arc<Mutex<CorrelationMap>>,
    ) {
        let id = frame.id;

        let json = match to_string(&frame) {
            Ok(json) => json,
            Err(e) => {
                let _ = response_tx.send(Err(Error::Json(e)));
                return;
            }
        };

        // Register before transmitting so a fast response always finds
        // its slot.
        correlation.lock().insert(id, response_tx);

        if let Err(e) = ws_write.send(Message::Text(json.into())).await
            && let Some(tx) = correlation.lock().remove(&id)
        {
            let _ = tx.send(Err(Error::connection(e.to_string())));
        }

        trace!(%id, method = frame.command.method(), "Frame sent");
    }

    /// Fails every pending command when the loop stops.
    fn fail_pending_commands(correlation: &Arc<Mutex<CorrelationMap>>, intentional: bool) {
        let pending: Vec<_> = {
            let mut map = correlation.lock();
            map.drain().collect()
        };
        let count = pending.len();

        for (_, tx) in pending {
            let err = if intentional {
                Error::ConnectionClosed
            } else {
                Error::ConnectionLost
            };
            let _ = tx.send(Err(err));
        }

        if count > 0 {
            debug!(count, intentional, "Failed pending commands on close");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    /// Socket type on the mock-server side.
    type ServerSocket = WebSocketStream<TcpStream>;

    /// Binds a listener standing in for the browser's debugger endpoint.
    async fn bind_mock() -> (TcpListener, Url) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let url = Url::parse(&format!("ws://127.0.0.1:{port}/devtools/page/TEST")).expect("url");
        (listener, url)
    }

    /// Accepts the driver's connection and upgrades it.
    async fn accept_ws(listener: &TcpListener) -> ServerSocket {
        let (stream, _) = listener.accept().await.expect("accept");
        accept_async(stream).await.expect("upgrade")
    }

    /// Reads the next text frame as JSON.
    async fn next_frame(ws: &mut ServerSocket) -> Value {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    return serde_json::from_str(&text).expect("frame json");
                }
                Some(Ok(_)) => continue,
                other => panic!("socket ended early: {other:?}"),
            }
        }
    }

    /// Sends one JSON value as a text frame.
    async fn send_frame(ws: &mut ServerSocket, value: Value) {
        ws.send(Message::Text(value.to_string().into()))
            .await
            .expect("send frame");
    }

    /// Answers the handshake and publishes readiness.
    async fn complete_handshake(ws: &mut ServerSocket) {
        let handshake = next_frame(ws).await;
        assert_eq!(handshake["method"], "Network.enable");
        assert_eq!(handshake["id"], 1);

        send_frame(ws, json!({"id": handshake["id"], "result": {}})).await;
        send_frame(
            ws,
            json!({"method": "Network.loadingFinished", "params": {}}),
        )
        .await;
    }

    fn evaluate(expression: &str) -> Command {
        Command::RuntimeEvaluate {
            expression: expression.to_string(),
        }
    }

    #[tokio::test]
    async fn test_socket_open_alone_is_not_connected() {
        let (listener, url) = bind_mock().await;

        let server = tokio::spawn(async move {
            let mut ws = accept_ws(&listener).await;
            let handshake = next_frame(&mut ws).await;
            assert_eq!(handshake["method"], "Network.enable");
            // Hold the socket open without publishing readiness.
            sleep(Duration::from_millis(100)).await;
        });

        let connection = Connection::open(&url, None).await.expect("open");
        assert_eq!(connection.state(), ConnectionState::Connecting);

        server.await.expect("server");
    }

    #[tokio::test]
    async fn test_out_of_order_responses_resolve_by_id() {
        let (listener, url) = bind_mock().await;

        let server = tokio::spawn(async move {
            let mut ws = accept_ws(&listener).await;
            complete_handshake(&mut ws).await;

            let first = next_frame(&mut ws).await;
            let second = next_frame(&mut ws).await;

            // Answer in reverse arrival order.
            send_frame(
                &mut ws,
                json!({"id": second["id"], "result": {"echo": second["params"]["expression"]}}),
            )
            .await;
            send_frame(
                &mut ws,
                json!({"id": first["id"], "result": {"echo": first["params"]["expression"]}}),
            )
            .await;
        });

        let connection = Connection::open(&url, None).await.expect("open");
        connection.wait_connected().await.expect("connected");

        let (alpha, beta) = tokio::join!(
            connection.send(evaluate("'alpha'")),
            connection.send(evaluate("'beta'")),
        );

        assert_eq!(alpha.expect("alpha")["echo"], "'alpha'");
        assert_eq!(beta.expect("beta")["echo"], "'beta'");

        server.await.expect("server");
    }

    #[tokio::test]
    async fn test_send_while_connecting_waits_then_succeeds() {
        let (listener, url) = bind_mock().await;

        let server = tokio::spawn(async move {
            let mut ws = accept_ws(&listener).await;
            let handshake = next_frame(&mut ws).await;
            send_frame(&mut ws, json!({"id": handshake["id"], "result": {}})).await;

            // Delay readiness so the send has to wait on the gate.
            sleep(Duration::from_millis(200)).await;
            send_frame(
                &mut ws,
                json!({"method": "Network.loadingFinished", "params": {}}),
            )
            .await;

            let frame = next_frame(&mut ws).await;
            send_frame(&mut ws, json!({"id": frame["id"], "result": {"ok": true}})).await;
        });

        let connection = Connection::open(&url, None).await.expect("open");
        assert_eq!(connection.state(), ConnectionState::Connecting);

        let value = connection
            .send(evaluate("document.title"))
            .await
            .expect("send resolves after readiness");
        assert_eq!(value["ok"], true);

        server.await.expect("server");
    }

    #[tokio::test]
    async fn test_response_for_unknown_id_is_ignored() {
        let (listener, url) = bind_mock().await;

        let server = tokio::spawn(async move {
            let mut ws = accept_ws(&listener).await;
            complete_handshake(&mut ws).await;

            let frame = next_frame(&mut ws).await;
            // Noise first, then the real answer.
            send_frame(&mut ws, json!({"id": 4242, "result": {"stray": true}})).await;
            send_frame(&mut ws, json!({"id": frame["id"], "result": {"real": true}})).await;
        });

        let connection = Connection::open(&url, None).await.expect("open");
        connection.wait_connected().await.expect("connected");

        let value = connection.send(evaluate("1")).await.expect("send");
        assert_eq!(value["real"], true);
        assert_eq!(connection.pending_count(), 0);

        server.await.expect("server");
    }

    #[tokio::test]
    async fn test_error_payload_surfaces_as_command_failed() {
        let (listener, url) = bind_mock().await;

        let server = tokio::spawn(async move {
            let mut ws = accept_ws(&listener).await;
            complete_handshake(&mut ws).await;

            let frame = next_frame(&mut ws).await;
            send_frame(
                &mut ws,
                json!({"id": frame["id"], "error": {"code": -32000, "message": "nope"}}),
            )
            .await;
        });

        let connection = Connection::open(&url, None).await.expect("open");
        connection.wait_connected().await.expect("connected");

        let err = connection.send(evaluate("1")).await.unwrap_err();
        assert!(matches!(err, Error::CommandFailed { code: -32000, .. }));

        server.await.expect("server");
    }

    #[tokio::test]
    async fn test_unexpected_close_is_fatal() {
        let (listener, url) = bind_mock().await;

        let server = tokio::spawn(async move {
            let mut ws = accept_ws(&listener).await;
            complete_handshake(&mut ws).await;

            // Read the command, then drop the socket without answering.
            let _ = next_frame(&mut ws).await;
            ws.close(None).await.expect("close");
        });

        let connection = Connection::open(&url, None).await.expect("open");
        connection.wait_connected().await.expect("connected");

        let err = connection.send(evaluate("1")).await.unwrap_err();
        assert!(matches!(err, Error::ConnectionLost));
        assert!(err.is_fatal());

        // The connection stays unusable; no reconnection is attempted.
        connection.wait_closed().await;
        let err = connection.send(evaluate("2")).await.unwrap_err();
        assert!(matches!(err, Error::ConnectionLost));

        server.await.expect("server");
    }

    #[tokio::test]
    async fn test_shutdown_completes_before_readiness() {
        let (listener, url) = bind_mock().await;

        let server = tokio::spawn(async move {
            let mut ws = accept_ws(&listener).await;
            let _ = next_frame(&mut ws).await;
            // Never publish readiness; wait for the driver to close.
            while let Some(Ok(message)) = ws.next().await {
                if matches!(message, Message::Close(_)) {
                    break;
                }
            }
        });

        let connection = Connection::open(&url, None).await.expect("open");
        assert_eq!(connection.state(), ConnectionState::Connecting);

        connection.begin_shutdown();
        connection.shutdown();
        connection.wait_closed().await;

        assert_eq!(connection.state(), ConnectionState::Closed);

        // A send after intentional shutdown reports the quiet close.
        let err = connection.send(evaluate("1")).await.unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));

        server.await.expect("server");
    }

    #[tokio::test]
    async fn test_configured_deadline_expires_pending_command() {
        let (listener, url) = bind_mock().await;

        let server = tokio::spawn(async move {
            let mut ws = accept_ws(&listener).await;
            complete_handshake(&mut ws).await;

            // Swallow the command and never answer it.
            let _ = next_frame(&mut ws).await;
            sleep(Duration::from_millis(300)).await;
        });

        let connection = Connection::open(&url, Some(Duration::from_millis(80)))
            .await
            .expect("open");
        connection.wait_connected().await.expect("connected");

        let err = connection.send(evaluate("1")).await.unwrap_err();
        assert!(matches!(err, Error::CommandDeadline { .. }));

        server.await.expect("server");
    }

    #[test]
    fn test_constants() {
        assert_eq!(SEND_RETRY_DELAY.as_millis(), 50);
        assert_eq!(READY_METHOD, "Network.loadingFinished");
    }
}
