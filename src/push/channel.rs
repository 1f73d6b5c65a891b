// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Push channel lifecycle: connect, receive, keepalive, reconnect, disconnect.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::{PushConnection, PushConnector, PushFrame, ReconnectPolicy};
use crate::error::{Error, TransportError};

/// Payload of the keepalive request.
const PING_FRAME: &str = r#"{"ping":1}"#;

/// Key the charger uses to answer a keepalive.
const PONG_KEY: &str = "pong";

/// Grace period for the close handshake on disconnect.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// State of the push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Not connected and not trying to. Initial and terminal state.
    Disconnected,
    /// Opening a connection.
    Connecting,
    /// Connected and receiving frames.
    Connected,
    /// Waiting out the backoff delay before the next attempt.
    Reconnecting,
}

impl ConnectionState {
    /// Returns the lowercase name of the state.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receiver of everything the push channel produces.
///
/// Both methods are called from the channel's background task while the
/// delivery gate is held, and never after [`PushChannel::disconnect`]
/// returned. They must not block.
pub trait PushSink: Send + Sync + 'static {
    /// A frame carrying field updates. The keepalive reply key is removed.
    fn on_fields(&self, fields: Map<String, Value>);

    /// The channel changed state.
    fn on_connection_state(&self, state: ConnectionState, error: Option<&Error>);
}

#[derive(Debug)]
struct Shared {
    state: RwLock<ConnectionState>,
    last_error: RwLock<Option<Arc<Error>>>,
    gate: Mutex<()>,
}

struct ActiveSession {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    sink: Arc<dyn PushSink>,
}

/// Manager of one push connection and its reconnection loop.
///
/// At most one connection is live at a time. Transient failures are retried
/// forever with [`ReconnectPolicy`] backoff. Rejected credentials or a closed
/// session stop the loop and leave the channel
/// [`Disconnected`](ConnectionState::Disconnected) with the error available
/// from [`last_error`](Self::last_error).
pub struct PushChannel {
    connector: Arc<dyn PushConnector>,
    policy: ReconnectPolicy,
    keepalive: Option<Duration>,
    shared: Arc<Shared>,
    session: Mutex<Option<ActiveSession>>,
}

impl PushChannel {
    /// Default interval between keepalive pings.
    pub const DEFAULT_KEEPALIVE: Duration = Duration::from_secs(300);

    /// Creates a disconnected channel.
    ///
    /// `keepalive` is the ping interval; `None` disables keepalive.
    #[must_use]
    pub fn new(
        connector: Arc<dyn PushConnector>,
        policy: ReconnectPolicy,
        keepalive: Option<Duration>,
    ) -> Self {
        Self {
            connector,
            policy,
            keepalive: keepalive.filter(|period| !period.is_zero()),
            shared: Arc::new(Shared {
                state: RwLock::new(ConnectionState::Disconnected),
                last_error: RwLock::new(None),
                gate: Mutex::new(()),
            }),
            session: Mutex::new(None),
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.read()
    }

    /// Returns the error that caused the latest failure, if any.
    ///
    /// Cleared on every successful connection.
    #[must_use]
    pub fn last_error(&self) -> Option<Arc<Error>> {
        self.shared.last_error.read().clone()
    }

    /// Returns the reconnect policy.
    #[must_use]
    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    /// Starts the channel and waits for the outcome of the first attempt.
    ///
    /// Returns once the first attempt connected or failed. A transient
    /// failure is not an error: the channel keeps retrying in the background.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyListening`] unless the channel is
    /// disconnected. Returns [`Error::Authentication`] or
    /// [`TransportError::SessionClosed`] if the first attempt hit one of
    /// them, in which case the channel is disconnected again.
    pub async fn connect(&self, sink: Arc<dyn PushSink>) -> Result<(), Error> {
        let first = {
            let mut session = self.session.lock();
            {
                let mut state = self.shared.state.write();
                if *state != ConnectionState::Disconnected {
                    return Err(Error::AlreadyListening);
                }
                *state = ConnectionState::Connecting;
            }
            *self.shared.last_error.write() = None;

            let cancel = CancellationToken::new();
            let (first_tx, first_rx) = oneshot::channel();
            let runner = Runner {
                connector: Arc::clone(&self.connector),
                policy: self.policy,
                keepalive: self.keepalive,
                shared: Arc::clone(&self.shared),
                sink: Arc::clone(&sink),
                cancel: cancel.clone(),
            };
            let task = tokio::spawn(runner.run(first_tx));
            *session = Some(ActiveSession { cancel, task, sink });
            first_rx
        };

        // A dropped sender means disconnect() won the race.
        first.await.unwrap_or(Ok(()))
    }

    /// Stops the channel from any state and waits for the background task.
    ///
    /// After this returns the sink receives nothing more from the stopped
    /// session and no reconnection is attempted.
    pub async fn disconnect(&self) {
        let Some(active) = self.session.lock().take() else {
            return;
        };

        active.cancel.cancel();
        // Wait for an in-flight delivery to finish.
        drop(self.shared.gate.lock());

        if let Err(err) = active.task.await
            && err.is_panic()
        {
            tracing::error!(error = %err, "Push task panicked");
        }

        let previous = std::mem::replace(
            &mut *self.shared.state.write(),
            ConnectionState::Disconnected,
        );
        if previous != ConnectionState::Disconnected {
            tracing::info!(previous = %previous, "Push channel disconnected");
            active
                .sink
                .on_connection_state(ConnectionState::Disconnected, None);
        }
    }

    /// Cancels the background task without waiting for it.
    pub(crate) fn abort(&self) {
        if let Some(active) = self.session.lock().take() {
            active.cancel.cancel();
            *self.shared.state.write() = ConnectionState::Disconnected;
        }
    }
}

impl Drop for PushChannel {
    fn drop(&mut self) {
        if let Some(active) = self.session.get_mut().take() {
            active.cancel.cancel();
        }
    }
}

impl std::fmt::Debug for PushChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushChannel")
            .field("state", &self.state())
            .field("policy", &self.policy)
            .field("keepalive", &self.keepalive)
            .finish_non_exhaustive()
    }
}

/// Why a live connection ended.
enum Ended {
    Cancelled,
    Dropped(Option<Error>),
}

/// Background reconnection loop owned by the spawned task.
struct Runner {
    connector: Arc<dyn PushConnector>,
    policy: ReconnectPolicy,
    keepalive: Option<Duration>,
    shared: Arc<Shared>,
    sink: Arc<dyn PushSink>,
    cancel: CancellationToken,
}

impl Runner {
    /// Main loop: connect, read, on failure back off and reconnect.
    async fn run(self, first: oneshot::Sender<Result<(), Error>>) {
        let mut first = Some(first);
        let mut attempt: u32 = 0;

        loop {
            self.transition(ConnectionState::Connecting, None);

            let result = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                result = self.connector.connect() => result,
            };

            match result {
                Ok(connection) => {
                    attempt = 0;
                    *self.shared.last_error.write() = None;
                    self.transition(ConnectionState::Connected, None);
                    if let Some(first) = first.take() {
                        let _ = first.send(Ok(()));
                    }

                    match self.receive(connection).await {
                        Ended::Cancelled => break,
                        Ended::Dropped(error) => {
                            let error = error.map(Arc::new);
                            if let Some(error) = &error {
                                tracing::warn!(error = %error, "Push connection lost");
                                *self.shared.last_error.write() = Some(Arc::clone(error));
                            }
                            self.transition(ConnectionState::Reconnecting, error.as_deref());
                        }
                    }
                }
                Err(error) if is_terminal(&error) => {
                    tracing::error!(error = %error, "Push channel cannot reconnect, giving up");
                    let error = Arc::new(error);
                    *self.shared.last_error.write() = Some(Arc::clone(&error));
                    self.transition(ConnectionState::Disconnected, Some(&error));
                    if let Some(first) = first.take() {
                        let _ = first.send(Err(duplicate_terminal(&error)));
                    }
                    return;
                }
                Err(error) => {
                    tracing::warn!(error = %error, attempt, "Push connection failed");
                    let error = Arc::new(error);
                    *self.shared.last_error.write() = Some(Arc::clone(&error));
                    self.transition(ConnectionState::Reconnecting, Some(&error));
                    if let Some(first) = first.take() {
                        let _ = first.send(Ok(()));
                    }
                }
            }

            let delay = self.policy.delay(attempt);
            attempt = attempt.saturating_add(1);
            tracing::info!(
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                attempt,
                "Waiting before reconnect"
            );

            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                () = tokio::time::sleep(delay) => {}
            }
        }

        tracing::debug!("Push loop exiting");
    }

    /// Reads one connection until it drops or the channel is cancelled.
    async fn receive(&self, connection: PushConnection) -> Ended {
        let PushConnection {
            mut inbound,
            mut outbound,
        } = connection;

        let mut keepalive = self.keepalive.map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        let mut awaiting_pong = false;

        let ended = loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break Ended::Cancelled,
                frame = inbound.next() => match frame {
                    Some(Ok(PushFrame::Text(text))) => {
                        if self.handle_text(&text) {
                            awaiting_pong = false;
                        }
                    }
                    Some(Ok(PushFrame::Close(reason))) => {
                        tracing::info!(reason = ?reason, "Push connection closed by charger");
                        break Ended::Dropped(None);
                    }
                    Some(Err(err)) => break Ended::Dropped(Some(err.into())),
                    None => {
                        tracing::info!("Push stream ended");
                        break Ended::Dropped(None);
                    }
                },
                () = tick(keepalive.as_mut()) => {
                    if awaiting_pong {
                        break Ended::Dropped(Some(TransportError::PingTimeout.into()));
                    }
                    tracing::debug!("Sending keepalive ping");
                    if let Err(err) = outbound.send(PING_FRAME.to_string()).await {
                        break Ended::Dropped(Some(err.into()));
                    }
                    awaiting_pong = true;
                }
            }
        };

        if matches!(ended, Ended::Cancelled)
            && tokio::time::timeout(CLOSE_TIMEOUT, outbound.close())
                .await
                .is_err()
        {
            tracing::debug!("Push close handshake timed out");
        }

        ended
    }

    /// Parses one text frame and delivers its fields.
    ///
    /// Returns `true` if the frame answered a keepalive ping.
    fn handle_text(&self, text: &str) -> bool {
        let mut fields = match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(fields)) => fields,
            Ok(_) => {
                tracing::warn!(frame = %text, "Dropping push frame that is not a JSON object");
                return false;
            }
            Err(err) => {
                tracing::warn!(error = %err, frame = %text, "Dropping malformed push frame");
                return false;
            }
        };

        let pong = fields.remove(PONG_KEY).is_some();
        tracing::debug!(fields = fields.len(), pong, "Push frame received");

        if !fields.is_empty() {
            let _gate = self.shared.gate.lock();
            if !self.cancel.is_cancelled() {
                self.sink.on_fields(fields);
            }
        }
        pong
    }

    fn transition(&self, state: ConnectionState, error: Option<&Error>) {
        let _gate = self.shared.gate.lock();
        if self.cancel.is_cancelled() {
            return;
        }
        *self.shared.state.write() = state;
        tracing::info!(state = %state, "Push channel state changed");
        self.sink.on_connection_state(state, error);
    }
}

/// Failures that no amount of retrying can fix.
fn is_terminal(error: &Error) -> bool {
    matches!(
        error,
        Error::Authentication | Error::Transport(TransportError::SessionClosed)
    )
}

/// Rebuilds a terminal error for the caller of the first attempt.
fn duplicate_terminal(error: &Error) -> Error {
    match error {
        Error::Transport(TransportError::SessionClosed) => TransportError::SessionClosed.into(),
        _ => Error::Authentication,
    }
}

/// Waits for the next keepalive tick, or forever when keepalive is off.
async fn tick(interval: Option<&mut Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
