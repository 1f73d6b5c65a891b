// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! High-level charger abstraction.
//!
//! A [`Charger`] keeps one live view of an OpenEVSE charger. Two channels
//! feed it:
//!
//! - **Polls**: [`Charger::update`] fetches `/status` over HTTP and merges
//!   the reply.
//! - **Push**: [`Charger::ws_connect`] opens the WebSocket at `/ws`; every
//!   frame is merged as soon as it arrives, and the connection is repaired
//!   in the background when it drops.
//!
//! Both channels write into the same cache with a last-write-wins merge.
//! Accessors such as [`Charger::charging_current`] only read that cache.
//!
//! ```no_run
//! use openevse_lib::Charger;
//!
//! # async fn example() -> openevse_lib::Result<()> {
//! let charger = Charger::http("openevse.local")
//!     .with_credentials("admin", "password")
//!     .build()?;
//!
//! charger.update().await?;
//! println!("{:?} at {:?} A", charger.status(), charger.charging_current());
//!
//! charger
//!     .ws_connect(|update| println!("changed: {:?}", update.changed))
//!     .await?;
//!
//! // ...
//!
//! charger.close().await;
//! # Ok(())
//! # }
//! ```

mod accessors;
mod builder;
mod commands;

pub use accessors::SafetyCounts;
pub use builder::ChargerBuilder;

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use reqwest::Method;
use serde_json::{Map, Value};

use crate::command::Command;
use crate::error::{Error, ParseError};
use crate::protocol::{HttpClient, HttpConfig, Protocol};
use crate::push::{ConnectionState, PushChannel, PushSink};
use crate::response::{CommandReply, DeviceInfo};
use crate::state::{ChangedFields, DeviceState, StateCache, UpdateSource};
use crate::subscription::{CallbackRegistry, StateUpdate, SubscriptionId};
use crate::types::FirmwareVersion;

/// Push keys announcing that a configuration endpoint changed.
const UPDATE_TRIGGERS: [&str; 6] = [
    "config_version",
    "claims_version",
    "override_version",
    "schedule_version",
    "schedule_plan_version",
    "limit_version",
];

/// An OpenEVSE charger reachable over HTTP and WebSocket.
///
/// Cloning is cheap; clones share the cache, the observers and the push
/// channel. The push task is cancelled and the session released when the
/// last clone is dropped.
#[derive(Clone)]
pub struct Charger {
    inner: Arc<Inner>,
}

struct Inner {
    client: HttpClient,
    status: StateCache,
    config: StateCache,
    callbacks: CallbackRegistry,
    // Held across one merge and its dispatch.
    dispatch: Mutex<()>,
    push: PushChannel,
    ws_subscription: Mutex<Option<SubscriptionId>>,
}

impl Charger {
    /// Creates a builder for a charger at `host`.
    ///
    /// `host` may carry a port (`"10.0.0.5:8080"`) or an `http://` prefix.
    #[must_use]
    pub fn http(host: impl Into<String>) -> ChargerBuilder {
        ChargerBuilder::new(HttpConfig::new(host))
    }

    /// Creates a builder from a complete [`HttpConfig`].
    #[must_use]
    pub fn http_config(config: HttpConfig) -> ChargerBuilder {
        ChargerBuilder::new(config)
    }

    pub(crate) fn new(client: HttpClient, push: PushChannel) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                status: StateCache::new(),
                config: StateCache::new(),
                callbacks: CallbackRegistry::new(),
                dispatch: Mutex::new(()),
                push,
                ws_subscription: Mutex::new(None),
            }),
        }
    }

    /// Returns the HTTP client requests are issued through.
    #[must_use]
    pub fn client(&self) -> &HttpClient {
        &self.inner.client
    }

    // ========== Polling ==========

    /// Fetches `/status` and merges it into the cache.
    ///
    /// State observers are notified if any field changed. Never retried.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] on network failure, [`Error::Authentication`]
    /// if the credentials are rejected and [`Error::Parse`] if the reply is
    /// not a JSON object.
    pub async fn update(&self) -> Result<DeviceState, Error> {
        let fields = fetch_object(&self.inner.client, "status").await?;
        tracing::debug!(fields = fields.len(), "Status update");
        self.inner.ingest(fields, UpdateSource::Poll);
        Ok(self.inner.status.snapshot())
    }

    /// Fetches `/config` into the configuration cache.
    ///
    /// Configuration fields do not notify state observers.
    ///
    /// # Errors
    ///
    /// Same as [`update`](Self::update).
    pub async fn update_config(&self) -> Result<DeviceState, Error> {
        self.inner.update_config().await
    }

    /// Checks connectivity and returns the charger's serial and model.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFeature`] on firmware that does not
    /// report a serial, plus the errors of [`update`](Self::update).
    pub async fn test_and_get(&self) -> Result<DeviceInfo, Error> {
        let config = self.inner.client.get("config").await?;
        DeviceInfo::from_config(&config)
    }

    /// Returns a snapshot of the status fields.
    #[must_use]
    pub fn state_snapshot(&self) -> DeviceState {
        self.inner.status.snapshot()
    }

    /// Returns a snapshot of the configuration fields.
    #[must_use]
    pub fn config_snapshot(&self) -> DeviceState {
        self.inner.config.snapshot()
    }

    // ========== Push channel ==========

    /// Starts listening for push updates.
    ///
    /// `callback` is registered as a state observer until
    /// [`ws_disconnect`](Self::ws_disconnect). Returns once the first
    /// connection attempt finished; a transient failure is retried in the
    /// background and is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyListening`] if the channel is not
    /// disconnected and [`Error::Authentication`] if the first attempt was
    /// rejected. After [`close`](Self::close) it returns
    /// [`TransportError::SessionClosed`](crate::TransportError::SessionClosed).
    /// In all of these cases `callback` is not kept.
    pub async fn ws_connect<F>(&self, callback: F) -> Result<(), Error>
    where
        F: Fn(&StateUpdate) + Send + Sync + 'static,
    {
        self.inner.client.session().session().client()?;

        let id = self.inner.callbacks.on_state_changed(callback);
        let sink: Arc<dyn PushSink> = Arc::new(ChargerSink {
            inner: Arc::downgrade(&self.inner),
        });

        if let Err(err) = self.inner.push.connect(sink).await {
            self.inner.callbacks.unsubscribe(id);
            return Err(err);
        }

        if let Some(previous) = self.inner.ws_subscription.lock().replace(id) {
            self.inner.callbacks.unsubscribe(previous);
        }
        Ok(())
    }

    /// Stops the push channel.
    ///
    /// No observer fires for a push frame after this returns, and the
    /// callback given to [`ws_connect`](Self::ws_connect) is unregistered.
    pub async fn ws_disconnect(&self) {
        self.inner.push.disconnect().await;
        // Waits for a poll that is notifying observers right now.
        let _guard = self.inner.dispatch.lock();
        if let Some(id) = self.inner.ws_subscription.lock().take() {
            self.inner.callbacks.unsubscribe(id);
        }
    }

    /// Returns the push channel state.
    #[must_use]
    pub fn ws_state(&self) -> ConnectionState {
        self.inner.push.state()
    }

    /// Returns the error behind the latest push failure, if any.
    #[must_use]
    pub fn last_ws_error(&self) -> Option<Arc<Error>> {
        self.inner.push.last_error()
    }

    // ========== Observers ==========

    /// Registers an observer for status changes from either channel.
    pub fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StateUpdate) + Send + Sync + 'static,
    {
        self.inner.callbacks.on_state_changed(callback)
    }

    /// Registers an observer for push channel transitions.
    pub fn on_connection_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(ConnectionState, Option<&Error>) + Send + Sync + 'static,
    {
        self.inner.callbacks.on_connection_changed(callback)
    }

    /// Removes an observer. Returns `true` if it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.callbacks.unsubscribe(id)
    }

    // ========== Commands ==========

    /// Sends a command after checking the firmware supports it.
    ///
    /// A `POST` whose reply carries `config_version` refreshes the
    /// configuration cache; a failed refresh is logged, not returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFeature`] if the firmware is too old or
    /// its version is unknown, [`Error::CommandRejected`] if an acknowledged
    /// command was refused, plus the errors of [`update`](Self::update).
    pub async fn send<C: Command + Sync>(&self, command: &C) -> Result<Value, Error> {
        if let Some(minimum) = command.min_firmware() {
            self.require(minimum).await?;
        }
        self.execute(command).await
    }

    /// Returns `true` if the gateway firmware is at least `minimum`.
    ///
    /// Loads the configuration first if it was never fetched.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`update_config`](Self::update_config).
    pub async fn supports(&self, minimum: FirmwareVersion) -> Result<bool, Error> {
        if self.inner.config.read(DeviceState::is_empty) {
            self.inner.update_config().await?;
        }
        match self.firmware_version() {
            Some(version) => Ok(version.supports(minimum)),
            None => {
                tracing::warn!("Unable to find firmware version");
                Ok(false)
            }
        }
    }

    async fn require(&self, minimum: FirmwareVersion) -> Result<(), Error> {
        if self.supports(minimum).await? {
            Ok(())
        } else {
            tracing::debug!(%minimum, "Feature not supported for older firmware");
            Err(Error::UnsupportedFeature)
        }
    }

    async fn execute<C: Command + Sync>(&self, command: &C) -> Result<Value, Error> {
        let reply = self.inner.client.send_command(command).await?;

        if command.expects_ack() {
            CommandReply::from_value(&reply)?.into_result()?;
        }

        if command.method() == Method::POST
            && reply.get("config_version").is_some()
            && let Err(err) = self.inner.update_config().await
        {
            tracing::warn!(error = %err, "Config refresh after command failed");
        }
        Ok(reply)
    }

    // ========== Teardown ==========

    /// Disconnects the push channel and releases the transport session.
    ///
    /// An owned session is closed, affecting every clone of this charger. A
    /// session supplied with [`ChargerBuilder::with_session`] stays open.
    pub async fn close(&self) {
        self.ws_disconnect().await;
        self.inner.client.session().release();
    }
}

impl std::fmt::Debug for Charger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Charger")
            .field("url", &self.inner.client.base_url().as_str())
            .field("ws_state", &self.inner.push.state())
            .field("fields", &self.inner.status.read(DeviceState::len))
            .finish_non_exhaustive()
    }
}

impl Inner {
    /// Merges fields and notifies observers of real changes.
    fn ingest(&self, fields: Map<String, Value>, source: UpdateSource) -> ChangedFields {
        let _guard = self.dispatch.lock();
        let changed = self.status.apply(fields, source);

        if !changed.is_empty() && self.callbacks.has_state_observers() {
            let update = StateUpdate {
                source,
                changed: changed.clone(),
                state: self.status.snapshot(),
            };
            self.callbacks.dispatch_state(&update);
        }
        changed
    }

    async fn update_config(&self) -> Result<DeviceState, Error> {
        let fields = fetch_object(&self.client, "config").await?;
        tracing::debug!(fields = fields.len(), "Config update");
        self.config.apply(fields, UpdateSource::Poll);
        Ok(self.config.snapshot())
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.push.abort();
        self.client.session().release();
    }
}

/// GETs an endpoint that must answer with a JSON object.
async fn fetch_object(client: &HttpClient, path: &str) -> Result<Map<String, Value>, Error> {
    match client.get(path).await? {
        Value::Object(fields) => Ok(fields),
        other => Err(ParseError::UnexpectedFormat(format!(
            "/{path} did not return a JSON object: {other}"
        ))
        .into()),
    }
}

/// Routes push channel output into a charger without keeping it alive.
struct ChargerSink {
    inner: Weak<Inner>,
}

impl PushSink for ChargerSink {
    fn on_fields(&self, mut fields: Map<String, Value>) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };

        if let Some(wh) = fields.remove("wh") {
            fields.insert("watthour".to_string(), wh);
        }

        if UPDATE_TRIGGERS.iter().any(|key| fields.contains_key(*key)) {
            let weak = Weak::clone(&self.inner);
            tokio::spawn(async move {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                if let Err(err) = inner.update_config().await {
                    tracing::warn!(error = %err, "Config refresh after push failed");
                }
            });
        }

        inner.ingest(fields, UpdateSource::Push);
    }

    fn on_connection_state(&self, state: ConnectionState, error: Option<&Error>) {
        if let Some(inner) = self.inner.upgrade() {
            inner.callbacks.dispatch_connection(state, error);
        }
    }
}
