// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Charger builder.

use std::sync::Arc;
use std::time::Duration;

use crate::charger::Charger;
use crate::error::Error;
use crate::protocol::{HttpConfig, Session, SessionHandle};
use crate::push::{PushChannel, PushConnector, ReconnectPolicy, WebSocketConnector};

/// Builder for [`Charger`].
///
/// Created with [`Charger::http`] or [`Charger::http_config`].
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use openevse_lib::Charger;
/// use openevse_lib::push::ReconnectPolicy;
///
/// # fn example() -> openevse_lib::Result<()> {
/// let charger = Charger::http("192.168.1.50")
///     .with_credentials("admin", "password")
///     .with_timeout(Duration::from_secs(5))
///     .with_reconnect_policy(
///         ReconnectPolicy::new().with_max_delay(Duration::from_secs(60)),
///     )
///     .with_keepalive(None)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ChargerBuilder {
    config: HttpConfig,
    session: Option<Arc<Session>>,
    policy: ReconnectPolicy,
    keepalive: Option<Duration>,
    connector: Option<Arc<dyn PushConnector>>,
}

impl ChargerBuilder {
    pub(crate) fn new(config: HttpConfig) -> Self {
        Self {
            config,
            session: None,
            policy: ReconnectPolicy::default(),
            keepalive: Some(PushChannel::DEFAULT_KEEPALIVE),
            connector: None,
        }
    }

    /// Sets the port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.config = self.config.with_port(port);
        self
    }

    /// Uses HTTPS for requests and `wss` for the push channel.
    #[must_use]
    pub fn with_https(mut self) -> Self {
        self.config = self.config.with_https();
        self
    }

    /// Sets HTTP Basic credentials, used by both channels.
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.config = self.config.with_credentials(username, password);
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_timeout(timeout);
        self
    }

    /// Issues requests through an application-owned session.
    ///
    /// The charger never closes a session supplied this way.
    #[must_use]
    pub fn with_session(mut self, session: Arc<Session>) -> Self {
        self.session = Some(session);
        self
    }

    /// Sets the backoff applied between push reconnection attempts.
    #[must_use]
    pub fn with_reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the keepalive ping interval. `None` disables keepalive.
    #[must_use]
    pub fn with_keepalive(mut self, interval: Option<Duration>) -> Self {
        self.keepalive = interval;
        self
    }

    /// Replaces the WebSocket transport of the push channel.
    #[must_use]
    pub fn with_push_connector(mut self, connector: Arc<dyn PushConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Returns the HTTP configuration built so far.
    #[must_use]
    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Builds the charger. No request is sent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the address is invalid or the HTTP
    /// client cannot be created.
    pub fn build(self) -> Result<Charger, Error> {
        let session = match self.session {
            Some(session) => SessionHandle::Borrowed(session),
            None => SessionHandle::owned()?,
        };

        let connector: Arc<dyn PushConnector> = match self.connector {
            Some(connector) => connector,
            None => Arc::new(WebSocketConnector::new(
                &self.config,
                Arc::clone(session.session()),
            )?),
        };

        tracing::debug!(
            host = %self.config.host(),
            owned_session = session.is_owned(),
            "Building charger"
        );

        let client = self.config.into_client(session)?;
        let push = PushChannel::new(connector, self.policy, self.keepalive);
        Ok(Charger::new(client, push))
    }
}

impl std::fmt::Debug for ChargerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChargerBuilder")
            .field("config", &self.config)
            .field("borrowed_session", &self.session.is_some())
            .field("policy", &self.policy)
            .field("keepalive", &self.keepalive)
            .field("custom_connector", &self.connector.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let builder = Charger::http("192.168.1.100");
        assert_eq!(builder.keepalive, Some(Duration::from_secs(300)));
        assert_eq!(builder.policy, ReconnectPolicy::default());
        assert!(builder.session.is_none());
        assert_eq!(builder.config().port(), 80);
    }

    #[test]
    fn builder_forwards_http_options() {
        let builder = Charger::http("192.168.1.100")
            .with_https()
            .with_port(8443)
            .with_credentials("admin", "secret")
            .with_timeout(Duration::from_secs(3));

        let config = builder.config();
        assert!(config.use_https());
        assert_eq!(config.port(), 8443);
        assert_eq!(config.timeout(), Duration::from_secs(3));
        assert_eq!(config.credentials().unwrap().username, "admin");
    }

    #[test]
    fn build_with_borrowed_session() {
        let session = Arc::new(Session::new().unwrap());
        let charger = Charger::http("192.168.1.100")
            .with_session(Arc::clone(&session))
            .build()
            .unwrap();
        assert!(!charger.client().session().is_owned());

        drop(charger);
        assert!(!session.is_closed());
    }

    #[test]
    fn build_rejects_invalid_host() {
        let result = Charger::http("not a host").build();
        assert!(matches!(result, Err(Error::Transport(_))));
    }

    #[test]
    fn debug_hides_credentials() {
        let builder = Charger::http("192.168.1.100").with_credentials("admin", "secret");
        let debug = format!("{builder:?}");
        assert!(!debug.contains("secret"));
    }
}
