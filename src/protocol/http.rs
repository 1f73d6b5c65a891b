// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP protocol implementation for OpenEVSE chargers.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde_json::Value;
use url::Url;

use crate::command::Command;
use crate::error::{Error, ParseError, TransportError};
use crate::protocol::{Protocol, RequestBody, SessionHandle, encode_form};

// ============================================================================
// HttpConfig - Connection descriptor for one charger
// ============================================================================

/// Configuration for an HTTP connection to an OpenEVSE charger.
///
/// # Examples
///
/// ```
/// use openevse_lib::protocol::HttpConfig;
/// use std::time::Duration;
///
/// // Simple configuration
/// let config = HttpConfig::new("192.168.1.100");
///
/// // With all options
/// let config = HttpConfig::new("192.168.1.100")
///     .with_port(8080)
///     .with_https()
///     .with_credentials("admin", "password")
///     .with_timeout(Duration::from_secs(5));
///
/// assert_eq!(config.base_url(), "https://192.168.1.100:8080");
/// assert_eq!(config.ws_url(), "wss://192.168.1.100:8080/ws");
/// ```
#[derive(Debug, Clone)]
pub struct HttpConfig {
    host: String,
    port: u16,
    use_https: bool,
    credentials: Option<Credentials>,
    timeout: Duration,
}

impl HttpConfig {
    /// Default HTTP port.
    pub const DEFAULT_PORT: u16 = 80;
    /// Default HTTPS port.
    pub const DEFAULT_HTTPS_PORT: u16 = 443;
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a new HTTP configuration for the specified host.
    ///
    /// A leading `http://` or `https://` is accepted and selects the scheme.
    ///
    /// # Arguments
    ///
    /// * `host` - The hostname or IP address of the charger
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        let host = host.into();
        let config = Self {
            host: String::new(),
            port: Self::DEFAULT_PORT,
            use_https: false,
            credentials: None,
            timeout: Self::DEFAULT_TIMEOUT,
        };

        if let Some(rest) = host.strip_prefix("https://") {
            Self {
                host: rest.trim_end_matches('/').to_string(),
                ..config
            }
            .with_https()
        } else {
            let rest = host.strip_prefix("http://").unwrap_or(&host);
            Self {
                host: rest.trim_end_matches('/').to_string(),
                ..config
            }
        }
    }

    /// Sets a custom port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Enables HTTPS.
    ///
    /// If port hasn't been explicitly set, it will be changed to 443.
    #[must_use]
    pub fn with_https(mut self) -> Self {
        self.use_https = true;
        if self.port == Self::DEFAULT_PORT {
            self.port = Self::DEFAULT_HTTPS_PORT;
        }
        self
    }

    /// Sets HTTP Basic credentials.
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some(Credentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns whether HTTPS is enabled.
    #[must_use]
    pub fn use_https(&self) -> bool {
        self.use_https
    }

    /// Returns the credentials if set.
    #[must_use]
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Returns the timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn authority(&self) -> String {
        let default_port = if self.use_https {
            Self::DEFAULT_HTTPS_PORT
        } else {
            Self::DEFAULT_PORT
        };
        if self.port == default_port {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Builds the base URL from this configuration.
    #[must_use]
    pub fn base_url(&self) -> String {
        let scheme = if self.use_https { "https" } else { "http" };
        format!("{scheme}://{}", self.authority())
    }

    /// Builds the push endpoint URL (`ws://host/ws`, or `wss` over HTTPS).
    #[must_use]
    pub fn ws_url(&self) -> String {
        let scheme = if self.use_https { "wss" } else { "ws" };
        format!("{scheme}://{}/ws", self.authority())
    }

    /// Creates an `HttpClient` that issues requests through `session`.
    ///
    /// # Errors
    ///
    /// Returns error if the host does not form a valid URL.
    pub fn into_client(self, session: SessionHandle) -> Result<HttpClient, TransportError> {
        let base_url = Url::parse(&format!("{}/", self.base_url()))
            .map_err(|e| TransportError::InvalidAddress(format!("{}: {e}", self.host)))?;

        Ok(HttpClient {
            base_url,
            credentials: self.credentials,
            timeout: self.timeout,
            session,
        })
    }
}

/// HTTP Basic authentication credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Username for authentication.
    pub username: String,
    /// Password for authentication.
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

// ============================================================================
// HttpClient - Request/response against the charger's REST API
// ============================================================================

/// HTTP client for one OpenEVSE charger.
///
/// Every request goes through the charger's [`SessionHandle`]; once that
/// session is closed, requests fail with [`TransportError::SessionClosed`].
///
/// # Examples
///
/// ```no_run
/// use openevse_lib::protocol::{HttpConfig, Protocol, SessionHandle};
///
/// # async fn example() -> openevse_lib::Result<()> {
/// let client = HttpConfig::new("192.168.1.100").into_client(SessionHandle::owned()?)?;
/// let status = client.get("status").await?;
/// println!("{status}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct HttpClient {
    base_url: Url,
    credentials: Option<Credentials>,
    timeout: Duration,
    session: SessionHandle,
}

impl HttpClient {
    /// Returns the base URL of the charger.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the credentials if set.
    #[must_use]
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Returns the session handle requests are issued through.
    #[must_use]
    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Builds the URL for an endpoint path relative to the charger root.
    fn build_url(&self, path: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| TransportError::InvalidAddress(format!("{path}: {e}")))
    }

    fn transport_error(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            let millis = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
            TransportError::Timeout(millis)
        } else if err.is_connect() {
            TransportError::ConnectionFailed(err.to_string())
        } else {
            TransportError::Http(err)
        }
    }
}

impl Protocol for HttpClient {
    async fn send_command<C: Command + Sync>(&self, command: &C) -> Result<Value, Error> {
        self.request(command.method(), &command.path(), &command.body())
            .await
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: &RequestBody,
    ) -> Result<Value, Error> {
        let client = self.session.session().client()?;
        let url = self.build_url(path)?;

        tracing::debug!(%method, url = %url, "Sending HTTP request");

        let mut request = client.request(method, url.clone()).timeout(self.timeout);
        if let Some(creds) = &self.credentials {
            request = request.basic_auth(&creds.username, Some(&creds.password));
        }
        request = match body {
            RequestBody::Empty => request,
            RequestBody::Json(value) => request.json(value),
            RequestBody::Form(pairs) => request
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(encode_form(pairs)),
        };

        let response = request
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e))?;
        let text = String::from_utf8_lossy(&bytes);

        tracing::debug!(status = status.as_u16(), body = %text, "Received HTTP response");

        let message = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or_else(|_| {
                tracing::debug!(url = %url, "Non JSON response");
                Value::String(text.clone().into_owned())
            })
        };

        match status.as_u16() {
            400 => {
                let reason = error_message(&message);
                tracing::error!(url = %url, reason = %reason, "Charger rejected request");
                Err(ParseError::Rejected(reason).into())
            }
            401 => {
                tracing::error!(url = %url, "Authentication error");
                Err(Error::Authentication)
            }
            code if !status.is_success() => {
                tracing::warn!(url = %url, status = code, body = %text, "Unexpected HTTP status");
                Err(TransportError::Status {
                    code,
                    body: text.into_owned(),
                }
                .into())
            }
            _ => Ok(message),
        }
    }
}

/// Extracts the human readable reason from an error reply.
fn error_message(message: &Value) -> String {
    match message {
        Value::String(text) => text.clone(),
        _ => message
            .get("msg")
            .or_else(|| message.get("error"))
            .and_then(Value::as_str)
            .map_or_else(|| message.to_string(), str::to_string),
    }
}
