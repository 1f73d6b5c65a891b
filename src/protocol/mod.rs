// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Request/response transport for OpenEVSE chargers.
//!
//! - [`Session`] / [`SessionHandle`]: the pooled HTTP client and who owns it
//! - [`HttpConfig`]: connection descriptor (host, scheme, credentials, timeout)
//! - [`HttpClient`]: issues JSON requests against the charger's REST API
//!
//! The push channel lives in [`crate::push`]; it reuses the same
//! configuration to derive its WebSocket endpoint.

mod http;
mod session;

pub use http::{Credentials, HttpClient, HttpConfig};
pub use session::{Session, SessionHandle};

use reqwest::Method;
use serde_json::Value;

use crate::command::Command;
use crate::error::Error;

/// Body of an HTTP request to the charger.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// No body.
    Empty,
    /// A JSON document.
    Json(Value),
    /// `application/x-www-form-urlencoded` pairs.
    Form(Vec<(String, String)>),
}

impl RequestBody {
    /// Builds a form body from borrowed pairs.
    #[must_use]
    pub fn form<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::Form(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Encodes pairs as `application/x-www-form-urlencoded`.
pub(crate) fn encode_form(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Trait for transports that can exchange JSON with a charger.
///
/// Replies are returned as raw JSON. A non-JSON body is surfaced as
/// [`Value::String`] and an empty body as [`Value::Null`].
#[allow(async_fn_in_trait)]
pub trait Protocol {
    /// Sends a typed command and returns the reply.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] on network failure or unexpected status,
    /// [`Error::Authentication`] on HTTP 401 and [`Error::Parse`] on HTTP 400.
    async fn send_command<C: Command + Sync>(&self, command: &C) -> Result<Value, Error>;

    /// Sends a raw request to an endpoint path.
    ///
    /// # Errors
    ///
    /// Same as [`send_command`](Self::send_command).
    async fn request(&self, method: Method, path: &str, body: &RequestBody) -> Result<Value, Error>;

    /// Fetches an endpoint with `GET`.
    ///
    /// # Errors
    ///
    /// Same as [`send_command`](Self::send_command).
    async fn get(&self, path: &str) -> Result<Value, Error> {
        self.request(Method::GET, path, &RequestBody::Empty).await
    }
}
