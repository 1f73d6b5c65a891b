// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! WebSocket connector for the charger's `/ws` endpoint.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures_util::future::{self, BoxFuture};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::http::{StatusCode, Uri};
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder, Message};
use url::Url;

use super::{PushConnection, PushConnector, PushFrame};
use crate::error::{Error, TransportError};
use crate::protocol::{Credentials, HttpConfig, Session};

/// Opens push connections with `tokio-tungstenite`.
///
/// Credentials are sent as an HTTP Basic `Authorization` header on the
/// upgrade request. A `401` upgrade response maps to
/// [`Error::Authentication`].
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: Url,
    credentials: Option<Credentials>,
    session: Arc<Session>,
}

impl WebSocketConnector {
    /// Creates a connector for the push endpoint described by `config`.
    ///
    /// Connection attempts fail with [`TransportError::SessionClosed`] once
    /// `session` is closed.
    ///
    /// # Errors
    ///
    /// Returns error if the host does not form a valid URL.
    pub fn new(config: &HttpConfig, session: Arc<Session>) -> Result<Self, TransportError> {
        let url = Url::parse(&config.ws_url())
            .map_err(|e| TransportError::InvalidAddress(format!("{}: {e}", config.host())))?;
        Ok(Self {
            url,
            credentials: config.credentials().cloned(),
            session,
        })
    }

    /// Returns the push endpoint URL.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    fn request(&self) -> Result<ClientRequestBuilder, TransportError> {
        let uri: Uri = self
            .url
            .as_str()
            .parse()
            .map_err(|e: tungstenite::http::uri::InvalidUri| {
                TransportError::InvalidAddress(e.to_string())
            })?;

        let mut request = ClientRequestBuilder::new(uri);
        if let Some(creds) = &self.credentials {
            request = request.with_header("Authorization", basic_auth(creds));
        }
        Ok(request)
    }

    async fn open(&self) -> Result<PushConnection, Error> {
        self.session.client()?;
        let request = self.request()?;

        tracing::debug!(url = %self.url, "Connecting to push endpoint");

        let (stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(handshake_error)?;

        tracing::debug!(url = %self.url, "Push endpoint connected");

        let (write, read) = stream.split();

        let inbound = read.filter_map(|message| future::ready(inbound_frame(message)));
        let outbound = write
            .sink_map_err(|e| TransportError::WebSocket(e.to_string()))
            .with(|text: String| future::ready(Ok::<_, TransportError>(Message::text(text))));

        Ok(PushConnection::new(inbound, outbound))
    }
}

impl PushConnector for WebSocketConnector {
    fn connect(&self) -> BoxFuture<'_, Result<PushConnection, Error>> {
        Box::pin(self.open())
    }
}

fn basic_auth(creds: &Credentials) -> String {
    let token = BASE64.encode(format!("{}:{}", creds.username, creds.password));
    format!("Basic {token}")
}

fn handshake_error(err: tungstenite::Error) -> Error {
    match err {
        tungstenite::Error::Http(response) if response.status() == StatusCode::UNAUTHORIZED => {
            tracing::error!("Push endpoint rejected credentials");
            Error::Authentication
        }
        tungstenite::Error::Http(response) => TransportError::Status {
            code: response.status().as_u16(),
            body: response
                .body()
                .as_ref()
                .map(|body| String::from_utf8_lossy(body).into_owned())
                .unwrap_or_default(),
        }
        .into(),
        tungstenite::Error::Io(io) => TransportError::ConnectionFailed(io.to_string()).into(),
        other => TransportError::WebSocket(other.to_string()).into(),
    }
}

/// Maps a WebSocket message to a push frame; control frames are skipped.
fn inbound_frame(
    message: Result<Message, tungstenite::Error>,
) -> Option<Result<PushFrame, TransportError>> {
    match message {
        Ok(Message::Text(text)) => Some(Ok(PushFrame::Text(text.to_string()))),
        Ok(Message::Close(frame)) => Some(Ok(PushFrame::Close(
            frame.map(|frame| frame.reason.to_string()),
        ))),
        Ok(Message::Ping(_)) => {
            // tungstenite queues the pong reply itself
            tracing::trace!("WebSocket ping");
            None
        }
        Ok(_) => None,
        Err(err) => Some(Err(TransportError::WebSocket(err.to_string()))),
    }
}
