// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transport-neutral view of one push connection.

use std::pin::Pin;

use futures_util::future::BoxFuture;
use futures_util::stream::BoxStream;
use futures_util::{Sink, Stream};

use crate::error::{Error, TransportError};

/// An inbound frame relevant to the push channel.
///
/// Transport-level control frames (ping/pong, binary) are filtered out by
/// the connector before they reach the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushFrame {
    /// A text frame, expected to hold a JSON object of field updates.
    Text(String),
    /// The peer closed the connection, with an optional reason.
    Close(Option<String>),
}

type OutboundSink = Pin<Box<dyn Sink<String, Error = TransportError> + Send>>;

/// One open push connection: an inbound frame stream and an outbound sink.
pub struct PushConnection {
    pub(crate) inbound: BoxStream<'static, Result<PushFrame, TransportError>>,
    pub(crate) outbound: OutboundSink,
}

impl PushConnection {
    /// Wraps a frame stream and a text sink.
    pub fn new<St, Si>(inbound: St, outbound: Si) -> Self
    where
        St: Stream<Item = Result<PushFrame, TransportError>> + Send + 'static,
        Si: Sink<String, Error = TransportError> + Send + 'static,
    {
        Self {
            inbound: Box::pin(inbound),
            outbound: Box::pin(outbound),
        }
    }
}

impl std::fmt::Debug for PushConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushConnection").finish_non_exhaustive()
    }
}

/// Opens push connections to a charger.
///
/// Implemented by [`WebSocketConnector`](super::WebSocketConnector); tests
/// and alternative transports can supply their own.
///
/// A connector must return [`Error::Authentication`] when the charger
/// rejects the credentials and [`TransportError::SessionClosed`] once its
/// session is closed, so the channel can stop retrying.
pub trait PushConnector: Send + Sync + 'static {
    /// Opens one connection.
    fn connect(&self) -> BoxFuture<'_, Result<PushConnection, Error>>;
}
