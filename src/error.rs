// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `openevse_lib` library.
//!
//! The hierarchy separates transport failures (retryable on the push path,
//! surfaced on the poll path), authentication failures (never retried),
//! parse failures (dropped for push frames, surfaced for polls) and command
//! argument validation.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// The request could not complete at the transport level.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The charger rejected the supplied credentials.
    #[error("authentication failed: credentials rejected")]
    Authentication,

    /// The charger replied with something that could not be interpreted.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// A command argument was rejected before being sent.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// The charger firmware does not support the requested feature.
    #[error("feature not supported by the charger firmware")]
    UnsupportedFeature,

    /// The push channel is already connected or connecting.
    #[error("push channel is already listening")]
    AlreadyListening,

    /// The charger answered a command with an error message.
    #[error("command rejected: {0}")]
    CommandRejected(String),
}

/// Errors raised while talking to the charger over HTTP or WebSocket.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Request timed out.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// Connection to the charger failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// WebSocket handshake or stream failure.
    #[error("websocket error: {0}")]
    WebSocket(String),

    /// Invalid URL or address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The transport session has been closed.
    #[error("transport session is closed")]
    SessionClosed,

    /// The charger stopped answering keepalive pings.
    #[error("no pong reply")]
    PingTimeout,

    /// The charger answered with an unexpected HTTP status.
    #[error("unexpected HTTP status {code}: {body}")]
    Status {
        /// The HTTP status code.
        code: u16,
        /// The reply body, possibly empty.
        body: String,
    },
}

/// Errors related to parsing charger replies and push frames.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Expected field is missing from the reply.
    #[error("missing field in response: {0}")]
    MissingField(String),

    /// Unexpected reply shape.
    #[error("unexpected response format: {0}")]
    UnexpectedFormat(String),

    /// Failed to parse a specific value.
    #[error("failed to parse {field}: {message}")]
    InvalidValue {
        /// The field that failed to parse.
        field: String,
        /// Description of the parsing failure.
        message: String,
    },

    /// The charger replied with HTTP 400.
    #[error("request rejected by charger: {0}")]
    Rejected(String),
}

/// Errors related to command argument validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A numeric value is outside the allowed range.
    #[error("value {actual} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Minimum allowed value.
        min: i64,
        /// Maximum allowed value.
        max: i64,
        /// The actual value that was provided.
        actual: i64,
    },

    /// An unrecognised mode name was provided.
    #[error("invalid {kind}: {value}")]
    InvalidChoice {
        /// What kind of value was being parsed.
        kind: &'static str,
        /// The rejected input.
        value: String,
    },
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
