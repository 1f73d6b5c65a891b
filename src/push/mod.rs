// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Push updates from the charger.
//!
//! The charger streams JSON objects of changed fields over a WebSocket at
//! `/ws`. [`PushChannel`] owns the lifecycle of that connection:
//!
//! ```text
//! Disconnected -> Connecting -> Connected -> Reconnecting -> Connecting ...
//!       ^                                          |
//!       +------ disconnect() or rejected auth -----+
//! ```
//!
//! Connections are opened through the [`PushConnector`] trait, so the
//! transport can be replaced. [`WebSocketConnector`] is the default.

mod backoff;
mod channel;
mod connection;
mod websocket;

pub use backoff::ReconnectPolicy;
pub use channel::{ConnectionState, PushChannel, PushSink};
pub use connection::{PushConnection, PushConnector, PushFrame};
pub use websocket::WebSocketConnector;
