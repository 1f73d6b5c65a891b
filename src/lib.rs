// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `OpenEVSE` Lib - A Rust client for `OpenEVSE` EV chargers.
//!
//! This library keeps a live view of one charger by combining HTTP polling
//! of the REST API with the WebSocket push channel, and exposes the charger's
//! commands as typed async calls.
//!
//! # Supported Features
//!
//! - **Polling**: `/status` and `/config` merged into a shared cache
//! - **Push updates**: WebSocket listener with keepalive and backoff reconnection
//! - **Observers**: callbacks for field changes and connection transitions
//! - **Commands**: charge mode, current limit, overrides, claims, limits, sensors
//!
//! # Quick Start
//!
//! ```no_run
//! use openevse_lib::Charger;
//!
//! #[tokio::main]
//! async fn main() -> openevse_lib::Result<()> {
//!     let charger = Charger::http("192.168.1.60")
//!         .with_credentials("admin", "password")
//!         .build()?;
//!
//!     // Initial poll
//!     charger.update().await?;
//!     charger.update_config().await?;
//!     println!("State: {:?}", charger.state());
//!
//!     // Live updates
//!     charger
//!         .ws_connect(|update| {
//!             for name in update.changed.iter() {
//!                 println!("{name} -> {:?}", update.state.get(name));
//!             }
//!         })
//!         .await?;
//!
//!     charger.set_current(16).await?;
//!
//!     charger.close().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Sharing a Session
//!
//! ```no_run
//! use std::sync::Arc;
//! use openevse_lib::{Charger, protocol::Session};
//!
//! # async fn example() -> openevse_lib::Result<()> {
//! let session = Arc::new(Session::new()?);
//! let charger = Charger::http("192.168.1.60")
//!     .with_session(Arc::clone(&session))
//!     .build()?;
//!
//! charger.update().await?;
//! charger.close().await;
//!
//! // The charger never closes a session it was given
//! assert!(!session.is_closed());
//! # Ok(())
//! # }
//! ```

mod charger;
pub mod command;
pub mod error;
pub mod protocol;
pub mod push;
pub mod response;
pub mod state;
pub mod subscription;
pub mod types;

pub use charger::{Charger, ChargerBuilder, SafetyCounts};
pub use command::Command;
pub use error::{Error, ParseError, Result, TransportError, ValueError};
pub use protocol::{HttpConfig, Session};
pub use push::{ConnectionState, ReconnectPolicy};
pub use response::{CommandReply, DeviceInfo, RapiReply};
pub use state::{DeviceState, UpdateSource};
pub use subscription::{StateUpdate, SubscriptionId};
pub use types::{ChargeMode, EvseState, FirmwareVersion, LimitType, OverrideState, ServiceLevel};
