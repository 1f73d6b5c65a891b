// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! OpenEVSE command definitions.
//!
//! Each command is a typed description of one HTTP request against the
//! charger's REST API: method, endpoint path, body and the minimum gateway
//! firmware that understands it.
//!
//! # Available Commands
//!
//! | Command Type | Purpose | Endpoint |
//! |-------------|---------|---------|
//! | [`RapiCommand`] | Raw RAPI serial command | `POST /r` |
//! | [`ConfigCommand`] | Charge mode, service level, LED, divert | `POST /config` |
//! | [`DivertModeCommand`] | Solar divert mode | `POST /divertmode` |
//! | [`OverrideCommand`] | Manual override | `/override` |
//! | [`LimitCommand`] | Session charge limit | `/limit` |
//! | [`ClaimCommand`] | EVSE manager claims | `/claims` |
//! | [`SensorCommand`] | Push grid, solar and vehicle readings | `POST /status` |
//! | [`RestartCommand`] | Restart gateway or EVSE | `POST /restart` |
//! | [`ScheduleCommand`] | Timer schedule | `POST /schedule` |
//!
//! # Examples
//!
//! ```
//! use openevse_lib::command::{Command, ConfigCommand, RapiCommand};
//! use openevse_lib::protocol::RequestBody;
//! use openevse_lib::types::ChargeMode;
//! use reqwest::Method;
//! use serde_json::json;
//!
//! let cmd = ConfigCommand::ChargeMode(ChargeMode::Eco);
//! assert_eq!(cmd.method(), Method::POST);
//! assert_eq!(cmd.path(), "config");
//! assert_eq!(cmd.body(), RequestBody::Json(json!({"charge_mode": "eco"})));
//!
//! let rapi = RapiCommand::set_current(16);
//! assert_eq!(rapi.path(), "r");
//! assert_eq!(rapi.as_str(), "$SC 16 N");
//! ```

mod config;
mod manual;
mod rapi;
mod sensor;
mod system;

pub use config::{ConfigCommand, DivertModeCommand};
pub use manual::{ClaimCommand, ClaimRequest, LimitCommand, OverrideCommand, OverrideRequest};
pub use rapi::RapiCommand;
pub use sensor::SensorCommand;
pub use system::{RestartCommand, ScheduleCommand};

use reqwest::Method;

use crate::protocol::RequestBody;
use crate::types::FirmwareVersion;

/// A request that can be sent to an OpenEVSE charger.
pub trait Command {
    /// Returns the HTTP method.
    fn method(&self) -> Method;

    /// Returns the endpoint path relative to the charger root, for example
    /// `"config"` or `"claims/20"`.
    fn path(&self) -> String;

    /// Returns the request body.
    fn body(&self) -> RequestBody {
        RequestBody::Empty
    }

    /// Returns the oldest gateway firmware that supports this command.
    ///
    /// `None` means every firmware does.
    fn min_firmware(&self) -> Option<FirmwareVersion> {
        None
    }

    /// Returns `true` if the reply carries a `msg` that must read `done` or
    /// `no change` for the command to count as applied.
    fn expects_ack(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe;

    impl Command for Probe {
        fn method(&self) -> Method {
            Method::GET
        }

        fn path(&self) -> String {
            "status".to_string()
        }
    }

    #[test]
    fn defaults() {
        assert_eq!(Probe.body(), RequestBody::Empty);
        assert!(Probe.min_firmware().is_none());
        assert!(!Probe.expects_ack());
    }
}
