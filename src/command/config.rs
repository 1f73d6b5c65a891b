// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Configuration writes.

use reqwest::Method;
use serde_json::json;

use crate::command::Command;
use crate::protocol::RequestBody;
use crate::types::{ChargeMode, FirmwareVersion, ServiceLevel};

/// A single setting written with `POST /config`.
///
/// # Examples
///
/// ```
/// use openevse_lib::command::{Command, ConfigCommand};
/// use openevse_lib::types::{FirmwareVersion, ServiceLevel};
///
/// let cmd = ConfigCommand::ServiceLevel(ServiceLevel::LEVEL_2);
/// assert!(cmd.expects_ack());
///
/// let led = ConfigCommand::LedBrightness(128);
/// assert_eq!(led.min_firmware(), Some(FirmwareVersion::new(4, 1, 0)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Charge mode used at startup.
    ChargeMode(ChargeMode),
    /// J1772 service level.
    ServiceLevel(ServiceLevel),
    /// Status LED brightness (0-255).
    LedBrightness(u8),
    /// Enable or disable solar divert.
    DivertEnabled(bool),
}

impl Command for ConfigCommand {
    fn method(&self) -> Method {
        Method::POST
    }

    fn path(&self) -> String {
        "config".to_string()
    }

    fn body(&self) -> RequestBody {
        RequestBody::Json(match self {
            Self::ChargeMode(mode) => json!({ "charge_mode": mode.as_str() }),
            Self::ServiceLevel(level) => json!({ "service": level.value() }),
            Self::LedBrightness(level) => json!({ "led_brightness": level }),
            Self::DivertEnabled(enabled) => json!({ "divert_enabled": enabled }),
        })
    }

    fn min_firmware(&self) -> Option<FirmwareVersion> {
        match self {
            Self::ChargeMode(_) | Self::ServiceLevel(_) => None,
            Self::LedBrightness(_) => Some(FirmwareVersion::new(4, 1, 0)),
            Self::DivertEnabled(_) => Some(FirmwareVersion::new(2, 9, 1)),
        }
    }

    fn expects_ack(&self) -> bool {
        matches!(self, Self::ChargeMode(_) | Self::ServiceLevel(_))
    }
}

/// Sets the solar divert mode with `POST /divertmode`.
///
/// The endpoint takes a form field and answers with plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DivertModeCommand(pub ChargeMode);

impl DivertModeCommand {
    /// Reply text of a successful change.
    pub const SUCCESS_REPLY: &'static str = "Divert Mode changed";
}

impl Command for DivertModeCommand {
    fn method(&self) -> Method {
        Method::POST
    }

    fn path(&self) -> String {
        "divertmode".to_string()
    }

    fn body(&self) -> RequestBody {
        RequestBody::form([("divertmode", self.0.divert_code().to_string())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_bodies() {
        assert_eq!(
            ConfigCommand::ChargeMode(ChargeMode::Fast).body(),
            RequestBody::Json(json!({"charge_mode": "fast"}))
        );
        assert_eq!(
            ConfigCommand::ServiceLevel(ServiceLevel::AUTO).body(),
            RequestBody::Json(json!({"service": 0}))
        );
        assert_eq!(
            ConfigCommand::DivertEnabled(false).body(),
            RequestBody::Json(json!({"divert_enabled": false}))
        );
    }

    #[test]
    fn config_firmware_gates() {
        let mode = ConfigCommand::ChargeMode(ChargeMode::Eco);
        assert!(mode.min_firmware().is_none());
        assert_eq!(
            ConfigCommand::DivertEnabled(true).min_firmware(),
            Some(FirmwareVersion::new(2, 9, 1))
        );
        assert!(!ConfigCommand::LedBrightness(10).expects_ack());
    }

    #[test]
    fn divert_mode_form() {
        let cmd = DivertModeCommand(ChargeMode::Eco);
        assert_eq!(cmd.path(), "divertmode");
        assert_eq!(cmd.body(), RequestBody::form([("divertmode", "2")]));
    }
}
