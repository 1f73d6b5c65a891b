// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Restart and schedule commands.

use reqwest::Method;
use serde_json::json;

use crate::command::Command;
use crate::protocol::RequestBody;
use crate::types::FirmwareVersion;

/// Restarts part of the charger with `POST /restart`.
///
/// Restarting the EVSE through this endpoint needs gateway 5.0.0; older
/// firmware resets it with [`RapiCommand::reset`](super::RapiCommand::reset).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartCommand {
    /// The WiFi gateway.
    Gateway,
    /// The EVSE controller.
    Evse,
}

impl Command for RestartCommand {
    fn method(&self) -> Method {
        Method::POST
    }

    fn path(&self) -> String {
        "restart".to_string()
    }

    fn body(&self) -> RequestBody {
        let device = match self {
            Self::Gateway => "gateway",
            Self::Evse => "evse",
        };
        RequestBody::Json(json!({ "device": device }))
    }

    fn min_firmware(&self) -> Option<FirmwareVersion> {
        match self {
            Self::Gateway => None,
            Self::Evse => Some(FirmwareVersion::new(5, 0, 0)),
        }
    }
}

/// Reads the timer schedule.
///
/// The gateway serves the schedule on `POST /schedule` with an empty body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScheduleCommand;

impl Command for ScheduleCommand {
    fn method(&self) -> Method {
        Method::POST
    }

    fn path(&self) -> String {
        "schedule".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restart_bodies() {
        assert_eq!(
            RestartCommand::Gateway.body(),
            RequestBody::Json(json!({"device": "gateway"}))
        );
        assert_eq!(
            RestartCommand::Evse.body(),
            RequestBody::Json(json!({"device": "evse"}))
        );
        assert!(RestartCommand::Gateway.min_firmware().is_none());
    }

    #[test]
    fn schedule_is_a_post() {
        assert_eq!(ScheduleCommand.method(), Method::POST);
        assert_eq!(ScheduleCommand.body(), RequestBody::Empty);
    }
}
