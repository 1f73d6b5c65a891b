// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! External sensor readings posted to `/status`.

use reqwest::Method;
use serde_json::{Map, Value};

use crate::command::Command;
use crate::protocol::RequestBody;
use crate::types::FirmwareVersion;

/// Readings pushed to the charger from external sensors.
///
/// Only the readings that are set are sent. A command with no reading has
/// an empty body; see [`is_empty`](Self::is_empty).
///
/// # Examples
///
/// ```
/// use openevse_lib::command::{Command, SensorCommand};
/// use openevse_lib::protocol::RequestBody;
/// use serde_json::json;
///
/// // Grid import of 1200 W is sent as -1200 (import negative, export positive)
/// let cmd = SensorCommand::SelfProduction {
///     grid: Some(1200),
///     solar: None,
///     invert: true,
///     voltage: Some(240),
/// };
/// assert_eq!(cmd.body(), RequestBody::Json(json!({"grid_ie": -1200, "voltage": 240})));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorCommand {
    /// Grid voltage for power calculations.
    GridVoltage {
        /// Volts.
        voltage: Option<i64>,
    },
    /// Solar production or grid import/export for divert.
    SelfProduction {
        /// Grid import/export in W. Preferred over `solar` when both are set.
        grid: Option<i64>,
        /// Solar production in W.
        solar: Option<i64>,
        /// Negate `grid` before sending.
        invert: bool,
        /// Volts.
        voltage: Option<i64>,
    },
    /// Vehicle state of charge.
    VehicleSoc {
        /// Battery level in percent.
        battery_level: Option<i64>,
        /// Remaining range.
        battery_range: Option<i64>,
        /// Seconds to a full charge.
        time_to_full: Option<i64>,
        /// Volts.
        voltage: Option<i64>,
    },
}

impl SensorCommand {
    fn readings(&self) -> Map<String, Value> {
        let mut data = Map::new();
        let mut put = |key: &str, value: Option<i64>| {
            if let Some(value) = value {
                data.insert(key.to_string(), value.into());
            }
        };

        match *self {
            Self::GridVoltage { voltage } => put("voltage", voltage),
            Self::SelfProduction {
                grid,
                solar,
                invert,
                voltage,
            } => {
                if grid.is_some() {
                    put("grid_ie", grid.map(|w| if invert { -w } else { w }));
                } else {
                    put("solar", solar);
                }
                put("voltage", voltage);
            }
            Self::VehicleSoc {
                battery_level,
                battery_range,
                time_to_full,
                voltage,
            } => {
                put("battery_level", battery_level);
                put("battery_range", battery_range);
                put("time_to_full_charge", time_to_full);
                put("voltage", voltage);
            }
        }
        data
    }

    /// Returns `true` if no reading is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.readings().is_empty()
    }
}

impl Command for SensorCommand {
    fn method(&self) -> Method {
        Method::POST
    }

    fn path(&self) -> String {
        "status".to_string()
    }

    fn body(&self) -> RequestBody {
        RequestBody::Json(Value::Object(self.readings()))
    }

    fn min_firmware(&self) -> Option<FirmwareVersion> {
        Some(match self {
            Self::GridVoltage { .. } | Self::SelfProduction { .. } => FirmwareVersion::new(2, 9, 1),
            Self::VehicleSoc { .. } => FirmwareVersion::new(4, 1, 0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn solar_used_only_without_grid() {
        let cmd = SensorCommand::SelfProduction {
            grid: None,
            solar: Some(3000),
            invert: true,
            voltage: None,
        };
        assert_eq!(cmd.body(), RequestBody::Json(json!({"solar": 3000})));

        let both = SensorCommand::SelfProduction {
            grid: Some(-500),
            solar: Some(3000),
            invert: false,
            voltage: None,
        };
        assert_eq!(both.body(), RequestBody::Json(json!({"grid_ie": -500})));
    }

    #[test]
    fn vehicle_soc_fields() {
        let cmd = SensorCommand::VehicleSoc {
            battery_level: Some(80),
            battery_range: None,
            time_to_full: Some(3600),
            voltage: None,
        };
        assert_eq!(
            cmd.body(),
            RequestBody::Json(json!({"battery_level": 80, "time_to_full_charge": 3600}))
        );
        assert_eq!(cmd.min_firmware(), Some(FirmwareVersion::new(4, 1, 0)));
    }

    #[test]
    fn empty_readings() {
        assert!(SensorCommand::GridVoltage { voltage: None }.is_empty());
        let reading = SensorCommand::GridVoltage { voltage: Some(230) };
        assert!(!reading.is_empty());
    }
}
