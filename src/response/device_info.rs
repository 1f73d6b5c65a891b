// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Charger identity from the `/config` endpoint.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, ParseError};

/// Model reported when the firmware has no `buildenv`.
const UNKNOWN_MODEL: &str = "unknown";

/// Serial number and hardware model of a charger.
///
/// # Examples
///
/// ```
/// use openevse_lib::response::DeviceInfo;
/// use serde_json::json;
///
/// let info = DeviceInfo::from_config(&json!({
///     "wifi_serial": "1234567890AB",
///     "buildenv": "openevse_wifi_v1",
///     "version": "4.1.2",
/// }))
/// .unwrap();
///
/// assert_eq!(info.serial, "1234567890AB");
/// assert_eq!(info.model, "openevse_wifi_v1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceInfo {
    /// Gateway serial number.
    #[serde(rename = "wifi_serial")]
    pub serial: String,
    /// Build environment, or `"unknown"` on firmware that does not report it.
    #[serde(rename = "buildenv", default = "unknown_model")]
    pub model: String,
}

fn unknown_model() -> String {
    UNKNOWN_MODEL.to_string()
}

impl DeviceInfo {
    /// Extracts the identity from a `/config` reply.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFeature`] if the reply carries no
    /// `wifi_serial` (older firmware), and [`Error::Parse`] if it is not a
    /// JSON object or a field has the wrong type.
    pub fn from_config(config: &Value) -> Result<Self, Error> {
        let Some(object) = config.as_object() else {
            return Err(ParseError::UnexpectedFormat(format!(
                "expected a JSON object, got {config}"
            ))
            .into());
        };
        if !object.contains_key("wifi_serial") {
            tracing::debug!("Older firmware detected, missing serial");
            return Err(Error::UnsupportedFeature);
        }
        Self::deserialize(config).map_err(|e| Error::Parse(ParseError::Json(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_buildenv_is_unknown() {
        let info = DeviceInfo::from_config(&json!({"wifi_serial": "ABC"})).unwrap();
        assert_eq!(info.model, "unknown");
    }

    #[test]
    fn missing_serial_is_unsupported() {
        let err = DeviceInfo::from_config(&json!({"buildenv": "x"})).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFeature));
    }

    #[test]
    fn non_object_is_parse_error() {
        let err = DeviceInfo::from_config(&json!([1, 2])).unwrap_err();
        assert!(matches!(err, Error::Parse(ParseError::UnexpectedFormat(_))));
    }
}
