// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Manual override, session limit and EVSE manager claims.

use reqwest::Method;
use serde_json::{Map, Value};

use crate::command::Command;
use crate::protocol::RequestBody;
use crate::types::{FirmwareVersion, LimitType, OverrideState};

const OVERRIDE_FIRMWARE: FirmwareVersion = FirmwareVersion::new(4, 0, 1);
const CLAIMS_FIRMWARE: FirmwareVersion = FirmwareVersion::new(4, 1, 0);
const LIMIT_FIRMWARE: FirmwareVersion = FirmwareVersion::new(5, 0, 0);

/// Properties of a manual override.
///
/// Unset properties keep the value of the override currently active on the
/// charger.
///
/// # Examples
///
/// ```
/// use openevse_lib::command::OverrideRequest;
/// use openevse_lib::types::OverrideState;
/// use serde_json::json;
///
/// let request = OverrideRequest::new()
///     .with_state(OverrideState::Active)
///     .with_charge_current(16);
///
/// let current = json!({"state": "disabled", "max_current": 32});
/// let merged = request.merge_into(current.as_object().unwrap().clone());
/// assert_eq!(
///     serde_json::Value::Object(merged),
///     json!({"state": "active", "max_current": 32, "charge_current": 16, "auto_release": true})
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideRequest {
    state: Option<OverrideState>,
    charge_current: Option<u32>,
    max_current: Option<u32>,
    energy_limit: Option<u64>,
    time_limit: Option<u64>,
    auto_release: bool,
}

impl OverrideRequest {
    /// Creates a request that changes nothing but releases automatically.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: None,
            charge_current: None,
            max_current: None,
            energy_limit: None,
            time_limit: None,
            auto_release: true,
        }
    }

    /// Forces charging on or off.
    #[must_use]
    pub fn with_state(mut self, state: OverrideState) -> Self {
        self.state = Some(state);
        self
    }

    /// Sets the charge current in amps.
    #[must_use]
    pub fn with_charge_current(mut self, amps: u32) -> Self {
        self.charge_current = Some(amps);
        self
    }

    /// Sets the maximum current in amps.
    #[must_use]
    pub fn with_max_current(mut self, amps: u32) -> Self {
        self.max_current = Some(amps);
        self
    }

    /// Stops charging after this much energy, in Wh.
    #[must_use]
    pub fn with_energy_limit(mut self, wh: u64) -> Self {
        self.energy_limit = Some(wh);
        self
    }

    /// Stops charging after this many seconds.
    #[must_use]
    pub fn with_time_limit(mut self, seconds: u64) -> Self {
        self.time_limit = Some(seconds);
        self
    }

    /// Releases the override when the vehicle disconnects.
    #[must_use]
    pub fn with_auto_release(mut self, auto_release: bool) -> Self {
        self.auto_release = auto_release;
        self
    }

    /// Overlays the set properties onto the charger's current override.
    #[must_use]
    pub fn merge_into(&self, mut current: Map<String, Value>) -> Map<String, Value> {
        current.insert("auto_release".to_string(), Value::Bool(self.auto_release));
        if let Some(state) = self.state {
            current.insert("state".to_string(), state.as_str().into());
        }
        if let Some(amps) = self.charge_current {
            current.insert("charge_current".to_string(), amps.into());
        }
        if let Some(amps) = self.max_current {
            current.insert("max_current".to_string(), amps.into());
        }
        if let Some(wh) = self.energy_limit {
            current.insert("energy_limit".to_string(), wh.into());
        }
        if let Some(seconds) = self.time_limit {
            current.insert("time_limit".to_string(), seconds.into());
        }
        current
    }
}

impl Default for OverrideRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// Manual override endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum OverrideCommand {
    /// Read the active override (`GET`).
    Get,
    /// Replace the override with these properties (`POST`).
    Set(Map<String, Value>),
    /// Remove the override (`DELETE`).
    Clear,
    /// Toggle the override (`PATCH`).
    Toggle,
}

impl Command for OverrideCommand {
    fn method(&self) -> Method {
        match self {
            Self::Get => Method::GET,
            Self::Set(_) => Method::POST,
            Self::Clear => Method::DELETE,
            Self::Toggle => Method::PATCH,
        }
    }

    fn path(&self) -> String {
        "override".to_string()
    }

    fn body(&self) -> RequestBody {
        match self {
            Self::Set(properties) => RequestBody::Json(Value::Object(properties.clone())),
            _ => RequestBody::Empty,
        }
    }

    fn min_firmware(&self) -> Option<FirmwareVersion> {
        Some(OVERRIDE_FIRMWARE)
    }
}

/// Session charge limit endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum LimitCommand {
    /// Read the active limit.
    Get,
    /// Replace the limit.
    Set(Map<String, Value>),
    /// Remove the limit.
    Clear,
}

impl LimitCommand {
    /// Builds a `Set` from the current limit and the new type and value.
    #[must_use]
    pub fn set(
        mut current: Map<String, Value>,
        kind: LimitType,
        value: u64,
        release: Option<bool>,
    ) -> Self {
        current.insert("type".to_string(), kind.as_str().into());
        current.insert("value".to_string(), value.into());
        if let Some(release) = release {
            current.insert("release".to_string(), release.into());
        }
        Self::Set(current)
    }
}

impl Command for LimitCommand {
    fn method(&self) -> Method {
        match self {
            Self::Get => Method::GET,
            Self::Set(_) => Method::POST,
            Self::Clear => Method::DELETE,
        }
    }

    fn path(&self) -> String {
        "limit".to_string()
    }

    fn body(&self) -> RequestBody {
        match self {
            Self::Get => RequestBody::Empty,
            Self::Set(limit) => RequestBody::Json(Value::Object(limit.clone())),
            Self::Clear => RequestBody::Json(Value::Object(Map::new())),
        }
    }

    fn min_firmware(&self) -> Option<FirmwareVersion> {
        Some(LIMIT_FIRMWARE)
    }
}

/// Properties of an EVSE manager claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimRequest {
    state: Option<OverrideState>,
    charge_current: Option<u32>,
    max_current: Option<u32>,
    auto_release: bool,
}

impl ClaimRequest {
    /// Creates an empty claim that releases automatically.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: None,
            charge_current: None,
            max_current: None,
            auto_release: true,
        }
    }

    /// Claims charging on or off.
    #[must_use]
    pub fn with_state(mut self, state: OverrideState) -> Self {
        self.state = Some(state);
        self
    }

    /// Claims a charge current in amps.
    #[must_use]
    pub fn with_charge_current(mut self, amps: u32) -> Self {
        self.charge_current = Some(amps);
        self
    }

    /// Claims a maximum current in amps.
    #[must_use]
    pub fn with_max_current(mut self, amps: u32) -> Self {
        self.max_current = Some(amps);
        self
    }

    /// Releases the claim when the vehicle disconnects.
    #[must_use]
    pub fn with_auto_release(mut self, auto_release: bool) -> Self {
        self.auto_release = auto_release;
        self
    }

    fn to_json(&self) -> Value {
        let mut body = Map::new();
        body.insert("auto_release".to_string(), Value::Bool(self.auto_release));
        if let Some(state) = self.state {
            body.insert("state".to_string(), state.as_str().into());
        }
        if let Some(amps) = self.charge_current {
            body.insert("charge_current".to_string(), amps.into());
        }
        if let Some(amps) = self.max_current {
            body.insert("max_current".to_string(), amps.into());
        }
        Value::Object(body)
    }
}

impl Default for ClaimRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// EVSE manager claims endpoint.
///
/// # Examples
///
/// ```
/// use openevse_lib::command::{ClaimCommand, ClaimRequest, Command};
///
/// let make = ClaimCommand::make(ClaimRequest::new().with_charge_current(10));
/// assert_eq!(make.path(), "claims/20");
///
/// let list = ClaimCommand::List { target: true };
/// assert_eq!(list.path(), "claims/target");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimCommand {
    /// Create or replace the claim of `client`.
    Make {
        /// Claiming client id.
        client: u32,
        /// Claim properties.
        request: ClaimRequest,
    },
    /// Release the claim of `client`.
    Release {
        /// Claiming client id.
        client: u32,
    },
    /// List all claims, or the resolved target when `target` is set.
    List {
        /// Return the resolved target instead of every claim.
        target: bool,
    },
}

impl ClaimCommand {
    /// Client id used by home automation integrations.
    pub const DEFAULT_CLIENT: u32 = 20;

    /// Makes a claim as [`DEFAULT_CLIENT`](Self::DEFAULT_CLIENT).
    #[must_use]
    pub fn make(request: ClaimRequest) -> Self {
        Self::Make {
            client: Self::DEFAULT_CLIENT,
            request,
        }
    }

    /// Releases the claim of [`DEFAULT_CLIENT`](Self::DEFAULT_CLIENT).
    #[must_use]
    pub fn release() -> Self {
        Self::Release {
            client: Self::DEFAULT_CLIENT,
        }
    }
}

impl Command for ClaimCommand {
    fn method(&self) -> Method {
        match self {
            Self::Make { .. } => Method::POST,
            Self::Release { .. } => Method::DELETE,
            Self::List { .. } => Method::GET,
        }
    }

    fn path(&self) -> String {
        match self {
            Self::Make { client, .. } | Self::Release { client } => format!("claims/{client}"),
            Self::List { target: true } => "claims/target".to_string(),
            Self::List { target: false } => "claims".to_string(),
        }
    }

    fn body(&self) -> RequestBody {
        match self {
            Self::Make { request, .. } => RequestBody::Json(request.to_json()),
            _ => RequestBody::Empty,
        }
    }

    fn min_firmware(&self) -> Option<FirmwareVersion> {
        Some(CLAIMS_FIRMWARE)
    }
}
