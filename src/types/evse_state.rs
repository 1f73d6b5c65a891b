// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! EVSE state codes reported in the `state` status field.

use std::fmt;

/// State of the EVSE controller.
///
/// # Examples
///
/// ```
/// use openevse_lib::types::EvseState;
///
/// let state = EvseState::from_code(3).unwrap();
/// assert_eq!(state, EvseState::Charging);
/// assert_eq!(state.as_str(), "charging");
/// assert_eq!(state.code(), 3);
///
/// assert!(EvseState::from_code(42).is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvseState {
    /// Starting up, state not yet known.
    Unknown,
    /// No vehicle plugged in.
    NotConnected,
    /// Vehicle plugged in, not charging.
    Connected,
    /// Charging.
    Charging,
    /// Vehicle requests ventilation.
    VentRequired,
    /// Pilot diode check failed.
    DiodeCheckFailed,
    /// Ground fault detected.
    GfciFault,
    /// Missing ground.
    NoGround,
    /// Relay stuck closed.
    StuckRelay,
    /// Ground fault self-test failed.
    GfciSelfTestFailure,
    /// Temperature above the shutdown threshold.
    OverTemperature,
    /// Sleeping (manually paused).
    Sleeping,
    /// Disabled.
    Disabled,
}

impl EvseState {
    /// Maps a raw state code. Returns `None` for codes the charger does not define.
    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        Some(match code {
            0 => Self::Unknown,
            1 => Self::NotConnected,
            2 => Self::Connected,
            3 => Self::Charging,
            4 => Self::VentRequired,
            5 => Self::DiodeCheckFailed,
            6 => Self::GfciFault,
            7 => Self::NoGround,
            8 => Self::StuckRelay,
            9 => Self::GfciSelfTestFailure,
            10 => Self::OverTemperature,
            254 => Self::Sleeping,
            255 => Self::Disabled,
            _ => return None,
        })
    }

    /// Returns the raw state code.
    #[must_use]
    pub const fn code(&self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::NotConnected => 1,
            Self::Connected => 2,
            Self::Charging => 3,
            Self::VentRequired => 4,
            Self::DiodeCheckFailed => 5,
            Self::GfciFault => 6,
            Self::NoGround => 7,
            Self::StuckRelay => 8,
            Self::GfciSelfTestFailure => 9,
            Self::OverTemperature => 10,
            Self::Sleeping => 254,
            Self::Disabled => 255,
        }
    }

    /// Returns the name the charger's web UI uses for this state.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::NotConnected => "not connected",
            Self::Connected => "connected",
            Self::Charging => "charging",
            Self::VentRequired => "vent required",
            Self::DiodeCheckFailed => "diode check failed",
            Self::GfciFault => "gfci fault",
            Self::NoGround => "no ground",
            Self::StuckRelay => "stuck relay",
            Self::GfciSelfTestFailure => "gfci self-test failure",
            Self::OverTemperature => "over temperature",
            Self::Sleeping => "sleeping",
            Self::Disabled => "disabled",
        }
    }

    /// Returns `true` for the fault states (4 through 10).
    #[must_use]
    pub const fn is_fault(&self) -> bool {
        matches!(self.code(), 4..=10)
    }
}

impl fmt::Display for EvseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_through_table() {
        for code in (0..=10).chain([254, 255]) {
            let state = EvseState::from_code(code).unwrap();
            assert_eq!(i64::from(state.code()), code);
        }
    }

    #[test]
    fn undefined_codes() {
        assert!(EvseState::from_code(11).is_none());
        assert!(EvseState::from_code(-1).is_none());
        assert!(EvseState::from_code(253).is_none());
    }

    #[test]
    fn names() {
        assert_eq!(EvseState::Sleeping.to_string(), "sleeping");
        assert_eq!(
            EvseState::GfciSelfTestFailure.as_str(),
            "gfci self-test failure"
        );
    }

    #[test]
    fn fault_states() {
        assert!(!EvseState::Charging.is_fault());
        assert!(EvseState::StuckRelay.is_fault());
        assert!(!EvseState::Disabled.is_fault());
    }
}
