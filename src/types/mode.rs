// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Charging modes and command arguments with a fixed set of values.

use std::fmt;
use std::str::FromStr;

use crate::error::ValueError;

/// Charge mode at startup, and the solar divert mode.
///
/// `Fast` charges at full rate; `Eco` follows available solar power.
///
/// # Examples
///
/// ```
/// use openevse_lib::types::ChargeMode;
///
/// let mode: ChargeMode = "eco".parse().unwrap();
/// assert_eq!(mode, ChargeMode::Eco);
/// assert_eq!(mode.divert_code(), 2);
/// assert!("turbo".parse::<ChargeMode>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChargeMode {
    /// Charge at the full configured rate.
    #[default]
    Fast,
    /// Charge from surplus solar power.
    Eco,
}

impl ChargeMode {
    /// Returns the name used in the config API.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Eco => "eco",
        }
    }

    /// Returns the number the `/divertmode` endpoint and `divertmode` status
    /// field use for this mode.
    #[must_use]
    pub const fn divert_code(&self) -> u8 {
        match self {
            Self::Fast => 1,
            Self::Eco => 2,
        }
    }

    /// Maps a `divertmode` status value. Every value other than 1 is eco.
    #[must_use]
    pub const fn from_divert_code(code: i64) -> Self {
        if code == 1 { Self::Fast } else { Self::Eco }
    }
}

impl fmt::Display for ChargeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChargeMode {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fast" => Ok(Self::Fast),
            "eco" => Ok(Self::Eco),
            _ => Err(ValueError::InvalidChoice {
                kind: "charge mode",
                value: s.to_string(),
            }),
        }
    }
}

/// J1772 service level.
///
/// # Examples
///
/// ```
/// use openevse_lib::types::ServiceLevel;
///
/// assert_eq!(ServiceLevel::new(2).unwrap(), ServiceLevel::LEVEL_2);
/// assert!(ServiceLevel::new(3).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceLevel(u8);

impl ServiceLevel {
    /// Automatic detection.
    pub const AUTO: Self = Self(0);
    /// Level 1 (120 V).
    pub const LEVEL_1: Self = Self(1);
    /// Level 2 (240 V).
    pub const LEVEL_2: Self = Self(2);

    /// Creates a service level.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` unless `level` is 0, 1 or 2.
    pub fn new(level: u8) -> Result<Self, ValueError> {
        if level > 2 {
            return Err(ValueError::OutOfRange {
                min: 0,
                max: 2,
                actual: i64::from(level),
            });
        }
        Ok(Self(level))
    }

    /// Returns the numeric level.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }
}

/// State requested by a manual override or a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverrideState {
    /// Force charging on.
    Active,
    /// Force charging off.
    Disabled,
}

impl OverrideState {
    /// Returns the name used in the override API.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Disabled => "disabled",
        }
    }
}

impl fmt::Display for OverrideState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OverrideState {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "disabled" => Ok(Self::Disabled),
            _ => Err(ValueError::InvalidChoice {
                kind: "override state",
                value: s.to_string(),
            }),
        }
    }
}

/// Kind of a session charge limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitType {
    /// Stop after a duration, in minutes.
    Time,
    /// Stop after an amount of energy, in Wh.
    Energy,
    /// Stop at a vehicle state of charge, in percent.
    Soc,
    /// Stop at a vehicle range.
    Range,
}

impl LimitType {
    /// Returns the name used in the limit API.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Time => "time",
            Self::Energy => "energy",
            Self::Soc => "soc",
            Self::Range => "range",
        }
    }
}

impl fmt::Display for LimitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LimitType {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "time" => Ok(Self::Time),
            "energy" => Ok(Self::Energy),
            "soc" => Ok(Self::Soc),
            "range" => Ok(Self::Range),
            _ => Err(ValueError::InvalidChoice {
                kind: "limit type",
                value: s.to_string(),
            }),
        }
    }
}
