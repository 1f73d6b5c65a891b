// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! WiFi gateway firmware versions, used to gate commands.

use std::fmt;
use std::str::FromStr;

use crate::error::ValueError;

/// A firmware version as reported in the config `version` field.
///
/// Builds from the `master` branch report no number and are treated as
/// newer than every release.
///
/// # Examples
///
/// ```
/// use openevse_lib::types::FirmwareVersion;
///
/// let version = FirmwareVersion::from_device("v4.1.2").unwrap();
/// assert_eq!(version, FirmwareVersion::new(4, 1, 2));
/// assert!(version.supports(FirmwareVersion::new(4, 0, 1)));
/// assert!(!version.supports(FirmwareVersion::new(5, 0, 0)));
///
/// // Development builds compare by their release prefix
/// let dev = FirmwareVersion::from_device("4.1.0.dev").unwrap();
/// assert_eq!(dev, FirmwareVersion::new(4, 1, 0));
///
/// let master = FirmwareVersion::from_device("master_abc123").unwrap();
/// assert!(master.supports(FirmwareVersion::new(5, 0, 0)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FirmwareVersion {
    /// A numbered release.
    Release {
        /// Major version.
        major: u32,
        /// Minor version.
        minor: u32,
        /// Patch version.
        patch: u32,
    },
    /// A build from the development branch.
    Master,
}

impl FirmwareVersion {
    /// Creates a release version.
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self::Release {
            major,
            minor,
            patch,
        }
    }

    /// Interprets a raw version string the way the charger reports it.
    ///
    /// `master` builds map to [`Master`](Self::Master). Strings containing
    /// `dev` use their first three dot-separated components. Anything else
    /// uses the first `x.y.z` triple found in the string. Returns `None` if
    /// no version can be found.
    #[must_use]
    pub fn from_device(raw: &str) -> Option<Self> {
        if raw.contains("master") {
            return Some(Self::Master);
        }
        if raw.contains("dev") {
            let mut parts = raw.split('.').map(leading_number);
            return match (parts.next(), parts.next(), parts.next()) {
                (Some(Some(major)), Some(Some(minor)), Some(Some(patch))) => {
                    Some(Self::new(major, minor, patch))
                }
                _ => None,
            };
        }
        find_triple(raw)
    }

    /// Returns `true` if this version is at least `minimum`.
    #[must_use]
    pub fn supports(&self, minimum: Self) -> bool {
        *self >= minimum
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Release {
                major,
                minor,
                patch,
            } => write!(f, "{major}.{minor}.{patch}"),
            Self::Master => f.write_str("master"),
        }
    }
}

impl FromStr for FirmwareVersion {
    type Err = ValueError;

    /// Parses a strict `major.minor.patch` string.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValueError::InvalidChoice {
            kind: "firmware version",
            value: s.to_string(),
        };
        let mut parts = s
            .split('.')
            .map(|p| p.parse::<u32>().map_err(|_| invalid()));
        let (Some(major), Some(minor), Some(patch), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        Ok(Self::new(major?, minor?, patch?))
    }
}

/// Parses the digits at the start of `part`, skipping a leading `v`.
fn leading_number(part: &str) -> Option<u32> {
    let part = part.trim_start_matches(['v', 'V']);
    let end = part
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(part.len());
    part[..end].parse().ok()
}

/// Finds the first `digits.digits.digits` run in `raw`.
fn find_triple(raw: &str) -> Option<FirmwareVersion> {
    let bytes = raw.as_bytes();
    let mut start = 0;
    while start < bytes.len() {
        if bytes[start].is_ascii_digit() && (start == 0 || !bytes[start - 1].is_ascii_digit()) {
            let mut numbers = [0u32; 3];
            let mut pos = start;
            let mut found = 0;
            while found < 3 {
                let digits_end = raw[pos..]
                    .find(|c: char| !c.is_ascii_digit())
                    .map_or(raw.len(), |offset| pos + offset);
                if digits_end == pos {
                    break;
                }
                let Ok(number) = raw[pos..digits_end].parse() else {
                    break;
                };
                numbers[found] = number;
                found += 1;
                if found < 3 {
                    if bytes.get(digits_end) != Some(&b'.') {
                        break;
                    }
                    pos = digits_end + 1;
                }
            }
            if found == 3 {
                return Some(FirmwareVersion::new(numbers[0], numbers[1], numbers[2]));
            }
        }
        start += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_strings() {
        assert_eq!(
            FirmwareVersion::from_device("4.1.2"),
            Some(FirmwareVersion::new(4, 1, 2))
        );
        assert_eq!(
            FirmwareVersion::from_device("v5.0.1_modified"),
            Some(FirmwareVersion::new(5, 0, 1))
        );
        assert_eq!(
            FirmwareVersion::from_device("2.9.1"),
            Some(FirmwareVersion::new(2, 9, 1))
        );
        assert_eq!(
            FirmwareVersion::from_device("4.10.3"),
            Some(FirmwareVersion::new(4, 10, 3))
        );
    }

    #[test]
    fn dev_and_master_strings() {
        assert_eq!(
            FirmwareVersion::from_device("4.1.0.dev"),
            Some(FirmwareVersion::new(4, 1, 0))
        );
        assert_eq!(
            FirmwareVersion::from_device("master_123abc"),
            Some(FirmwareVersion::Master)
        );
    }

    #[test]
    fn unparseable_strings() {
        assert_eq!(FirmwareVersion::from_device("unknown"), None);
        assert_eq!(FirmwareVersion::from_device("4.1"), None);
        assert_eq!(FirmwareVersion::from_device("dev"), None);
    }

    #[test]
    fn ordering() {
        let v = FirmwareVersion::new;
        assert!(v(4, 1, 2) > v(4, 1, 0));
        assert!(v(4, 10, 0) > v(4, 9, 9));
        assert!(FirmwareVersion::Master > v(99, 0, 0));
        assert!(v(5, 0, 0).supports(v(5, 0, 0)));
    }

    #[test]
    fn from_str_is_strict() {
        assert_eq!(
            "4.0.1".parse::<FirmwareVersion>(),
            Ok(FirmwareVersion::new(4, 0, 1))
        );
        assert!("4.0".parse::<FirmwareVersion>().is_err());
        assert!("4.0.1.2".parse::<FirmwareVersion>().is_err());
        assert!("v4.0.1".parse::<FirmwareVersion>().is_err());
    }

    #[test]
    fn display() {
        assert_eq!(FirmwareVersion::new(4, 1, 2).to_string(), "4.1.2");
        assert_eq!(FirmwareVersion::Master.to_string(), "master");
    }
}
