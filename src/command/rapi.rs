// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! RAPI serial commands tunnelled through the gateway.

use reqwest::Method;

use crate::command::Command;
use crate::protocol::RequestBody;

/// A RAPI command forwarded to the EVSE controller through `POST /r`.
///
/// Older firmware has no REST endpoint for some operations; the charger
/// facade falls back to these.
///
/// # Examples
///
/// ```
/// use openevse_lib::command::{Command, RapiCommand};
/// use openevse_lib::protocol::RequestBody;
///
/// let cmd = RapiCommand::new("$GS");
/// assert_eq!(
///     cmd.body(),
///     RequestBody::form([("json", "1"), ("rapi", "$GS")])
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RapiCommand(String);

impl RapiCommand {
    /// Wraps a raw RAPI command such as `"$GS"`.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self(command.into())
    }

    /// Sets the soft current limit without saving it (`$SC <amps> N`).
    #[must_use]
    pub fn set_current(amps: u32) -> Self {
        Self(format!("$SC {amps} N"))
    }

    /// Resets the EVSE controller (`$FR`).
    #[must_use]
    pub fn reset() -> Self {
        Self::new("$FR")
    }

    /// Wakes the EVSE from sleep (`$FE`).
    #[must_use]
    pub fn enable() -> Self {
        Self::new("$FE")
    }

    /// Puts the EVSE to sleep (`$FS`).
    #[must_use]
    pub fn sleep() -> Self {
        Self::new("$FS")
    }

    /// Returns the raw command.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Command for RapiCommand {
    fn method(&self) -> Method {
        Method::POST
    }

    fn path(&self) -> String {
        "r".to_string()
    }

    fn body(&self) -> RequestBody {
        RequestBody::form([("json", "1"), ("rapi", self.0.as_str())])
    }
}
