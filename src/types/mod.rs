// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types for OpenEVSE chargers.
//!
//! Command arguments with a closed set of values are validated when they
//! are constructed, so a command that reaches the wire is well formed.
//!
//! # Types
//!
//! - [`EvseState`] - State codes from the `state` status field
//! - [`FirmwareVersion`] - Gateway firmware, used to gate commands
//! - [`ChargeMode`] - Fast or eco charging (also the divert mode)
//! - [`ServiceLevel`] - J1772 service level (0 = auto, 1, 2)
//! - [`OverrideState`] - Requested state for overrides and claims
//! - [`LimitType`] - Kind of a session charge limit

mod evse_state;
mod firmware;
mod mode;

pub use evse_state::EvseState;
pub use firmware::FirmwareVersion;
pub use mode::{ChargeMode, LimitType, OverrideState, ServiceLevel};
