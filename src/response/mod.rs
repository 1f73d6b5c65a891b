// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed views of charger replies.
//!
//! Most endpoints answer with free-form JSON that is returned as
//! [`serde_json::Value`]. The replies with a fixed shape are deserialized
//! into the structures below.

mod device_info;
mod reply;

pub use device_info::DeviceInfo;
pub use reply::{CommandReply, RapiReply};
