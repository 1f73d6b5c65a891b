// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device state management types.
//!
//! The [`StateCache`] holds the single authoritative copy of the charger's
//! fields. Polls and push frames are merged into it with
//! [`StateCache::apply`]; readers get detached [`DeviceState`] snapshots.
//!
//! # Examples
//!
//! ```
//! use openevse_lib::state::{StateCache, UpdateSource};
//! use serde_json::json;
//!
//! let cache = StateCache::new();
//! cache.apply(
//!     [
//!         ("status".to_string(), json!("charging")),
//!         ("amp".to_string(), json!(16)),
//!     ],
//!     UpdateSource::Poll,
//! );
//!
//! let changed = cache.apply([("amp".to_string(), json!(20))], UpdateSource::Push);
//! assert_eq!(changed.iter().collect::<Vec<_>>(), vec!["amp"]);
//! assert_eq!(cache.snapshot().get_i64("amp"), Some(20));
//! ```

mod cache;
mod device_state;

pub use cache::{ChangedFields, StateCache};
pub use device_state::{DeviceState, Field, UpdateSource};
