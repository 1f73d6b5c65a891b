// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscription system for charger state changes.
//!
//! Observers are invoked synchronously on the path that merged the update,
//! right after the merge and before the next update can be merged. They
//! must return quickly.
//!
//! # Usage
//!
//! ```no_run
//! use openevse_lib::Charger;
//!
//! # async fn example() -> openevse_lib::Result<()> {
//! let charger = Charger::http("openevse.local").build()?;
//!
//! let sub_id = charger.on_state_changed(|update| {
//!     for name in update.changed.iter() {
//!         println!("{name} = {:?}", update.state.get(name));
//!     }
//! });
//!
//! charger.update().await?;
//! charger.unsubscribe(sub_id);
//! # Ok(())
//! # }
//! ```

mod callback;

pub use callback::{CallbackRegistry, StateUpdate, SubscriptionId};
