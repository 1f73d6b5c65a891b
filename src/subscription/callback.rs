// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Callback management for charger state subscriptions.
//!
//! - [`SubscriptionId`] - Unique identifier for unsubscribing
//! - [`StateUpdate`] - What observers receive after a merge
//! - [`CallbackRegistry`] - Registry for storing and dispatching callbacks

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::error::Error;
use crate::push::ConnectionState;
use crate::state::{ChangedFields, DeviceState, UpdateSource};

/// Unique identifier for a subscription.
///
/// Returned when registering a callback and used to unsubscribe later.
/// IDs are unique within a charger's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Creates a new subscription ID with the given value.
    #[must_use]
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", self.0)
    }
}

/// A merge that changed at least one field.
#[derive(Debug, Clone)]
pub struct StateUpdate {
    /// The channel the merged fields came from.
    pub source: UpdateSource,
    /// Names of the fields whose value changed.
    pub changed: ChangedFields,
    /// The state right after the merge.
    pub state: DeviceState,
}

type StateCallback = Arc<dyn Fn(&StateUpdate) + Send + Sync>;

type ConnectionCallback = Arc<dyn Fn(ConnectionState, Option<&Error>) + Send + Sync>;

/// Registry for charger observers.
///
/// Callbacks are stored behind `parking_lot::RwLock` and cloned out before
/// being invoked, so a callback may register or unregister observers without
/// deadlocking.
pub struct CallbackRegistry {
    next_id: AtomicU64,
    state_callbacks: RwLock<HashMap<SubscriptionId, StateCallback>>,
    connection_callbacks: RwLock<HashMap<SubscriptionId, ConnectionCallback>>,
}

impl CallbackRegistry {
    /// Creates a new empty callback registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            state_callbacks: RwLock::new(HashMap::new()),
            connection_callbacks: RwLock::new(HashMap::new()),
        }
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Registers a callback for state changes from either channel.
    pub fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StateUpdate) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.state_callbacks.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for push channel state transitions.
    ///
    /// The error is set when the channel stopped or is retrying because of a
    /// failure.
    pub fn on_connection_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(ConnectionState, Option<&Error>) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.connection_callbacks
            .write()
            .insert(id, Arc::new(callback));
        id
    }

    /// Unregisters a callback by its subscription ID.
    ///
    /// Returns `true` if a callback was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        if self.state_callbacks.write().remove(&id).is_some() {
            return true;
        }
        self.connection_callbacks.write().remove(&id).is_some()
    }

    /// Clears all callbacks.
    pub fn clear(&self) {
        self.state_callbacks.write().clear();
        self.connection_callbacks.write().clear();
    }

    /// Dispatches a state update to every state observer.
    pub fn dispatch_state(&self, update: &StateUpdate) {
        let callbacks: Vec<StateCallback> = self.state_callbacks.read().values().cloned().collect();
        for callback in callbacks {
            callback(update);
        }
    }

    /// Dispatches a connection state transition.
    pub fn dispatch_connection(&self, state: ConnectionState, error: Option<&Error>) {
        let callbacks: Vec<ConnectionCallback> =
            self.connection_callbacks.read().values().cloned().collect();
        for callback in callbacks {
            callback(state, error);
        }
    }

    /// Returns `true` if at least one state observer is registered.
    #[must_use]
    pub fn has_state_observers(&self) -> bool {
        !self.state_callbacks.read().is_empty()
    }

    /// Returns the total number of registered callbacks.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.state_callbacks.read().len() + self.connection_callbacks.read().len()
    }

    /// Returns `true` if there are no registered callbacks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callback_count() == 0
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("callback_count", &self.callback_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    fn update(names: &[&str]) -> StateUpdate {
        StateUpdate {
            source: UpdateSource::Push,
            changed: names.iter().copied().collect(),
            state: DeviceState::new(),
        }
    }

    #[test]
    fn subscription_id_display() {
        let id = SubscriptionId::new(42);
        assert_eq!(id.to_string(), "Sub(42)");
    }

    #[test]
    fn registry_new_is_empty() {
        let registry = CallbackRegistry::new();
        assert!(registry.is_empty());
        assert!(!registry.has_state_observers());
    }

    #[test]
    fn registry_state_callback() {
        let registry = CallbackRegistry::new();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let id = registry.on_state_changed(move |update| {
            assert!(update.changed.contains("amp"));
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert!(registry.has_state_observers());
        registry.dispatch_state(&update(&["amp"]));
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        assert!(registry.unsubscribe(id));
        registry.dispatch_state(&update(&["amp"]));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn registry_connection_callback() {
        let registry = CallbackRegistry::new();
        let seen = Arc::new(RwLock::new(Vec::new()));
        let seen_clone = seen.clone();

        registry.on_connection_changed(move |state, error| {
            seen_clone.write().push((state, error.is_some()));
        });

        registry.dispatch_connection(ConnectionState::Connecting, None);
        registry.dispatch_connection(ConnectionState::Disconnected, Some(&Error::Authentication));

        assert_eq!(
            *seen.read(),
            vec![
                (ConnectionState::Connecting, false),
                (ConnectionState::Disconnected, true)
            ]
        );
    }

    #[test]
    fn callback_may_unsubscribe_itself() {
        let registry = Arc::new(CallbackRegistry::new());
        let id_slot = Arc::new(RwLock::new(None::<SubscriptionId>));
        let counter = Arc::new(AtomicU32::new(0));

        let id = {
            let inner = Arc::clone(&registry);
            let id_slot = Arc::clone(&id_slot);
            let counter = Arc::clone(&counter);
            registry.on_state_changed(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                if let Some(id) = *id_slot.read() {
                    inner.unsubscribe(id);
                }
            })
        };
        *id_slot.write() = Some(id);

        registry.dispatch_state(&update(&["amp"]));
        registry.dispatch_state(&update(&["amp"]));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn registry_unsubscribe_nonexistent() {
        let registry = CallbackRegistry::new();
        assert!(!registry.unsubscribe(SubscriptionId::new(999)));
    }

    #[test]
    fn registry_clear_and_unique_ids() {
        let registry = CallbackRegistry::new();
        let id1 = registry.on_state_changed(|_| {});
        let id2 = registry.on_connection_changed(|_, _| {});
        assert_ne!(id1, id2);
        assert_eq!(registry.callback_count(), 2);

        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn registry_debug() {
        let registry = CallbackRegistry::new();
        registry.on_state_changed(|_| {});
        let debug = format!("{registry:?}");
        assert!(debug.contains("callback_count"));
    }
}
