// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Authoritative merged state of a charger.
//!
//! Both the polling path and the push path write into the same cache.
//! Conflicts are resolved by recency: whichever merge happens last wins for
//! every field it carries, independent of the channel it came from.

use std::collections::BTreeSet;
use std::collections::btree_set;

use chrono::Utc;
use parking_lot::RwLock;
use serde_json::Value;

use super::{DeviceState, Field, UpdateSource};

/// Names of the fields whose value actually changed during a merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangedFields(BTreeSet<String>);

impl ChangedFields {
    /// Creates an empty change set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the named field changed.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    /// Returns the number of changed fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the changed names in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Returns the underlying set.
    #[must_use]
    pub fn as_set(&self) -> &BTreeSet<String> {
        &self.0
    }

    fn insert(&mut self, name: String) {
        self.0.insert(name);
    }
}

impl IntoIterator for ChangedFields {
    type Item = String;
    type IntoIter = btree_set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<S: Into<String>> FromIterator<S> for ChangedFields {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Thread-safe store of the merged device state.
///
/// Each [`apply`](Self::apply) runs as one write-locked read-modify-write and
/// each [`snapshot`](Self::snapshot) as one read-locked copy, so a reader never
/// observes half of a merge.
///
/// # Examples
///
/// ```
/// use openevse_lib::state::{StateCache, UpdateSource};
/// use serde_json::json;
///
/// let cache = StateCache::new();
/// cache.apply([("amp".to_string(), json!(16))], UpdateSource::Poll);
///
/// let changed = cache.apply([("amp".to_string(), json!(20))], UpdateSource::Push);
/// assert!(changed.contains("amp"));
///
/// // Same value again: nothing changed
/// let changed = cache.apply([("amp".to_string(), json!(20))], UpdateSource::Poll);
/// assert!(changed.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct StateCache {
    inner: RwLock<CacheInner>,
}

#[derive(Debug, Default)]
struct CacheInner {
    state: DeviceState,
    sequence: u64,
}

impl StateCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges fields into the cache, overwriting every field present.
    ///
    /// Returns the names of the fields whose stored value differed from the
    /// new one. Unchanged fields still have their source and sequence
    /// refreshed.
    pub fn apply<I>(&self, fields: I, source: UpdateSource) -> ChangedFields
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let now = Utc::now();
        let mut changed = ChangedFields::new();

        let mut inner = self.inner.write();
        inner.sequence += 1;
        let sequence = inner.sequence;

        for (name, value) in fields {
            let differs = inner
                .state
                .get(&name)
                .is_none_or(|previous| *previous != value);
            if differs {
                changed.insert(name.clone());
            }
            inner
                .state
                .insert(name, Field::new(value, source, sequence, now));
        }
        drop(inner);

        tracing::trace!(
            sequence,
            %source,
            changed = changed.len(),
            "Merged fields into state cache"
        );

        changed
    }

    /// Returns an owned copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> DeviceState {
        self.inner.read().state.clone()
    }

    /// Runs a closure against the current state without copying it.
    ///
    /// The read lock is held for the duration of the closure, so it must not
    /// call back into the cache.
    pub fn read<R>(&self, f: impl FnOnce(&DeviceState) -> R) -> R {
        f(&self.inner.read().state)
    }

    /// Returns the sequence number of the latest merge.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.inner.read().sequence
    }

    /// Drops every stored field.
    pub fn clear(&self) {
        self.inner.write().state.clear();
    }
}
