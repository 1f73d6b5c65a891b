// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device state snapshot types.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The channel that last wrote a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateSource {
    /// A one-shot HTTP poll.
    Poll,
    /// A frame received on the push channel.
    Push,
}

impl UpdateSource {
    /// Returns the lowercase name of the source.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Poll => "poll",
            Self::Push => "push",
        }
    }
}

impl fmt::Display for UpdateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single stored field value together with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    value: Value,
    source: UpdateSource,
    sequence: u64,
    updated_at: DateTime<Utc>,
}

impl Field {
    pub(crate) fn new(
        value: Value,
        source: UpdateSource,
        sequence: u64,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            value,
            source,
            sequence,
            updated_at,
        }
    }

    /// Returns the stored value.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Returns the channel that last wrote this field.
    #[must_use]
    pub fn source(&self) -> UpdateSource {
        self.source
    }

    /// Returns the sequence number of the merge that last wrote this field.
    ///
    /// Sequence numbers increase by one per merge and are shared by every
    /// field written in the same merge.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns when this field was last written.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// A point-in-time copy of the charger's fields.
///
/// Values are kept as raw JSON; typed interpretation lives in the accessor
/// methods of [`Charger`](crate::Charger). Numeric helpers are lenient in the
/// same way the charger firmware is: booleans may arrive as `0`/`1`.
///
/// # Examples
///
/// ```
/// use openevse_lib::state::{StateCache, UpdateSource};
/// use serde_json::json;
///
/// let cache = StateCache::new();
/// cache.apply(
///     [
///         ("amp".to_string(), json!(16)),
///         ("status".to_string(), json!("charging")),
///     ],
///     UpdateSource::Poll,
/// );
///
/// let state = cache.snapshot();
/// assert_eq!(state.get_i64("amp"), Some(16));
/// assert_eq!(state.get_str("status"), Some("charging"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceState {
    fields: BTreeMap<String, Field>,
}

impl DeviceState {
    /// Creates a new empty device state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of known fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if no field has been reported yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns `true` if the field is known.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Returns the raw value of a field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).map(Field::value)
    }

    /// Returns a field with its provenance.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Iterates over the fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    /// Iterates over the field names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Returns the plain name to value mapping, without provenance.
    #[must_use]
    pub fn to_map(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .map(|(name, field)| (name.clone(), field.value.clone()))
            .collect()
    }

    /// Returns the value as a float, accepting integers.
    #[must_use]
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    /// Returns the value as an integer.
    ///
    /// Floats with a zero fractional part are accepted.
    #[must_use]
    // Safe: only whole floats within i64 range reach the cast
    #[allow(clippy::cast_possible_truncation)]
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        let value = self.get(name)?;
        value.as_i64().or_else(|| {
            let float = value.as_f64()?;
            if float.fract() == 0.0 && float.abs() < 9.0e18 {
                Some(float as i64)
            } else {
                None
            }
        })
    }

    /// Returns the value as a string slice.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Returns the value as a boolean.
    ///
    /// Numbers are truthy when non-zero, as the firmware reports several
    /// flags as integers.
    #[must_use]
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_f64().map(|f| f != 0.0),
            _ => None,
        }
    }

    /// Returns `true` if the value is present and truthy.
    ///
    /// Absent, `null`, `false`, `0` and empty strings are all falsy.
    #[must_use]
    pub fn is_truthy(&self, name: &str) -> bool {
        match self.get(name) {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Array(a)) => !a.is_empty(),
            Some(Value::Object(o)) => !o.is_empty(),
        }
    }

    pub(crate) fn insert(&mut self, name: String, field: Field) -> Option<Field> {
        self.fields.insert(name, field)
    }

    pub(crate) fn clear(&mut self) {
        self.fields.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state_with(fields: &[(&str, Value)]) -> DeviceState {
        let mut state = DeviceState::new();
        for (name, value) in fields {
            state.insert(
                (*name).to_string(),
                Field::new(value.clone(), UpdateSource::Poll, 1, Utc::now()),
            );
        }
        state
    }

    #[test]
    fn new_state_is_empty() {
        let state = DeviceState::new();
        assert!(state.is_empty());
        assert_eq!(state.len(), 0);
        assert!(state.get("amp").is_none());
    }

    #[test]
    fn typed_getters() {
        let state = state_with(&[
            ("amp", json!(16)),
            ("voltage", json!(240.5)),
            ("status", json!("charging")),
            ("eth_connected", json!(1)),
            ("shaper", json!(false)),
        ]);

        assert_eq!(state.get_i64("amp"), Some(16));
        assert_eq!(state.get_f64("amp"), Some(16.0));
        assert_eq!(state.get_f64("voltage"), Some(240.5));
        assert_eq!(state.get_i64("voltage"), None);
        assert_eq!(state.get_str("status"), Some("charging"));
        assert_eq!(state.get_bool("eth_connected"), Some(true));
        assert_eq!(state.get_bool("shaper"), Some(false));
        assert_eq!(state.get_bool("status"), None);
    }

    #[test]
    fn whole_float_reads_as_integer() {
        let state = state_with(&[("pilot", json!(32.0))]);
        assert_eq!(state.get_i64("pilot"), Some(32));
    }

    #[test]
    fn truthiness() {
        let state = state_with(&[
            ("zero", json!(0)),
            ("null", Value::Null),
            ("empty", json!("")),
            ("one", json!(1)),
            ("text", json!("x")),
        ]);

        assert!(!state.is_truthy("zero"));
        assert!(!state.is_truthy("null"));
        assert!(!state.is_truthy("empty"));
        assert!(!state.is_truthy("missing"));
        assert!(state.is_truthy("one"));
        assert!(state.is_truthy("text"));
    }

    #[test]
    fn to_map_drops_provenance() {
        let state = state_with(&[("amp", json!(16)), ("status", json!("charging"))]);
        assert_eq!(
            Value::Object(state.to_map()),
            json!({"amp": 16, "status": "charging"})
        );
    }

    #[test]
    fn names_are_ordered() {
        let state = state_with(&[("b", json!(1)), ("a", json!(2))]);
        assert_eq!(state.names().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn update_source_display() {
        assert_eq!(UpdateSource::Poll.to_string(), "poll");
        assert_eq!(UpdateSource::Push.to_string(), "push");
    }
}
