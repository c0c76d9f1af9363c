use std::collections::HashMap;
use std::sync::Arc;

use derive_more::From;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The decoded result of a config, experiment, or layer evaluation.
///
/// `values` is an open string-keyed map; entries may be scalars, lists, or
/// nested maps. A payload is read-only after construction. The wire names
/// (`name`, `values`, `ruleId`) are shared with the engine and must not be
/// renamed.
///
/// Callers pick between two access styles: the lenient typed getters
/// ([`get_bool`](DynamicPayload::get_bool) and friends) which coerce where
/// reasonable and fall back to a default, and the strict
/// [`decode`](DynamicPayload::decode) path which deserializes the whole value
/// map into a typed struct and fails loudly on any mismatch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DynamicPayload {
    /// Name of the config, experiment, or layer that produced this payload.
    pub name: String,
    /// The evaluated key-value payload.
    pub values: HashMap<String, PayloadValue>,
    /// Engine-assigned identifier of the targeting rule that matched.
    pub rule_id: String,
}

impl DynamicPayload {
    /// Parses a serialized payload. Never fails: blank or malformed input
    /// yields the empty payload.
    pub fn parse(raw: &str) -> DynamicPayload {
        serde_json::from_str(raw).unwrap_or_default()
    }

    /// Raw access to a single entry of the value map.
    pub fn value(&self, key: &str) -> Option<&PayloadValue> {
        self.values.get(key)
    }

    /// Returns the boolean stored under `key`, coercing numbers (nonzero is
    /// `true`). Returns `default` if the key is absent or not coercible.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.value(key)
            .and_then(PayloadValue::coerce_bool)
            .unwrap_or(default)
    }

    /// Returns the integer stored under `key`, truncating floats. Returns
    /// `default` if the key is absent or not coercible.
    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        self.value(key)
            .and_then(PayloadValue::coerce_int)
            .unwrap_or(default)
    }

    /// Returns the float stored under `key`, widening integers. Returns
    /// `default` if the key is absent or not coercible.
    pub fn get_float(&self, key: &str, default: f64) -> f64 {
        self.value(key)
            .and_then(PayloadValue::coerce_float)
            .unwrap_or(default)
    }

    /// Returns the string stored under `key`. Strings are never synthesized
    /// from other types; returns `default` for anything that is not a string.
    pub fn get_string(&self, key: &str, default: &str) -> String {
        self.value(key)
            .and_then(PayloadValue::as_str)
            .unwrap_or(default)
            .to_owned()
    }

    /// Deserializes the value map directly into `T`.
    ///
    /// Strict where the getters are lenient: a missing required field, a type
    /// mismatch, or any other shape error fails with
    /// [`Error::DecodeMismatch`] carrying the underlying cause.
    ///
    /// # Examples
    /// ```
    /// # use flagbridge::DynamicPayload;
    /// #[derive(serde::Deserialize)]
    /// struct Banner { text: String, max_shows: i64 }
    ///
    /// let payload = DynamicPayload::parse(
    ///     r#"{"name": "banner", "values": {"text": "hi", "max_shows": 3}, "ruleId": "r1"}"#,
    /// );
    /// let banner: Banner = payload.decode()?;
    /// assert_eq!(banner.max_shows, 3);
    /// # Ok::<(), flagbridge::Error>(())
    /// ```
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        let values = serde_json::to_value(&self.values)
            .map_err(|err| Error::DecodeMismatch(Arc::new(err)))?;
        serde_json::from_value(values).map_err(|err| Error::DecodeMismatch(Arc::new(err)))
    }
}

/// A single value of a [`DynamicPayload`] map.
///
/// Tagged in memory so the getter coercion rules are exhaustive and checkable;
/// untagged on the wire.
#[derive(Debug, Clone, PartialEq, From, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PayloadValue {
    /// A null value or absence of value.
    Null,
    /// A boolean value.
    Bool(bool),
    /// An integral number.
    Int(i64),
    /// A floating-point number.
    Float(f64),
    /// A string value.
    String(String),
    /// An ordered list of values.
    List(Vec<PayloadValue>),
    /// A nested map of values.
    Map(HashMap<String, PayloadValue>),
}

impl PayloadValue {
    /// Returns the string value, if this entry holds one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PayloadValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Boolean view: booleans as-is, numbers by nonzero test. Lists, maps,
    /// strings, and null do not coerce.
    pub fn coerce_bool(&self) -> Option<bool> {
        match self {
            PayloadValue::Bool(b) => Some(*b),
            PayloadValue::Int(i) => Some(*i != 0),
            PayloadValue::Float(f) => Some(*f != 0.0),
            _ => None,
        }
    }

    /// Integer view: integers as-is, floats by truncation.
    pub fn coerce_int(&self) -> Option<i64> {
        match self {
            PayloadValue::Int(i) => Some(*i),
            PayloadValue::Float(f) => Some(*f as i64),
            _ => None,
        }
    }

    /// Float view: floats as-is, integers widened.
    pub fn coerce_float(&self) -> Option<f64> {
        match self {
            PayloadValue::Float(f) => Some(*f),
            PayloadValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl From<&str> for PayloadValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}
