use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::{Attributes, Error};

/// A complete, schema-stable description of the unit being evaluated.
///
/// Every field is always present: scalar attributes default to the empty string
/// and maps default to empty maps, so the serialized shape is identical across
/// engine calls regardless of how much data the caller supplied. The field names
/// below (camelCased on the wire) are part of the wire contract shared with the
/// engine and must not be renamed.
///
/// A context is constructed fresh per evaluation call and never mutated
/// afterwards. [`UserContext::default()`] is the canonical skeleton;
/// [`UserContext::normalize`] builds a context from partial caller-supplied JSON.
///
/// # Examples
/// ```
/// # use flagbridge::UserContext;
/// let user = UserContext::normalize(Some(r#"{"id": "user-1", "country": "NZ"}"#))?;
/// assert_eq!(user.id, "user-1");
/// assert_eq!(user.email, "");
/// # Ok::<(), flagbridge::UserInputError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserContext {
    /// Stable identifier used for deterministic bucketing. Two contexts with an
    /// empty `id` are equivalent for bucketing purposes.
    pub id: String,
    /// Email address, if known.
    pub email: String,
    /// IP address the evaluation originates from.
    pub ip_address: String,
    /// User agent string.
    pub user_agent: String,
    /// Two-letter country code.
    pub country: String,
    /// Locale identifier, e.g. `en_US`.
    pub locale: String,
    /// Version of the calling application.
    pub app_version: String,
    /// Free-form attributes available to targeting rules.
    pub custom: Attributes,
    /// Attributes used for evaluation but withheld from exposure logs.
    pub private_attributes: Attributes,
    /// Deployment environment tags, e.g. `{"tier": "staging"}`.
    pub environment_tags: HashMap<String, String>,
    /// Additional unit identifiers keyed by identifier kind.
    pub custom_identifiers: HashMap<String, String>,
}

impl UserContext {
    /// Creates a context with the given `id` and every other field empty.
    pub fn new(id: impl Into<String>) -> Self {
        UserContext {
            id: id.into(),
            ..UserContext::default()
        }
    }

    /// Builds a complete context from partial caller-supplied JSON.
    ///
    /// `None` or blank input yields the canonical skeleton. Otherwise the input
    /// must be a JSON object; it is patched over the skeleton field by field.
    /// Unknown fields are ignored.
    pub fn normalize(raw: Option<&str>) -> Result<UserContext, UserInputError> {
        match raw {
            Some(raw) if !raw.trim().is_empty() => UserContext::default().patch_json(raw),
            _ => Ok(UserContext::default()),
        }
    }

    /// Returns a copy of this context patched with a JSON object.
    ///
    /// Scalar fields in the patch overwrite the current values. Map-valued
    /// fields (`custom`, `privateAttributes`, `environmentTags`,
    /// `customIdentifiers`) are replaced as a whole, never deep-merged
    /// key-by-key. A field set to JSON `null` is treated as absent. Unknown
    /// fields are ignored.
    pub fn patch_json(&self, raw: &str) -> Result<UserContext, UserInputError> {
        let input = serde_json::from_str(raw)?;
        self.patch_value(input)
    }

    /// Builds a context from any serializable caller-side value.
    ///
    /// The value must serialize to a JSON object, which is then patched over the
    /// skeleton exactly like [`UserContext::normalize`].
    pub fn from_serialize<T: Serialize>(user: &T) -> crate::Result<UserContext> {
        let value = serde_json::to_value(user).map_err(|err| Error::Encoding(Arc::new(err)))?;
        let context = UserContext::default().patch_value(value)?;
        Ok(context)
    }

    fn patch_value(&self, input: Value) -> Result<UserContext, UserInputError> {
        let Value::Object(patch) = input else {
            return Err(UserInputError::NotAnObject);
        };

        let mut merged = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            // A struct of strings and maps always serializes to an object.
            _ => serde_json::Map::new(),
        };
        for (key, value) in patch {
            if value.is_null() {
                // Merge-patch removal: the field falls back to its current value.
                continue;
            }
            merged.insert(key, value);
        }

        let context = serde_json::from_value(Value::Object(merged))?;
        Ok(context)
    }
}

/// Error returned when caller-supplied user data cannot be normalized.
#[derive(Error, Debug, Clone)]
pub enum UserInputError {
    /// The input parsed, but the top-level value is not a JSON object.
    #[error("user input is not a JSON object")]
    NotAnObject,
    /// The input is not valid JSON, or a known field has the wrong shape.
    // serde_json::Error is not clonable, so we're wrapping it in an Arc.
    #[error("malformed user input")]
    Json(#[source] Arc<serde_json::Error>),
}

impl From<serde_json::Error> for UserInputError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(Arc::new(value))
    }
}
