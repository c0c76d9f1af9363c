use crate::{Error, Result};

/// Outcome wrapper that always carries a usable value.
///
/// Ergonomic callers that must never propagate an error get the success value
/// when the operation resolved, and their supplied default otherwise. The
/// failure reason stays available for diagnostics in [`error`](Resolved::error).
///
/// # Examples
/// ```
/// # use flagbridge::{Error, Resolved};
/// let resolved = Resolved::from_outcome(Err(Error::NotInitialized), false);
/// assert!(!resolved.value);
/// assert!(!resolved.resolved);
/// assert!(resolved.error.is_some());
/// ```
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    /// The evaluated value on success, the caller-supplied default otherwise.
    /// Never absent.
    pub value: T,
    /// Whether the operation actually resolved `value`.
    pub resolved: bool,
    /// The failure reason, when the operation did not resolve.
    pub error: Option<Error>,
}

impl<T> Resolved<T> {
    /// Converts an operation outcome into a resolution-status record.
    ///
    /// Total: for any outcome, `value` is either the success value or
    /// `default`, never a failure artifact.
    pub fn from_outcome(outcome: Result<T>, default: T) -> Resolved<T> {
        match outcome {
            Ok(value) => Resolved {
                value,
                resolved: true,
                error: None,
            },
            Err(error) => Resolved {
                value: default,
                resolved: false,
                error: Some(error),
            },
        }
    }
}
