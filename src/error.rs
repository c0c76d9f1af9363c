use std::sync::Arc;

use thiserror::Error;

use crate::engine::EngineError;
use crate::user::UserInputError;

/// Result type used throughout the bridge.
///
/// Success carries the operation's value (`bool` for gate checks,
/// [`DynamicPayload`](crate::DynamicPayload) for config-shaped fetches, `()` for
/// lifecycle and event logging). The error variant is always [`Error`], so every
/// operation kind shares one result model.
pub type Result<T> = std::result::Result<T, Error>;

/// Enum representing possible errors returned by the bridge.
///
/// `Error::to_string()` is always a non-empty human-readable diagnostic.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// An evaluation or logging call was made before [`initialize`](crate::Client::initialize)
    /// succeeded, or after [`shutdown`](crate::Client::shutdown).
    #[error("not initialized")]
    NotInitialized,

    /// [`initialize`](crate::Client::initialize) was called while the client is
    /// already initialized.
    #[error("already initialized")]
    AlreadyInitialized,

    /// Caller-supplied user data was malformed or not a JSON object.
    #[error("invalid user input: {0}")]
    InvalidUserInput(#[from] UserInputError),

    /// The engine failed during a gate, config, experiment, layer, or log call.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A caller-side value could not be serialized into user attributes.
    // serde_json::Error is not clonable, so we're wrapping it in an Arc.
    #[error("failed to encode user data")]
    Encoding(#[source] Arc<serde_json::Error>),

    /// A payload did not match the shape of the requested type on the strict
    /// decode path.
    #[error("payload does not match the requested type")]
    DecodeMismatch(#[source] Arc<serde_json::Error>),
}
