use thiserror::Error;

use crate::{EngineOptions, UserContext};

/// The synchronous call surface of the evaluation engine.
///
/// The engine is an external collaborator: rule matching, bucketing, network
/// sync, background refresh, and event batching all live behind this trait and
/// are opaque to the bridge. Implementations must be safe to call from multiple
/// threads; any synchronization needed for concurrent evaluation is the
/// engine's responsibility.
///
/// Evaluating a gate, config, experiment, or layer emits an exposure record as
/// an engine-owned side effect. The bridge neither suppresses nor deduplicates
/// exposures.
///
/// `initialize` may block (e.g. on the first ruleset fetch). Evaluation calls
/// are expected to be fast reads against a background-refreshed in-memory
/// ruleset.
pub trait Engine: Send + Sync {
    /// Start the engine with default options.
    fn initialize(&self, secret_key: &str) -> Result<(), EngineError>;

    /// Start the engine with the given options, applied verbatim.
    fn initialize_with_options(
        &self,
        secret_key: &str,
        options: &EngineOptions,
    ) -> Result<(), EngineError>;

    /// Flush buffered events and stop background work.
    fn shutdown(&self) -> Result<(), EngineError>;

    /// Evaluate a boolean feature gate for the given user.
    fn check_gate(&self, user: &UserContext, gate_name: &str) -> Result<bool, EngineError>;

    /// Evaluate a dynamic config, returning the serialized
    /// `{name, values, ruleId}` payload.
    fn get_config(&self, user: &UserContext, config_name: &str) -> Result<String, EngineError>;

    /// Evaluate an experiment, returning the serialized
    /// `{name, values, ruleId}` payload.
    fn get_experiment(
        &self,
        user: &UserContext,
        experiment_name: &str,
    ) -> Result<String, EngineError>;

    /// Evaluate a layer, returning the serialized `{name, values, ruleId}`
    /// payload.
    fn get_layer(&self, user: &UserContext, layer_name: &str) -> Result<String, EngineError>;

    /// Record a custom event for the given user. Fire-and-forget; delivery is
    /// owned by the engine's buffering and flush schedule.
    fn log_event(&self, user: &UserContext, event_name: &str) -> Result<(), EngineError>;
}

impl<E: Engine + ?Sized> Engine for std::sync::Arc<E> {
    fn initialize(&self, secret_key: &str) -> Result<(), EngineError> {
        (**self).initialize(secret_key)
    }

    fn initialize_with_options(
        &self,
        secret_key: &str,
        options: &EngineOptions,
    ) -> Result<(), EngineError> {
        (**self).initialize_with_options(secret_key, options)
    }

    fn shutdown(&self) -> Result<(), EngineError> {
        (**self).shutdown()
    }

    fn check_gate(&self, user: &UserContext, gate_name: &str) -> Result<bool, EngineError> {
        (**self).check_gate(user, gate_name)
    }

    fn get_config(&self, user: &UserContext, config_name: &str) -> Result<String, EngineError> {
        (**self).get_config(user, config_name)
    }

    fn get_experiment(
        &self,
        user: &UserContext,
        experiment_name: &str,
    ) -> Result<String, EngineError> {
        (**self).get_experiment(user, experiment_name)
    }

    fn get_layer(&self, user: &UserContext, layer_name: &str) -> Result<String, EngineError> {
        (**self).get_layer(user, layer_name)
    }

    fn log_event(&self, user: &UserContext, event_name: &str) -> Result<(), EngineError> {
        (**self).log_event(user, event_name)
    }
}

/// Failure raised by the engine during a boundary call.
///
/// Carries the engine's diagnostic message. The message is never empty: an
/// engine that reports an empty message gets a generic diagnostic instead, so
/// failure reasons stay human-readable all the way up the stack.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct EngineError {
    message: String,
}

impl EngineError {
    /// Wraps an engine diagnostic message.
    pub fn new(message: impl Into<String>) -> Self {
        let mut message = message.into();
        if message.is_empty() {
            message = "engine call failed".to_owned();
        }
        EngineError { message }
    }

    /// The engine's diagnostic message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for EngineError {
    fn from(value: String) -> Self {
        EngineError::new(value)
    }
}

impl From<&str> for EngineError {
    fn from(value: &str) -> Self {
        EngineError::new(value)
    }
}
