use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::engine::{Engine, EngineError};
use crate::{DynamicPayload, EngineOptions, Error, Resolved, Result, UserContext};

/// A client handle over the evaluation engine.
///
/// The client owns the engine's two-state lifecycle (uninitialized or
/// initialized) and is the single place where engine failures are converted
/// into [`Error`] values; no engine failure crosses this boundary any other
/// way. Every evaluation and logging operation first checks the lifecycle flag
/// and returns [`Error::NotInitialized`] without touching the engine when it is
/// not set.
///
/// The client is synchronous and re-entrant: evaluation calls may run
/// concurrently from any number of threads without locking, while
/// [`initialize`](Client::initialize) and [`shutdown`](Client::shutdown) are
/// mutually exclusive with each other. Treat `initialize` as potentially slow
/// (the engine may block on its first ruleset fetch) and the evaluation calls
/// as fast in-memory reads.
///
/// Dropping the client does not shut the engine down; call
/// [`shutdown`](Client::shutdown) to flush buffered events first.
pub struct Client {
    engine: Box<dyn Engine>,
    // Serializes lifecycle transitions. Evaluation calls never take this lock;
    // they only read the flag.
    lifecycle: Mutex<()>,
    initialized: AtomicBool,
}

impl Client {
    /// Creates a client over the given engine. The engine stays idle until
    /// [`initialize`](Client::initialize) is called.
    pub fn new(engine: impl Engine + 'static) -> Client {
        Client {
            engine: Box::new(engine),
            lifecycle: Mutex::new(()),
            initialized: AtomicBool::new(false),
        }
    }

    /// Starts the engine with default options.
    ///
    /// Fails with [`Error::AlreadyInitialized`] when called on an initialized
    /// client. On engine-side failure the client stays uninitialized. A
    /// successful call lets the engine begin background sync and event
    /// logging as its own side effect.
    pub fn initialize(&self, secret_key: &str) -> Result<()> {
        self.transition_initialized(|engine| engine.initialize(secret_key))
    }

    /// Starts the engine with the given options, passed through verbatim.
    ///
    /// An empty [`EngineOptions::api_base`] means "use the engine default";
    /// the bridge does not interpret the options.
    pub fn initialize_with_options(&self, secret_key: &str, options: EngineOptions) -> Result<()> {
        self.transition_initialized(|engine| engine.initialize_with_options(secret_key, &options))
    }

    /// Flushes and stops the engine.
    ///
    /// Fails with [`Error::NotInitialized`] on an uninitialized client.
    /// Evaluation calls racing with shutdown are not waited for; they fail the
    /// lifecycle check as soon as the flag clears. Re-initialization after
    /// shutdown is permitted.
    pub fn shutdown(&self) -> Result<()> {
        let _lifecycle = self.lock_lifecycle();
        if !self.initialized.load(Ordering::Acquire) {
            return Err(Error::NotInitialized);
        }

        // Clear the flag first so new evaluation calls stop before the engine
        // begins its flush.
        self.initialized.store(false, Ordering::Release);
        self.engine.shutdown().map_err(|err| {
            log::warn!(target: "flagbridge", error = err.message(); "engine shutdown failed");
            Error::Engine(err)
        })?;
        log::debug!(target: "flagbridge", "engine shut down");
        Ok(())
    }

    /// Whether the client is currently initialized. Atomic read, never fails.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Evaluates a boolean feature gate for the given user.
    ///
    /// Evaluation emits an exposure record as an engine-owned side effect.
    pub fn check_gate(&self, user: &UserContext, gate_name: &str) -> Result<bool> {
        let value = self.guarded("check_gate", gate_name, |engine| {
            engine.check_gate(user, gate_name)
        })?;
        log::trace!(target: "flagbridge", gate_name, user_id = user.id.as_str(), value; "checked gate");
        Ok(value)
    }

    /// Fetches a dynamic config for the given user.
    pub fn get_config(&self, user: &UserContext, config_name: &str) -> Result<DynamicPayload> {
        let raw = self.guarded("get_config", config_name, |engine| {
            engine.get_config(user, config_name)
        })?;
        let payload = DynamicPayload::parse(&raw);
        log::trace!(target: "flagbridge", config_name, rule_id = payload.rule_id.as_str(); "fetched config");
        Ok(payload)
    }

    /// Fetches an experiment for the given user.
    pub fn get_experiment(
        &self,
        user: &UserContext,
        experiment_name: &str,
    ) -> Result<DynamicPayload> {
        let raw = self.guarded("get_experiment", experiment_name, |engine| {
            engine.get_experiment(user, experiment_name)
        })?;
        let payload = DynamicPayload::parse(&raw);
        log::trace!(target: "flagbridge", experiment_name, rule_id = payload.rule_id.as_str(); "fetched experiment");
        Ok(payload)
    }

    /// Fetches a layer for the given user.
    pub fn get_layer(&self, user: &UserContext, layer_name: &str) -> Result<DynamicPayload> {
        let raw = self.guarded("get_layer", layer_name, |engine| {
            engine.get_layer(user, layer_name)
        })?;
        let payload = DynamicPayload::parse(&raw);
        log::trace!(target: "flagbridge", layer_name, rule_id = payload.rule_id.as_str(); "fetched layer");
        Ok(payload)
    }

    /// Records a custom event for the given user.
    pub fn log_event(&self, user: &UserContext, event_name: &str) -> Result<()> {
        self.guarded("log_event", event_name, |engine| {
            engine.log_event(user, event_name)
        })
    }

    /// Lifecycle check plus engine dispatch, with the engine failure converted
    /// at this boundary.
    fn guarded<T>(
        &self,
        op: &str,
        name: &str,
        call: impl FnOnce(&dyn Engine) -> std::result::Result<T, EngineError>,
    ) -> Result<T> {
        if !self.initialized.load(Ordering::Acquire) {
            return Err(Error::NotInitialized);
        }
        call(self.engine.as_ref()).map_err(|err| {
            log::warn!(target: "flagbridge", op, name, error = err.message(); "engine call failed");
            Error::Engine(err)
        })
    }

    fn transition_initialized(
        &self,
        start: impl FnOnce(&dyn Engine) -> std::result::Result<(), EngineError>,
    ) -> Result<()> {
        let _lifecycle = self.lock_lifecycle();
        if self.initialized.load(Ordering::Acquire) {
            return Err(Error::AlreadyInitialized);
        }

        start(self.engine.as_ref()).map_err(|err| {
            log::warn!(target: "flagbridge", error = err.message(); "engine initialization failed");
            Error::Engine(err)
        })?;
        self.initialized.store(true, Ordering::Release);
        log::debug!(target: "flagbridge", "engine initialized");
        Ok(())
    }

    fn lock_lifecycle(&self) -> MutexGuard<'_, ()> {
        // The guarded value is a unit, so a poisoned lock is still usable.
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Non-propagating call shapes layered on the core operations.
impl Client {
    /// Like [`check_gate`](Client::check_gate), returning `false` on failure.
    /// Lossy: the error is discarded. Call sites that need diagnostics should
    /// use the resolution-reporting or `Result`-returning form.
    pub fn check_gate_or_default(&self, user: &UserContext, gate_name: &str) -> bool {
        self.check_gate(user, gate_name).unwrap_or_default()
    }

    /// Like [`check_gate`](Client::check_gate), reporting resolution status
    /// alongside a safe value.
    pub fn check_gate_resolved(&self, user: &UserContext, gate_name: &str) -> Resolved<bool> {
        Resolved::from_outcome(self.check_gate(user, gate_name), false)
    }

    /// Like [`get_config`](Client::get_config), returning the empty payload on
    /// failure. Lossy.
    pub fn get_config_or_default(&self, user: &UserContext, config_name: &str) -> DynamicPayload {
        self.get_config(user, config_name).unwrap_or_default()
    }

    /// Like [`get_config`](Client::get_config), reporting resolution status.
    pub fn get_config_resolved(
        &self,
        user: &UserContext,
        config_name: &str,
    ) -> Resolved<DynamicPayload> {
        Resolved::from_outcome(
            self.get_config(user, config_name),
            DynamicPayload::default(),
        )
    }

    /// Like [`get_experiment`](Client::get_experiment), returning the empty
    /// payload on failure. Lossy.
    pub fn get_experiment_or_default(
        &self,
        user: &UserContext,
        experiment_name: &str,
    ) -> DynamicPayload {
        self.get_experiment(user, experiment_name).unwrap_or_default()
    }

    /// Like [`get_experiment`](Client::get_experiment), reporting resolution
    /// status.
    pub fn get_experiment_resolved(
        &self,
        user: &UserContext,
        experiment_name: &str,
    ) -> Resolved<DynamicPayload> {
        Resolved::from_outcome(
            self.get_experiment(user, experiment_name),
            DynamicPayload::default(),
        )
    }

    /// Like [`get_layer`](Client::get_layer), returning the empty payload on
    /// failure. Lossy.
    pub fn get_layer_or_default(&self, user: &UserContext, layer_name: &str) -> DynamicPayload {
        self.get_layer(user, layer_name).unwrap_or_default()
    }

    /// Like [`get_layer`](Client::get_layer), reporting resolution status.
    pub fn get_layer_resolved(
        &self,
        user: &UserContext,
        layer_name: &str,
    ) -> Resolved<DynamicPayload> {
        Resolved::from_outcome(self.get_layer(user, layer_name), DynamicPayload::default())
    }

    /// Like [`log_event`](Client::log_event), discarding the outcome. Lossy.
    pub fn log_event_best_effort(&self, user: &UserContext, event_name: &str) {
        let _ = self.log_event(user, event_name);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::Client;
    use crate::engine::{Engine, EngineError};
    use crate::{DynamicPayload, EngineOptions, Error, UserContext};

    /// Scriptable engine double. Records every boundary call.
    #[derive(Default)]
    struct MockEngine {
        gate_value: bool,
        payload_json: String,
        lifecycle_error: Mutex<Option<String>>,
        evaluation_error: Option<String>,
        calls: Mutex<Vec<String>>,
        options_seen: Mutex<Option<EngineOptions>>,
    }

    impl MockEngine {
        fn record(&self, call: &str) {
            self.calls.lock().unwrap().push(call.to_owned());
        }

        fn lifecycle(&self, call: &str) -> Result<(), EngineError> {
            self.record(call);
            match &*self.lifecycle_error.lock().unwrap() {
                Some(message) => Err(EngineError::new(message.clone())),
                None => Ok(()),
            }
        }

        fn evaluation(&self, call: &str) -> Result<(), EngineError> {
            self.record(call);
            match &self.evaluation_error {
                Some(message) => Err(EngineError::new(message.clone())),
                None => Ok(()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl Engine for MockEngine {
        fn initialize(&self, _secret_key: &str) -> Result<(), EngineError> {
            self.lifecycle("initialize")
        }

        fn initialize_with_options(
            &self,
            _secret_key: &str,
            options: &EngineOptions,
        ) -> Result<(), EngineError> {
            *self.options_seen.lock().unwrap() = Some(options.clone());
            self.lifecycle("initialize_with_options")
        }

        fn shutdown(&self) -> Result<(), EngineError> {
            self.lifecycle("shutdown")
        }

        fn check_gate(&self, _user: &UserContext, _gate_name: &str) -> Result<bool, EngineError> {
            self.evaluation("check_gate")?;
            Ok(self.gate_value)
        }

        fn get_config(
            &self,
            _user: &UserContext,
            _config_name: &str,
        ) -> Result<String, EngineError> {
            self.evaluation("get_config")?;
            Ok(self.payload_json.clone())
        }

        fn get_experiment(
            &self,
            _user: &UserContext,
            _experiment_name: &str,
        ) -> Result<String, EngineError> {
            self.evaluation("get_experiment")?;
            Ok(self.payload_json.clone())
        }

        fn get_layer(&self, _user: &UserContext, _layer_name: &str) -> Result<String, EngineError> {
            self.evaluation("get_layer")?;
            Ok(self.payload_json.clone())
        }

        fn log_event(&self, _user: &UserContext, _event_name: &str) -> Result<(), EngineError> {
            self.evaluation("log_event")
        }
    }

    fn client_over(engine: &Arc<MockEngine>) -> Client {
        Client::new(Arc::clone(engine))
    }

    #[test]
    fn operations_require_initialization() {
        let engine = Arc::new(MockEngine::default());
        let client = client_over(&engine);
        let user = UserContext::default();

        assert!(matches!(
            client.check_gate(&user, "gate"),
            Err(Error::NotInitialized)
        ));
        assert!(matches!(
            client.get_config(&user, "config"),
            Err(Error::NotInitialized)
        ));
        assert!(matches!(
            client.get_experiment(&user, "experiment"),
            Err(Error::NotInitialized)
        ));
        assert!(matches!(
            client.get_layer(&user, "layer"),
            Err(Error::NotInitialized)
        ));
        assert!(matches!(
            client.log_event(&user, "event"),
            Err(Error::NotInitialized)
        ));
        // The lifecycle check fails before the engine is ever touched.
        assert_eq!(engine.call_count(), 0);
    }

    #[test]
    fn not_initialized_reason_is_stable() {
        let client = Client::new(MockEngine::default());
        let err = client.check_gate(&UserContext::default(), "gate").unwrap_err();
        assert_eq!(err.to_string(), "not initialized");
    }

    #[test]
    fn initialize_twice_fails_without_reaching_the_engine_again() {
        let engine = Arc::new(MockEngine::default());
        let client = client_over(&engine);

        client.initialize("secret-key").unwrap();
        assert!(client.is_initialized());

        assert!(matches!(
            client.initialize("secret-key"),
            Err(Error::AlreadyInitialized)
        ));
        assert_eq!(engine.call_count(), 1);
    }

    #[test]
    fn shutdown_requires_initialization() {
        let client = Client::new(MockEngine::default());
        assert!(matches!(client.shutdown(), Err(Error::NotInitialized)));
    }

    #[test]
    fn reinitialization_after_shutdown_is_permitted() {
        let client = Client::new(MockEngine::default());

        client.initialize("secret-key").unwrap();
        client.shutdown().unwrap();
        assert!(!client.is_initialized());

        client.initialize("secret-key").unwrap();
        assert!(client.is_initialized());
    }

    #[test]
    fn failed_initialization_leaves_the_client_uninitialized() {
        let client = Client::new(MockEngine {
            lifecycle_error: Mutex::new(Some("network unreachable".to_owned())),
            ..MockEngine::default()
        });

        let err = client.initialize("secret-key").unwrap_err();
        assert_eq!(err.to_string(), "network unreachable");
        assert!(!client.is_initialized());
        assert!(matches!(
            client.check_gate(&UserContext::default(), "gate"),
            Err(Error::NotInitialized)
        ));
    }

    #[test]
    fn options_pass_through_verbatim() {
        let engine = Arc::new(MockEngine::default());
        let client = client_over(&engine);

        let mut options = EngineOptions::new();
        options
            .api_base("")
            .local_mode(true)
            .ruleset_sync_interval_ms(1_234);
        client
            .initialize_with_options("secret-key", options.clone())
            .unwrap();

        assert_eq!(engine.options_seen.lock().unwrap().as_ref(), Some(&options));
    }

    #[test]
    fn gate_checks_flow_end_to_end() {
        let client = Client::new(MockEngine::default());
        let user = UserContext::default();

        client.initialize("secret-key").unwrap();
        // Unknown gates evaluate to the engine default rather than failing.
        assert!(!client.check_gate(&user, "unknown_gate").unwrap());

        client.shutdown().unwrap();
        assert!(matches!(
            client.check_gate(&user, "unknown_gate"),
            Err(Error::NotInitialized)
        ));
    }

    #[test]
    fn evaluation_failures_are_reported_with_the_engine_reason() {
        let client = Client::new(MockEngine {
            evaluation_error: Some("gate evaluation exploded".to_owned()),
            ..MockEngine::default()
        });
        client.initialize("secret-key").unwrap();

        let err = client
            .check_gate(&UserContext::default(), "gate")
            .unwrap_err();
        assert!(matches!(err, Error::Engine(_)));
        assert_eq!(err.to_string(), "gate evaluation exploded");
    }

    #[test]
    fn shutdown_failures_still_stop_evaluations() {
        let engine = Arc::new(MockEngine::default());
        let client = client_over(&engine);
        client.initialize("secret-key").unwrap();

        *engine.lifecycle_error.lock().unwrap() = Some("flush failed".to_owned());

        // A flush failure surfaces to the caller, but the handle is already
        // uninitialized, so evaluations stop either way.
        let err = client.shutdown().unwrap_err();
        assert_eq!(err.to_string(), "flush failed");
        assert!(!client.is_initialized());
        assert!(matches!(
            client.check_gate(&UserContext::default(), "gate"),
            Err(Error::NotInitialized)
        ));
    }

    #[test]
    fn payload_operations_parse_the_engine_payload() {
        let engine = Arc::new(MockEngine {
            payload_json:
                r#"{"name": "pricing", "values": {"tier": "gold", "limit": 10}, "ruleId": "r-2"}"#
                    .to_owned(),
            ..MockEngine::default()
        });
        let client = client_over(&engine);
        let user = UserContext::new("user-1");
        client.initialize("secret-key").unwrap();

        for payload in [
            client.get_config(&user, "pricing").unwrap(),
            client.get_experiment(&user, "pricing").unwrap(),
            client.get_layer(&user, "pricing").unwrap(),
        ] {
            assert_eq!(payload.name, "pricing");
            assert_eq!(payload.rule_id, "r-2");
            assert_eq!(payload.get_string("tier", ""), "gold");
            assert_eq!(payload.get_int("limit", 0), 10);
        }
    }

    #[test]
    fn malformed_engine_payload_degrades_to_empty() {
        let engine = Arc::new(MockEngine {
            payload_json: "definitely not json".to_owned(),
            ..MockEngine::default()
        });
        let client = client_over(&engine);
        client.initialize("secret-key").unwrap();

        let payload = client
            .get_config(&UserContext::default(), "broken")
            .unwrap();
        assert_eq!(payload, DynamicPayload::default());
    }

    #[test]
    fn log_event_reaches_the_engine() {
        let engine = Arc::new(MockEngine::default());
        let client = client_over(&engine);
        client.initialize("secret-key").unwrap();

        client
            .log_event(&UserContext::new("user-1"), "purchase")
            .unwrap();
        assert!(engine.calls.lock().unwrap().contains(&"log_event".to_owned()));
    }

    #[test]
    fn default_variants_swallow_failures() {
        let client = Client::new(MockEngine::default());
        let user = UserContext::default();

        // Uninitialized, so every call fails underneath.
        assert!(!client.check_gate_or_default(&user, "gate"));
        assert_eq!(
            client.get_config_or_default(&user, "config"),
            DynamicPayload::default()
        );
        assert_eq!(
            client.get_experiment_or_default(&user, "experiment"),
            DynamicPayload::default()
        );
        assert_eq!(
            client.get_layer_or_default(&user, "layer"),
            DynamicPayload::default()
        );
        client.log_event_best_effort(&user, "event");
    }

    #[test]
    fn resolved_variants_report_the_failure_reason() {
        let client = Client::new(MockEngine::default());
        let user = UserContext::default();

        let resolved = client.check_gate_resolved(&user, "gate");
        assert!(!resolved.value);
        assert!(!resolved.resolved);
        assert!(matches!(resolved.error, Some(Error::NotInitialized)));

        client.initialize("secret-key").unwrap();
        let resolved = client.check_gate_resolved(&user, "gate");
        assert!(resolved.resolved);
        assert!(resolved.error.is_none());

        let resolved = client.get_layer_resolved(&user, "layer");
        assert!(resolved.resolved);
        assert_eq!(resolved.value, DynamicPayload::default());
    }

    #[test]
    fn client_is_usable_across_threads() {
        let client = Arc::new(Client::new(MockEngine::default()));
        client.initialize("secret-key").unwrap();

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let client = Arc::clone(&client);
                std::thread::spawn(move || {
                    let user = UserContext::new(format!("user-{i}"));
                    client.check_gate(&user, "gate").unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert!(!handle.join().unwrap());
        }
    }
}
