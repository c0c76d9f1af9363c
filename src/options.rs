/// Options passed to the engine at initialization.
///
/// Constructed once, handed to
/// [`Client::initialize_with_options`](crate::Client::initialize_with_options),
/// and immutable thereafter. The bridge passes the options through to the engine
/// verbatim; in particular an empty [`api_base`](EngineOptions::api_base) means
/// "use the engine's default endpoint", not "use an empty endpoint".
///
/// # Examples
/// ```
/// # use flagbridge::EngineOptions;
/// let mut options = EngineOptions::new();
/// options.local_mode(true).logging_interval_ms(30_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Endpoint the engine syncs against; empty means the engine default.
    pub api_base: String,
    /// When set, the engine disables network sync and event logging.
    pub local_mode: bool,
    /// How often the engine refreshes its ruleset. Positive.
    pub ruleset_sync_interval_ms: u32,
    /// How often the engine flushes buffered events. Positive.
    pub logging_interval_ms: u32,
    /// How many events the engine buffers before forcing a flush. Positive.
    pub logging_max_buffered_events: u32,
}

impl EngineOptions {
    /// How often the engine refreshes its ruleset, unless overridden.
    pub const DEFAULT_RULESET_SYNC_INTERVAL_MS: u32 = 10_000;
    /// How often the engine flushes buffered events, unless overridden.
    pub const DEFAULT_LOGGING_INTERVAL_MS: u32 = 60_000;
    /// How many events the engine buffers before forcing a flush, unless overridden.
    pub const DEFAULT_LOGGING_MAX_BUFFERED_EVENTS: u32 = 1_000;

    /// Creates options with every setting at its engine default.
    pub fn new() -> Self {
        EngineOptions {
            api_base: String::new(),
            local_mode: false,
            ruleset_sync_interval_ms: Self::DEFAULT_RULESET_SYNC_INTERVAL_MS,
            logging_interval_ms: Self::DEFAULT_LOGGING_INTERVAL_MS,
            logging_max_buffered_events: Self::DEFAULT_LOGGING_MAX_BUFFERED_EVENTS,
        }
    }

    /// Override the endpoint the engine syncs against. Clients should use the
    /// default setting in most cases.
    pub fn api_base(&mut self, api_base: impl Into<String>) -> &mut Self {
        self.api_base = api_base.into();
        self
    }

    /// Disable network sync and event logging. Evaluations then run purely
    /// against locally supplied rulesets.
    pub fn local_mode(&mut self, local_mode: bool) -> &mut Self {
        self.local_mode = local_mode;
        self
    }

    /// Override the ruleset refresh interval. Must be positive.
    pub fn ruleset_sync_interval_ms(&mut self, interval_ms: u32) -> &mut Self {
        self.ruleset_sync_interval_ms = interval_ms;
        self
    }

    /// Override the event flush interval. Must be positive.
    pub fn logging_interval_ms(&mut self, interval_ms: u32) -> &mut Self {
        self.logging_interval_ms = interval_ms;
        self
    }

    /// Override the event buffer high-water mark. Must be positive.
    pub fn logging_max_buffered_events(&mut self, max_events: u32) -> &mut Self {
        self.logging_max_buffered_events = max_events;
        self
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions::new()
    }
}
