//! Runtime configuration for the engine and its transport boundary.
//!
//! Configuration is explicit and constructed once by the process entry
//! point; `.env` files are honoured via `dotenvy`, and a handful of
//! environment variables override the defaults:
//!
//! - `IDEAFORGE_DEBUG`: `1`/`true` enables the human-readable execution
//!   summary mirror after each tick
//! - `IDEAFORGE_BRAINSTORM_MODEL` / `IDEAFORGE_SUMMARY_MODEL` /
//!   `IDEAFORGE_PRD_MODEL`: per-stage default model identifiers for new
//!   sessions

use std::time::Duration;

use crate::event_log::{EventBus, MemorySink, StdOutSink};
use crate::state::SessionDefaults;
use crate::types::Stage;

/// Bounded-retry settings for the caller-side `execute` wrapper.
///
/// Attempt `n` (1-based) is followed by a delay of `n * base_delay` before
/// the next try.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts before giving up.
    pub attempts: u32,
    /// Base delay unit for the linear backoff.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// The delay to sleep after the given 1-based attempt number.
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

/// Which sinks the engine's event bus should broadcast to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SinkConfig {
    StdOut,
    Memory,
}

/// Event bus construction settings.
#[derive(Clone, Debug)]
pub struct EventBusConfig {
    pub sinks: Vec<SinkConfig>,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self::with_stdout_only()
    }
}

impl EventBusConfig {
    /// Broadcast to stdout only.
    #[must_use]
    pub fn with_stdout_only() -> Self {
        Self {
            sinks: vec![SinkConfig::StdOut],
        }
    }

    /// Adds a sink if not already configured.
    #[must_use]
    pub fn add_sink(mut self, sink: SinkConfig) -> Self {
        if !self.sinks.contains(&sink) {
            self.sinks.push(sink);
        }
        self
    }

    /// Builds an [`EventBus`] with the configured sinks (listener not yet
    /// started).
    #[must_use]
    pub fn build_event_bus(&self) -> EventBus {
        let sinks = self
            .sinks
            .iter()
            .map(|sink| -> Box<dyn crate::event_log::EventSink> {
                match sink {
                    SinkConfig::StdOut => Box::new(StdOutSink::default()),
                    SinkConfig::Memory => Box::new(MemorySink::new()),
                }
            })
            .collect();
        EventBus::with_sinks(sinks)
    }
}

/// Top-level engine configuration.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Mirror execution summaries through `tracing` after each tick.
    pub debug: bool,
    /// Event bus sinks for workflow telemetry.
    pub event_bus: EventBusConfig,
    /// Caller-side retry settings for `execute`.
    pub retry: RetryPolicy,
    /// Prompt/model defaults for freshly created sessions.
    pub defaults: SessionDefaults,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            debug: false,
            event_bus: EventBusConfig::default(),
            retry: RetryPolicy::default(),
            defaults: SessionDefaults::default(),
        }
    }
}

impl RuntimeConfig {
    /// Builds a configuration from the environment (and any `.env` file).
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let debug = std::env::var("IDEAFORGE_DEBUG")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let mut defaults = SessionDefaults::default();
        for (stage, var) in [
            (Stage::Brainstorm, "IDEAFORGE_BRAINSTORM_MODEL"),
            (Stage::Summary, "IDEAFORGE_SUMMARY_MODEL"),
            (Stage::Prd, "IDEAFORGE_PRD_MODEL"),
        ] {
            if let Ok(model) = std::env::var(var) {
                defaults = defaults.with_model(stage, model);
            }
        }

        Self {
            debug,
            defaults,
            ..Self::default()
        }
    }

    /// Overrides the event bus configuration.
    #[must_use]
    pub fn with_event_bus(mut self, event_bus: EventBusConfig) -> Self {
        self.event_bus = event_bus;
        self
    }

    /// Overrides the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Overrides the debug flag.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}
