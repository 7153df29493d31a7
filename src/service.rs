//! The transport boundary: request/response operations exposed to the UI
//! process.
//!
//! Five operations make up the contract (execute one tick, create a
//! session, validate a state payload, fetch metrics, clear a session), each
//! returning a [`ServiceResponse`] envelope with `success`, optional data,
//! optional error string, and the handling duration. The UI holds the
//! latest [`SessionState`] snapshot, renders it, and calls back in here in
//! response to user actions; it persists no workflow logic of its own.
//!
//! [`WorkflowService::execute_with_retry`] is the caller-side wrapper:
//! bounded retry with linear backoff, surfacing a final error that names
//! the attempt count once the budget is exhausted.

use miette::Diagnostic;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::instrument;

use crate::capabilities::Capabilities;
use crate::event_log::{EventBus, ExecutionSummary};
use crate::executor::WorkflowExecutor;
use crate::registry::SessionRegistry;
use crate::runtime_config::{RetryPolicy, RuntimeConfig};
use crate::state::SessionState;
use crate::validator::{ValidationError, collect_issues};

/// Transport-level failure after the retry budget is spent.
#[derive(Debug, Error, Diagnostic)]
pub enum TransportError {
    #[error("workflow execution failed after {attempts} attempts: {last_error}")]
    #[diagnostic(
        code(ideaforge::service::retries_exhausted),
        help("Inspect the last error; validation failures will never succeed on retry.")
    )]
    RetriesExhausted { attempts: u32, last_error: String },
}

/// The response envelope every transport operation returns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServiceResponse<T> {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Payload on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error message on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// How long the operation took to handle, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl<T> ServiceResponse<T> {
    fn ok(data: T, started: Instant) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            duration_ms: Some(elapsed_ms(started)),
        }
    }

    fn failure(error: impl Into<String>, started: Instant) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            duration_ms: Some(elapsed_ms(started)),
        }
    }

    /// Converts the envelope into a plain `Result`.
    pub fn into_result(self) -> Result<T, String> {
        if self.success {
            self.data.ok_or_else(|| "missing response data".to_string())
        } else {
            Err(self.error.unwrap_or_else(|| "unknown error".to_string()))
        }
    }
}

/// Result of a client-side pre-flight validation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub issues: Vec<String>,
}

/// Per-session execution metrics retained by the service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkflowMetrics {
    /// The session these metrics describe.
    pub session_id: String,
    /// How many ticks completed for the session.
    pub ticks: u64,
    /// Roll-up of the most recent tick.
    pub last_summary: ExecutionSummary,
}

/// The request/response handler backing the UI's IPC surface.
///
/// # Examples
///
/// ```rust
/// use ideaforge::capabilities::Capabilities;
/// use ideaforge::runtime_config::RuntimeConfig;
/// use ideaforge::service::WorkflowService;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let service = WorkflowService::new(RuntimeConfig::default(), Capabilities::placeholder());
///
/// let created = service.create_session("sess_1", None).into_result().unwrap();
/// let ticked = service.execute(created).await.into_result().unwrap();
/// assert_eq!(ticked.messages.len(), 1); // assistant welcome
/// # }
/// ```
pub struct WorkflowService {
    registry: Arc<SessionRegistry>,
    executor: WorkflowExecutor,
    retry: RetryPolicy,
    event_bus: Option<EventBus>,
    metrics: RwLock<FxHashMap<String, WorkflowMetrics>>,
}

impl WorkflowService {
    /// Builds the service, its registry, its executor, and the event bus the
    /// configuration describes, from an injected capability set.
    #[must_use]
    pub fn new(config: RuntimeConfig, capabilities: Capabilities) -> Self {
        let registry = Arc::new(SessionRegistry::new(config.defaults.clone()));
        let event_bus = config.event_bus.build_event_bus();
        let executor = WorkflowExecutor::new(capabilities)
            .with_debug(config.debug)
            .with_event_sender(event_bus.get_sender());
        let mut service = Self::with_parts(registry, executor, config.retry);
        service.event_bus = Some(event_bus);
        service
    }

    /// Builds the service around an existing registry and executor.
    ///
    /// No event bus is owned in this form; wire the executor's event sender
    /// yourself if you want sink output.
    #[must_use]
    pub fn with_parts(
        registry: Arc<SessionRegistry>,
        executor: WorkflowExecutor,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            registry,
            executor,
            retry,
            event_bus: None,
            metrics: RwLock::new(FxHashMap::default()),
        }
    }

    /// The shared session registry.
    #[must_use]
    pub fn registry(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.registry)
    }

    /// The owned event bus, when the service was built from a
    /// [`RuntimeConfig`]. Add sinks here before the first tick.
    #[must_use]
    pub fn event_bus(&self) -> Option<&EventBus> {
        self.event_bus.as_ref()
    }

    /// Runs exactly one executor tick against the given state.
    ///
    /// On success the registry binding (if any) is refreshed with the
    /// returned state and the session's metrics are updated.
    #[instrument(skip(self, state), fields(session_id = %state.session_id))]
    pub async fn execute(&self, state: SessionState) -> ServiceResponse<SessionState> {
        let started = Instant::now();
        if let Some(bus) = &self.event_bus {
            // Idempotent; deferred to here so construction needs no runtime.
            bus.listen_for_events();
        }
        match self.executor.execute(state).await {
            Ok(outcome) => {
                self.record_metrics(&outcome.state.session_id, outcome.logger.execution_summary());
                if self.registry.update_session(outcome.state.clone()).is_err() {
                    tracing::debug!(
                        session_id = %outcome.state.session_id,
                        "tick completed for a session not bound in the registry"
                    );
                }
                ServiceResponse::ok(outcome.state, started)
            }
            Err(err) => ServiceResponse::failure(err.to_string(), started),
        }
    }

    /// Runs `execute` with bounded retry and linear backoff.
    ///
    /// Each attempt re-submits the same input state; on exhaustion the
    /// error names the attempt count and the last failure.
    pub async fn execute_with_retry(
        &self,
        state: &SessionState,
    ) -> Result<SessionState, TransportError> {
        let policy = self.retry;
        let mut last_error = String::new();

        for attempt in 1..=policy.attempts {
            match self.execute(state.clone()).await.into_result() {
                Ok(next) => return Ok(next),
                Err(err) => {
                    tracing::warn!(attempt, error = %err, "execute attempt failed");
                    last_error = err;
                }
            }
            if attempt < policy.attempts {
                tokio::time::sleep(policy.delay_after(attempt)).await;
            }
        }

        Err(TransportError::RetriesExhausted {
            attempts: policy.attempts,
            last_error,
        })
    }

    /// Creates (or recreates) a session and returns its initial state.
    pub fn create_session(
        &self,
        session_id: &str,
        user_id: Option<&str>,
    ) -> ServiceResponse<SessionState> {
        let started = Instant::now();
        if session_id.is_empty() {
            return ServiceResponse::failure(ValidationError::InvalidIdeaId.to_string(), started);
        }
        let state = self.registry.create_session(session_id, user_id);
        ServiceResponse::ok(state, started)
    }

    /// Pre-flight structural validation of a raw state payload.
    pub fn validate_state(&self, payload: &serde_json::Value) -> ServiceResponse<ValidationReport> {
        let started = Instant::now();
        let issues = collect_issues(payload);
        ServiceResponse::ok(
            ValidationReport {
                is_valid: issues.is_empty(),
                issues,
            },
            started,
        )
    }

    /// Execution metrics for a session, or `None` if it never ticked.
    pub fn get_metrics(&self, session_id: &str) -> ServiceResponse<Option<WorkflowMetrics>> {
        let started = Instant::now();
        let metrics = self.metrics.read().get(session_id).cloned();
        ServiceResponse::ok(metrics, started)
    }

    /// Removes the session binding and its retained metrics.
    pub fn clear_session(&self, session_id: &str) -> ServiceResponse<()> {
        let started = Instant::now();
        self.registry.clear_session(session_id);
        self.metrics.write().remove(session_id);
        ServiceResponse::ok((), started)
    }

    fn record_metrics(&self, session_id: &str, summary: ExecutionSummary) {
        let mut metrics = self.metrics.write();
        match metrics.get_mut(session_id) {
            Some(existing) => {
                existing.ticks += 1;
                existing.last_summary = summary;
            }
            None => {
                metrics.insert(
                    session_id.to_string(),
                    WorkflowMetrics {
                        session_id: session_id.to_string(),
                        ticks: 1,
                        last_summary: summary,
                    },
                );
            }
        }
    }
}

impl std::fmt::Debug for WorkflowService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowService")
            .field("registry", &self.registry)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}
