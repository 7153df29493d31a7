//! The workflow executor: one validated, observed, merged tick at a time.
//!
//! A single [`WorkflowExecutor::execute`] call performs exactly one node
//! invocation (one "tick"), not a loop to completion. The caller (in
//! practice the transport boundary) issues repeated calls for multi-step
//! advancement and must always feed the *previous* tick's returned state
//! into the next call (read-modify-write discipline).
//!
//! Ticks for one session must be strictly serialized; `is_processing` is
//! the advisory lock and the nodes no-op when it is set. Different sessions
//! are fully independent and may tick concurrently.
//!
//! # Tick anatomy
//!
//! 1. record `WORKFLOW_START`
//! 2. validate the input state; failures propagate immediately, and no
//!    `WORKFLOW_END` is recorded for the attempt
//! 3. ask the router for the next node; record the `EDGE_TRANSITION`; if
//!    the route is done, record `WORKFLOW_END` and return the state
//!    unchanged
//! 4. record `NODE_ENTER`, invoke the node, record `NODE_EXIT` with its
//!    duration and the patch's field names
//! 5. record `STATE_UPDATE` and merge the patch (patch fields win,
//!    `updated_at` always refreshed)
//! 6. record `WORKFLOW_END`

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::instrument;

use crate::capabilities::Capabilities;
use crate::event_log::{WorkflowEvent, WorkflowLogger};
use crate::node::{Node, NodeContext, NodeError};
use crate::nodes::{GenerateSummaryNode, ProcessUserTurnNode, ProcessVoiceInputNode};
use crate::router::route;
use crate::state::SessionState;
use crate::types::{NodeKind, Route};
use crate::utils::id_generator::IdGenerator;
use crate::validator::{ValidationError, validate};

/// Failures that halt a tick.
///
/// Capability failures never appear here; nodes convert them into error
/// patches on the session state.
#[derive(Debug, Error, Diagnostic)]
pub enum ExecuteError {
    /// The input state violates a structural invariant.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),

    /// A node failed outside its error-patch convention.
    #[error("node {node} failed")]
    #[diagnostic(code(ideaforge::executor::node))]
    Node {
        node: NodeKind,
        #[source]
        source: NodeError,
    },

    /// The router selected a node with no registered implementation.
    #[error("no node registered for {node}")]
    #[diagnostic(
        code(ideaforge::executor::unknown_node),
        help("Register the node when constructing the executor.")
    )]
    UnknownNode { node: NodeKind },
}

/// Result of one executed tick.
#[derive(Debug)]
pub struct TickOutcome {
    /// The merged state (identical to the input when the route was done).
    pub state: SessionState,
    /// The node that ran, if any.
    pub ran_node: Option<NodeKind>,
    /// The tick's event log, for metrics and export.
    pub logger: Arc<WorkflowLogger>,
}

/// Drives one full tick of the workflow graph.
///
/// Construct it once with the injected [`Capabilities`]; it registers the
/// three built-in nodes and is cheap to share behind the transport handler.
///
/// # Examples
///
/// ```rust
/// use ideaforge::capabilities::Capabilities;
/// use ideaforge::executor::WorkflowExecutor;
/// use ideaforge::state::SessionState;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let executor = WorkflowExecutor::new(Capabilities::placeholder());
/// let outcome = executor
///     .execute(SessionState::new("sess_1", None))
///     .await
///     .expect("fresh state is valid");
///
/// // Cold start: exactly one assistant welcome message.
/// assert_eq!(outcome.state.messages.len(), 1);
/// # }
/// ```
pub struct WorkflowExecutor {
    nodes: FxHashMap<NodeKind, Arc<dyn Node>>,
    event_sender: Option<flume::Sender<WorkflowEvent>>,
    debug: bool,
    ids: IdGenerator,
}

impl WorkflowExecutor {
    /// Creates an executor with the three built-in nodes wired to the given
    /// capability set.
    #[must_use]
    pub fn new(capabilities: Capabilities) -> Self {
        let mut nodes: FxHashMap<NodeKind, Arc<dyn Node>> = FxHashMap::default();
        nodes.insert(
            NodeKind::ProcessUserTurn,
            Arc::new(ProcessUserTurnNode::new(capabilities.clone())),
        );
        nodes.insert(
            NodeKind::ProcessVoiceInput,
            Arc::new(ProcessVoiceInputNode::new(capabilities.clone())),
        );
        nodes.insert(
            NodeKind::GenerateSummary,
            Arc::new(GenerateSummaryNode::new(capabilities)),
        );
        Self {
            nodes,
            event_sender: None,
            debug: false,
            ids: IdGenerator::new(),
        }
    }

    /// Replaces a node implementation (used by tests to inject probes).
    #[must_use]
    pub fn with_node(mut self, kind: NodeKind, node: Arc<dyn Node>) -> Self {
        self.nodes.insert(kind, node);
        self
    }

    /// Streams every recorded event to an event-bus sender.
    #[must_use]
    pub fn with_event_sender(mut self, sender: flume::Sender<WorkflowEvent>) -> Self {
        self.event_sender = Some(sender);
        self
    }

    /// Mirrors a human-readable execution summary through `tracing` after
    /// each completed tick.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Runs exactly one tick against the given state.
    ///
    /// Returns the merged state; fails with a [`ValidationError`] if the
    /// input state is structurally invalid, or an execution error if a node
    /// fails outside its error-patch convention.
    #[instrument(skip(self, state), fields(session_id = %state.session_id), err)]
    pub async fn execute(&self, state: SessionState) -> Result<TickOutcome, ExecuteError> {
        let workflow_id = self.ids.generate_run_id();
        let mut logger =
            WorkflowLogger::new(&workflow_id, &state.session_id).with_debug(self.debug);
        if let Some(sender) = &self.event_sender {
            logger = logger.with_sender(sender.clone());
        }
        let logger = Arc::new(logger);
        let started = Instant::now();

        logger.record(WorkflowEvent::workflow_start(&workflow_id, &state.session_id));

        // Validation failures propagate before any WORKFLOW_END is recorded.
        validate(&state)?;

        let decision = route(&state);
        logger.record(WorkflowEvent::edge_transition(
            "start",
            &decision.target.to_string(),
            Some(decision.condition),
        ));

        let Route::To(kind) = decision.target else {
            tracing::debug!(condition = decision.condition, "no node to run this tick");
            logger.finish(elapsed_ms(started));
            return Ok(TickOutcome {
                state,
                ran_node: None,
                logger,
            });
        };

        let node = self
            .nodes
            .get(&kind)
            .ok_or(ExecuteError::UnknownNode { node: kind })?;

        logger.record(WorkflowEvent::node_enter(kind));
        let node_started = Instant::now();
        let ctx = NodeContext::new(kind, Arc::clone(&logger));
        let result = node.run(&state, ctx).await;
        let node_duration = elapsed_ms(node_started);

        let patch = match result {
            Ok(patch) => patch,
            Err(err) => {
                logger.record(WorkflowEvent::workflow_error(format!(
                    "node {kind} failed: {err}"
                )));
                return Err(ExecuteError::Node { node: kind, source: err });
            }
        };

        let fields = patch.updated_fields();
        logger.record(WorkflowEvent::node_exit(kind, node_duration, &fields));
        logger.record(WorkflowEvent::state_update(
            kind,
            &fields,
            serde_json::to_value(&patch).unwrap_or(serde_json::Value::Null),
        ));

        let mut next = state;
        next.apply(patch);

        logger.finish(elapsed_ms(started));
        Ok(TickOutcome {
            state: next,
            ran_node: Some(kind),
            logger,
        })
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}
