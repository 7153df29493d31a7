//! Node execution primitives.
//!
//! A node is one named unit of workflow logic: it receives the current
//! session state and returns a sparse [`StatePatch`] for the executor to
//! merge. Nodes never mutate the input state in place, must be safe to
//! invoke at most once per tick, and communicate capability failures
//! through the error-patch convention (`{is_processing: false, error}`)
//! rather than by raising.
//!
//! Returning `Err(NodeError)` is reserved for failures *outside* that
//! convention: a node routed without the input it requires is an executor
//! bug, not a conversation error.

use async_trait::async_trait;
use miette::Diagnostic;
use std::sync::Arc;
use thiserror::Error;

use crate::event_log::{WorkflowEvent, WorkflowLogger};
use crate::state::{SessionState, StatePatch};
use crate::types::NodeKind;

/// Core trait for executable workflow nodes.
///
/// # Design Principles
///
/// - **Stateless**: a node owns its collaborators, never session state
/// - **Focused**: one node, one unit of workflow logic
/// - **Observable**: guard decisions go through [`NodeContext::condition`]
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use ideaforge::message::Message;
/// use ideaforge::node::{Node, NodeContext, NodeError};
/// use ideaforge::state::{SessionState, StatePatch};
///
/// struct EchoNode;
///
/// #[async_trait]
/// impl Node for EchoNode {
///     async fn run(
///         &self,
///         state: &SessionState,
///         ctx: NodeContext,
///     ) -> Result<StatePatch, NodeError> {
///         ctx.condition("has_history", !state.messages.is_empty(), "");
///         let Some(last) = state.last_message() else {
///             return Ok(StatePatch::new());
///         };
///         Ok(StatePatch::new()
///             .with_messages(vec![Message::assistant(last.content.clone(), state.stage)])
///             .with_is_processing(false))
///     }
/// }
/// ```
#[async_trait]
pub trait Node: Send + Sync {
    /// Execute this node against the given session state.
    async fn run(&self, state: &SessionState, ctx: NodeContext) -> Result<StatePatch, NodeError>;
}

/// Execution context passed to nodes during a tick.
///
/// Carries the node's identity and a handle to the tick's
/// [`WorkflowLogger`] so guard evaluations show up in the event log.
#[derive(Clone)]
pub struct NodeContext {
    /// Which node this context belongs to.
    pub node: NodeKind,
    /// The logger scoped to the current execution.
    logger: Arc<WorkflowLogger>,
}

impl NodeContext {
    /// Creates a context for one node invocation.
    #[must_use]
    pub fn new(node: NodeKind, logger: Arc<WorkflowLogger>) -> Self {
        Self { node, logger }
    }

    /// Records a `CONDITION_CHECK` event for a guard evaluation.
    ///
    /// Returns the result so guards read naturally at the call site:
    ///
    /// ```rust,ignore
    /// if !ctx.condition("not_processing", !state.is_processing, "") {
    ///     return Ok(StatePatch::new());
    /// }
    /// ```
    pub fn condition(&self, name: &str, result: bool, detail: impl Into<String>) -> bool {
        self.logger
            .record(WorkflowEvent::condition_check(Some(self.node), name, result, detail));
        result
    }

    /// Records a `NODE_ERROR` event for a failure that is being converted
    /// into an error patch.
    pub fn record_error(&self, message: impl Into<String>) {
        self.logger
            .record(WorkflowEvent::node_error(self.node, message));
    }
}

impl std::fmt::Debug for NodeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeContext")
            .field("node", &self.node)
            .finish_non_exhaustive()
    }
}

/// Errors that halt a tick instead of becoming state.
///
/// Capability failures never take this path; they become error patches.
#[derive(Debug, Error, Diagnostic)]
pub enum NodeError {
    /// Expected input data is missing from the session state.
    ///
    /// Reaching this means the router selected a node whose input
    /// precondition does not hold, which is an orchestration bug.
    #[error("missing expected input: {what}")]
    #[diagnostic(
        code(ideaforge::node::missing_input),
        help("Check the router's guard for this node.")
    )]
    MissingInput { what: &'static str },

    /// JSON serialization error while assembling a patch.
    #[error(transparent)]
    #[diagnostic(code(ideaforge::node::serde_json))]
    Serde(#[from] serde_json::Error),
}
