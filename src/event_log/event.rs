//! Structured workflow events recorded during tick execution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;

use crate::types::NodeKind;

/// The kind of a recorded workflow event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    WorkflowStart,
    WorkflowEnd,
    NodeEnter,
    NodeExit,
    NodeError,
    EdgeTransition,
    StateUpdate,
    ConditionCheck,
    WorkflowError,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EventKind::WorkflowStart => "WORKFLOW_START",
            EventKind::WorkflowEnd => "WORKFLOW_END",
            EventKind::NodeEnter => "NODE_ENTER",
            EventKind::NodeExit => "NODE_EXIT",
            EventKind::NodeError => "NODE_ERROR",
            EventKind::EdgeTransition => "EDGE_TRANSITION",
            EventKind::StateUpdate => "STATE_UPDATE",
            EventKind::ConditionCheck => "CONDITION_CHECK",
            EventKind::WorkflowError => "WORKFLOW_ERROR",
        };
        f.write_str(label)
    }
}

/// One recorded event in a workflow execution.
///
/// Events carry a timestamp, the node they concern (when any), a
/// human-readable message, and a structured payload whose shape depends on
/// the kind (durations, updated field names, condition results, …).
///
/// # Examples
///
/// ```rust
/// use ideaforge::event_log::{EventKind, WorkflowEvent};
/// use ideaforge::types::NodeKind;
///
/// let event = WorkflowEvent::node_exit(NodeKind::ProcessUserTurn, 12, &["messages"]);
/// assert_eq!(event.kind, EventKind::NodeExit);
/// assert_eq!(event.duration_ms(), Some(12));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkflowEvent {
    /// When the event was recorded.
    pub when: DateTime<Utc>,
    /// What happened.
    pub kind: EventKind,
    /// The node this event concerns, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<NodeKind>,
    /// Human-readable description.
    pub message: String,
    /// Kind-specific structured payload.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl WorkflowEvent {
    fn new(kind: EventKind, node: Option<NodeKind>, message: String, data: Value) -> Self {
        Self {
            when: Utc::now(),
            kind,
            node,
            message,
            data,
        }
    }

    /// A workflow tick began.
    #[must_use]
    pub fn workflow_start(workflow_id: &str, session_id: &str) -> Self {
        Self::new(
            EventKind::WorkflowStart,
            None,
            format!("workflow {workflow_id} started"),
            json!({ "workflow_id": workflow_id, "session_id": session_id }),
        )
    }

    /// The tick finished; carries the total duration.
    #[must_use]
    pub fn workflow_end(duration_ms: u64) -> Self {
        Self::new(
            EventKind::WorkflowEnd,
            None,
            format!("workflow finished in {duration_ms}ms"),
            json!({ "duration_ms": duration_ms }),
        )
    }

    /// The executor is about to invoke a node.
    #[must_use]
    pub fn node_enter(node: NodeKind) -> Self {
        Self::new(
            EventKind::NodeEnter,
            Some(node),
            format!("entering {node}"),
            Value::Null,
        )
    }

    /// A node returned; carries its duration and the patch's field names.
    #[must_use]
    pub fn node_exit(node: NodeKind, duration_ms: u64, updated_fields: &[&str]) -> Self {
        Self::new(
            EventKind::NodeExit,
            Some(node),
            format!("{node} finished in {duration_ms}ms"),
            json!({ "duration_ms": duration_ms, "updated_fields": updated_fields }),
        )
    }

    /// A node reported a recoverable failure (surfaced as state, not raised).
    #[must_use]
    pub fn node_error(node: NodeKind, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(
            EventKind::NodeError,
            Some(node),
            format!("{node}: {message}"),
            json!({ "error": message }),
        )
    }

    /// The router took an edge; carries `"from -> to"` and the condition
    /// label that selected it.
    #[must_use]
    pub fn edge_transition(from: &str, to: &str, condition: Option<&str>) -> Self {
        Self::new(
            EventKind::EdgeTransition,
            None,
            format!("{from} -> {to}"),
            json!({ "from": from, "to": to, "condition": condition }),
        )
    }

    /// A node's patch was merged into the session state.
    #[must_use]
    pub fn state_update(node: NodeKind, updated_fields: &[&str], patch: Value) -> Self {
        Self::new(
            EventKind::StateUpdate,
            Some(node),
            format!("{node} updated [{}]", updated_fields.join(", ")),
            json!({ "updated_fields": updated_fields, "patch": patch }),
        )
    }

    /// A guard condition was evaluated.
    #[must_use]
    pub fn condition_check(
        node: Option<NodeKind>,
        name: &str,
        result: bool,
        detail: impl Into<String>,
    ) -> Self {
        let detail = detail.into();
        Self::new(
            EventKind::ConditionCheck,
            node,
            format!("{name} = {result}"),
            json!({ "condition": name, "result": result, "detail": detail }),
        )
    }

    /// The tick failed outside a node's error-patch convention.
    #[must_use]
    pub fn workflow_error(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(
            EventKind::WorkflowError,
            None,
            message.clone(),
            json!({ "error": message }),
        )
    }

    /// The duration payload, for `WORKFLOW_END` and `NODE_EXIT` events.
    #[must_use]
    pub fn duration_ms(&self) -> Option<u64> {
        self.data.get("duration_ms").and_then(Value::as_u64)
    }

    /// Returns `true` for the error-bearing kinds.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self.kind, EventKind::NodeError | EventKind::WorkflowError)
    }
}

impl fmt::Display for WorkflowEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node {
            Some(node) => write!(f, "[{}] [{}] {}", self.kind, node, self.message),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_extraction() {
        assert_eq!(WorkflowEvent::workflow_end(42).duration_ms(), Some(42));
        assert_eq!(
            WorkflowEvent::node_exit(NodeKind::GenerateSummary, 7, &[]).duration_ms(),
            Some(7)
        );
        assert_eq!(WorkflowEvent::node_enter(NodeKind::GenerateSummary).duration_ms(), None);
    }

    #[test]
    fn error_kinds_are_flagged() {
        assert!(WorkflowEvent::node_error(NodeKind::ProcessUserTurn, "boom").is_error());
        assert!(WorkflowEvent::workflow_error("boom").is_error());
        assert!(!WorkflowEvent::workflow_end(1).is_error());
    }

    #[test]
    fn edge_transition_message_shape() {
        let event = WorkflowEvent::edge_transition("start", "generate_summary", Some("brainstorm_done"));
        assert_eq!(event.message, "start -> generate_summary");
        assert_eq!(event.data["condition"], "brainstorm_done");
    }

    #[test]
    fn display_includes_kind_and_node() {
        let event = WorkflowEvent::node_enter(NodeKind::ProcessVoiceInput);
        let rendered = event.to_string();
        assert!(rendered.contains("NODE_ENTER"));
        assert!(rendered.contains("process_voice_input"));
    }

    #[test]
    fn serialization_round_trip() {
        let event = WorkflowEvent::state_update(
            NodeKind::ProcessUserTurn,
            &["messages", "error"],
            serde_json::json!({"is_processing": false}),
        );
        let json = serde_json::to_string(&event).unwrap();
        let parsed: WorkflowEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, parsed);
    }
}
