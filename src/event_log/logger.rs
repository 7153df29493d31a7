//! Append-only event recorder scoped to one workflow execution.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::event::{EventKind, WorkflowEvent};
use crate::telemetry::{PlainFormatter, TelemetryFormatter};
use crate::types::NodeKind;

/// Aggregate statistics for one node across an execution.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeStats {
    /// How many times the node ran.
    pub count: u64,
    /// Mean node duration in milliseconds.
    pub avg_duration_ms: f64,
}

/// Roll-up of one workflow execution, derived from the recorded events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    /// The execution this summary describes.
    pub workflow_id: String,
    /// The session the execution ran against.
    pub session_id: String,
    /// Total number of recorded events.
    pub event_count: usize,
    /// Number of `NODE_ERROR`/`WORKFLOW_ERROR` events.
    pub error_count: usize,
    /// Per-node run counts and mean durations.
    pub node_stats: FxHashMap<NodeKind, NodeStats>,
    /// Number of `STATE_UPDATE` events.
    pub state_update_count: usize,
    /// Total duration from `WORKFLOW_END`, when the tick completed.
    pub total_duration_ms: Option<u64>,
}

/// One node invocation in the execution timeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeTimelineEntry {
    /// The node that ran.
    pub node: NodeKind,
    /// When the executor entered the node.
    pub entered_at: DateTime<Utc>,
    /// When the node returned, if it did.
    pub exited_at: Option<DateTime<Utc>>,
    /// Node duration in milliseconds, if it returned.
    pub duration_ms: Option<u64>,
}

/// Serializable snapshot of a full execution log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogExport {
    /// The execution this export describes.
    pub workflow_id: String,
    /// The session the execution ran against.
    pub session_id: String,
    /// When the logger was created.
    pub started_at: DateTime<Utc>,
    /// Every recorded event, in order.
    pub events: Vec<WorkflowEvent>,
    /// Derived roll-up.
    pub summary: ExecutionSummary,
    /// Derived node timeline.
    pub timeline: Vec<NodeTimelineEntry>,
}

/// Append-only event log for a single workflow execution.
///
/// The logger has no control-flow authority: it only observes events pushed
/// to it by the executor, the router bookkeeping, and node guard checks. It
/// optionally forwards every event to an [`EventBus`](super::EventBus)
/// sender so sinks see the stream live, and in debug mode mirrors a
/// human-readable summary through `tracing` after `WORKFLOW_END`.
///
/// # Examples
///
/// ```rust
/// use ideaforge::event_log::{EventKind, WorkflowEvent, WorkflowLogger};
/// use ideaforge::types::NodeKind;
///
/// let logger = WorkflowLogger::new("run_1", "sess_1");
/// logger.record(WorkflowEvent::workflow_start("run_1", "sess_1"));
/// logger.record(WorkflowEvent::node_enter(NodeKind::ProcessUserTurn));
/// logger.record(WorkflowEvent::node_exit(NodeKind::ProcessUserTurn, 3, &["messages"]));
///
/// assert_eq!(logger.events_by_kind(EventKind::NodeEnter).len(), 1);
/// let summary = logger.execution_summary();
/// assert_eq!(summary.node_stats[&NodeKind::ProcessUserTurn].count, 1);
/// ```
pub struct WorkflowLogger {
    workflow_id: String,
    session_id: String,
    started_at: DateTime<Utc>,
    debug: bool,
    events: Mutex<Vec<WorkflowEvent>>,
    sender: Option<flume::Sender<WorkflowEvent>>,
}

impl WorkflowLogger {
    /// Creates a logger for one execution of one session.
    #[must_use]
    pub fn new(workflow_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            session_id: session_id.into(),
            started_at: Utc::now(),
            debug: false,
            events: Mutex::new(Vec::new()),
            sender: None,
        }
    }

    /// Forwards every recorded event to an event-bus sender.
    #[must_use]
    pub fn with_sender(mut self, sender: flume::Sender<WorkflowEvent>) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Enables the human-readable summary mirror after `WORKFLOW_END`.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// The execution id this logger is scoped to.
    #[must_use]
    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    /// The session id this logger is scoped to.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Appends an event and forwards it to the bus, if one is attached.
    pub fn record(&self, event: WorkflowEvent) {
        if let Some(sender) = &self.sender {
            if sender.send(event.clone()).is_err() {
                tracing::warn!(
                    workflow = %self.workflow_id,
                    "event bus receiver dropped; continuing without forwarding"
                );
            }
        }
        self.events.lock().push(event);
    }

    /// Records `WORKFLOW_END` and, in debug mode, mirrors a human-readable
    /// summary through `tracing`.
    pub fn finish(&self, duration_ms: u64) {
        self.record(WorkflowEvent::workflow_end(duration_ms));
        if self.debug {
            let rendered = PlainFormatter::plain().render_summary(&self.execution_summary());
            tracing::debug!(target: "ideaforge::event_log", "{rendered}");
        }
    }

    /// All recorded events, in order.
    #[must_use]
    pub fn events(&self) -> Vec<WorkflowEvent> {
        self.events.lock().clone()
    }

    /// Every recorded event of the given kind, in order.
    #[must_use]
    pub fn events_by_kind(&self, kind: EventKind) -> Vec<WorkflowEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    /// Derives the execution roll-up from the recorded events.
    #[must_use]
    pub fn execution_summary(&self) -> ExecutionSummary {
        let events = self.events.lock();
        let mut node_stats: FxHashMap<NodeKind, NodeStats> = FxHashMap::default();
        let mut state_update_count = 0;
        let mut error_count = 0;
        let mut total_duration_ms = None;

        for event in events.iter() {
            match event.kind {
                EventKind::NodeExit => {
                    if let Some(node) = event.node {
                        let duration = event.duration_ms().unwrap_or(0) as f64;
                        let stats = node_stats.entry(node).or_default();
                        let total = stats.avg_duration_ms * stats.count as f64 + duration;
                        stats.count += 1;
                        stats.avg_duration_ms = total / stats.count as f64;
                    }
                }
                EventKind::StateUpdate => state_update_count += 1,
                EventKind::WorkflowEnd => total_duration_ms = event.duration_ms(),
                _ => {}
            }
            if event.is_error() {
                error_count += 1;
            }
        }

        ExecutionSummary {
            workflow_id: self.workflow_id.clone(),
            session_id: self.session_id.clone(),
            event_count: events.len(),
            error_count,
            node_stats,
            state_update_count,
            total_duration_ms,
        }
    }

    /// Derives the ordered node timeline from enter/exit pairs.
    #[must_use]
    pub fn node_timeline(&self) -> Vec<NodeTimelineEntry> {
        let events = self.events.lock();
        let mut timeline: Vec<NodeTimelineEntry> = Vec::new();

        for event in events.iter() {
            match event.kind {
                EventKind::NodeEnter => {
                    if let Some(node) = event.node {
                        timeline.push(NodeTimelineEntry {
                            node,
                            entered_at: event.when,
                            exited_at: None,
                            duration_ms: None,
                        });
                    }
                }
                EventKind::NodeExit => {
                    if let Some(entry) = timeline
                        .iter_mut()
                        .rev()
                        .find(|e| Some(e.node) == event.node && e.exited_at.is_none())
                    {
                        entry.exited_at = Some(event.when);
                        entry.duration_ms = event.duration_ms();
                    }
                }
                _ => {}
            }
        }

        timeline
    }

    /// Serializable snapshot of context, events, summary, and timeline.
    #[must_use]
    pub fn export(&self) -> LogExport {
        LogExport {
            workflow_id: self.workflow_id.clone(),
            session_id: self.session_id.clone(),
            started_at: self.started_at,
            events: self.events(),
            summary: self.execution_summary(),
            timeline: self.node_timeline(),
        }
    }
}

impl std::fmt::Debug for WorkflowLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowLogger")
            .field("workflow_id", &self.workflow_id)
            .field("session_id", &self.session_id)
            .field("event_count", &self.events.lock().len())
            .finish()
    }
}
