//! Structured execution telemetry: events, the per-tick logger, and fan-out.
//!
//! The module is organised around three pieces:
//!
//! - [`WorkflowEvent`]/[`EventKind`]: what gets recorded
//! - [`WorkflowLogger`]: the append-only per-execution recorder with derived
//!   views ([`ExecutionSummary`], [`NodeTimelineEntry`], [`LogExport`])
//! - [`EventBus`] + [`EventSink`] implementations for streaming events to
//!   stdout, memory (tests), or async consumers
//!
//! Telemetry has no control-flow authority: the executor and nodes push
//! events; nothing here decides what runs.

pub mod bus;
pub mod event;
pub mod logger;
pub mod sink;

pub use bus::EventBus;
pub use event::{EventKind, WorkflowEvent};
pub use logger::{ExecutionSummary, LogExport, NodeStats, NodeTimelineEntry, WorkflowLogger};
pub use sink::{ChannelSink, EventSink, MemorySink, StdOutSink};
