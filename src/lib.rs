//! # Ideaforge: Staged Idea-Development Workflow Engine
//!
//! Ideaforge is the core of a chat application that walks a user through a
//! staged idea-development workflow (brainstorm, then summary, then PRD) with
//! voice input transcribed to text and orchestration performed by a small
//! graph-based engine that advances one "tick" at a time.
//!
//! ## Core Concepts
//!
//! - **Session state**: the canonical, serializable conversation record
//! - **Nodes**: async units of workflow logic mapping state to a sparse patch
//! - **Router**: a pure, deterministic function choosing the next node
//! - **Executor**: one validated, observed, merged node invocation per tick
//! - **Event log**: structured per-execution telemetry with derived views
//! - **Service**: the request/response boundary the UI process calls
//!
//! ## Quick Start
//!
//! ```rust
//! use ideaforge::capabilities::Capabilities;
//! use ideaforge::runtime_config::RuntimeConfig;
//! use ideaforge::service::WorkflowService;
//! use ideaforge::types::Stage;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let service = WorkflowService::new(RuntimeConfig::default(), Capabilities::placeholder());
//!
//! // Cold start: create the session, then tick once for the welcome message.
//! let state = service.create_session("sess_1", None).into_result().unwrap();
//! let state = service.execute(state).await.into_result().unwrap();
//! assert_eq!(state.messages.len(), 1);
//! assert_eq!(state.stage, Stage::Brainstorm);
//!
//! // Always feed the previous tick's returned state into the next call.
//! let state = service.execute(state).await.into_result().unwrap();
//! assert_eq!(state.messages.len(), 1); // assistant-terminated history: no-op
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Two deliberately different paths:
//!
//! - **Validation failures** ([`validator::ValidationError`]) always raise
//!   to the caller, never logged-and-swallowed.
//! - **Capability failures** (generation, summarization, transcription) are
//!   recovered *into state*: the node returns an
//!   `{is_processing: false, error}` patch, so the conversation remains
//!   inspectable and resumable, and a reloaded UI can still show the error.
//!
//! ## Concurrency Model
//!
//! One logical owner per session: the caller awaits one tick's result
//! before issuing the next, with `is_processing` as the advisory lock.
//! Different sessions are fully independent and may tick concurrently; the
//! session registry is the only shared mutable resource.
//!
//! ## Module Guide
//!
//! - [`types`] - Stage, user-action, node, and route identifiers
//! - [`message`] - Conversation messages and role typing
//! - [`state`] - Session state, voice descriptors, and patches
//! - [`validator`] - Structural invariant checks
//! - [`capabilities`] - Injected generation/summarization/transcription traits
//! - [`node`] / [`nodes`] - Node trait and the three built-in nodes
//! - [`router`] - Deterministic next-node selection
//! - [`executor`] - Single-tick execution
//! - [`event_log`] - Structured telemetry, sinks, and the event bus
//! - [`telemetry`] - Formatting and tracing bootstrap
//! - [`registry`] - Process-wide session registry
//! - [`service`] - The transport boundary and retry wrapper
//! - [`runtime_config`] - Configuration with environment overrides

pub mod capabilities;
pub mod event_log;
pub mod executor;
pub mod message;
pub mod node;
pub mod nodes;
pub mod registry;
pub mod router;
pub mod runtime_config;
pub mod service;
pub mod state;
pub mod telemetry;
pub mod types;
pub mod utils;
pub mod validator;
