//! Core identifier types for the ideaforge workflow engine.
//!
//! This module defines the fundamental enums used throughout the system to
//! identify workflow phases, user triggers, and processing nodes. These are
//! the core domain concepts that define what a session *is*.
//!
//! # Key Types
//!
//! - [`Stage`]: The macro phase of the idea-development workflow
//! - [`UserAction`]: The last user trigger that drives routing
//! - [`NodeKind`]: Identifies the processing node selected by the router
//! - [`Route`]: The router's verdict for one tick
//!
//! # Examples
//!
//! ```rust
//! use ideaforge::types::{NodeKind, Stage, UserAction};
//!
//! let stage = Stage::Brainstorm;
//! assert_eq!(stage.as_str(), "brainstorm");
//! assert_eq!(stage.next(), Some(Stage::Summary));
//!
//! let action = UserAction::BrainstormDone;
//! assert_eq!(action.as_str(), "Brainstorm Done");
//!
//! let node = NodeKind::ProcessUserTurn;
//! assert_eq!(node.to_string(), "process_user_turn");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The macro phase of the idea-development workflow.
///
/// A session starts in [`Stage::Brainstorm`] and advances monotonically
/// through [`Stage::Summary`] to [`Stage::Prd`] under normal operation.
/// Nothing in the engine forbids external callers from setting the stage
/// directly; the validator checks membership only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Open-ended idea exploration with the assistant.
    Brainstorm,
    /// Condensed recap of the brainstorm conversation.
    Summary,
    /// Product requirements document derived from the summary.
    Prd,
}

impl Stage {
    /// All stages in workflow order.
    pub const ALL: [Stage; 3] = [Stage::Brainstorm, Stage::Summary, Stage::Prd];

    /// The canonical string form, matching the serialized representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Brainstorm => "brainstorm",
            Stage::Summary => "summary",
            Stage::Prd => "prd",
        }
    }

    /// The stage that follows this one, or `None` from [`Stage::Prd`].
    #[must_use]
    pub fn next(&self) -> Option<Stage> {
        match self {
            Stage::Brainstorm => Some(Stage::Summary),
            Stage::Summary => Some(Stage::Prd),
            Stage::Prd => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "brainstorm" => Ok(Stage::Brainstorm),
            "summary" => Ok(Stage::Summary),
            "prd" => Ok(Stage::Prd),
            other => Err(format!("unknown stage: {other:?}")),
        }
    }
}

/// The last user trigger on a session, consulted by the router on every tick.
///
/// The string forms mirror the labels the UI sends over the transport
/// boundary ("Brainstorm Done" is literally the button label).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserAction {
    /// A plain chat turn (typed text or transcribed voice).
    #[serde(rename = "chat")]
    Chat,
    /// The user finished brainstorming and asked for a summary.
    #[serde(rename = "Brainstorm Done")]
    BrainstormDone,
    /// The user accepted the summary and asked for a PRD.
    #[serde(rename = "Summary Done")]
    SummaryDone,
    /// The user accepted the PRD; the workflow is complete.
    #[serde(rename = "PRD Done")]
    PrdDone,
}

impl UserAction {
    /// All actions the engine recognises.
    pub const ALL: [UserAction; 4] = [
        UserAction::Chat,
        UserAction::BrainstormDone,
        UserAction::SummaryDone,
        UserAction::PrdDone,
    ];

    /// The canonical string form, matching the serialized representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            UserAction::Chat => "chat",
            UserAction::BrainstormDone => "Brainstorm Done",
            UserAction::SummaryDone => "Summary Done",
            UserAction::PrdDone => "PRD Done",
        }
    }
}

impl fmt::Display for UserAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chat" => Ok(UserAction::Chat),
            "Brainstorm Done" => Ok(UserAction::BrainstormDone),
            "Summary Done" => Ok(UserAction::SummaryDone),
            "PRD Done" => Ok(UserAction::PrdDone),
            other => Err(format!("unknown user action: {other:?}")),
        }
    }
}

/// Identifies a processing node within the workflow.
///
/// Each variant corresponds to one registered [`Node`](crate::node::Node)
/// implementation; the router selects at most one per tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Reacts to a chat turn: welcome message or assistant reply.
    ProcessUserTurn,
    /// Transcribes pending voice input into a user message.
    ProcessVoiceInput,
    /// Produces the brainstorm summary and advances the stage.
    GenerateSummary,
}

impl NodeKind {
    /// The canonical string form used in telemetry and logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::ProcessUserTurn => "process_user_turn",
            NodeKind::ProcessVoiceInput => "process_voice_input",
            NodeKind::GenerateSummary => "generate_summary",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The router's verdict for one tick: run a node, or nothing to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    /// Execute the named node this tick.
    To(NodeKind),
    /// No rule matched; the tick completes without running a node.
    Done,
}

impl Route {
    /// Returns `true` if this route terminates the tick without a node run.
    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self, Route::Done)
    }

    /// The selected node, if any.
    #[must_use]
    pub fn node(&self) -> Option<NodeKind> {
        match self {
            Route::To(kind) => Some(*kind),
            Route::Done => None,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::To(kind) => write!(f, "{kind}"),
            Route::Done => f.write_str("end"),
        }
    }
}
