//! The built-in workflow nodes.
//!
//! Three nodes cover the staged idea-development flow:
//!
//! - [`ProcessUserTurnNode`]: welcome message on an empty history, or an
//!   assistant reply to the latest user message
//! - [`ProcessVoiceInputNode`]: transcribes pending voice input into a user
//!   message
//! - [`GenerateSummaryNode`]: condenses the brainstorm and advances the
//!   session to the summary stage
//!
//! Every node follows the same conventions: guards are re-checked inside
//! the node (returning an empty patch when they fail, so a misrouted tick is
//! a no-op rather than a crash), and capability failures become
//! `{is_processing: false, error}` patches.

pub mod summary;
pub mod turn;
pub mod voice;

pub use summary::GenerateSummaryNode;
pub use turn::{ProcessUserTurnNode, WELCOME_MESSAGE};
pub use voice::ProcessVoiceInputNode;
