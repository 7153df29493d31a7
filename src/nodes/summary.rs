//! Brainstorm summarization and the stage transition it carries.

use async_trait::async_trait;

use crate::capabilities::Capabilities;
use crate::message::Message;
use crate::node::{Node, NodeContext, NodeError};
use crate::state::{SessionState, StatePatch};
use crate::types::{Stage, UserAction};

/// Condenses the brainstorm conversation and advances the session to
/// [`Stage::Summary`].
///
/// The summary message is tagged `stage_at_creation = summary` (it belongs
/// to the stage being entered, not the one being left), and the stage field
/// moves in the same patch, so the two can never be observed apart.
pub struct GenerateSummaryNode {
    capabilities: Capabilities,
}

impl GenerateSummaryNode {
    /// Creates the node with its injected capability set.
    #[must_use]
    pub fn new(capabilities: Capabilities) -> Self {
        Self { capabilities }
    }
}

#[async_trait]
impl Node for GenerateSummaryNode {
    async fn run(&self, state: &SessionState, ctx: NodeContext) -> Result<StatePatch, NodeError> {
        if !ctx.condition(
            "brainstorm_done_in_brainstorm",
            state.last_user_action == UserAction::BrainstormDone && state.stage == Stage::Brainstorm,
            format!("action={}, stage={}", state.last_user_action, state.stage),
        ) {
            return Ok(StatePatch::new());
        }
        if !ctx.condition("not_processing", !state.is_processing, "") {
            return Ok(StatePatch::new());
        }
        if !ctx.condition("no_existing_error", !state.has_error(), "") {
            return Ok(StatePatch::new());
        }

        let result = self
            .capabilities
            .summarizer
            .summarize(
                &state.messages,
                state.prompt_for(Stage::Summary),
                state.model_for(Stage::Summary),
            )
            .await;

        match result {
            Ok(summary) => Ok(StatePatch::new()
                .with_messages(vec![Message::assistant(summary, Stage::Summary)])
                .with_stage(Stage::Summary)
                .with_clear_error()
                .with_is_processing(false)),
            Err(err) => {
                let message = err.to_string();
                ctx.record_error(&message);
                Ok(StatePatch::error_patch(message))
            }
        }
    }
}
