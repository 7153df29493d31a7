//! Chat-turn processing: welcome messages and assistant replies.

use async_trait::async_trait;

use crate::capabilities::{Capabilities, TurnRequest};
use crate::message::{Message, Role};
use crate::node::{Node, NodeContext, NodeError};
use crate::state::{SessionState, StatePatch};
use crate::types::UserAction;

/// The synthetic assistant greeting appended to a brand-new session.
pub const WELCOME_MESSAGE: &str =
    "Welcome! Tell me about the idea you'd like to develop, and we'll shape it together.";

/// Reacts to a plain chat trigger.
///
/// Behavior by history shape:
///
/// - empty history: appends the welcome message (once; a second tick sees
///   an assistant-terminated history and becomes a no-op)
/// - latest message from the user: delegates to the injected turn generator
///   for the current stage and appends its reply
/// - latest message from the assistant: nothing to react to; clears
///   `is_processing` and leaves the history untouched
///
/// A generation failure becomes an error patch; no exception escapes.
pub struct ProcessUserTurnNode {
    capabilities: Capabilities,
}

impl ProcessUserTurnNode {
    /// Creates the node with its injected capability set.
    #[must_use]
    pub fn new(capabilities: Capabilities) -> Self {
        Self { capabilities }
    }
}

#[async_trait]
impl Node for ProcessUserTurnNode {
    async fn run(&self, state: &SessionState, ctx: NodeContext) -> Result<StatePatch, NodeError> {
        if !ctx.condition(
            "last_user_action_is_chat",
            state.last_user_action == UserAction::Chat,
            state.last_user_action.as_str(),
        ) {
            return Ok(StatePatch::new());
        }
        if !ctx.condition("not_processing", !state.is_processing, "") {
            // Another tick is (advisorily) in flight; leave everything alone.
            return Ok(StatePatch::new());
        }

        if state.messages.is_empty() {
            ctx.condition("history_empty", true, "appending welcome message");
            return Ok(StatePatch::new()
                .with_messages(vec![Message::assistant(WELCOME_MESSAGE, state.stage)])
                .with_is_processing(false));
        }

        if !ctx.condition(
            "latest_message_from_user",
            state.last_message_is(Role::User),
            "",
        ) {
            // Assistant-terminated history: nothing new to react to.
            return Ok(StatePatch::new().with_is_processing(false));
        }

        let request = TurnRequest {
            stage: state.stage,
            prompt: state.prompt_for(state.stage),
            model: state.model_for(state.stage),
            messages: &state.messages,
        };

        match self.capabilities.turns.reply(request).await {
            Ok(reply) => Ok(StatePatch::new()
                .with_messages(vec![Message::assistant(reply, state.stage)])
                .with_clear_error()
                .with_last_user_action(UserAction::Chat)
                .with_is_processing(false)),
            Err(err) => {
                let message = err.to_string();
                ctx.record_error(&message);
                Ok(StatePatch::error_patch(message))
            }
        }
    }
}
