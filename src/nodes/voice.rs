//! Voice-input transcription into a user chat message.

use async_trait::async_trait;

use crate::capabilities::Capabilities;
use crate::message::Message;
use crate::node::{Node, NodeContext, NodeError};
use crate::state::{SessionState, StatePatch};
use crate::types::UserAction;

/// Turns pending voice input into a user message via the injected
/// transcriber.
///
/// On success the transcript is appended as a user message (so the next
/// tick's `process_user_turn` replies to it), the transcription is stored on
/// the session, and the pending flag is cleared. On failure the pending flag
/// is *also* cleared, so a bad recording is consumed rather than retried
/// forever, and the failure becomes an error patch.
pub struct ProcessVoiceInputNode {
    capabilities: Capabilities,
}

impl ProcessVoiceInputNode {
    /// Creates the node with its injected capability set.
    #[must_use]
    pub fn new(capabilities: Capabilities) -> Self {
        Self { capabilities }
    }
}

#[async_trait]
impl Node for ProcessVoiceInputNode {
    async fn run(&self, state: &SessionState, ctx: NodeContext) -> Result<StatePatch, NodeError> {
        if !ctx.condition(
            "last_user_action_is_chat",
            state.last_user_action == UserAction::Chat,
            state.last_user_action.as_str(),
        ) {
            return Ok(StatePatch::new());
        }
        if !ctx.condition("not_processing", !state.is_processing, "") {
            return Ok(StatePatch::new());
        }
        if !ctx.condition("no_existing_error", !state.has_error(), "") {
            return Ok(StatePatch::new());
        }

        // The router only selects this node when audio is pending; missing
        // audio here is an orchestration bug, not a conversation error.
        let audio = state
            .voice_audio_data
            .as_ref()
            .ok_or(NodeError::MissingInput {
                what: "voice_audio_data",
            })?;

        match self.capabilities.transcriber.transcribe(audio).await {
            Ok(transcript) => Ok(StatePatch::new()
                .with_messages(vec![Message::user(transcript.clone(), state.stage)])
                .with_voice_transcription(transcript)
                .with_voice_pending(false)
                .with_last_user_action(UserAction::Chat)
                .with_is_processing(false)),
            Err(err) => {
                let message = err.to_string();
                ctx.record_error(&message);
                Ok(StatePatch::error_patch(message).with_voice_pending(false))
            }
        }
    }
}
