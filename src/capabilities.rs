//! Injected collaborator capabilities consumed by workflow nodes.
//!
//! The engine never talks to a chat-completion or speech-to-text service
//! directly. Nodes delegate to the traits in this module, and the hosting
//! process decides what stands behind them: a real provider client, or the
//! placeholder implementations shipped here.
//!
//! A capability failure is *not* an engine failure: nodes convert it into an
//! error patch on the session state so the conversation stays inspectable
//! and resumable.
//!
//! # Examples
//!
//! ```rust
//! use ideaforge::capabilities::Capabilities;
//!
//! // The placeholder set: canned replies, a bullet summarizer, and a
//! // transcriber that reports itself unconfigured.
//! let caps = Capabilities::placeholder();
//! ```

use async_trait::async_trait;
use miette::Diagnostic;
use std::sync::Arc;
use thiserror::Error;

use crate::message::{Message, Role};
use crate::state::VoiceAudioData;
use crate::types::Stage;

/// Failure reported by an external capability.
#[derive(Debug, Error, Diagnostic)]
#[error("capability error ({provider}): {message}")]
#[diagnostic(code(ideaforge::capability::provider))]
pub struct CapabilityError {
    /// Short name of the failing collaborator ("turn generator",
    /// "summarizer", "transcriber", or a concrete backend name).
    pub provider: &'static str,
    /// Human-readable failure description, surfaced on the session state.
    pub message: String,
}

impl CapabilityError {
    /// Creates a new capability error.
    #[must_use]
    pub fn new(provider: &'static str, message: impl Into<String>) -> Self {
        Self {
            provider,
            message: message.into(),
        }
    }
}

/// Everything a turn generator needs to produce an assistant reply.
#[derive(Debug)]
pub struct TurnRequest<'a> {
    /// The stage the session is in.
    pub stage: Stage,
    /// The steering prompt configured for that stage, if any.
    pub prompt: Option<&'a str>,
    /// The model identifier configured for that stage.
    pub model: &'a str,
    /// The full conversation so far, latest message last.
    pub messages: &'a [Message],
}

/// Produces an assistant reply to the latest user message.
#[async_trait]
pub trait TurnGenerator: Send + Sync {
    async fn reply(&self, request: TurnRequest<'_>) -> Result<String, CapabilityError>;
}

/// Condenses a conversation into a stage summary.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(
        &self,
        messages: &[Message],
        prompt: Option<&str>,
        model: &str,
    ) -> Result<String, CapabilityError>;
}

/// Turns recorded audio into transcript text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &VoiceAudioData) -> Result<String, CapabilityError>;
}

/// The capability set injected into the built-in nodes at construction.
#[derive(Clone)]
pub struct Capabilities {
    pub turns: Arc<dyn TurnGenerator>,
    pub summarizer: Arc<dyn Summarizer>,
    pub transcriber: Arc<dyn Transcriber>,
}

impl Capabilities {
    /// Assembles a capability set from concrete implementations.
    #[must_use]
    pub fn new(
        turns: Arc<dyn TurnGenerator>,
        summarizer: Arc<dyn Summarizer>,
        transcriber: Arc<dyn Transcriber>,
    ) -> Self {
        Self {
            turns,
            summarizer,
            transcriber,
        }
    }

    /// The placeholder set used until real providers are wired in:
    /// [`CannedTurnGenerator`], [`BulletSummarizer`], [`NullTranscriber`].
    #[must_use]
    pub fn placeholder() -> Self {
        Self::new(
            Arc::new(CannedTurnGenerator),
            Arc::new(BulletSummarizer),
            Arc::new(NullTranscriber),
        )
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities").finish_non_exhaustive()
    }
}

/// Placeholder turn generator producing a stage-appropriate canned reply.
///
/// Stands in for the chat-completion backend; the replies acknowledge the
/// latest user message so the conversation loop is exercisable end to end.
#[derive(Debug, Default)]
pub struct CannedTurnGenerator;

#[async_trait]
impl TurnGenerator for CannedTurnGenerator {
    async fn reply(&self, request: TurnRequest<'_>) -> Result<String, CapabilityError> {
        let latest = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map_or("your idea", |m| m.content.as_str());
        let reply = match request.stage {
            Stage::Brainstorm => format!(
                "Interesting. Tell me more about \"{latest}\": who would use it, and what \
                 problem does it solve for them?"
            ),
            Stage::Summary => format!(
                "Noted. I've folded \"{latest}\" into the running summary; say \"Summary Done\" \
                 when it looks right."
            ),
            Stage::Prd => format!(
                "Added \"{latest}\" to the requirements draft. Anything else before we finalize?"
            ),
        };
        Ok(reply)
    }
}

/// Placeholder summarizer that lists the user's brainstorm contributions.
#[derive(Debug, Default)]
pub struct BulletSummarizer;

#[async_trait]
impl Summarizer for BulletSummarizer {
    async fn summarize(
        &self,
        messages: &[Message],
        _prompt: Option<&str>,
        _model: &str,
    ) -> Result<String, CapabilityError> {
        let mut summary = String::from("Here is a summary of the brainstorm so far:\n");
        let mut any = false;
        for message in messages.iter().filter(|m| m.role == Role::User) {
            summary.push_str("- ");
            summary.push_str(&message.content);
            summary.push('\n');
            any = true;
        }
        if !any {
            summary.push_str("- (no user contributions recorded)\n");
        }
        summary.push_str("Review it and say \"Summary Done\" to move on to the PRD.");
        Ok(summary)
    }
}

/// Placeholder transcriber that reports itself unconfigured.
///
/// Real deployments replace this with a speech-to-text client; keeping the
/// failure inside the capability exercises the error-as-state path.
#[derive(Debug, Default)]
pub struct NullTranscriber;

#[async_trait]
impl Transcriber for NullTranscriber {
    async fn transcribe(&self, audio: &VoiceAudioData) -> Result<String, CapabilityError> {
        Err(CapabilityError::new(
            "transcriber",
            format!(
                "no transcription backend configured (audio at {}, {} bytes)",
                audio.path, audio.byte_size
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn audio() -> VoiceAudioData {
        VoiceAudioData {
            path: "/tmp/clip.webm".to_string(),
            duration_secs: 1.0,
            mime_type: "audio/webm".to_string(),
            byte_size: 512,
            recorded_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn canned_generator_echoes_latest_user_message() {
        let messages = vec![
            Message::user("an app for plant care", Stage::Brainstorm),
            Message::assistant("go on", Stage::Brainstorm),
            Message::user("it reminds you to water", Stage::Brainstorm),
        ];
        let reply = CannedTurnGenerator
            .reply(TurnRequest {
                stage: Stage::Brainstorm,
                prompt: None,
                model: "test-model",
                messages: &messages,
            })
            .await
            .unwrap();
        assert!(reply.contains("it reminds you to water"));
    }

    #[tokio::test]
    async fn bullet_summarizer_lists_user_messages() {
        let messages = vec![
            Message::user("first thought", Stage::Brainstorm),
            Message::assistant("noted", Stage::Brainstorm),
            Message::user("second thought", Stage::Brainstorm),
        ];
        let summary = BulletSummarizer
            .summarize(&messages, None, "test-model")
            .await
            .unwrap();
        assert!(summary.contains("- first thought"));
        assert!(summary.contains("- second thought"));
        assert!(!summary.contains("- noted"));
    }

    #[tokio::test]
    async fn null_transcriber_fails_with_provider_context() {
        let err = NullTranscriber.transcribe(&audio()).await.unwrap_err();
        assert_eq!(err.provider, "transcriber");
        assert!(err.to_string().contains("no transcription backend"));
    }
}
