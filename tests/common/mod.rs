//! Shared fakes and fixtures for integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use ideaforge::capabilities::{
    Capabilities, CapabilityError, Summarizer, Transcriber, TurnGenerator, TurnRequest,
};
use ideaforge::message::Message;
use ideaforge::state::VoiceAudioData;

/// Turn generator that always returns the same reply and counts calls.
pub struct ScriptedTurnGenerator {
    reply: String,
    pub calls: Arc<AtomicUsize>,
}

impl ScriptedTurnGenerator {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl TurnGenerator for ScriptedTurnGenerator {
    async fn reply(&self, _request: TurnRequest<'_>) -> Result<String, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}

/// Turn generator that always fails.
pub struct FailingTurnGenerator {
    message: String,
}

impl FailingTurnGenerator {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl TurnGenerator for FailingTurnGenerator {
    async fn reply(&self, _request: TurnRequest<'_>) -> Result<String, CapabilityError> {
        Err(CapabilityError::new("turn generator", self.message.clone()))
    }
}

/// Summarizer that returns a fixed summary.
pub struct ScriptedSummarizer {
    summary: String,
}

impl ScriptedSummarizer {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
        }
    }
}

#[async_trait]
impl Summarizer for ScriptedSummarizer {
    async fn summarize(
        &self,
        _messages: &[Message],
        _prompt: Option<&str>,
        _model: &str,
    ) -> Result<String, CapabilityError> {
        Ok(self.summary.clone())
    }
}

/// Summarizer that always fails.
pub struct FailingSummarizer;

#[async_trait]
impl Summarizer for FailingSummarizer {
    async fn summarize(
        &self,
        _messages: &[Message],
        _prompt: Option<&str>,
        _model: &str,
    ) -> Result<String, CapabilityError> {
        Err(CapabilityError::new("summarizer", "summary backend down"))
    }
}

/// Transcriber that returns a fixed transcript.
pub struct FixedTranscriber {
    transcript: String,
}

impl FixedTranscriber {
    pub fn new(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
        }
    }
}

#[async_trait]
impl Transcriber for FixedTranscriber {
    async fn transcribe(&self, _audio: &VoiceAudioData) -> Result<String, CapabilityError> {
        Ok(self.transcript.clone())
    }
}

/// Transcriber that always fails.
pub struct FailingTranscriber;

#[async_trait]
impl Transcriber for FailingTranscriber {
    async fn transcribe(&self, _audio: &VoiceAudioData) -> Result<String, CapabilityError> {
        Err(CapabilityError::new("transcriber", "speech service timed out"))
    }
}

/// A capability set with scripted success paths everywhere.
pub fn scripted_capabilities(reply: &str, summary: &str, transcript: &str) -> Capabilities {
    Capabilities::new(
        Arc::new(ScriptedTurnGenerator::new(reply)),
        Arc::new(ScriptedSummarizer::new(summary)),
        Arc::new(FixedTranscriber::new(transcript)),
    )
}

/// A sample pending-voice descriptor.
pub fn sample_audio() -> VoiceAudioData {
    VoiceAudioData {
        path: "/tmp/recording_7.webm".to_string(),
        duration_secs: 3.5,
        mime_type: "audio/webm".to_string(),
        byte_size: 24_576,
        recorded_at: Utc::now(),
    }
}
