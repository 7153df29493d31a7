//! Session state: the canonical, serializable record of one conversation.
//!
//! This module provides the unit of truth for the workflow engine:
//!
//! - [`SessionState`]: everything the engine knows about one conversation
//! - [`VoiceAudioData`]: a pending voice-input descriptor
//! - [`StatePatch`]: the sparse update a node returns, merged by the executor
//! - [`SessionDefaults`]: per-stage prompt and model defaults for new sessions
//!
//! State is mutated exclusively through [`SessionState::apply`], which the
//! executor calls with the patch a node produced. Applying a patch always
//! refreshes `updated_at`; patch fields win over existing values and
//! `messages` are appended in order.
//!
//! # Examples
//!
//! ```rust
//! use ideaforge::message::Message;
//! use ideaforge::state::{SessionState, StatePatch};
//! use ideaforge::types::Stage;
//!
//! let mut state = SessionState::new("sess_1", Some("user_7"));
//! assert_eq!(state.stage, Stage::Brainstorm);
//! assert!(state.messages.is_empty());
//!
//! let patch = StatePatch::new()
//!     .with_messages(vec![Message::assistant("Welcome!", Stage::Brainstorm)])
//!     .with_is_processing(false);
//! state.apply(patch);
//! assert_eq!(state.messages.len(), 1);
//! ```

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::message::{Message, Role};
use crate::types::{Stage, UserAction};
use crate::utils::collections::new_stage_map;

/// Descriptor for voice input awaiting transcription.
///
/// The UI records audio to a file and attaches this descriptor via
/// [`SessionState::attach_voice`]; the transcription capability receives it
/// verbatim.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VoiceAudioData {
    /// Filesystem path to the recorded audio.
    pub path: String,
    /// Recording length in seconds.
    pub duration_secs: f64,
    /// MIME type of the recording (e.g. `audio/webm`).
    pub mime_type: String,
    /// Size of the recording in bytes.
    pub byte_size: u64,
    /// When the recording finished.
    pub recorded_at: DateTime<Utc>,
}

/// Per-stage prompt and model defaults applied to freshly created sessions.
///
/// The built-in defaults cover all three stages;
/// [`RuntimeConfig`](crate::runtime_config::RuntimeConfig) can override the
/// model identifiers from the environment.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionDefaults {
    /// Instruction string used to steer generation, per stage.
    pub user_prompts: FxHashMap<Stage, String>,
    /// Model identifier used for generation, per stage.
    pub selected_models: FxHashMap<Stage, String>,
}

impl SessionDefaults {
    /// Fallback model identifier when no override is configured.
    pub const DEFAULT_MODEL: &'static str = "gpt-4o-mini";

    /// Replaces the model for one stage.
    #[must_use]
    pub fn with_model(mut self, stage: Stage, model: impl Into<String>) -> Self {
        self.selected_models.insert(stage, model.into());
        self
    }

    /// Replaces the prompt for one stage.
    #[must_use]
    pub fn with_prompt(mut self, stage: Stage, prompt: impl Into<String>) -> Self {
        self.user_prompts.insert(stage, prompt.into());
        self
    }
}

impl Default for SessionDefaults {
    fn default() -> Self {
        let mut user_prompts = new_stage_map();
        user_prompts.insert(
            Stage::Brainstorm,
            "You are a creative partner helping the user explore and sharpen a product idea. \
             Ask probing questions and suggest concrete directions."
                .to_string(),
        );
        user_prompts.insert(
            Stage::Summary,
            "Condense the brainstorm conversation into a concise summary of the idea, \
             its audience, and its core value."
                .to_string(),
        );
        user_prompts.insert(
            Stage::Prd,
            "Write a structured product requirements document based on the summarized idea."
                .to_string(),
        );

        let mut selected_models = new_stage_map();
        for stage in Stage::ALL {
            selected_models.insert(stage, Self::DEFAULT_MODEL.to_string());
        }

        Self {
            user_prompts,
            selected_models,
        }
    }
}

/// The canonical, serializable record of one conversation/workflow.
///
/// One `SessionState` exists per session id, owned by the
/// [`SessionRegistry`](crate::registry::SessionRegistry) and advanced one
/// tick at a time by the [`WorkflowExecutor`](crate::executor::WorkflowExecutor).
///
/// `is_processing` is the advisory per-session lock: while it is `true` the
/// caller must not start another tick for the same session. Different
/// sessions are fully independent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Opaque unique identifier, assigned at creation, immutable.
    pub session_id: String,
    /// Owning user, if known. Immutable after creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Display title, mutable via rename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Current workflow phase.
    pub stage: Stage,
    /// The trigger that determines routing on the next tick.
    pub last_user_action: UserAction,
    /// Conversation history, append-only in normal flow; order is
    /// conversation order.
    pub messages: Vec<Message>,
    /// Instruction string per stage, used to steer generation.
    pub user_prompts: FxHashMap<Stage, String>,
    /// Model identifier per stage.
    pub selected_models: FxHashMap<Stage, String>,
    /// Pending voice-input descriptor, replaced on every new recording.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_audio_data: Option<VoiceAudioData>,
    /// Transcript of the most recent voice input, once produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_transcription: Option<String>,
    /// `true` while `voice_audio_data` holds audio that has not been
    /// transcribed (or failed transcription) yet.
    #[serde(default)]
    pub voice_pending: bool,
    /// `true` while a tick is in flight for this session.
    #[serde(default)]
    pub is_processing: bool,
    /// Last error message, cleared at the start of the next successful tick.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// Refreshed on every accepted state update.
    pub updated_at: DateTime<Utc>,
}

impl SessionState {
    /// Creates a fresh session with built-in defaults.
    ///
    /// The new session starts at [`Stage::Brainstorm`] with
    /// [`UserAction::Chat`], an empty history, and no error.
    #[must_use]
    pub fn new(session_id: impl Into<String>, user_id: Option<&str>) -> Self {
        Self::with_defaults(session_id, user_id, &SessionDefaults::default())
    }

    /// Creates a fresh session using the given prompt/model defaults.
    #[must_use]
    pub fn with_defaults(
        session_id: impl Into<String>,
        user_id: Option<&str>,
        defaults: &SessionDefaults,
    ) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            user_id: user_id.map(str::to_string),
            title: None,
            stage: Stage::Brainstorm,
            last_user_action: UserAction::Chat,
            messages: Vec::new(),
            user_prompts: defaults.user_prompts.clone(),
            selected_models: defaults.selected_models.clone(),
            voice_audio_data: None,
            voice_transcription: None,
            voice_pending: false,
            is_processing: false,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Starts a builder for assembling a session in a specific shape,
    /// typically in tests.
    #[must_use]
    pub fn builder(session_id: impl Into<String>) -> SessionStateBuilder {
        SessionStateBuilder::new(session_id)
    }

    /// The most recent message, if any.
    #[must_use]
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Returns `true` if the latest message exists and has the given role.
    #[must_use]
    pub fn last_message_is(&self, role: Role) -> bool {
        self.last_message().is_some_and(|m| m.role == role)
    }

    /// Returns `true` if there is recorded audio awaiting transcription.
    ///
    /// The router consults this flag; it never infers pendingness from the
    /// mere presence of `voice_audio_data`.
    #[must_use]
    pub fn has_pending_voice(&self) -> bool {
        self.voice_pending && self.voice_audio_data.is_some()
    }

    /// Returns `true` if `error` is set to a non-empty message.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.error.as_deref().is_some_and(|e| !e.is_empty())
    }

    /// Attaches freshly recorded voice input.
    ///
    /// Replaces any previous recording, flags it pending, and clears the old
    /// transcription so the router schedules `process_voice_input` on the
    /// next tick.
    pub fn attach_voice(&mut self, audio: VoiceAudioData) {
        self.voice_audio_data = Some(audio);
        self.voice_transcription = None;
        self.voice_pending = true;
        self.updated_at = Utc::now();
    }

    /// The steering prompt for the given stage, if configured.
    #[must_use]
    pub fn prompt_for(&self, stage: Stage) -> Option<&str> {
        self.user_prompts.get(&stage).map(String::as_str)
    }

    /// The model identifier for the given stage, falling back to the
    /// built-in default.
    #[must_use]
    pub fn model_for(&self, stage: Stage) -> &str {
        self.selected_models
            .get(&stage)
            .map_or(SessionDefaults::DEFAULT_MODEL, String::as_str)
    }

    /// Merges a node's patch into this state.
    ///
    /// Patch fields win over existing values, `messages` are appended, and
    /// `updated_at` is always refreshed, even for an empty patch, since an
    /// accepted tick is a state update.
    pub fn apply(&mut self, patch: StatePatch) {
        if let Some(messages) = patch.messages {
            self.messages.extend(messages);
        }
        if let Some(stage) = patch.stage {
            self.stage = stage;
        }
        if let Some(action) = patch.last_user_action {
            self.last_user_action = action;
        }
        if let Some(transcription) = patch.voice_transcription {
            self.voice_transcription = Some(transcription);
        }
        if let Some(pending) = patch.voice_pending {
            self.voice_pending = pending;
        }
        if let Some(processing) = patch.is_processing {
            self.is_processing = processing;
        }
        if patch.clear_error {
            self.error = None;
        }
        if let Some(error) = patch.error {
            self.error = Some(error);
        }
        self.updated_at = Utc::now();
    }
}

/// Sparse state update returned by node execution.
///
/// All fields are optional; a node touches only the state aspects it owns
/// and the executor merges the patch via [`SessionState::apply`]. An empty
/// patch is a legal no-op tick result.
///
/// # Examples
///
/// ```rust
/// use ideaforge::message::Message;
/// use ideaforge::state::StatePatch;
/// use ideaforge::types::Stage;
///
/// // A failed capability call becomes an error patch, never a panic:
/// let patch = StatePatch::error_patch("generation backend unavailable");
/// assert_eq!(patch.updated_fields(), vec!["is_processing", "error"]);
///
/// // A successful reply:
/// let patch = StatePatch::new()
///     .with_messages(vec![Message::assistant("Sounds promising!", Stage::Brainstorm)])
///     .with_clear_error()
///     .with_is_processing(false);
/// assert!(!patch.is_empty());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StatePatch {
    /// Messages to append to the conversation, in order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<Message>>,
    /// New workflow stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    /// New last-user-action trigger.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_user_action: Option<UserAction>,
    /// Transcript produced from pending voice input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_transcription: Option<String>,
    /// New value for the pending-voice flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_pending: Option<bool>,
    /// New value for the in-flight-tick flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_processing: Option<bool>,
    /// Error message to surface on the session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Clear any existing error. Applied before `error`, so a patch can
    /// also replace the message outright.
    #[serde(default)]
    pub clear_error: bool,
}

impl StatePatch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The conventional failure patch: stop processing, surface the error.
    #[must_use]
    pub fn error_patch(message: impl Into<String>) -> Self {
        Self::new()
            .with_is_processing(false)
            .with_error(message)
    }

    /// Appends messages to the patch.
    #[must_use]
    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = Some(messages);
        self
    }

    /// Sets the stage field.
    #[must_use]
    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stage = Some(stage);
        self
    }

    /// Sets the last-user-action field.
    #[must_use]
    pub fn with_last_user_action(mut self, action: UserAction) -> Self {
        self.last_user_action = Some(action);
        self
    }

    /// Sets the voice transcription field.
    #[must_use]
    pub fn with_voice_transcription(mut self, transcription: impl Into<String>) -> Self {
        self.voice_transcription = Some(transcription.into());
        self
    }

    /// Sets the pending-voice flag.
    #[must_use]
    pub fn with_voice_pending(mut self, pending: bool) -> Self {
        self.voice_pending = Some(pending);
        self
    }

    /// Sets the in-flight-tick flag.
    #[must_use]
    pub fn with_is_processing(mut self, processing: bool) -> Self {
        self.is_processing = Some(processing);
        self
    }

    /// Sets an error message.
    #[must_use]
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }

    /// Marks any existing error for clearing.
    #[must_use]
    pub fn with_clear_error(mut self) -> Self {
        self.clear_error = true;
        self
    }

    /// Returns `true` if applying this patch changes nothing but
    /// `updated_at`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_none()
            && self.stage.is_none()
            && self.last_user_action.is_none()
            && self.voice_transcription.is_none()
            && self.voice_pending.is_none()
            && self.is_processing.is_none()
            && self.error.is_none()
            && !self.clear_error
    }

    /// Names of the fields this patch touches, for telemetry.
    #[must_use]
    pub fn updated_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.messages.is_some() {
            fields.push("messages");
        }
        if self.stage.is_some() {
            fields.push("stage");
        }
        if self.last_user_action.is_some() {
            fields.push("last_user_action");
        }
        if self.voice_transcription.is_some() {
            fields.push("voice_transcription");
        }
        if self.voice_pending.is_some() {
            fields.push("voice_pending");
        }
        if self.is_processing.is_some() {
            fields.push("is_processing");
        }
        if self.error.is_some() || self.clear_error {
            fields.push("error");
        }
        fields
    }
}

/// Fluent builder for assembling a [`SessionState`] in a specific shape.
///
/// Primarily used by tests and by callers restoring a session from a
/// serialized snapshot.
///
/// # Examples
///
/// ```rust
/// use ideaforge::message::Message;
/// use ideaforge::state::SessionState;
/// use ideaforge::types::{Stage, UserAction};
///
/// let state = SessionState::builder("sess_42")
///     .with_message(Message::user("I have an idea", Stage::Brainstorm))
///     .with_last_user_action(UserAction::BrainstormDone)
///     .build();
///
/// assert_eq!(state.messages.len(), 1);
/// assert_eq!(state.last_user_action, UserAction::BrainstormDone);
/// ```
#[derive(Debug)]
pub struct SessionStateBuilder {
    state: SessionState,
}

impl SessionStateBuilder {
    fn new(session_id: impl Into<String>) -> Self {
        Self {
            state: SessionState::new(session_id, None),
        }
    }

    /// Sets the owning user.
    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.state.user_id = Some(user_id.into());
        self
    }

    /// Sets the display title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.state.title = Some(title.into());
        self
    }

    /// Sets the workflow stage.
    #[must_use]
    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.state.stage = stage;
        self
    }

    /// Sets the routing trigger.
    #[must_use]
    pub fn with_last_user_action(mut self, action: UserAction) -> Self {
        self.state.last_user_action = action;
        self
    }

    /// Appends a message to the history.
    #[must_use]
    pub fn with_message(mut self, message: Message) -> Self {
        self.state.messages.push(message);
        self
    }

    /// Sets the in-flight-tick flag.
    #[must_use]
    pub fn processing(mut self, processing: bool) -> Self {
        self.state.is_processing = processing;
        self
    }

    /// Sets an error message.
    #[must_use]
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.state.error = Some(message.into());
        self
    }

    /// Attaches pending voice input.
    #[must_use]
    pub fn with_pending_voice(mut self, audio: VoiceAudioData) -> Self {
        self.state.attach_voice(audio);
        self
    }

    /// Finishes building.
    #[must_use]
    pub fn build(self) -> SessionState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_audio() -> VoiceAudioData {
        VoiceAudioData {
            path: "/tmp/rec_001.webm".to_string(),
            duration_secs: 4.2,
            mime_type: "audio/webm".to_string(),
            byte_size: 18_432,
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn fresh_session_shape() {
        let state = SessionState::new("sess_1", Some("user_1"));
        assert_eq!(state.session_id, "sess_1");
        assert_eq!(state.stage, Stage::Brainstorm);
        assert_eq!(state.last_user_action, UserAction::Chat);
        assert!(state.messages.is_empty());
        assert!(!state.is_processing);
        assert!(state.error.is_none());
        assert!(state.user_prompts.contains_key(&Stage::Summary));
        assert_eq!(state.model_for(Stage::Prd), SessionDefaults::DEFAULT_MODEL);
    }

    #[test]
    fn apply_appends_messages_and_refreshes_updated_at() {
        let mut state = SessionState::new("sess_1", None);
        let before = state.updated_at;
        let patch = StatePatch::new()
            .with_messages(vec![Message::assistant("hello", Stage::Brainstorm)])
            .with_is_processing(false);
        state.apply(patch);
        assert_eq!(state.messages.len(), 1);
        assert!(state.updated_at >= before);
    }

    #[test]
    fn apply_clear_error_then_set_wins() {
        let mut state = SessionState::builder("sess_1")
            .with_error("old failure")
            .build();
        state.apply(StatePatch::new().with_clear_error());
        assert!(state.error.is_none());

        state.apply(StatePatch::error_patch("new failure"));
        assert_eq!(state.error.as_deref(), Some("new failure"));
        assert!(!state.is_processing);
    }

    #[test]
    fn attach_voice_flags_pending_and_clears_transcription() {
        let mut state = SessionState::new("sess_1", None);
        state.voice_transcription = Some("stale".to_string());
        state.attach_voice(sample_audio());
        assert!(state.has_pending_voice());
        assert!(state.voice_transcription.is_none());

        state.apply(
            StatePatch::new()
                .with_voice_transcription("fresh words")
                .with_voice_pending(false),
        );
        assert!(!state.has_pending_voice());
        assert_eq!(state.voice_transcription.as_deref(), Some("fresh words"));
    }

    #[test]
    fn empty_patch_reports_no_fields() {
        let patch = StatePatch::new();
        assert!(patch.is_empty());
        assert!(patch.updated_fields().is_empty());
    }

    #[test]
    fn stage_keyed_maps_serialize_as_string_keys() {
        let state = SessionState::new("sess_1", None);
        let json = serde_json::to_value(&state).unwrap();
        assert!(json["user_prompts"]["brainstorm"].is_string());
        let restored: SessionState = serde_json::from_value(json).unwrap();
        assert_eq!(restored, state);
    }
}
