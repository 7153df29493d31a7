mod common;

use std::sync::Arc;

use common::{
    FailingSummarizer, FailingTranscriber, FailingTurnGenerator, FixedTranscriber,
    ScriptedSummarizer, ScriptedTurnGenerator, sample_audio, scripted_capabilities,
};
use ideaforge::capabilities::Capabilities;
use ideaforge::event_log::WorkflowLogger;
use ideaforge::message::{Message, Role};
use ideaforge::node::{Node, NodeContext, NodeError};
use ideaforge::nodes::{
    GenerateSummaryNode, ProcessUserTurnNode, ProcessVoiceInputNode, WELCOME_MESSAGE,
};
use ideaforge::state::SessionState;
use ideaforge::types::{NodeKind, Stage, UserAction};

fn ctx(node: NodeKind) -> NodeContext {
    NodeContext::new(node, Arc::new(WorkflowLogger::new("run_test", "sess_test")))
}

fn failing_turn_capabilities(message: &str) -> Capabilities {
    Capabilities::new(
        Arc::new(FailingTurnGenerator::new(message)),
        Arc::new(ScriptedSummarizer::new("unused")),
        Arc::new(FixedTranscriber::new("unused")),
    )
}

#[tokio::test]
async fn empty_history_gets_exactly_one_welcome_message() {
    let node = ProcessUserTurnNode::new(scripted_capabilities("reply", "summary", "transcript"));
    let mut state = SessionState::new("sess_1", None);

    let patch = node
        .run(&state, ctx(NodeKind::ProcessUserTurn))
        .await
        .unwrap();
    let messages = patch.messages.clone().expect("welcome message appended");
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, Role::Assistant);
    assert_eq!(messages[0].content, WELCOME_MESSAGE);
    assert_eq!(patch.is_processing, Some(false));

    // A second tick on the welcomed state sees an assistant-terminated
    // history and must not append another welcome.
    state.apply(patch);
    let second = node
        .run(&state, ctx(NodeKind::ProcessUserTurn))
        .await
        .unwrap();
    assert!(second.messages.is_none());
    assert_eq!(second.is_processing, Some(false));
}

#[tokio::test]
async fn assistant_terminated_history_is_a_noop() {
    let node = ProcessUserTurnNode::new(scripted_capabilities("reply", "summary", "transcript"));
    let state = SessionState::builder("sess_1")
        .with_message(Message::user("an idea", Stage::Brainstorm))
        .with_message(Message::assistant("noted", Stage::Brainstorm))
        .build();

    let patch = node
        .run(&state, ctx(NodeKind::ProcessUserTurn))
        .await
        .unwrap();
    assert!(patch.messages.is_none());
    assert_eq!(patch.is_processing, Some(false));
}

#[tokio::test]
async fn processing_guard_returns_an_empty_patch() {
    let caps = scripted_capabilities("reply", "summary", "transcript");
    let node = ProcessUserTurnNode::new(caps);
    let state = SessionState::builder("sess_1")
        .with_message(Message::user("an idea", Stage::Brainstorm))
        .processing(true)
        .build();

    let patch = node
        .run(&state, ctx(NodeKind::ProcessUserTurn))
        .await
        .unwrap();
    assert!(patch.is_empty());
}

#[tokio::test]
async fn user_terminated_history_gets_a_generated_reply() {
    let generator = ScriptedTurnGenerator::new("What would make it unique?");
    let calls = Arc::clone(&generator.calls);
    let caps = Capabilities::new(
        Arc::new(generator),
        Arc::new(ScriptedSummarizer::new("unused")),
        Arc::new(FixedTranscriber::new("unused")),
    );
    let node = ProcessUserTurnNode::new(caps);
    // The error guard belongs to the router; the node itself replies and
    // clears the stale error.
    let mut state = SessionState::builder("sess_1")
        .with_message(Message::user("a habit tracker for plants", Stage::Brainstorm))
        .with_error("stale banner")
        .build();

    let patch = node
        .run(&state, ctx(NodeKind::ProcessUserTurn))
        .await
        .unwrap();
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    let messages = patch.messages.clone().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, Role::Assistant);
    assert_eq!(messages[0].content, "What would make it unique?");
    assert_eq!(messages[0].stage_at_creation, Stage::Brainstorm);
    assert!(patch.clear_error);
    assert_eq!(patch.last_user_action, Some(UserAction::Chat));
    assert_eq!(patch.is_processing, Some(false));

    state.apply(patch);
    assert!(state.error.is_none());
}

#[tokio::test]
async fn generator_failure_becomes_an_error_patch() {
    let node = ProcessUserTurnNode::new(failing_turn_capabilities("model unavailable"));
    let state = SessionState::builder("sess_1")
        .with_message(Message::user("an idea", Stage::Brainstorm))
        .build();

    let patch = node
        .run(&state, ctx(NodeKind::ProcessUserTurn))
        .await
        .expect("failures are state, not exceptions");
    assert!(patch.messages.is_none());
    assert_eq!(patch.is_processing, Some(false));
    assert!(patch.error.as_deref().unwrap().contains("model unavailable"));
}

#[tokio::test]
async fn voice_transcription_appends_a_user_message() {
    let node =
        ProcessVoiceInputNode::new(scripted_capabilities("reply", "summary", "water my ferns"));
    let state = SessionState::builder("sess_1")
        .with_pending_voice(sample_audio())
        .build();

    let patch = node
        .run(&state, ctx(NodeKind::ProcessVoiceInput))
        .await
        .unwrap();
    let messages = patch.messages.clone().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].content, "water my ferns");
    assert_eq!(patch.voice_transcription.as_deref(), Some("water my ferns"));
    assert_eq!(patch.voice_pending, Some(false));
    assert_eq!(patch.is_processing, Some(false));

    let mut state = state;
    state.apply(patch);
    assert!(!state.has_pending_voice());
}

#[tokio::test]
async fn transcription_failure_consumes_the_pending_audio() {
    let caps = Capabilities::new(
        Arc::new(ScriptedTurnGenerator::new("unused")),
        Arc::new(ScriptedSummarizer::new("unused")),
        Arc::new(FailingTranscriber),
    );
    let node = ProcessVoiceInputNode::new(caps);
    let state = SessionState::builder("sess_1")
        .with_pending_voice(sample_audio())
        .build();

    let patch = node
        .run(&state, ctx(NodeKind::ProcessVoiceInput))
        .await
        .unwrap();
    assert!(patch.messages.is_none());
    assert!(patch.error.as_deref().unwrap().contains("speech service"));
    assert_eq!(patch.voice_pending, Some(false));
}

#[tokio::test]
async fn voice_node_without_audio_is_a_missing_input() {
    let node = ProcessVoiceInputNode::new(scripted_capabilities("r", "s", "t"));
    let state = SessionState::new("sess_1", None);

    let err = node
        .run(&state, ctx(NodeKind::ProcessVoiceInput))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        NodeError::MissingInput {
            what: "voice_audio_data"
        }
    ));
}

#[tokio::test]
async fn voice_node_guards_on_existing_error() {
    let node = ProcessVoiceInputNode::new(scripted_capabilities("r", "s", "t"));
    let mut state = SessionState::builder("sess_1")
        .with_pending_voice(sample_audio())
        .build();
    state.error = Some("previous failure".to_string());

    let patch = node
        .run(&state, ctx(NodeKind::ProcessVoiceInput))
        .await
        .unwrap();
    assert!(patch.is_empty());
}

#[tokio::test]
async fn summary_advances_the_stage_with_its_message() {
    let node = GenerateSummaryNode::new(scripted_capabilities(
        "reply",
        "A plant-care companion app.",
        "transcript",
    ));
    let state = SessionState::builder("sess_1")
        .with_message(Message::user("plant care, but fun", Stage::Brainstorm))
        .with_last_user_action(UserAction::BrainstormDone)
        .build();

    let patch = node
        .run(&state, ctx(NodeKind::GenerateSummary))
        .await
        .unwrap();
    assert_eq!(patch.stage, Some(Stage::Summary));
    let messages = patch.messages.clone().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, Role::Assistant);
    assert_eq!(messages[0].stage_at_creation, Stage::Summary);
    assert_eq!(patch.is_processing, Some(false));
}

#[tokio::test]
async fn summary_guard_rejects_wrong_stage() {
    let node = GenerateSummaryNode::new(scripted_capabilities("r", "s", "t"));
    let state = SessionState::builder("sess_1")
        .with_stage(Stage::Summary)
        .with_last_user_action(UserAction::BrainstormDone)
        .build();

    let patch = node
        .run(&state, ctx(NodeKind::GenerateSummary))
        .await
        .unwrap();
    assert!(patch.is_empty());
}

#[tokio::test]
async fn summarizer_failure_becomes_an_error_patch() {
    let caps = Capabilities::new(
        Arc::new(ScriptedTurnGenerator::new("unused")),
        Arc::new(FailingSummarizer),
        Arc::new(FixedTranscriber::new("unused")),
    );
    let node = GenerateSummaryNode::new(caps);
    let state = SessionState::builder("sess_1")
        .with_message(Message::user("idea", Stage::Brainstorm))
        .with_last_user_action(UserAction::BrainstormDone)
        .build();

    let patch = node
        .run(&state, ctx(NodeKind::GenerateSummary))
        .await
        .unwrap();
    assert!(patch.stage.is_none());
    assert!(patch.error.as_deref().unwrap().contains("summary backend"));
    assert_eq!(patch.is_processing, Some(false));
}
