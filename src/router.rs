//! Deterministic routing: which node runs on the next tick.
//!
//! The router is a pure function of the session's routing-relevant fields
//! (`stage`, `last_user_action`, `is_processing`, `error`, and the
//! pending-voice flag): no side effects, no I/O, never suspends. Message
//! *content* never influences the decision.
//!
//! # Decision table (first match wins)
//!
//! 1. `error` set and non-empty → done (no auto-retry within a tick)
//! 2. `chat` + pending untranscribed voice → `process_voice_input`
//! 3. `chat` → `process_user_turn`
//! 4. `Brainstorm Done` while in `brainstorm` → `generate_summary`
//! 5. otherwise → done
//!
//! # Examples
//!
//! ```rust
//! use ideaforge::router::route;
//! use ideaforge::state::SessionState;
//! use ideaforge::types::{NodeKind, Route};
//!
//! let state = SessionState::new("sess_1", None);
//! let decision = route(&state);
//! assert_eq!(decision.target, Route::To(NodeKind::ProcessUserTurn));
//! assert_eq!(decision.condition, "chat_turn");
//! ```

use crate::state::SessionState;
use crate::types::{NodeKind, Route, Stage, UserAction};

/// The router's verdict plus the condition label that selected it, for
/// edge telemetry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decision {
    /// Where the tick goes.
    pub target: Route,
    /// Which decision-table rule fired.
    pub condition: &'static str,
}

impl Decision {
    fn new(target: Route, condition: &'static str) -> Self {
        Self { target, condition }
    }
}

/// Decides which node runs next, or that the tick is done.
#[must_use]
pub fn route(state: &SessionState) -> Decision {
    if state.has_error() {
        return Decision::new(Route::Done, "error_set");
    }
    if state.last_user_action == UserAction::Chat && state.has_pending_voice() {
        return Decision::new(Route::To(NodeKind::ProcessVoiceInput), "pending_voice_input");
    }
    if state.last_user_action == UserAction::Chat {
        return Decision::new(Route::To(NodeKind::ProcessUserTurn), "chat_turn");
    }
    if state.last_user_action == UserAction::BrainstormDone && state.stage == Stage::Brainstorm {
        return Decision::new(Route::To(NodeKind::GenerateSummary), "brainstorm_done");
    }
    Decision::new(Route::Done, "no_matching_rule")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::VoiceAudioData;
    use chrono::Utc;

    fn audio() -> VoiceAudioData {
        VoiceAudioData {
            path: "/tmp/clip.webm".to_string(),
            duration_secs: 2.0,
            mime_type: "audio/webm".to_string(),
            byte_size: 1024,
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn error_short_circuits_everything() {
        let state = SessionState::builder("sess_1")
            .with_error("backend down")
            .with_pending_voice(audio())
            .build();
        // Attaching voice after an error would still route to Done: rule 1
        // comes first.
        let decision = route(&state);
        assert_eq!(decision.target, Route::Done);
        assert_eq!(decision.condition, "error_set");
    }

    #[test]
    fn empty_error_string_does_not_count() {
        let mut state = SessionState::new("sess_1", None);
        state.error = Some(String::new());
        assert_eq!(route(&state).target, Route::To(NodeKind::ProcessUserTurn));
    }

    #[test]
    fn pending_voice_beats_plain_chat() {
        let state = SessionState::builder("sess_1")
            .with_pending_voice(audio())
            .build();
        assert_eq!(route(&state).target, Route::To(NodeKind::ProcessVoiceInput));
    }

    #[test]
    fn consumed_voice_routes_to_user_turn() {
        let mut state = SessionState::builder("sess_1")
            .with_pending_voice(audio())
            .build();
        state.voice_pending = false;
        assert_eq!(route(&state).target, Route::To(NodeKind::ProcessUserTurn));
    }

    #[test]
    fn brainstorm_done_routes_to_summary_only_in_brainstorm() {
        let in_brainstorm = SessionState::builder("sess_1")
            .with_last_user_action(UserAction::BrainstormDone)
            .build();
        assert_eq!(
            route(&in_brainstorm).target,
            Route::To(NodeKind::GenerateSummary)
        );

        let in_summary = SessionState::builder("sess_1")
            .with_stage(Stage::Summary)
            .with_last_user_action(UserAction::BrainstormDone)
            .build();
        assert_eq!(route(&in_summary).target, Route::Done);
    }

    #[test]
    fn terminal_actions_route_to_done() {
        for action in [UserAction::SummaryDone, UserAction::PrdDone] {
            let state = SessionState::builder("sess_1")
                .with_last_user_action(action)
                .build();
            let decision = route(&state);
            assert_eq!(decision.target, Route::Done);
            assert_eq!(decision.condition, "no_matching_rule");
        }
    }
}
