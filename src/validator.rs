//! Structural invariant checks for session state.
//!
//! The validator guards every executor tick and is also exposed standalone
//! at the transport boundary for client-side pre-flight checks. Two surfaces
//! exist because the two callers see different representations:
//!
//! - [`validate`] runs against a typed [`SessionState`], where the enum and
//!   sequence invariants are already carried by the type system; only the
//!   non-empty `session_id` invariant remains checkable.
//! - [`validate_payload`] runs against a raw JSON value as received from a
//!   client, checking all four structural rules in order and
//!   short-circuiting on the first failure.
//! - [`collect_issues`] runs the same rules without short-circuiting, for
//!   the transport's `validate_state` operation.
//!
//! The error wording ("Invalid idea_id", "Invalid current_stage", …)
//! matches what the UI layer pattern-matches on and must stay stable.

use miette::Diagnostic;
use serde_json::Value;
use std::str::FromStr;
use thiserror::Error;

use crate::state::SessionState;
use crate::types::{Stage, UserAction};

/// A structural invariant violation on a session state.
///
/// Validation failures always surface to the caller; the executor never
/// logs-and-swallows them.
#[derive(Debug, Error, Diagnostic)]
pub enum ValidationError {
    /// `session_id` is missing, empty, or not a string.
    #[error("Invalid idea_id: session identifier must be a non-empty string")]
    #[diagnostic(
        code(ideaforge::validator::idea_id),
        help("Create sessions through the registry so ids are always assigned.")
    )]
    InvalidIdeaId,

    /// `stage` is not one of brainstorm/summary/prd.
    #[error("Invalid current_stage: {found}")]
    #[diagnostic(
        code(ideaforge::validator::current_stage),
        help("Allowed stages are \"brainstorm\", \"summary\", and \"prd\".")
    )]
    InvalidStage { found: String },

    /// `last_user_action` is not one of the recognised triggers.
    #[error("Invalid last_user_action: {found}")]
    #[diagnostic(
        code(ideaforge::validator::last_user_action),
        help("Allowed actions are \"chat\", \"Brainstorm Done\", \"Summary Done\", and \"PRD Done\".")
    )]
    InvalidUserAction { found: String },

    /// `messages` is not a sequence.
    #[error("Invalid messages: expected a sequence")]
    #[diagnostic(code(ideaforge::validator::messages))]
    InvalidMessages,
}

/// Validates a typed session state before a tick is applied.
///
/// Checks the invariants the type system cannot carry: currently that
/// `session_id` is non-empty. No side effects.
pub fn validate(state: &SessionState) -> Result<(), ValidationError> {
    if state.session_id.is_empty() {
        return Err(ValidationError::InvalidIdeaId);
    }
    Ok(())
}

/// Validates a raw JSON session-state payload, short-circuiting on the
/// first failure.
///
/// Checks, in order: (a) `session_id` is a non-empty string; (b) `stage` is
/// a recognised stage; (c) `last_user_action` is a recognised action;
/// (d) `messages` is a sequence.
pub fn validate_payload(payload: &Value) -> Result<(), ValidationError> {
    check_session_id(payload)?;
    check_stage(payload)?;
    check_user_action(payload)?;
    check_messages(payload)?;
    Ok(())
}

/// Runs every payload check and returns all failures, for pre-flight
/// reporting at the transport boundary.
#[must_use]
pub fn collect_issues(payload: &Value) -> Vec<String> {
    [
        check_session_id(payload),
        check_stage(payload),
        check_user_action(payload),
        check_messages(payload),
    ]
    .into_iter()
    .filter_map(|check| check.err().map(|e| e.to_string()))
    .collect()
}

fn check_session_id(payload: &Value) -> Result<(), ValidationError> {
    match payload.get("session_id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => Ok(()),
        _ => Err(ValidationError::InvalidIdeaId),
    }
}

fn check_stage(payload: &Value) -> Result<(), ValidationError> {
    let raw = payload.get("stage");
    match raw.and_then(Value::as_str).map(Stage::from_str) {
        Some(Ok(_)) => Ok(()),
        _ => Err(ValidationError::InvalidStage {
            found: describe(raw),
        }),
    }
}

fn check_user_action(payload: &Value) -> Result<(), ValidationError> {
    let raw = payload.get("last_user_action");
    match raw.and_then(Value::as_str).map(UserAction::from_str) {
        Some(Ok(_)) => Ok(()),
        _ => Err(ValidationError::InvalidUserAction {
            found: describe(raw),
        }),
    }
}

fn check_messages(payload: &Value) -> Result<(), ValidationError> {
    match payload.get("messages") {
        Some(Value::Array(_)) => Ok(()),
        _ => Err(ValidationError::InvalidMessages),
    }
}

fn describe(value: Option<&Value>) -> String {
    match value {
        None => "missing".to_string(),
        Some(v) => v.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn typed_state_with_id_passes() {
        let state = SessionState::new("sess_1", None);
        assert!(validate(&state).is_ok());
    }

    #[test]
    fn typed_state_with_empty_id_fails_citing_idea_id() {
        let mut state = SessionState::new("sess_1", None);
        state.session_id.clear();
        let err = validate(&state).unwrap_err();
        assert!(err.to_string().contains("idea_id"));
    }

    #[test]
    fn payload_checks_short_circuit_in_order() {
        // Both the stage and the messages are wrong; stage is reported first.
        let payload = json!({
            "session_id": "sess_1",
            "stage": "shipping",
            "last_user_action": "chat",
            "messages": "not-a-sequence",
        });
        let err = validate_payload(&payload).unwrap_err();
        assert!(err.to_string().contains("current_stage"));
    }

    #[test]
    fn collect_issues_reports_everything() {
        let payload = json!({
            "session_id": "",
            "stage": "shipping",
            "last_user_action": "ship it",
            "messages": 7,
        });
        let issues = collect_issues(&payload);
        assert_eq!(issues.len(), 4);
        assert!(issues[0].contains("idea_id"));
        assert!(issues[1].contains("current_stage"));
        assert!(issues[2].contains("last_user_action"));
        assert!(issues[3].contains("messages"));
    }

    #[test]
    fn serialized_session_state_is_a_valid_payload() {
        let state = SessionState::new("sess_1", Some("user_1"));
        let payload = serde_json::to_value(&state).unwrap();
        assert!(validate_payload(&payload).is_ok());
        assert!(collect_issues(&payload).is_empty());
    }
}
