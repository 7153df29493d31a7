//! Process-wide registry of live sessions.
//!
//! One [`SessionRegistry`] exists per process, constructed by the entry
//! point and shared by reference with the transport handler: explicit
//! ownership instead of a hidden module-level singleton. The id → state map
//! is the only shared mutable resource in the engine; it is safe for
//! concurrent access across sessions, while per-session tick serialization
//! remains the caller's job via the advisory `is_processing` flag.

use miette::Diagnostic;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::state::{SessionDefaults, SessionState};
use crate::types::Stage;

/// Operations against an unknown session id.
#[derive(Debug, Error, Diagnostic)]
pub enum RegistryError {
    #[error("session not found: {session_id}")]
    #[diagnostic(
        code(ideaforge::registry::session_not_found),
        help("Create the session first, or check the id for typos.")
    )]
    SessionNotFound { session_id: String },
}

/// Map from session id to live session state, with create/fetch/clear
/// lifecycle.
///
/// # Examples
///
/// ```rust
/// use ideaforge::registry::SessionRegistry;
///
/// let registry = SessionRegistry::default();
/// let created = registry.create_session("sess_1", Some("user_9"));
/// assert_eq!(created.session_id, "sess_1");
///
/// let fetched = registry.get_session("sess_1").unwrap();
/// assert_eq!(fetched.user_id.as_deref(), Some("user_9"));
///
/// registry.clear_session("sess_1");
/// assert!(registry.get_session("sess_1").is_err());
/// ```
pub struct SessionRegistry {
    sessions: RwLock<FxHashMap<String, SessionState>>,
    defaults: SessionDefaults,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(SessionDefaults::default())
    }
}

impl SessionRegistry {
    /// Creates a registry whose fresh sessions carry the given defaults.
    #[must_use]
    pub fn new(defaults: SessionDefaults) -> Self {
        Self {
            sessions: RwLock::new(FxHashMap::default()),
            defaults,
        }
    }

    /// Creates fresh initial state for the id and (re)binds it.
    ///
    /// Deliberately overwrites any existing binding: "create" always means
    /// a clean slate for that id.
    pub fn create_session(&self, session_id: &str, user_id: Option<&str>) -> SessionState {
        let state = SessionState::with_defaults(session_id, user_id, &self.defaults);
        self.sessions
            .write()
            .insert(session_id.to_string(), state.clone());
        tracing::info!(session_id, "session created");
        state
    }

    /// Fetches a clone of the session's current state.
    pub fn get_session(&self, session_id: &str) -> Result<SessionState, RegistryError> {
        self.sessions
            .read()
            .get(session_id)
            .cloned()
            .ok_or_else(|| RegistryError::SessionNotFound {
                session_id: session_id.to_string(),
            })
    }

    /// Rebinds a session to post-tick state.
    ///
    /// The binding is keyed by the state's own id; unknown ids are an
    /// error so a cleared session cannot be resurrected by a stale tick
    /// result.
    pub fn update_session(&self, state: SessionState) -> Result<(), RegistryError> {
        let mut sessions = self.sessions.write();
        match sessions.get_mut(&state.session_id) {
            Some(slot) => {
                *slot = state;
                Ok(())
            }
            None => Err(RegistryError::SessionNotFound {
                session_id: state.session_id,
            }),
        }
    }

    /// Removes the binding. No error if the id is absent.
    pub fn clear_session(&self, session_id: &str) {
        if self.sessions.write().remove(session_id).is_some() {
            tracing::info!(session_id, "session cleared");
        }
    }

    /// Renames a session's display title.
    pub fn rename_session(
        &self,
        session_id: &str,
        title: impl Into<String>,
    ) -> Result<(), RegistryError> {
        self.mutate(session_id, |state| state.title = Some(title.into()))
    }

    /// Replaces the steering prompt for one stage.
    pub fn update_prompt(
        &self,
        session_id: &str,
        stage: Stage,
        prompt: impl Into<String>,
    ) -> Result<(), RegistryError> {
        self.mutate(session_id, |state| {
            state.user_prompts.insert(stage, prompt.into());
        })
    }

    /// Replaces the model identifier for one stage.
    pub fn update_model(
        &self,
        session_id: &str,
        stage: Stage,
        model: impl Into<String>,
    ) -> Result<(), RegistryError> {
        self.mutate(session_id, |state| {
            state.selected_models.insert(stage, model.into());
        })
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Returns `true` if no sessions are bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    fn mutate(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut SessionState),
    ) -> Result<(), RegistryError> {
        let mut sessions = self.sessions.write();
        match sessions.get_mut(session_id) {
            Some(state) => {
                f(state);
                state.updated_at = chrono::Utc::now();
                Ok(())
            }
            None => Err(RegistryError::SessionNotFound {
                session_id: session_id.to_string(),
            }),
        }
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.len())
            .finish()
    }
}
