//! Identifier generation for sessions and workflow executions.

use uuid::Uuid;

/// Generates the opaque ids used across the engine.
///
/// # Examples
///
/// ```rust
/// use ideaforge::utils::id_generator::IdGenerator;
///
/// let ids = IdGenerator::new();
/// let run_id = ids.generate_run_id();
/// assert!(run_id.starts_with("run_"));
///
/// let session_id = ids.generate_session_id();
/// assert!(session_id.starts_with("sess_"));
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct IdGenerator;

impl IdGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// A fresh workflow-execution id.
    #[must_use]
    pub fn generate_run_id(&self) -> String {
        format!("run_{}", Uuid::new_v4().simple())
    }

    /// A fresh session id.
    #[must_use]
    pub fn generate_session_id(&self) -> String {
        format!("sess_{}", Uuid::new_v4().simple())
    }
}
