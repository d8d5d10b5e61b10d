//! Simulation error types.

use thiserror::Error;

/// Errors surfaced by the simulation core.
///
/// Removing a body that is already gone and dropping a piece twice are not
/// errors; both are silent no-ops.
#[derive(Debug, Error)]
pub enum SimError {
    /// A size index outside the ladder was requested.
    #[error("size index {index} out of range (ladder has {count} sizes)")]
    InvalidSizeIndex { index: usize, count: usize },

    /// The physics step produced a non-finite body state.
    #[error("physics step failed: {0}")]
    EngineStepFailure(String),

    /// A previous tick failed; the session cannot continue.
    #[error("session faulted by an earlier engine failure")]
    SessionFaulted,

    /// Settings failed validation.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// Settings JSON could not be parsed.
    #[error("failed to parse settings: {0}")]
    SettingsParse(#[from] serde_json::Error),
}
