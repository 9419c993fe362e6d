use thiserror::Error;

/// Errors from controlling the periodic sweep task.
///
/// Event emission itself is infallible by design: a missing tracking entry
/// or an unresolved code source degrades fields within the event, never the
/// call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SweepTaskError {
    #[error("periodic sweep task is already running")]
    AlreadyRunning,

    #[error("periodic sweep task is not running")]
    NotRunning,

    #[error("failed to spawn sweep thread: {0}")]
    Spawn(String),
}
