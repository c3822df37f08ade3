//! The engine's error taxonomy (`spec.md` §7).
//!
//! Mirrors the severity split the teacher draws between `OperationError`
//! (recoverable, per-call) and a fatal class that exits the process: here,
//! [`EngineError::MalformedMessage`] is the one recoverable variant --
//! every other variant propagates out of [`crate::engine::SessionEngine::run`]
//! and ends the process, relying on an external supervisor to restart it.

use pi_core::MessageError;

/// Errors raised while running the session engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A single bad message: unknown routing key or missing header.
    /// Recoverable -- the message is dead-lettered and consumption
    /// continues.
    #[error("malformed message: {0}")]
    MalformedMessage(#[from] MessageError),

    /// The engine tried to insert a phone already present. Unreachable in
    /// practice since `handle` always checks `get` first; fatal if it ever
    /// happens.
    #[error("programmer error: duplicate insert for a phone already in the store")]
    DuplicateInsert,

    /// Connection drop, publish failure, consumer cancellation, etc.
    /// Fatal.
    #[error("transport error: {0}")]
    Transport(#[source] anyhow::Error),

    /// In-memory store backend failure. Fatal (there is currently no
    /// backend that can fail this way, but the variant exists for
    /// forward-compatibility with `spec.md` §7's taxonomy).
    #[error("store error: {0}")]
    Store(#[source] anyhow::Error),

    /// Manifest serialization failed -- should be unreachable since
    /// `ManifestEntry` always serializes, but surfaced rather than
    /// unwrapped.
    #[error("manifest serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

// `spec.md` §7 also names `TimerCallbackError`: here that's not a distinct
// variant but the ordinary propagation of whatever `publish_manifest`
// returns (`Transport`, `Store`, or `Serialize`) out of the due-timer
// dispatch in `SessionEngine::run_due_timers` -- the taxonomy's point is
// that it's fatal and unwrapped, not that it has its own shape.
