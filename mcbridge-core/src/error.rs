//! Error types shared across the bridge.

use thiserror::Error;

/// Failures surfaced by the bridge.
///
/// Foreign-runtime exceptions are caught at the call boundary, cleared,
/// summarized into a string, and reported as [`BridgeError::External`].
/// They never propagate back into the foreign runtime.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The foreign runtime raised an exception or a foreign call failed.
    #[error("external runtime failure: {0}")]
    External(String),

    /// A caller violated an API precondition.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An allocation or pool request could not be satisfied.
    #[error("resource exhaustion: {0}")]
    ResourceExhaustion(String),
}
