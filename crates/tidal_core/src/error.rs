//! Error types for tidal_core

use thiserror::Error;

use crate::placeholder::Kind;

/// Invariant violations raised by the reactive primitives
///
/// Every variant is a programmer error surfaced at the call that broke the
/// invariant. Nothing in the core retries or swallows them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReactiveError {
    /// `resolve` was called on a future that already holds a value
    #[error(
        "a future can not be resolved twice: already resolved with {existing}, now resolved with {attempted}"
    )]
    DoubleResolution { existing: String, attempted: String },

    /// `replace_with` was called on a placeholder that is already bound
    #[error("a {kind} placeholder can only be replaced once")]
    DoubleBinding { kind: Kind },

    /// A placeholder was read before anything was bound to it
    #[error("{kind} placeholder was used before it was bound")]
    Unbound { kind: Kind },
}

/// Result type for tidal_core operations
pub type Result<T> = std::result::Result<T, ReactiveError>;
