//! Error types for tidal_component

use thiserror::Error;

use tidal_core::ReactiveError;

/// Errors raised while rendering a component
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComponentError {
    /// A feedback builder read a looped input its output never supplies
    #[error("the looped input `{key}` has no matching output")]
    MissingOutput { key: String },

    /// `Component::output` selected a key the component does not make available
    #[error("`{key}` is not available on this component")]
    Unavailable { key: String },

    /// An output or looped input was used at a different type than it holds
    #[error("`{key}` is not a {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    /// A reactive invariant failed while tying off outputs
    #[error(transparent)]
    Reactive(#[from] ReactiveError),
}

/// Result type for tidal_component operations
pub type Result<T> = std::result::Result<T, ComponentError>;
