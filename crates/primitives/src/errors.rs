//! Errors during parsing of primitives.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PrimitivesError {
    /// Provider name outside the closed set of known variants.
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("unknown provider kind: {0}")]
    UnknownProviderKind(String),

    #[error("unknown role: {0}")]
    UnknownRole(String),
}
