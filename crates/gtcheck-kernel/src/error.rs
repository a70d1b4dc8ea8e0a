//! Error types for kernel operations.

/// Why a call-expression string did not parse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallSyntaxError {
    #[error("empty call expression")]
    Empty,

    /// The text parsed up to `offset` but what follows is not part of a call.
    #[error("unexpected input at byte {offset}: {near:?}")]
    Unexpected { offset: usize, near: String },

    /// The expression is well-formed but its callee is not a name or attribute.
    #[error("expression is not a call on a named method")]
    NotACall,
}
