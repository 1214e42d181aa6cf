use thiserror::Error;

/// A selector could not be constructed.
///
/// This is the only fatal error in the crate. Everything that goes wrong
/// during a call is reported as a [`Warning`](crate::Warning) instead.
#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
pub enum InvalidArgumentError {
    /// No compute function was provided.
    #[error("invalid arguments: a compute function is required, use .compute() to set it")]
    MissingCompute,
    /// No dependents deriver was provided.
    #[error("invalid arguments: a dependents deriver is required, use .dependents() to set it")]
    MissingDependents,
}

/// A specialized `Result` type for selector construction.
pub type Result<T> = std::result::Result<T, InvalidArgumentError>;
