use thiserror::Error;

/// Caller-facing resolution errors.
///
/// Dependency failures never surface here: they are absorbed into the trace
/// and the caller receives a well-formed [`crate::model::ResolutionResult`].
/// The only hard error is invalid caller input.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Required input missing or empty after normalization. Maps to 400.
    #[error("missing required parameter: {0}")]
    MissingParameters(&'static str),
}

pub type ResolveResult<T> = Result<T, ResolveError>;
