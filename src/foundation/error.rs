/// Convenience result type used across Celgraph.
pub type CelgraphResult<T> = Result<T, CelgraphError>;

/// Top-level error taxonomy used by engine APIs.
///
/// Every fault is detected locally and surfaced immediately; nothing inside
/// the rewrite loop catches and downgrades an error. A fault aborts the
/// optimization run for the whole tree.
#[derive(thiserror::Error, Debug)]
pub enum CelgraphError {
    /// Invariant violation in the task DAG itself: a required surface missing
    /// where one must exist, a cyclic sub-task reference, an out-of-range id,
    /// or a rewrite that failed to converge. Indicates a programming error
    /// upstream; not retried.
    #[error("structural error: {0}")]
    Structural(String),

    /// No execution backend satisfies a node's declared capability set.
    /// The pipeline never guesses a fallback backend.
    #[error("unsupported configuration: {0}")]
    Unsupported(String),

    /// A pixel buffer of the requested size could not be created.
    /// Retry/backoff, if any, is the render-job driver's responsibility.
    #[error("allocation error: {0}")]
    Allocation(String),

    /// Wrapped lower-level error from dependencies.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CelgraphError {
    /// Build a [`CelgraphError::Structural`] value.
    pub fn structural(msg: impl Into<String>) -> Self {
        Self::Structural(msg.into())
    }

    /// Build a [`CelgraphError::Unsupported`] value.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Build a [`CelgraphError::Allocation`] value.
    pub fn allocation(msg: impl Into<String>) -> Self {
        Self::Allocation(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
