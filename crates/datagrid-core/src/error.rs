use thiserror::Error;

/// Failures surfaced by grid execution and configuration.
///
/// Validation failures on submitted filter values are deliberately absent:
/// the pipeline recovers from them locally (see [`crate::binding::FieldError`]).
#[derive(Debug, Error)]
pub enum GridError {
    /// Grid definition is unusable (missing accessor, bad route, invalid builder input).
    #[error("grid configuration error: {0}")]
    Configuration(String),
    #[error("no grid registered under id {0}")]
    UnknownGrid(String),
    #[error("malformed grid id: {0}")]
    MalformedGridId(String),
    #[error("invalid ordering: {0}")]
    InvalidOrdering(String),
    #[error("filter predicate {filter} failed: {message}")]
    Predicate { filter: String, message: String },
    #[error("query source error: {0}")]
    Source(String),
}

impl GridError {
    pub fn configuration(message: impl Into<String>) -> Self {
        GridError::Configuration(message.into())
    }

    pub fn source(message: impl Into<String>) -> Self {
        GridError::Source(message.into())
    }

    /// Client errors are caused by the request and are not worth retrying server side.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            GridError::UnknownGrid(_) | GridError::MalformedGridId(_) | GridError::InvalidOrdering(_)
        )
    }
}

/// Cache backend failures. The result cache never lets these escape a request.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache entry corrupt: {0}")]
    Corrupt(String),
    #[error("cache backend error: {0}")]
    Backend(String),
}
