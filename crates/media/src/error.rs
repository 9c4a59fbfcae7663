/// Crate-wide result type for media operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Media exceeds the configured byte ceiling. Never retried.
    #[error("media too large: {size} bytes exceeds limit of {limit}")]
    TooLarge { size: u64, limit: u64 },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A fetch gave up after its bounded retries, or was already recorded
    /// as failed by an earlier materialization attempt.
    #[error("media fetch failed: {message}")]
    Failed { message: String },
}

impl Error {
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    /// True when the failure is the explicit size-ceiling rejection, which
    /// callers surface to the conversation instead of retrying.
    #[must_use]
    pub fn is_too_large(&self) -> bool {
        matches!(self, Self::TooLarge { .. })
    }
}
