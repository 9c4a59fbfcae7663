use std::error::Error as StdError;

/// Crate-wide result type for directory operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Snapshot file could not be read or written.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Snapshot (de)serialization failed.
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    /// A live query against the vendor data source failed.
    #[error("vendor directory query failed: {context}: {source}")]
    Vendor {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn vendor(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Vendor {
            context: context.into(),
            source: Box::new(source),
        }
    }
}
