use std::{path::PathBuf, sync::Arc, time::Duration};

use {async_trait::async_trait, tokio::sync::Mutex, tracing::warn};

use crate::{Error, Result};

/// Fetch attempts before a lazy fetch is recorded as failed.
const FETCH_ATTEMPTS: usize = 3;
/// Fixed backoff between attempts.
const FETCH_BACKOFF: Duration = Duration::from_secs(1);

/// One deferred vendor fetch: download, decrypt, or transcode, whatever it
/// takes to turn a media reference into a local file.
///
/// Implementations are invoked at most [`FETCH_ATTEMPTS`] times total,
/// across the lifetime of the owning [`LazyMedia`].
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn fetch(&self) -> Result<PathBuf>;

    /// Short label for logs ("wcf image 123", "cdn voice …").
    fn describe(&self) -> String;
}

enum FetchState {
    Pending(Arc<dyn MediaSource>),
    Fetched(PathBuf),
    Failed(String),
}

/// A media payload that is materialized on first consumption.
///
/// The fetch runs at most once: concurrent callers serialize on the state
/// lock, a success is cached, and a failure is sticky: later calls return
/// the recorded error instead of re-downloading.
pub struct LazyMedia {
    state: Mutex<FetchState>,
}

impl LazyMedia {
    #[must_use]
    pub fn deferred(source: Arc<dyn MediaSource>) -> Self {
        Self {
            state: Mutex::new(FetchState::Pending(source)),
        }
    }

    /// Wrap a file the vendor already delivered to local disk.
    #[must_use]
    pub fn resolved(path: impl Into<PathBuf>) -> Self {
        Self {
            state: Mutex::new(FetchState::Fetched(path.into())),
        }
    }

    /// Materialize the payload, fetching it if this is the first consumer.
    pub async fn materialize(&self) -> Result<PathBuf> {
        let mut state = self.state.lock().await;
        let source = match &*state {
            FetchState::Fetched(path) => return Ok(path.clone()),
            FetchState::Failed(message) => return Err(Error::failed(message.clone())),
            FetchState::Pending(source) => Arc::clone(source),
        };

        let mut last_error = String::new();
        for attempt in 1..=FETCH_ATTEMPTS {
            match source.fetch().await {
                Ok(path) => {
                    *state = FetchState::Fetched(path.clone());
                    return Ok(path);
                }
                Err(e) if e.is_too_large() => {
                    // Size rejections are final, retrying cannot help.
                    *state = FetchState::Failed(e.to_string());
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        media = %source.describe(),
                        attempt,
                        error = %e,
                        "media fetch attempt failed"
                    );
                    last_error = e.to_string();
                    if attempt < FETCH_ATTEMPTS {
                        tokio::time::sleep(FETCH_BACKOFF).await;
                    }
                }
            }
        }

        *state = FetchState::Failed(last_error.clone());
        Err(Error::failed(last_error))
    }

    /// Whether materialization already happened (successfully or not).
    pub async fn is_settled(&self) -> bool {
        !matches!(&*self.state.lock().await, FetchState::Pending(_))
    }
}

impl std::fmt::Debug for LazyMedia {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state.try_lock() {
            Ok(guard) => match &*guard {
                FetchState::Pending(source) => format!("Pending({})", source.describe()),
                FetchState::Fetched(path) => format!("Fetched({})", path.display()),
                FetchState::Failed(message) => format!("Failed({message})"),
            },
            Err(_) => "<fetching>".to_string(),
        };
        f.debug_struct("LazyMedia").field("state", &state).finish()
    }
}
