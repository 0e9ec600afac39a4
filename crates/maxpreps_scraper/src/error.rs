use thiserror::Error;

/// A fetch that failed on every attempt.
///
/// Carries only owned strings so it can be cloned into per-link and
/// per-region reports.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("timed out fetching {url}")]
    Timeout { url: String },

    #[error("network error fetching {url}: {message}")]
    Network { url: String, message: String },

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl FetchError {
    pub fn status(status: u16, url: impl Into<String>) -> Self {
        Self::Status {
            status,
            url: url.into(),
        }
    }

    pub fn network(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            message: message.into(),
        }
    }

    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::network(url, err.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("unknown region code: {0}")]
    InvalidRegion(String),

    #[error("invalid run date {0:?}, expected M/D/YYYY")]
    InvalidDate(String),

    /// A spawned resolution task panicked or was aborted.
    #[error("worker task failed: {0}")]
    Worker(String),
}

pub type ScrapeResult<T> = Result<T, ScrapeError>;
