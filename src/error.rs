use thiserror::Error;

/// Errors from the fetch client and everything built on it.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Request cancelled")]
    Cancelled,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid module path or version: {0}")]
    InvalidPath(String),

    #[error("Cache I/O error: {0}")]
    Cache(#[from] std::io::Error),

    #[error("Corrupt cache entry: {0}")]
    CorruptCache(String),
}

impl FetchError {
    /// The HTTP status carried by this error, if it is a status error.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Reports whether the upstream said the resource does not exist (404 or 410).
    pub fn is_not_found(&self) -> bool {
        matches!(self.status(), Some(404 | 410))
    }
}

/// Errors from the registry store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database lock poisoned")]
    LockPoisoned,

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors from resolving the latest version of one module.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no versions from proxy")]
    NoVersions,

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl ResolveError {
    /// Soft errors are recorded on the module instead of aborting a run.
    pub fn is_soft(&self) -> bool {
        match self {
            ResolveError::NoVersions => true,
            ResolveError::Fetch(e) => e.is_not_found(),
        }
    }
}

/// Errors that abort an update run.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("Registry error: {0}")]
    Store(#[from] StoreError),

    #[error("Reading feed: {0}")]
    Feed(FetchError),

    #[error("Resolving {path}: {source}")]
    Resolve {
        path: String,
        #[source]
        source: ResolveError,
    },
}
