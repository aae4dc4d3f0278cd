use thiserror::Error;

/// Errors surfaced by the OpenDAP client and ASCII parser.
#[derive(Debug, Error)]
pub enum OpendapError {
    #[error("upstream request failed with status {status}")]
    UpstreamHttp { status: u16 },

    #[error("upstream not ready: {message}")]
    UpstreamNotReady { message: String },

    #[error("failed to parse OpenDAP response: {0}")]
    Parse(String),

    #[error("PNG encoder failed: {0}")]
    EncoderUnavailable(String),

    #[error(transparent)]
    Request(#[from] reqwest::Error),
}

/// Errors surfaced by the cache store.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("value too large to chunk automatically ({size} bytes)")]
    ValueTooLarge { size: usize },

    #[error("cache backend error: {0}")]
    Backend(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
