use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("HTTP request failed: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("git {command} failed: {detail}")]
    Git { command: String, detail: String },

    #[error("failed to run git: {0}")]
    Spawn(#[from] std::io::Error),
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        SyncError::Http(Box::new(e))
    }
}

impl SyncError {
    /// Network failures and 5xx responses are worth another attempt; a 4xx
    /// will not change on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            SyncError::Http(_) => true,
            SyncError::Server { status, .. } => *status >= 500,
            SyncError::Git { .. } | SyncError::Spawn(_) => false,
        }
    }
}
