use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NavigateError {
    #[error("failed to launch browser: {0}")]
    Launch(#[source] std::io::Error),

    #[error("browser timed out after {0:?}")]
    Timeout(Duration),

    #[error("browser exited with {status}: {stderr}")]
    Exited { status: String, stderr: String },

    #[error("{0}")]
    Other(String),
}

/// Drives a browser to a URL and reports where it ended up.
///
/// Map services redirect a search URL to a place URL that carries the
/// coordinates, so the final URL is all the resolver needs.
#[async_trait]
pub trait Navigator: Send + Sync {
    /// Load `url`, give the page `settle` to finish redirecting, and return
    /// the final URL.
    async fn navigate(&self, url: &str, settle: Duration) -> Result<String, NavigateError>;

    fn name(&self) -> &str;
}
