//! Outbound collaborators: upstream page fetches, run notifications, and
//! publishing the dataset repository.

mod error;
pub use error::SyncError;

pub mod git;
pub use git::{GitPublisher, PublishOutcome, redact_credentials};

#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "http")]
pub mod notify;

#[cfg(feature = "http")]
pub use http::{HttpFetcher, RetryPolicy};
#[cfg(feature = "http")]
pub use notify::{Notifier, TelegramNotifier};

#[cfg(all(test, feature = "http"))]
pub(crate) mod test_server;
