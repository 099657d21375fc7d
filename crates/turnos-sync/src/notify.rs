//! Best-effort run notifications over the Telegram bot API.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::SyncError;

const TELEGRAM_API: &str = "https://api.telegram.org";
const SEND_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn from_parts(token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(SEND_TIMEOUT)
                .build()
                .unwrap_or_default(),
            api_base: TELEGRAM_API.to_string(),
            token: token.into(),
            chat_id: chat_id.into(),
        }
    }

    /// Point at a different API host (tests, self-hosted bot API servers).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub async fn send(&self, text: &str) -> Result<(), SyncError> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.token);
        let body = json!({ "chat_id": self.chat_id, "text": text });

        // The token is part of the URL; keep it out of error messages.
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| SyncError::from(e.without_url()))?;

        let status = resp.status();
        let parsed: Option<ApiResponse> = resp.json().await.ok();
        match parsed {
            Some(ApiResponse { ok: true, .. }) if status.is_success() => Ok(()),
            other => Err(SyncError::Server {
                status: status.as_u16(),
                body: other
                    .and_then(|r| r.description)
                    .unwrap_or_else(|| "unexpected response".to_string()),
            }),
        }
    }
}

impl fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("api_base", &self.api_base)
            .field("token", &"***")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

/// Run-summary delivery. Disabled when no bot token or chat is configured.
#[derive(Debug, Default)]
pub struct Notifier {
    telegram: Option<TelegramNotifier>,
}

impl Notifier {
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Enabled only when both parts are present and non-blank.
    pub fn from_config(token: Option<&str>, chat_id: Option<&str>) -> Self {
        let present = |v: Option<&str>| v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
        match (present(token), present(chat_id)) {
            (Some(token), Some(chat)) => Self {
                telegram: Some(TelegramNotifier::from_parts(token, chat)),
            },
            _ => Self::disabled(),
        }
    }

    pub fn with_telegram(telegram: TelegramNotifier) -> Self {
        Self {
            telegram: Some(telegram),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.telegram.is_some()
    }

    /// Deliver `text`. Failures are logged, never raised; returns whether the
    /// message went out.
    pub async fn notify(&self, text: &str) -> bool {
        let Some(telegram) = &self.telegram else {
            info!("notifications disabled, skipping run summary delivery");
            return false;
        };
        match telegram.send(text).await {
            Ok(()) => {
                info!("run summary delivered");
                true
            }
            Err(e) => {
                warn!(error = %e, "failed to deliver run summary");
                false
            }
        }
    }
}
