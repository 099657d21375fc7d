//! Command-line and environment configuration.
//!
//! Every option can come from a flag or the environment (`.env` included);
//! secrets are read but never echoed by `--help` or logs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Args;

#[derive(Debug, Clone, Args)]
pub struct Paths {
    /// Repository holding the published data; git runs here.
    #[arg(long, env = "REPO_PATH", default_value = ".", global = true)]
    pub repo_path: PathBuf,

    /// Canonical dataset file, relative to the repository.
    #[arg(long, env = "DATASET_PATH", default_value = "data/farmacias_turno.json", global = true)]
    pub dataset_path: PathBuf,

    /// Localities index file, relative to the repository.
    #[arg(long, env = "LOCALITIES_PATH", default_value = "data/localidades.json", global = true)]
    pub localities_path: PathBuf,

    #[arg(long, env = "CACHE_PATH", default_value = "coordenadas_cache.json", global = true)]
    pub cache_path: PathBuf,

    /// Hand-maintained schedule files in dataset shape.
    #[arg(long, env = "SOURCES_DIR", default_value = "sources", global = true)]
    pub sources_dir: PathBuf,

    #[arg(long, env = "LOG_DIR", default_value = "logs", global = true)]
    pub log_dir: PathBuf,
}

impl Paths {
    pub fn dataset(&self) -> PathBuf {
        in_repo(&self.repo_path, &self.dataset_path)
    }

    pub fn localities(&self) -> PathBuf {
        in_repo(&self.repo_path, &self.localities_path)
    }
}

fn in_repo(repo: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        repo.join(path)
    }
}

#[derive(Debug, Clone, Args)]
pub struct GeoArgs {
    #[arg(long, env = "CHROME_BIN", default_value = "chromium")]
    pub chrome_bin: String,

    /// Seconds the map page gets to redirect before its URL is read.
    #[arg(long, env = "SETTLE_SECS", default_value_t = 5)]
    pub settle_secs: u64,

    /// Look up again addresses whose earlier lookup failed.
    #[arg(long)]
    pub retry_unresolved: bool,
}

impl GeoArgs {
    pub fn settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }
}

#[derive(Debug, Clone, Args)]
pub struct PublishArgs {
    /// Push URL, credentials included. Defaults to the repository's origin.
    #[arg(long, env = "GIT_REMOTE", hide_env_values = true)]
    pub git_remote: Option<String>,

    #[arg(long, env = "GIT_BRANCH", default_value = "main")]
    pub git_branch: String,

    /// Write the dataset but skip commit and push.
    #[arg(long)]
    pub no_publish: bool,
}

#[derive(Debug, Clone, Args)]
pub struct NotifyArgs {
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub telegram_bot_token: Option<String>,

    #[arg(long, env = "TELEGRAM_CHAT_ID")]
    pub telegram_chat_id: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct ProvinceArg {
    /// Province the localities index files entries under.
    #[arg(long, env = "PROVINCE", default_value = "Buenos Aires")]
    pub province: String,
}
