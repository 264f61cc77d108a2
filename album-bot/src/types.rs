use chrono::NaiveTime;
use std::path::PathBuf;
use std::time::Duration;

pub use interfaces::defs::{
    AlbumRecord, Announcement, CatalogMatch, PostId, ReactionChange, ReactionEvent, UserId,
};

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "Album-Bot/1.0".to_string(),
            timeout_seconds: 30,
            max_retries: 3,
            retry_delay_seconds: 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SheetConfig {
    pub spreadsheet_id: String,
    pub range: String,
    pub api_key: String,
    /// 1-based row holding the column names.
    pub header_row: usize,
}

#[derive(Debug, Clone)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone)]
pub struct DiscordConfig {
    pub token: String,
    pub channel_id: String,
}

/// Restart policy for supervised background tasks.
#[derive(Debug, Clone)]
pub struct RestartPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    /// A run lasting at least this long resets the backoff.
    pub healthy_after: Duration,
    /// `None` restarts forever.
    pub max_restarts: Option<u32>,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(5),
            max_interval: Duration::from_secs(300),
            healthy_after: Duration::from_secs(600),
            max_restarts: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub discord: DiscordConfig,
    pub sheet: SheetConfig,
    pub spotify: Option<SpotifyCredentials>,
    pub post_time: NaiveTime,
    pub rating_scale: usize,
    pub history_path: PathBuf,
    pub post_now: bool,
    pub http: HttpConfig,
    pub restart: RestartPolicy,
}

#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Album source unavailable: {0}")]
    DataSourceUnavailable(String),

    #[error("Album sheet is malformed: {0}")]
    Schema(String),

    #[error("Catalog lookup failed for {album}: {reason}")]
    CatalogLookupFailed { album: String, reason: String },

    #[error("No candidate albums to choose from")]
    NoCandidates,

    #[error("Publishing failed: {0}")]
    PublishFailed(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Supervised task gave up: {0}")]
    Supervisor(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BotError>;
