use crate::types::{
    BotConfig, BotError, DiscordConfig, HttpConfig, RestartPolicy, Result, SheetConfig, SpotifyCredentials,
};
use chrono::NaiveTime;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments. Every option can also come from the environment.
#[derive(Parser, Debug, Clone)]
#[command(name = "album-bot")]
#[command(about = "Posts a daily album to a Discord channel and tallies emoji ratings")]
#[command(version)]
pub struct Args {
    /// Discord bot token
    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true)]
    pub discord_token: String,

    /// Channel the albums are posted to
    #[arg(long, env = "CHANNEL_ID")]
    pub channel_id: String,

    /// Local time of day to post at, HH:MM
    #[arg(long, env = "POST_TIME", default_value = "20:00")]
    pub post_time: String,

    /// Google spreadsheet holding the album list
    #[arg(long, env = "GOOGLE_SHEET_ID")]
    pub sheet_id: String,

    /// Range or worksheet name to read
    #[arg(long, env = "GOOGLE_SHEET_RANGE", default_value = "Sheet1")]
    pub sheet_range: String,

    /// Google API key with read access to the sheet
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    pub google_api_key: String,

    /// 1-based row holding the column names
    #[arg(long, env = "HEADER_ROW", default_value_t = 1)]
    pub header_row: usize,

    #[arg(long, env = "SPOTIFY_CLIENT_ID")]
    pub spotify_client_id: Option<String>,

    #[arg(long, env = "SPOTIFY_CLIENT_SECRET", hide_env_values = true)]
    pub spotify_client_secret: Option<String>,

    /// Number of rating symbols (1 to 10)
    #[arg(long, env = "RATING_SCALE", default_value_t = 5)]
    pub rating_scale: usize,

    /// File remembering which albums were already posted
    #[arg(long, env = "HISTORY_FILE", default_value = "posted_albums.json")]
    pub history_file: PathBuf,

    /// Post one album right away, then follow the daily schedule
    #[arg(long, env = "POST_NOW")]
    pub post_now: bool,
}

pub fn parse_post_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value.trim(), "%H:%M:%S"))
        .map_err(|_| BotError::Config(format!("POST_TIME must look like HH:MM, got '{}'", value)))
}

fn required(name: &str, value: String) -> Result<String> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(BotError::Config(format!("{} must not be empty", name)));
    }
    Ok(value)
}

impl Args {
    pub fn into_config(self) -> Result<BotConfig> {
        let spotify = match (self.spotify_client_id, self.spotify_client_secret) {
            (Some(client_id), Some(client_secret)) => Some(SpotifyCredentials {
                client_id: required("SPOTIFY_CLIENT_ID", client_id)?,
                client_secret: required("SPOTIFY_CLIENT_SECRET", client_secret)?,
            }),
            (None, None) => None,
            _ => {
                return Err(BotError::Config(
                    "SPOTIFY_CLIENT_ID and SPOTIFY_CLIENT_SECRET must be set together".to_string(),
                ))
            }
        };

        if !(1..=10).contains(&self.rating_scale) {
            return Err(BotError::Config(format!(
                "RATING_SCALE must be between 1 and 10, got {}",
                self.rating_scale
            )));
        }
        if self.header_row == 0 {
            return Err(BotError::Config("HEADER_ROW is 1-based".to_string()));
        }

        Ok(BotConfig {
            discord: DiscordConfig {
                token: required("DISCORD_TOKEN", self.discord_token)?,
                channel_id: required("CHANNEL_ID", self.channel_id)?,
            },
            sheet: SheetConfig {
                spreadsheet_id: required("GOOGLE_SHEET_ID", self.sheet_id)?,
                range: required("GOOGLE_SHEET_RANGE", self.sheet_range)?,
                api_key: required("GOOGLE_API_KEY", self.google_api_key)?,
                header_row: self.header_row,
            },
            spotify,
            post_time: parse_post_time(&self.post_time)?,
            rating_scale: self.rating_scale,
            history_path: self.history_file,
            post_now: self.post_now,
            http: HttpConfig::default(),
            restart: RestartPolicy::default(),
        })
    }
}
