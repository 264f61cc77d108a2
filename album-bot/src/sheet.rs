use crate::http::{expect_success, HttpClient};
use crate::types::{AlbumRecord, BotError, Result, SheetConfig};
use async_trait::async_trait;
use interfaces::defs::AlbumSource;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets/";

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

/// Column positions resolved from the header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetSchema {
    album: usize,
    artist: usize,
    suggester: Option<usize>,
    link: Option<usize>,
}

impl SheetSchema {
    pub fn from_header(header: &[String]) -> Result<Self> {
        let find = |names: &[&str]| {
            header
                .iter()
                .position(|cell| names.iter().any(|name| cell.trim().eq_ignore_ascii_case(name)))
        };

        let album = find(&["Album", "Album Name"])
            .ok_or_else(|| BotError::Schema("missing required column 'Album'".to_string()))?;
        let artist = find(&["Artist"])
            .ok_or_else(|| BotError::Schema("missing required column 'Artist'".to_string()))?;

        Ok(Self {
            album,
            artist,
            suggester: find(&["Suggester", "Suggested By"]),
            link: find(&["Spotify Link", "Link"]),
        })
    }

    fn record(&self, row: &[String]) -> AlbumRecord {
        let cell = |index: usize| row.get(index).map(|v| v.trim().to_string()).unwrap_or_default();
        let optional = |index: Option<usize>| index.map(cell).filter(|v| !v.is_empty());

        AlbumRecord {
            name: cell(self.album),
            artist: cell(self.artist),
            suggester: optional(self.suggester),
            external_link: optional(self.link),
            cover_url: None,
        }
    }
}

/// Turn raw sheet values into album records.
///
/// `header_row` is 1-based. Rows above it are ignored, fully blank rows below it
/// are dropped. Rows with a blank album or artist are kept; the selector skips them.
pub fn parse_rows(values: &[Vec<String>], header_row: usize) -> Result<Vec<AlbumRecord>> {
    if header_row == 0 {
        return Err(BotError::Config("header row is 1-based".to_string()));
    }
    let header = values
        .get(header_row - 1)
        .ok_or_else(|| BotError::Schema(format!("sheet has no row {} to use as header", header_row)))?;
    let schema = SheetSchema::from_header(header)?;

    let records = values
        .iter()
        .skip(header_row)
        .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
        .map(|row| schema.record(row))
        .collect();

    Ok(records)
}

/// Album list kept in a Google Sheet, read through the Sheets values API.
pub struct GoogleSheetsSource {
    http: HttpClient,
    config: SheetConfig,
}

impl GoogleSheetsSource {
    pub fn new(http: HttpClient, config: SheetConfig) -> Self {
        Self { http, config }
    }

    fn values_url(&self) -> Result<Url> {
        let mut url = Url::parse(SHEETS_API)?;
        url.path_segments_mut()
            .map_err(|_| BotError::Config("invalid sheets api url".to_string()))?
            .pop_if_empty()
            .push(&self.config.spreadsheet_id)
            .push("values")
            .push(&self.config.range);
        url.query_pairs_mut().append_pair("key", &self.config.api_key);
        Ok(url)
    }

    async fn load(&self) -> Result<Vec<AlbumRecord>> {
        let url = self.values_url()?;
        let response = self.http.send("sheet fetch", |client| client.get(url.clone())).await?;
        let response = expect_success("sheet fetch", response).await?;
        let range: ValueRange = response.json().await?;
        debug!("Sheet returned {} rows", range.values.len());

        let records = parse_rows(&range.values, self.config.header_row)?;
        info!("Loaded {} albums from sheet", records.len());
        Ok(records)
    }
}

#[async_trait]
impl AlbumSource for GoogleSheetsSource {
    async fn fetch_albums(&self) -> anyhow::Result<Vec<AlbumRecord>> {
        Ok(self.load().await?)
    }
}
