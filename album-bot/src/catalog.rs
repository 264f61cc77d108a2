use crate::http::{expect_success, HttpClient};
use crate::types::{AlbumRecord, BotError, CatalogMatch, Result, SpotifyCredentials};
use async_trait::async_trait;
use interfaces::defs::CatalogLookup;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const SEARCH_URL: &str = "https://api.spotify.com/v1/search";

/// Refresh the token this long before Spotify says it expires.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Strip diacritics so "Björk" searches as "Bjork".
pub fn normalize_query(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    albums: AlbumPage,
}

#[derive(Debug, Deserialize)]
struct AlbumPage {
    #[serde(default)]
    items: Vec<SpotifyAlbum>,
}

#[derive(Debug, Deserialize)]
struct SpotifyAlbum {
    #[serde(default)]
    external_urls: ExternalUrls,
    #[serde(default)]
    images: Vec<SpotifyImage>,
}

#[derive(Debug, Default, Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SpotifyImage {
    url: String,
    width: Option<u32>,
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Spotify Web API album search using the client-credentials flow.
pub struct SpotifyCatalog {
    http: HttpClient,
    credentials: SpotifyCredentials,
    token: Arc<RwLock<Option<CachedToken>>>,
}

impl SpotifyCatalog {
    pub fn new(http: HttpClient, credentials: SpotifyCredentials) -> Self {
        Self {
            http,
            credentials,
            token: Arc::new(RwLock::new(None)),
        }
    }

    async fn access_token(&self) -> Result<String> {
        {
            let cached = self.token.read().await;
            if let Some(token) = cached.as_ref() {
                if Instant::now() < token.refresh_at {
                    return Ok(token.value.clone());
                }
            }
        }

        let mut cached = self.token.write().await;
        // Another task may have refreshed while we waited for the lock.
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        let response = self
            .http
            .send("spotify token", |client| {
                client
                    .post(TOKEN_URL)
                    .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
                    .form(&[("grant_type", "client_credentials")])
            })
            .await?;
        let response = expect_success("spotify token", response).await?;
        let token: TokenResponse = response.json().await?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        debug!("Refreshed spotify token, valid for {:?}", lifetime);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }

    async fn search_album(&self, name: &str, artist: &str) -> Result<Option<CatalogMatch>> {
        let token = self.access_token().await?;
        let query = format!("album:{} artist:{}", normalize_query(name), normalize_query(artist));

        let response = self
            .http
            .send("spotify search", |client| {
                client
                    .get(SEARCH_URL)
                    .bearer_auth(&token)
                    .query(&[("q", query.as_str()), ("type", "album"), ("limit", "1")])
            })
            .await?;
        let response = expect_success("spotify search", response).await?;
        let results: SearchResponse = response.json().await?;

        let Some(album) = results.albums.items.into_iter().next() else {
            return Ok(None);
        };

        let mut images = album.images;
        images.sort_by(|a, b| b.width.unwrap_or(0).cmp(&a.width.unwrap_or(0)));

        Ok(Some(CatalogMatch {
            link: album.external_urls.spotify,
            images: images.into_iter().map(|image| image.url).collect(),
        }))
    }
}

#[async_trait]
impl CatalogLookup for SpotifyCatalog {
    fn catalog_name(&self) -> &str {
        "Spotify"
    }

    async fn search(&self, name: &str, artist: &str) -> anyhow::Result<Option<CatalogMatch>> {
        Ok(self.search_album(name, artist).await?)
    }
}

/// Link and cover art found for an album. Both empty when nothing was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enrichment {
    pub link: Option<String>,
    pub cover_url: Option<String>,
    /// Catalog the link points into, when it came from one.
    pub source: Option<String>,
}

impl Enrichment {
    pub fn apply(&self, album: &AlbumRecord) -> AlbumRecord {
        let mut album = album.clone();
        if album.external_link.is_none() {
            album.external_link = self.link.clone();
        }
        if album.cover_url.is_none() {
            album.cover_url = self.cover_url.clone();
        }
        album
    }
}

/// Best-effort lookup of links and art. Never fails.
pub struct Enricher {
    catalog: Arc<dyn CatalogLookup>,
}

impl Enricher {
    pub fn new(catalog: Arc<dyn CatalogLookup>) -> Self {
        Self { catalog }
    }

    pub async fn enrich(&self, album: &AlbumRecord) -> Enrichment {
        match self.catalog.search(&album.name, &album.artist).await {
            Ok(Some(found)) => {
                info!("{} match for {}: {:?}", self.catalog.catalog_name(), album.label(), found.link);
                Enrichment {
                    source: found.link.as_ref().map(|_| self.catalog.catalog_name().to_string()),
                    link: found.link,
                    cover_url: found.images.into_iter().next(),
                }
            }
            Ok(None) => {
                info!("No {} match for {}", self.catalog.catalog_name(), album.label());
                Enrichment::default()
            }
            Err(e) => {
                let error = BotError::CatalogLookupFailed {
                    album: album.label(),
                    reason: e.to_string(),
                };
                warn!("{}, posting without link", error);
                Enrichment::default()
            }
        }
    }
}
