use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One row of the album list, as read from the spreadsheet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumRecord {
    pub name: String,
    pub artist: String,
    pub suggester: Option<String>,
    pub external_link: Option<String>,
    pub cover_url: Option<String>,
}

impl AlbumRecord {
    pub fn new(name: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            artist: artist.into(),
            suggester: None,
            external_link: None,
            cover_url: None,
        }
    }

    /// Key used to remember that this album was already posted.
    pub fn identity(&self) -> &str {
        self.name.trim()
    }

    /// Rows with a blank name or artist are never posted.
    pub fn is_postable(&self) -> bool {
        !self.name.trim().is_empty() && !self.artist.trim().is_empty()
    }

    pub fn label(&self) -> String {
        format!("{} - {}", self.artist.trim(), self.name.trim())
    }
}

/// Opaque handle of a published post.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostId(pub String);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReactionChange {
    Added,
    Removed,
}

/// A reaction being added to or removed from some post.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReactionEvent {
    pub post_id: PostId,
    pub user_id: UserId,
    pub emoji: String,
    pub change: ReactionChange,
    pub is_bot: bool,
}

/// Result of a catalog search.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CatalogMatch {
    pub link: Option<String>,
    /// Largest image first.
    pub images: Vec<String>,
}

/// Everything needed to render an album announcement on a chat platform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Announcement {
    pub title: String,
    pub url: Option<String>,
    pub description: String,
    pub cover_url: Option<String>,
    pub footer: String,
}

/// Read-only source of candidate albums.
#[async_trait]
pub trait AlbumSource: Send + Sync {
    async fn fetch_albums(&self) -> Result<Vec<AlbumRecord>>;
}

/// External music catalog used to find links and cover art.
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    fn catalog_name(&self) -> &str;

    /// `Ok(None)` when nothing matched.
    async fn search(&self, name: &str, artist: &str) -> Result<Option<CatalogMatch>>;
}

/// The chat platform the announcements are posted to.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    async fn send(&self, announcement: &Announcement) -> Result<PostId>;

    async fn add_reaction_option(&self, post_id: &PostId, emoji: &str) -> Result<()>;

    async fn edit_footer(&self, post_id: &PostId, footer: &str) -> Result<()>;
}
