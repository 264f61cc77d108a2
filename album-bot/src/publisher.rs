use crate::aggregator::RatingScale;
use crate::catalog::Enrichment;
use crate::types::{AlbumRecord, Announcement, BotError, PostId, Result};
use interfaces::defs::ChatPlatform;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

const SPOTIFY_HOST: &str = "open.spotify.com";

/// Name of the service `album`'s link points into, when known.
///
/// A catalog is only credited for the link it found itself; a link typed into
/// the sheet is recognised by its host.
fn link_source(album: &AlbumRecord, enrichment: &Enrichment) -> Option<String> {
    let link = album.external_link.as_deref()?;
    if enrichment.link.as_deref() == Some(link) {
        return enrichment.source.clone();
    }
    let url = Url::parse(link).ok()?;
    (url.host_str() == Some(SPOTIFY_HOST)).then(|| "Spotify".to_string())
}

/// Build the announcement for an album that has already been enriched.
pub fn compose(album: &AlbumRecord, enrichment: &Enrichment, scale: &RatingScale) -> Announcement {
    let mut description = format!("by {}", album.artist.trim());
    if let Some(suggester) = &album.suggester {
        description.push_str(&format!("\nSuggested by {}", suggester));
    }
    description.push_str(&format!(
        "\n\nReact with {} to {} to rate this album!",
        scale.first(),
        scale.last()
    ));

    let footer = match (&album.external_link, link_source(album, enrichment)) {
        (Some(_), Some(source)) => format!("Listen on {}. Ratings will be averaged automatically.", source),
        (Some(_), None) => "Ratings will be averaged automatically.".to_string(),
        (None, _) => "No link found. Ratings will be averaged automatically.".to_string(),
    };

    Announcement {
        title: album.name.trim().to_string(),
        url: album.external_link.clone(),
        description,
        cover_url: album.cover_url.clone(),
        footer,
    }
}

/// Posts announcements and keeps their rating footers up to date.
pub struct Publisher {
    chat: Arc<dyn ChatPlatform>,
}

impl Publisher {
    pub fn new(chat: Arc<dyn ChatPlatform>) -> Self {
        Self { chat }
    }

    pub async fn send(&self, announcement: &Announcement) -> Result<PostId> {
        self.chat
            .send(announcement)
            .await
            .map_err(|e| BotError::PublishFailed(format!("{}: {:#}", announcement.title, e)))
    }

    /// Offer every rating symbol as a reaction. Failures only cost convenience,
    /// users can still add the reactions themselves.
    pub async fn add_rating_options(&self, post_id: &PostId, scale: &RatingScale) {
        for symbol in scale.symbols() {
            if let Err(e) = self.chat.add_reaction_option(post_id, symbol).await {
                warn!("Could not add {} to {}: {:#}", symbol, post_id, e);
            }
        }
        info!("Added {} rating options to {}", scale.symbols().len(), post_id);
    }

    pub async fn update_footer(&self, post_id: &PostId, footer: &str) -> Result<()> {
        self.chat
            .edit_footer(post_id, footer)
            .await
            .map_err(|e| BotError::PublishFailed(format!("footer of {}: {:#}", post_id, e)))
    }
}
