use crate::aggregator::{RatingAggregator, RatingScale, RatingSummary, RatingUpdate};
use crate::catalog::Enricher;
use crate::history::HistoryStore;
use crate::publisher::{compose, Publisher};
use crate::scheduler::ScheduledJob;
use crate::selector::{record_selection, AlbumSelector};
use crate::types::{AlbumRecord, BotError, PostId, ReactionEvent, Result};
use async_trait::async_trait;
use interfaces::defs::{AlbumSource, CatalogLookup, ChatPlatform};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

/// A post that went out successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedPost {
    pub post_id: PostId,
    pub album: AlbumRecord,
}

/// Ties the album pipeline and the rating aggregator together.
///
/// One instance per process, shared by the scheduler and the reaction consumer.
/// All aggregator access goes through one lock that is held across the footer
/// edit, so displayed footers always match a complete tally and land in order.
pub struct Bot {
    source: Arc<dyn AlbumSource>,
    enricher: Enricher,
    publisher: Publisher,
    scale: RatingScale,
    selector: Mutex<AlbumSelector>,
    history: Mutex<HistoryStore>,
    aggregator: Mutex<RatingAggregator>,
}

impl Bot {
    pub fn new(
        source: Arc<dyn AlbumSource>,
        catalog: Arc<dyn CatalogLookup>,
        chat: Arc<dyn ChatPlatform>,
        history: HistoryStore,
        scale: RatingScale,
    ) -> Self {
        Self::with_selector(source, catalog, chat, history, scale, AlbumSelector::new())
    }

    pub fn with_selector(
        source: Arc<dyn AlbumSource>,
        catalog: Arc<dyn CatalogLookup>,
        chat: Arc<dyn ChatPlatform>,
        history: HistoryStore,
        scale: RatingScale,
        selector: AlbumSelector,
    ) -> Self {
        Self {
            source,
            enricher: Enricher::new(catalog),
            publisher: Publisher::new(chat),
            aggregator: Mutex::new(RatingAggregator::new(scale.clone())),
            scale,
            selector: Mutex::new(selector),
            history: Mutex::new(history),
        }
    }

    async fn load_candidates(&self) -> Result<Vec<AlbumRecord>> {
        self.source.fetch_albums().await.map_err(|e| match e.downcast::<BotError>() {
            Ok(BotError::Schema(reason)) => BotError::Schema(reason),
            Ok(other) => BotError::DataSourceUnavailable(other.to_string()),
            Err(other) => BotError::DataSourceUnavailable(format!("{:#}", other)),
        })
    }

    /// Pick, enrich, and publish the next album, then start tracking its ratings.
    pub async fn post_next_album(&self) -> Result<PublishedPost> {
        let candidates = self.load_candidates().await?;

        let selection = {
            let mut selector = self.selector.lock().await;
            let mut history = self.history.lock().await;
            let selection = selector.select(&candidates, &history)?;
            // Recorded before publishing so a crash never leads to a repost.
            record_selection(&mut history, &selection)?;
            selection
        };
        if selection.history_exhausted {
            info!("History was reset, a new cycle starts with {}", selection.album.label());
        }

        let enrichment = self.enricher.enrich(&selection.album).await;
        let album = enrichment.apply(&selection.album);
        let announcement = compose(&album, &enrichment, &self.scale);

        let post_id = {
            // Hold the aggregator while sending so reactions on the new post
            // wait until it is registered instead of being dropped.
            let mut aggregator = self.aggregator.lock().await;
            let post_id = self.publisher.send(&announcement).await?;
            aggregator.register_post(post_id.clone(), album.label());
            post_id
        };

        self.publisher.add_rating_options(&post_id, &self.scale).await;
        info!("Published {} as {}", album.label(), post_id);

        Ok(PublishedPost { post_id, album })
    }

    /// Apply a reaction and refresh the post's footer if the tally changed.
    pub async fn handle_reaction(&self, event: &ReactionEvent) -> Option<RatingUpdate> {
        let mut aggregator = self.aggregator.lock().await;
        let update = aggregator.apply_reaction(event)?;

        if let Err(e) = self.publisher.update_footer(&update.post_id, &update.footer).await {
            warn!("{}", e);
        }
        Some(update)
    }

    /// Consume reactions one at a time, in the order they were received.
    pub async fn process_reactions(&self, mut events: mpsc::Receiver<ReactionEvent>) {
        while let Some(event) = events.recv().await {
            if self.handle_reaction(&event).await.is_none() {
                debug!("Ignored reaction {} on {}", event.emoji, event.post_id);
            }
        }
        info!("Reaction stream closed");
    }

    pub async fn active_post(&self) -> Option<PostId> {
        self.aggregator.lock().await.active_post().cloned()
    }

    pub async fn rating_summary(&self) -> RatingSummary {
        self.aggregator.lock().await.summary()
    }

    pub async fn history_len(&self) -> usize {
        self.history.lock().await.len()
    }

    pub async fn is_posted(&self, album: &AlbumRecord) -> bool {
        self.history.lock().await.has(album.identity())
    }
}

#[async_trait]
impl ScheduledJob for Bot {
    fn job_name(&self) -> String {
        "daily album post".to_string()
    }

    async fn run(&self) -> Result<()> {
        self.post_next_album().await.map(|_| ())
    }
}
