use crate::history::HistoryStore;
use crate::types::{AlbumRecord, BotError, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

/// Outcome of picking the next album.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub album: AlbumRecord,
    /// Every postable album was already in the history. The caller must clear
    /// the history before recording this selection.
    pub history_exhausted: bool,
}

/// Picks the next album uniformly at random among those not yet posted.
///
/// Selection never touches the history; recording the choice is up to the caller.
pub struct AlbumSelector<R = StdRng> {
    rng: R,
}

impl AlbumSelector<StdRng> {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl Default for AlbumSelector<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> AlbumSelector<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    pub fn select(&mut self, candidates: &[AlbumRecord], history: &HistoryStore) -> Result<Selection> {
        if candidates.is_empty() {
            return Err(BotError::NoCandidates);
        }

        let unposted: Vec<&AlbumRecord> = candidates
            .iter()
            .filter(|album| album.is_postable() && !history.has(album.identity()))
            .collect();

        if let Some(album) = unposted.choose(&mut self.rng) {
            debug!("Picked {} out of {} unposted albums", album.label(), unposted.len());
            return Ok(Selection {
                album: (*album).clone(),
                history_exhausted: false,
            });
        }

        // Everything has been posted: start a new cycle over the full list.
        let postable: Vec<&AlbumRecord> = candidates.iter().filter(|album| album.is_postable()).collect();
        match postable.choose(&mut self.rng) {
            Some(album) => {
                info!(
                    "All {} albums have been posted, starting over with {}",
                    postable.len(),
                    album.label()
                );
                Ok(Selection {
                    album: (*album).clone(),
                    history_exhausted: true,
                })
            }
            None => Err(BotError::NoCandidates),
        }
    }
}

/// Record a selection in the history, resetting it first when the cycle is over.
pub fn record_selection(history: &mut HistoryStore, selection: &Selection) -> Result<()> {
    if selection.history_exhausted {
        history.clear()?;
    }
    history.add(selection.album.identity())
}
