//! Rating aggregation for the most recent album post.
//!
//! Only one post is tracked at a time. Publishing a new album replaces the
//! tracked post and drops the previous tally; reactions on older posts are
//! ignored from then on, so their last displayed average stays frozen.

use crate::types::{BotError, PostId, ReactionChange, ReactionEvent, Result, UserId};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

const KEYCAPS: [&str; 10] = [
    "1\u{fe0f}\u{20e3}",
    "2\u{fe0f}\u{20e3}",
    "3\u{fe0f}\u{20e3}",
    "4\u{fe0f}\u{20e3}",
    "5\u{fe0f}\u{20e3}",
    "6\u{fe0f}\u{20e3}",
    "7\u{fe0f}\u{20e3}",
    "8\u{fe0f}\u{20e3}",
    "9\u{fe0f}\u{20e3}",
    "\u{1f51f}",
];

/// Ordered set of rating symbols. The symbol at index `i` stands for rating `i + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingScale {
    symbols: Vec<String>,
}

impl RatingScale {
    /// Keycap emoji scale from 1 up to `size` (at most 10).
    pub fn keycaps(size: usize) -> Result<Self> {
        if size == 0 || size > KEYCAPS.len() {
            return Err(BotError::Config(format!(
                "rating scale must be between 1 and {}, got {}",
                KEYCAPS.len(),
                size
            )));
        }
        Ok(Self {
            symbols: KEYCAPS[..size].iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn from_symbols(symbols: Vec<String>) -> Result<Self> {
        if symbols.is_empty() {
            return Err(BotError::Config("rating scale needs at least one symbol".to_string()));
        }
        let mut seen = Vec::with_capacity(symbols.len());
        for symbol in &symbols {
            let key = strip_variation_selectors(symbol);
            if seen.contains(&key) {
                return Err(BotError::Config(format!("duplicate rating symbol {}", symbol)));
            }
            seen.push(key);
        }
        Ok(Self { symbols })
    }

    pub fn max_rating(&self) -> u8 {
        self.symbols.len() as u8
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Rating for `emoji`, if it is one of the scale's symbols.
    pub fn rating_for(&self, emoji: &str) -> Option<u8> {
        let wanted = strip_variation_selectors(emoji);
        self.symbols
            .iter()
            .position(|symbol| strip_variation_selectors(symbol) == wanted)
            .map(|index| index as u8 + 1)
    }

    pub fn first(&self) -> &str {
        &self.symbols[0]
    }

    pub fn last(&self) -> &str {
        &self.symbols[self.symbols.len() - 1]
    }
}

// Keycaps arrive both with and without U+FE0F depending on the client.
fn strip_variation_selectors(emoji: &str) -> String {
    emoji.chars().filter(|c| *c != '\u{fe0f}').collect()
}

/// What the post's footer should show for the current tally.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RatingSummary {
    NoRatings,
    Average { average: f64, votes: usize },
}

impl RatingSummary {
    fn from_tally(tally: &HashMap<UserId, u8>) -> Self {
        if tally.is_empty() {
            return Self::NoRatings;
        }
        let votes = tally.len();
        let sum: u32 = tally.values().map(|r| *r as u32).sum();
        // Halves go to the even digit: 9/8 shows as 1.12, 11/8 as 1.38.
        let average = ((sum as f64 / votes as f64) * 100.0).round_ties_even() / 100.0;
        Self::Average { average, votes }
    }

    pub fn render(&self, scale: &RatingScale) -> String {
        match self {
            Self::NoRatings => format!(
                "No ratings yet. React with {} to {} to rate!",
                scale.first(),
                scale.last()
            ),
            Self::Average { average, votes } => format!(
                "Average rating: {} \u{2b50} from {} votes.",
                AverageDisplay(*average),
                votes
            ),
        }
    }
}

/// Prints whole numbers with one decimal place (`3.0`) and everything else as is (`4.33`).
struct AverageDisplay(f64);

impl fmt::Display for AverageDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.fract() == 0.0 {
            write!(f, "{:.1}", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// New footer for a post after its tally changed.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingUpdate {
    pub post_id: PostId,
    pub summary: RatingSummary,
    pub footer: String,
}

#[derive(Debug)]
enum TrackingState {
    Idle,
    Tracking {
        post_id: PostId,
        album_label: String,
        tally: HashMap<UserId, u8>,
    },
}

/// Keeps the per-user ratings of the active post.
///
/// Not synchronised itself; callers serialise access (see `Bot`).
#[derive(Debug)]
pub struct RatingAggregator {
    scale: RatingScale,
    state: TrackingState,
}

impl RatingAggregator {
    pub fn new(scale: RatingScale) -> Self {
        Self {
            scale,
            state: TrackingState::Idle,
        }
    }

    pub fn scale(&self) -> &RatingScale {
        &self.scale
    }

    /// Start tracking a freshly published post, discarding the previous one.
    pub fn register_post(&mut self, post_id: PostId, album_label: impl Into<String>) {
        let album_label = album_label.into();
        if let TrackingState::Tracking {
            post_id: old,
            album_label: old_label,
            tally,
        } = &self.state
        {
            debug!("Post {} ({}) retired with {} ratings", old, old_label, tally.len());
        }
        info!("Tracking ratings for {} on post {}", album_label, post_id);
        self.state = TrackingState::Tracking {
            post_id,
            album_label,
            tally: HashMap::new(),
        };
    }

    pub fn active_post(&self) -> Option<&PostId> {
        match &self.state {
            TrackingState::Idle => None,
            TrackingState::Tracking { post_id, .. } => Some(post_id),
        }
    }

    /// Current rating of `user_id` on the active post.
    pub fn rating_of(&self, user_id: &UserId) -> Option<u8> {
        match &self.state {
            TrackingState::Idle => None,
            TrackingState::Tracking { tally, .. } => tally.get(user_id).copied(),
        }
    }

    pub fn summary(&self) -> RatingSummary {
        match &self.state {
            TrackingState::Idle => RatingSummary::NoRatings,
            TrackingState::Tracking { tally, .. } => RatingSummary::from_tally(tally),
        }
    }

    /// Apply one reaction change. Returns the footer to display, or `None` when
    /// the event does not concern the active post's ratings.
    pub fn apply_reaction(&mut self, event: &ReactionEvent) -> Option<RatingUpdate> {
        if event.is_bot {
            return None;
        }

        let TrackingState::Tracking { post_id, tally, .. } = &mut self.state else {
            return None;
        };
        if *post_id != event.post_id {
            return None;
        }

        let rating = self.scale.rating_for(&event.emoji)?;

        match event.change {
            ReactionChange::Added => {
                tally.insert(event.user_id.clone(), rating);
            }
            ReactionChange::Removed => {
                // A late removal of a symbol the user already switched away from
                // must not drop their current rating.
                if tally.get(&event.user_id) == Some(&rating) {
                    tally.remove(&event.user_id);
                }
            }
        }
        debug!(
            "Post {}: {:?} {} by {}, {} ratings",
            post_id,
            event.change,
            rating,
            event.user_id,
            tally.len()
        );

        let summary = RatingSummary::from_tally(tally);
        Some(RatingUpdate {
            post_id: post_id.clone(),
            summary,
            footer: summary.render(&self.scale),
        })
    }
}
