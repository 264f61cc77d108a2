pub mod types;
pub mod history;
pub mod selector;
pub mod aggregator;
pub mod http;
pub mod sheet;
pub mod catalog;
pub mod discord;
pub mod publisher;
pub mod scheduler;
pub mod supervisor;
pub mod shutdown;
pub mod bot;
pub mod config;
pub mod utils;

pub use types::*;
pub use history::HistoryStore;
pub use selector::{AlbumSelector, Selection};
pub use aggregator::{RatingAggregator, RatingScale, RatingSummary, RatingUpdate};
pub use catalog::{Enricher, Enrichment, SpotifyCatalog};
pub use sheet::GoogleSheetsSource;
pub use discord::{DiscordClient, Gateway};
pub use publisher::Publisher;
pub use scheduler::{DailyScheduler, ScheduledJob};
pub use shutdown::Shutdown;
pub use bot::{Bot, PublishedPost};
