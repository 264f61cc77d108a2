#![allow(dead_code)]

// In-memory stand-ins for the spreadsheet, catalog and chat platform.

use album_bot::types::{AlbumRecord, Announcement, BotError, CatalogMatch, PostId};
use anyhow::anyhow;
use async_trait::async_trait;
use interfaces::defs::{AlbumSource, CatalogLookup, ChatPlatform};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn album(name: &str, artist: &str) -> AlbumRecord {
    AlbumRecord::new(name, artist)
}

pub fn sample_albums() -> Vec<AlbumRecord> {
    vec![
        album("OK Computer", "Radiohead"),
        album("Homogenic", "Björk"),
        album("Blue", "Joni Mitchell"),
    ]
}

pub enum SourceBehaviour {
    Albums(Vec<AlbumRecord>),
    Unreachable,
    MissingColumn,
}

pub struct FakeSource {
    pub behaviour: SourceBehaviour,
}

impl FakeSource {
    pub fn with_albums(albums: Vec<AlbumRecord>) -> Self {
        Self {
            behaviour: SourceBehaviour::Albums(albums),
        }
    }
}

#[async_trait]
impl AlbumSource for FakeSource {
    async fn fetch_albums(&self) -> anyhow::Result<Vec<AlbumRecord>> {
        match &self.behaviour {
            SourceBehaviour::Albums(albums) => Ok(albums.clone()),
            SourceBehaviour::Unreachable => Err(anyhow!("connection refused")),
            SourceBehaviour::MissingColumn => Err(BotError::Schema("missing required column 'Artist'".to_string()).into()),
        }
    }
}

pub enum CatalogBehaviour {
    Found(CatalogMatch),
    NotFound,
    Failing,
}

pub struct FakeCatalog {
    pub behaviour: CatalogBehaviour,
    pub queries: Mutex<Vec<(String, String)>>,
}

impl FakeCatalog {
    pub fn new(behaviour: CatalogBehaviour) -> Self {
        Self {
            behaviour,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn found(link: &str, images: &[&str]) -> Self {
        Self::new(CatalogBehaviour::Found(CatalogMatch {
            link: Some(link.to_string()),
            images: images.iter().map(|s| s.to_string()).collect(),
        }))
    }
}

#[async_trait]
impl CatalogLookup for FakeCatalog {
    fn catalog_name(&self) -> &str {
        "Spotify"
    }

    async fn search(&self, name: &str, artist: &str) -> anyhow::Result<Option<CatalogMatch>> {
        self.queries.lock().unwrap().push((name.to_string(), artist.to_string()));
        match &self.behaviour {
            CatalogBehaviour::Found(found) => Ok(Some(found.clone())),
            CatalogBehaviour::NotFound => Ok(None),
            CatalogBehaviour::Failing => Err(anyhow!("401 invalid client")),
        }
    }
}

#[derive(Default)]
pub struct FakeChat {
    fail_send: AtomicBool,
    next_id: AtomicU64,
    pub sent: Mutex<Vec<(PostId, Announcement)>>,
    pub reactions: Mutex<Vec<(PostId, String)>>,
    pub edits: Mutex<Vec<(PostId, String)>>,
}

impl FakeChat {
    pub fn failing() -> Self {
        Self {
            fail_send: AtomicBool::new(true),
            ..Default::default()
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_send.store(failing, Ordering::SeqCst);
    }

    pub fn last_sent(&self) -> Option<Announcement> {
        self.sent.lock().unwrap().last().map(|(_, a)| a.clone())
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn edits_for(&self, post_id: &PostId) -> Vec<String> {
        self.edits
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == post_id)
            .map(|(_, footer)| footer.clone())
            .collect()
    }
}

#[async_trait]
impl ChatPlatform for FakeChat {
    async fn send(&self, announcement: &Announcement) -> anyhow::Result<PostId> {
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(anyhow!("403 missing access"));
        }
        let id = PostId(format!("post-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1));
        self.sent.lock().unwrap().push((id.clone(), announcement.clone()));
        Ok(id)
    }

    async fn add_reaction_option(&self, post_id: &PostId, emoji: &str) -> anyhow::Result<()> {
        self.reactions.lock().unwrap().push((post_id.clone(), emoji.to_string()));
        Ok(())
    }

    async fn edit_footer(&self, post_id: &PostId, footer: &str) -> anyhow::Result<()> {
        self.edits.lock().unwrap().push((post_id.clone(), footer.to_string()));
        Ok(())
    }
}
