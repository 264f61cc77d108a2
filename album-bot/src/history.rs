use crate::types::Result;
use std::collections::HashSet;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use tracing::{debug, info};

/// Durable set of album identities that have already been posted.
///
/// The file holds a JSON list of strings and is rewritten in full after every
/// mutation, so a restart never reposts something that was already shown.
pub struct HistoryStore {
    path: PathBuf,
    entries: HashSet<String>,
}

impl HistoryStore {
    /// Load the store from `path`. A missing file is an empty history.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => HashSet::new(),
            Ok(contents) => {
                let list: Vec<String> = serde_json::from_str(&contents)?;
                list.into_iter().collect()
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No history at {}, starting empty", path.display());
                HashSet::new()
            }
            Err(e) => return Err(e.into()),
        };

        debug!("Loaded {} history entries from {}", entries.len(), path.display());
        Ok(Self { path, entries })
    }

    pub fn has(&self, id: &str) -> bool {
        self.entries.contains(id)
    }

    pub fn add(&mut self, id: &str) -> Result<()> {
        if self.entries.insert(id.to_string()) {
            self.persist()?;
        }
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        self.persist()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn persist(&self) -> Result<()> {
        let mut list: Vec<&String> = self.entries.iter().collect();
        list.sort();
        let json = serde_json::to_vec(&list)?;

        // Write beside the target and rename over it so a crash mid-write
        // leaves the previous history intact.
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;

        debug!("Persisted {} history entries to {}", list.len(), self.path.display());
        Ok(())
    }
}
