//! File-backed event store.
//!
//! The whole store is a single JSON object keyed by event id. Every write
//! rewrites that document: the new content goes to a temp file in the same
//! directory, which is fsynced and renamed over the store. A sidecar
//! `<store>.lock` file carries an advisory lock so that load-mutate-save
//! cycles from separate processes serialize instead of losing updates.

use crate::error::{Result, ToolError};
use crate::memory::event::{MemoryEvent, StoredEvent};
use fs2::FileExt;
use serde_json::{Map, Value};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const DEFAULT_STORE_PATH: &str = ".pieces_store.json";

#[derive(Debug, Clone)]
pub struct EventStore {
    path: PathBuf,
}

impl EventStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn add_event(&self, title: &str, payload: Map<String, Value>) -> Result<String> {
        let _lock = self.lock(true)?;

        let mut events = self.load()?;
        let event = MemoryEvent::new(title, payload);
        let id = event.id.clone();
        events.push(event);
        self.save(&events)?;

        tracing::debug!(id = %id, count = events.len(), path = %self.path.display(), "Stored event");
        Ok(id)
    }

    pub fn query(&self, keywords: &str) -> Result<Vec<MemoryEvent>> {
        let terms: Vec<String> = keywords.split_whitespace().map(str::to_lowercase).collect();

        let matches: Vec<MemoryEvent> = self
            .events()?
            .into_iter()
            .filter(|event| event.matches(&terms))
            .collect();

        tracing::debug!(keywords, matched = matches.len(), "Queried event store");
        Ok(matches)
    }

    /// All events in store order.
    pub fn events(&self) -> Result<Vec<MemoryEvent>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let _lock = self.lock(false)?;
        self.load()
    }

    pub fn get(&self, id: &str) -> Result<Option<MemoryEvent>> {
        Ok(self.events()?.into_iter().find(|event| event.id == id))
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        self.path.with_file_name(name)
    }

    /// Exclusive locks create the store directory and the sidecar. A shared
    /// lock falls back to the existing sidecar opened read-only, and to an
    /// unlocked read when the directory is not writable at all.
    fn lock(&self, exclusive: bool) -> Result<Option<File>> {
        let lock_path = self.lock_path();

        if exclusive {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|e| ToolError::io(parent, e))?;
            }
        }

        let file = match OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
        {
            Ok(file) => file,
            Err(e) if !exclusive && is_read_only(&e) => match File::open(&lock_path) {
                Ok(file) => file,
                Err(_) => {
                    tracing::warn!(
                        path = %lock_path.display(),
                        "Lock file not writable; reading event store unlocked"
                    );
                    return Ok(None);
                }
            },
            Err(e) => return Err(ToolError::io(&lock_path, e)),
        };

        let locked = if exclusive {
            file.lock_exclusive()
        } else {
            file.lock_shared()
        };
        locked.map_err(|source| ToolError::LockFailed {
            path: lock_path,
            source,
        })?;

        // Released when the handle is dropped.
        Ok(Some(file))
    }

    fn load(&self) -> Result<Vec<MemoryEvent>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ToolError::io(&self.path, e)),
        };

        let corrupt = |source: serde_json::Error| ToolError::CorruptStore {
            path: self.path.clone(),
            source,
        };

        let document: Map<String, Value> = serde_json::from_str(&content).map_err(corrupt)?;

        document
            .into_iter()
            .map(|(id, record)| -> Result<MemoryEvent> {
                let stored: StoredEvent = serde_json::from_value(record).map_err(corrupt)?;
                Ok(MemoryEvent::from_stored(id, stored))
            })
            .collect()
    }

    fn save(&self, events: &[MemoryEvent]) -> Result<()> {
        let mut document = Map::new();
        for event in events {
            let record = serde_json::to_value(event.to_stored())
                .map_err(|e| ToolError::Other(e.into()))?;
            document.insert(event.id.clone(), record);
        }
        let content = serde_json::to_string_pretty(&document)
            .map_err(|e| ToolError::Other(e.into()))?;

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));

        // Removed on drop unless persisted.
        let mut temp = tempfile::Builder::new()
            .prefix(".mcphub-store-")
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(|e| ToolError::io(dir, e))?;
        temp.write_all(content.as_bytes())
            .map_err(|e| ToolError::io(temp.path(), e))?;
        if let Ok(metadata) = fs::metadata(&self.path) {
            temp.as_file()
                .set_permissions(metadata.permissions())
                .map_err(|e| ToolError::io(temp.path(), e))?;
        }
        temp.as_file()
            .sync_all()
            .map_err(|e| ToolError::io(temp.path(), e))?;

        temp.persist(&self.path)
            .map_err(|e| ToolError::io(&self.path, e.error))?;

        Ok(())
    }
}

fn is_read_only(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::PermissionDenied | std::io::ErrorKind::ReadOnlyFilesystem
    )
}
