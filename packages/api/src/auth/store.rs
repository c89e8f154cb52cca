//! # Session persistence
//!
//! A signed-in session lives in two places:
//!
//! | Slot | Contents | Lifetime |
//! |------|----------|----------|
//! | durable record | [`DurableSession`] as JSON | until logout or detected expiry |
//! | mirror | [`MirroredToken`] | max-age of one TTL, renewed with the record |
//!
//! The mirror is a projection of the durable record. It is rewritten from the
//! record on every restore and renewal and never read back as a source of truth.
//!
//! [`FileSessionStore`] lays both slots out under one directory:
//!
//! ```text
//! <data_dir>/
//! ├── session.json     # durable record
//! └── session.cookie   # mirrored token
//! ```

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use ledger::Identity;
use serde::{Deserialize, Serialize};

/// The durable session record.
///
/// `expires_at` stays textual so a corrupt value can be told apart from a
/// corrupt document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DurableSession {
    pub identity: Identity,
    pub token: String,
    #[serde(default)]
    pub expires_at: Option<String>,
}

/// The short-lived copy of the session token.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MirroredToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Storage for the two session slots. The record is handled as raw text.
pub trait SessionStore: Send + 'static {
    fn read_record(&self) -> io::Result<Option<String>>;
    fn write_record(&mut self, json: &str) -> io::Result<()>;
    fn clear_record(&mut self) -> io::Result<()>;

    fn read_mirror(&self) -> io::Result<Option<MirroredToken>>;
    fn write_mirror(&mut self, mirror: &MirroredToken) -> io::Result<()>;
    fn clear_mirror(&mut self) -> io::Result<()>;
}

/// In-memory session storage for tests. Clones share state.
#[derive(Clone, Debug, Default)]
pub struct MemorySessionStore {
    inner: Arc<Mutex<MemorySlots>>,
}

#[derive(Debug, Default)]
struct MemorySlots {
    record: Option<String>,
    mirror: Option<MirroredToken>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the durable slot with arbitrary text.
    pub fn with_record(json: &str) -> Self {
        let store = Self::default();
        store.lock().record = Some(json.to_string());
        store
    }

    pub fn record(&self) -> Option<String> {
        self.lock().record.clone()
    }

    pub fn mirror(&self) -> Option<MirroredToken> {
        self.lock().mirror.clone()
    }

    /// Overwrite the mirror directly, bypassing the lifecycle.
    pub fn set_mirror(&self, mirror: Option<MirroredToken>) {
        self.lock().mirror = mirror;
    }

    fn lock(&self) -> MutexGuard<'_, MemorySlots> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SessionStore for MemorySessionStore {
    fn read_record(&self) -> io::Result<Option<String>> {
        Ok(self.lock().record.clone())
    }

    fn write_record(&mut self, json: &str) -> io::Result<()> {
        self.lock().record = Some(json.to_string());
        Ok(())
    }

    fn clear_record(&mut self) -> io::Result<()> {
        self.lock().record = None;
        Ok(())
    }

    fn read_mirror(&self) -> io::Result<Option<MirroredToken>> {
        Ok(self.lock().mirror.clone())
    }

    fn write_mirror(&mut self, mirror: &MirroredToken) -> io::Result<()> {
        self.lock().mirror = Some(mirror.clone());
        Ok(())
    }

    fn clear_mirror(&mut self) -> io::Result<()> {
        self.lock().mirror = None;
        Ok(())
    }
}

/// Filesystem-backed session storage for the command-line client.
#[derive(Clone, Debug)]
pub struct FileSessionStore {
    base: PathBuf,
}

impl FileSessionStore {
    pub fn new(base: PathBuf) -> Self {
        Self { base }
    }

    fn record_path(&self) -> PathBuf {
        self.base.join("session.json")
    }

    fn mirror_path(&self) -> PathBuf {
        self.base.join("session.cookie")
    }

    fn write(&self, path: PathBuf, contents: &str) -> io::Result<()> {
        std::fs::create_dir_all(&self.base)?;
        std::fs::write(path, contents)
    }
}

fn read_optional(path: &Path) -> io::Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn remove_optional(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

impl SessionStore for FileSessionStore {
    fn read_record(&self) -> io::Result<Option<String>> {
        read_optional(&self.record_path())
    }

    fn write_record(&mut self, json: &str) -> io::Result<()> {
        self.write(self.record_path(), json)
    }

    fn clear_record(&mut self) -> io::Result<()> {
        remove_optional(&self.record_path())
    }

    /// An unreadable mirror reads as absent; it is re-derived on restore anyway.
    fn read_mirror(&self) -> io::Result<Option<MirroredToken>> {
        Ok(read_optional(&self.mirror_path())?
            .and_then(|text| serde_json::from_str(&text).ok()))
    }

    fn write_mirror(&mut self, mirror: &MirroredToken) -> io::Result<()> {
        let json = serde_json::to_string(mirror).map_err(io::Error::other)?;
        self.write(self.mirror_path(), &json)
    }

    fn clear_mirror(&mut self) -> io::Result<()> {
        remove_optional(&self.mirror_path())
    }
}
