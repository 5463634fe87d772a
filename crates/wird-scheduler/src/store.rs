//! File-based tenant store: one JSON document holding every tenant record.
//! Human-readable; rewritten atomically (temp file + rename) on each mutation.
//! The in-memory map is authoritative: a failed write is logged, never fatal.
//! Inside a tokio runtime the file write runs on the blocking pool, so the
//! async store lock is never held across disk I/O.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use wird_core::error::{Result, WirdError};
use wird_core::tenant::{TenantId, TenantRecord};

/// Store shared between the scheduler loop and the bot front-end.
pub type SharedStore = Arc<Mutex<TenantStore>>;

const FILE_NAME: &str = "tenants.json";

/// JSON-file tenant store keyed by chat id.
pub struct TenantStore {
    file: PathBuf,
    tenants: BTreeMap<TenantId, TenantRecord>,
    generation: u64,
    writer: Arc<FileWriter>,
}

/// Serialises writes of the backing file; an older snapshot never replaces a newer one.
struct FileWriter {
    file: PathBuf,
    written: std::sync::Mutex<u64>,
}

impl FileWriter {
    fn write(&self, generation: u64, json: &str) -> Result<()> {
        let mut written = self.written.lock().unwrap_or_else(|e| e.into_inner());
        if generation <= *written {
            return Ok(());
        }
        let tmp = self.file.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .map_err(|e| WirdError::Persistence(format!("write {}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, &self.file)
            .map_err(|e| WirdError::Persistence(format!("rename to {}: {e}", self.file.display())))?;
        *written = generation;
        Ok(())
    }
}

impl TenantStore {
    /// Open (or create) the store in `dir`.
    ///
    /// A file that exists but cannot be parsed is an error rather than an
    /// empty store, so the next save cannot clobber it.
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let file = dir.join(FILE_NAME);
        let tenants = if file.exists() {
            let json = std::fs::read_to_string(&file)?;
            let records: Vec<TenantRecord> = serde_json::from_str(&json).map_err(|e| {
                WirdError::Persistence(format!("failed to parse {}: {e}", file.display()))
            })?;
            records.into_iter().map(|r| (r.id, r)).collect()
        } else {
            BTreeMap::new()
        };
        tracing::info!("📂 Loaded {} tenant(s) from {}", tenants.len(), file.display());
        let writer = Arc::new(FileWriter {
            file: file.clone(),
            written: std::sync::Mutex::new(0),
        });
        Ok(Self {
            file,
            tenants,
            generation: 0,
            writer,
        })
    }

    /// Wrap into the shared handle used by the loop and the bot.
    pub fn shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    /// Path of the backing JSON document.
    pub fn file_path(&self) -> &Path {
        &self.file
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }

    pub fn get(&self, id: TenantId) -> Option<&TenantRecord> {
        self.tenants.get(&id)
    }

    /// Fetch a record, creating (and persisting) an inactive one on first contact.
    pub fn get_or_create(&mut self, id: TenantId) -> TenantRecord {
        if let Some(existing) = self.tenants.get(&id) {
            return existing.clone();
        }
        let record = TenantRecord::new(id);
        self.tenants.insert(id, record.clone());
        tracing::info!("🆕 New tenant {id}");
        self.persist();
        record
    }

    /// Snapshot of every record.
    pub fn list(&self) -> Vec<TenantRecord> {
        self.tenants.values().cloned().collect()
    }

    /// Snapshot of the records the scheduler works on.
    pub fn active(&self) -> Vec<TenantRecord> {
        self.tenants.values().filter(|r| r.active).cloned().collect()
    }

    /// Insert or replace a whole record.
    pub fn upsert(&mut self, record: TenantRecord) {
        self.tenants.insert(record.id, record);
        self.persist();
    }

    /// Read-modify-write a single record, then persist.
    /// Returns `None` when the tenant does not exist.
    pub fn update<R>(&mut self, id: TenantId, f: impl FnOnce(&mut TenantRecord) -> R) -> Option<R> {
        let record = self.tenants.get_mut(&id)?;
        let out = f(record);
        self.persist();
        Some(out)
    }

    /// Read-modify-write every record, then persist once.
    pub fn update_all(&mut self, mut f: impl FnMut(&mut TenantRecord)) {
        self.tenants.values_mut().for_each(&mut f);
        self.persist();
    }

    /// Rewrite the whole document now, on the calling thread.
    pub fn save(&mut self) -> Result<()> {
        let (generation, json) = self.snapshot()?;
        self.writer.write(generation, &json)?;
        tracing::debug!("💾 Saved {} tenants to {}", self.tenants.len(), self.file.display());
        Ok(())
    }

    fn snapshot(&mut self) -> Result<(u64, String)> {
        let records: Vec<&TenantRecord> = self.tenants.values().collect();
        let json = serde_json::to_string_pretty(&records)?;
        self.generation += 1;
        Ok((self.generation, json))
    }

    fn persist(&mut self) {
        let (generation, json) = match self.snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("⚠️ Failed to serialize tenants: {e}");
                return;
            }
        };
        let writer = self.writer.clone();
        let write = move || {
            if let Err(e) = writer.write(generation, &json) {
                tracing::warn!("⚠️ Failed to save tenants: {e}");
            }
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(write);
            }
            Err(_) => write(),
        }
    }
}
