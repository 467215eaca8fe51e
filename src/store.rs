// Canonical store: single-slot snapshot with atomic replace

use crate::data::{CanonicalRecord, Snapshot};
use crate::error::StoreError;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Single-slot snapshot storage.
///
/// `write` fully supersedes the prior snapshot; readers get an `Arc` to one
/// complete snapshot and never see a partial write.
pub trait SnapshotStore: Send + Sync {
    fn read(&self) -> Result<Arc<Snapshot>, StoreError>;
    fn write(&self, snapshot: Snapshot) -> Result<(), StoreError>;
}

/// The committed snapshot slot shared by both store implementations.
#[derive(Debug, Default)]
struct Slot {
    current: RwLock<Option<Arc<Snapshot>>>,
    writer: Mutex<()>,
}

impl Slot {
    fn get(&self) -> Result<Arc<Snapshot>, StoreError> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        guard.clone().ok_or(StoreError::NotFound)
    }

    fn swap(&self, snapshot: Arc<Snapshot>) {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(snapshot);
    }
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slot: Slot,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStore {
    fn read(&self) -> Result<Arc<Snapshot>, StoreError> {
        self.slot.get()
    }

    fn write(&self, snapshot: Snapshot) -> Result<(), StoreError> {
        let _writer = self.slot.writer.lock().unwrap_or_else(|e| e.into_inner());
        self.slot.swap(Arc::new(snapshot));
        Ok(())
    }
}

/// JSON-file store. The record array lives at `path`; the content
/// fingerprint lives next to it in `<path>.sha256`.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    fingerprint_path: PathBuf,
    slot: Slot,
}

impl FileStore {
    /// Open a store at `path`, loading any snapshot already committed there.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path: PathBuf = path.into();
        let mut fingerprint_path = path.clone().into_os_string();
        fingerprint_path.push(".sha256");

        let store = Self {
            path,
            fingerprint_path: fingerprint_path.into(),
            slot: Slot::default(),
        };

        if let Some(snapshot) = store.load()? {
            debug!(path = %store.path.display(), records = snapshot.len(), "loaded snapshot");
            store.slot.swap(Arc::new(snapshot));
        }
        Ok(store)
    }

    fn load(&self) -> Result<Option<Snapshot>, StoreError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let records: Vec<CanonicalRecord> = serde_json::from_reader(BufReader::new(file))?;

        let fingerprint = match fs::read_to_string(&self.fingerprint_path) {
            Ok(text) => Some(text.trim().to_string()).filter(|s| !s.is_empty()),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        Ok(Some(Snapshot::new(records, fingerprint)))
    }

    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }

    /// Stage output in a temp file beside `target`, then rename it over
    /// `target`.
    fn commit_file(
        &self,
        target: &Path,
        write: impl FnOnce(&mut dyn Write) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        let tmp = NamedTempFile::new_in(self.directory())?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            write(&mut writer)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(target).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }
}

impl SnapshotStore for FileStore {
    fn read(&self) -> Result<Arc<Snapshot>, StoreError> {
        self.slot.get()
    }

    fn write(&self, mut snapshot: Snapshot) -> Result<(), StoreError> {
        let _writer = self.slot.writer.lock().unwrap_or_else(|e| e.into_inner());

        // A stale fingerprint must never outlive the records it described.
        match fs::remove_file(&self.fingerprint_path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        self.commit_file(&self.path, |w| {
            serde_json::to_writer_pretty(w, &snapshot.records)?;
            Ok(())
        })?;

        // Records are committed; without a sidecar the next identical ingest
        // simply re-normalizes.
        if let Some(fingerprint) = snapshot.fingerprint.clone() {
            let committed = self.commit_file(&self.fingerprint_path, |w| {
                w.write_all(fingerprint.as_bytes())?;
                Ok(())
            });
            if let Err(e) = committed {
                warn!(
                    path = %self.fingerprint_path.display(),
                    error = %e,
                    "failed to record content fingerprint"
                );
                snapshot.fingerprint = None;
            }
        }

        info!(path = %self.path.display(), records = snapshot.len(), "committed snapshot");
        self.slot.swap(Arc::new(snapshot));
        Ok(())
    }
}
