//! JSON file backed release store.
//!
//! All records live in a single `releases.json` inside the state directory:
//!
//! ```json
//! {"version":1,"mods":{"101":{"release_id":"5551","version":"1234","announced_at":"..."}}}
//! ```
//!
//! The file is rewritten through a temporary file and an atomic rename, so a
//! crash mid-write never leaves a truncated state behind.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::common::error::{StorageError, StorageResult};
use crate::common::{ModId, SeenRecord};
use crate::store::ReleaseStore;

/// File name of the state file inside the state directory.
pub const STATE_FILE: &str = "releases.json";

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Deserialize)]
struct StateFile {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    mods: BTreeMap<ModId, SeenRecord>,
}

#[derive(Debug, Serialize)]
struct StateFileRef<'a> {
    version: u32,
    mods: &'a BTreeMap<ModId, SeenRecord>,
}

/// Release store persisted as one JSON document, mirrored in memory.
#[derive(Debug)]
pub struct JsonReleaseStore {
    path: PathBuf,
    records: BTreeMap<ModId, SeenRecord>,
}

impl JsonReleaseStore {
    /// Open the store in `dir`, creating the directory if needed.
    ///
    /// Fails if the directory cannot be created or written to. An unreadable
    /// or corrupt state file is logged and treated as empty.
    pub fn open(dir: impl AsRef<Path>) -> StorageResult<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|source| io_error(dir, source))?;
        probe_writable(dir)?;

        let path = dir.join(STATE_FILE);
        let records = match load(&path) {
            Ok(records) => records,
            Err(e @ StorageError::Corrupt { .. }) => {
                warn!("{}; starting with empty state", e);
                quarantine(&path);
                BTreeMap::new()
            }
            Err(e) => {
                warn!("{}; starting with empty state", e);
                BTreeMap::new()
            }
        };

        info!("Loaded {} release records from {}", records.len(), path.display());

        Ok(Self { path, records })
    }

    /// Path of the backing state file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, records: &BTreeMap<ModId, SeenRecord>) -> StorageResult<()> {
        let content = serde_json::to_vec_pretty(&StateFileRef {
            version: FORMAT_VERSION,
            mods: records,
        })?;

        let tmp_path = self.path.with_extension("json.tmp");
        let write = || -> std::io::Result<()> {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&content)?;
            file.sync_all()?;
            fs::rename(&tmp_path, &self.path)
        };

        write().map_err(|source| {
            let _ = fs::remove_file(&tmp_path);
            io_error(&self.path, source)
        })
    }
}

impl ReleaseStore for JsonReleaseStore {
    fn get(&self, mod_id: ModId) -> StorageResult<Option<SeenRecord>> {
        Ok(self.records.get(&mod_id).cloned())
    }

    fn set(&mut self, mod_id: ModId, record: SeenRecord) -> StorageResult<()> {
        let mut next = self.records.clone();
        next.insert(mod_id, record);

        // Memory only follows disk, so a failed write is retried next cycle.
        self.persist(&next)?;
        self.records = next;

        debug!("Stored release record for mod {}", mod_id);
        Ok(())
    }

    fn recent(&self, limit: usize) -> Vec<(ModId, SeenRecord)> {
        let mut records: Vec<(ModId, SeenRecord)> = self
            .records
            .iter()
            .map(|(id, record)| (*id, record.clone()))
            .collect();
        records.sort_by(|a, b| b.1.announced_at.cmp(&a.1.announced_at));
        records.truncate(limit);
        records
    }
}

fn load(path: &Path) -> StorageResult<BTreeMap<ModId, SeenRecord>> {
    let content = match fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No state file at {}, nothing seen yet", path.display());
            return Ok(BTreeMap::new());
        }
        Err(source) => return Err(io_error(path, source)),
    };

    let state: StateFile =
        serde_json::from_slice(&content).map_err(|source| StorageError::Corrupt {
            path: path.display().to_string(),
            source,
        })?;

    if state.version > FORMAT_VERSION {
        warn!(
            "State file {} has newer format version {}, reading known fields only",
            path.display(),
            state.version
        );
    }

    Ok(state.mods)
}

/// Move a corrupt state file aside so it is not overwritten by the next save.
fn quarantine(path: &Path) {
    let backup = path.with_extension("json.corrupt");
    match fs::rename(path, &backup) {
        Ok(()) => warn!("Moved corrupt state file to {}", backup.display()),
        Err(e) => warn!("Failed to move corrupt state file aside: {}", e),
    }
}

/// Fail early when the state directory is not writable.
fn probe_writable(dir: &Path) -> StorageResult<()> {
    let probe = dir.join(".write-probe");
    fs::write(&probe, b"ok").map_err(|source| io_error(dir, source))?;
    let _ = fs::remove_file(&probe);
    Ok(())
}

fn io_error(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        source,
    }
}
