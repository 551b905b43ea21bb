//! Persistence of announced releases.

pub mod json;

pub use json::JsonReleaseStore;

use crate::common::error::StorageResult;
use crate::common::{ModId, SeenRecord};

/// Keyed record of the last release announced per mod.
///
/// The watcher is the only writer.
pub trait ReleaseStore: Send + Sync {
    /// Last announced release for a mod, if any.
    fn get(&self, mod_id: ModId) -> StorageResult<Option<SeenRecord>>;

    /// Record an announcement. The record is durable once this returns `Ok`.
    fn set(&mut self, mod_id: ModId, record: SeenRecord) -> StorageResult<()>;

    /// Most recently announced releases, newest first.
    fn recent(&self, limit: usize) -> Vec<(ModId, SeenRecord)>;
}
