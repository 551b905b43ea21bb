//! Shared types used across the application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a mod, assigned by CurseForge.
pub type ModId = u64;

/// Discord channel identifier as configured.
pub type ChannelRef = u64;

/// Metadata describing a tracked mod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModInfo {
    pub id: ModId,
    pub name: String,
    pub slug: String,
    pub logo_url: Option<String>,
}

/// A published file of a mod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    /// CurseForge file id, kept as an opaque string.
    pub id: String,
    pub mod_id: ModId,
    pub version: String,
    pub file_name: String,
    pub published_at: DateTime<Utc>,
    /// Direct download link; absent for files CurseForge does not serve directly.
    pub download_url: Option<String>,
}

/// A release that is about to be announced, with everything the message needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRelease {
    pub mod_info: ModInfo,
    pub release: Release,
    pub changelog: Option<String>,
}

/// Marker of the last release announced for a mod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenRecord {
    pub release_id: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub announced_at: DateTime<Utc>,
}

impl SeenRecord {
    /// Build a record for a release announced just now.
    pub fn for_release(release: &Release) -> Self {
        Self {
            release_id: release.id.clone(),
            version: release.version.clone(),
            announced_at: Utc::now(),
        }
    }
}
