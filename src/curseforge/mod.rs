//! CurseForge integration.
//!
//! Provides the release lookup used by the watcher and the concrete
//! HTTP client talking to the CurseForge v1 API.

pub mod changelog;
pub mod client;
mod types;

pub use client::CurseForgeClient;

use serenity::async_trait;

use crate::common::error::UpstreamResult;
use crate::common::{ModId, ModInfo, Release};

/// Source of release information for mods.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// Latest published release of a mod, `None` when it has no files.
    async fn latest_release(&self, mod_id: ModId) -> UpstreamResult<Option<Release>>;

    /// Display metadata of a mod.
    async fn mod_info(&self, mod_id: ModId) -> UpstreamResult<ModInfo>;

    /// Changelog of a release as markdown-like text, if one was published.
    async fn changelog(&self, mod_id: ModId, release_id: &str) -> UpstreamResult<Option<String>>;
}

/// Public curseforge.com page of a file.
pub fn file_page_url(game_slug: &str, mod_slug: &str, release_id: &str) -> String {
    format!(
        "https://www.curseforge.com/{}/mods/{}/files/{}",
        game_slug, mod_slug, release_id
    )
}
