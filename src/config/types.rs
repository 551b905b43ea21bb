//! Configuration type definitions.

use std::path::PathBuf;
use std::time::Duration;

use crate::common::{ChannelRef, ModId};

/// Default CurseForge API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://api.curseforge.com/v1";

/// CurseForge game id for ARK: Survival Ascended.
pub const DEFAULT_GAME_ID: u64 = 828326;

/// Game slug used in curseforge.com file links.
pub const DEFAULT_GAME_SLUG: &str = "ark-survival-ascended";

/// Root configuration structure.
#[derive(Debug, Clone)]
pub struct Config {
    pub discord: DiscordConfig,
    pub curseforge: CurseForgeConfig,
    pub watcher: WatcherConfig,
    pub messages: MessageConfig,
    /// Route every announcement to the debug channel and skip publishing.
    pub debug: bool,
}

/// Discord bot configuration.
#[derive(Debug, Clone)]
pub struct DiscordConfig {
    pub token: String,
    pub debug_channel_id: ChannelRef,
    /// Release channels, matched to `CurseForgeConfig::mod_ids` by position.
    pub releases_channel_ids: Vec<ChannelRef>,
}

/// CurseForge API configuration.
#[derive(Debug, Clone)]
pub struct CurseForgeConfig {
    pub api_key: String,
    pub base_url: String,
    pub game_id: u64,
    pub game_slug: String,
    pub mod_ids: Vec<ModId>,
    /// Minimum gap between two API requests.
    pub request_gap: Duration,
}

/// Poll loop settings.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    pub poll_interval: Duration,
    /// Pause between two mods within a cycle.
    pub mod_delay: Duration,
    pub state_dir: PathBuf,
}

/// Announcement templates and delivery flags.
#[derive(Debug, Clone, Default)]
pub struct MessageConfig {
    /// Plain content sent above the embed, usually a role mention.
    pub tag: Option<String>,
    pub header: Option<String>,
    pub footer: Option<String>,
    pub add_reactions: bool,
    /// Crosspost announcements in news channels.
    pub announce_messages: bool,
    pub show_logo: bool,
}
