//! Destination routing for announcements.

use tracing::warn;

use crate::common::{ChannelRef, ModId};
use crate::config::types::Config;

/// Maps mods to the channels their releases are announced in.
#[derive(Debug, Clone)]
pub struct Destinations {
    debug_channel: ChannelRef,
    release_channels: Vec<ChannelRef>,
    mod_ids: Vec<ModId>,
    debug_mode: bool,
}

impl Destinations {
    pub fn new(
        debug_channel: ChannelRef,
        release_channels: Vec<ChannelRef>,
        mod_ids: Vec<ModId>,
        debug_mode: bool,
    ) -> Self {
        Self {
            debug_channel,
            release_channels,
            mod_ids,
            debug_mode,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.discord.debug_channel_id,
            config.discord.releases_channel_ids.clone(),
            config.curseforge.mod_ids.clone(),
            config.debug,
        )
    }

    /// Channel for operational status messages.
    pub fn debug_channel(&self) -> ChannelRef {
        self.debug_channel
    }

    /// Channel a mod's releases are announced in.
    ///
    /// A mod uses the release channel at its own position in the mod list,
    /// or the first release channel when there are fewer channels than mods.
    /// In debug mode everything goes to the debug channel.
    pub fn for_mod(&self, mod_id: ModId) -> ChannelRef {
        if self.debug_mode {
            return self.debug_channel;
        }

        let index = self.mod_ids.iter().position(|id| *id == mod_id);
        match index.and_then(|i| self.release_channels.get(i)) {
            Some(channel) => *channel,
            None => {
                let fallback = self
                    .release_channels
                    .first()
                    .copied()
                    .unwrap_or(self.debug_channel);
                warn!(
                    "No dedicated channel for mod {}, using fallback channel {}",
                    mod_id, fallback
                );
                fallback
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_by_position() {
        let destinations = Destinations::new(1, vec![10, 20], vec![101, 202], false);
        assert_eq!(destinations.for_mod(101), 10);
        assert_eq!(destinations.for_mod(202), 20);
    }

    #[test]
    fn test_fallback_to_first_channel() {
        let destinations = Destinations::new(1, vec![10], vec![101, 202, 303], false);
        assert_eq!(destinations.for_mod(303), 10);
        assert_eq!(destinations.for_mod(999), 10);
    }

    #[test]
    fn test_debug_mode_uses_debug_channel() {
        let destinations = Destinations::new(1, vec![10, 20], vec![101, 202], true);
        assert_eq!(destinations.for_mod(202), 1);
        assert_eq!(destinations.debug_channel(), 1);
    }
}
