//! Configuration validation.
//!
//! Validates configuration values and provides helpful error messages.

use url::Url;

use crate::common::error::ConfigError;
use crate::config::env::var_name;
use crate::config::types::Config;

/// Validate a configuration and return detailed errors.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    // Validate Discord config
    if config.discord.token.is_empty() {
        errors.push(format!("{} is required", var_name("BOT_TOKEN")));
    }
    if config.discord.debug_channel_id == 0 {
        errors.push(format!("{} is required", var_name("DEBUG_CHANNEL_ID")));
    }
    if config.discord.releases_channel_ids.is_empty() {
        errors.push(format!(
            "At least one channel in {} is required",
            var_name("RELEASES_CHANNEL_IDS")
        ));
    }
    for (i, id) in config.discord.releases_channel_ids.iter().enumerate() {
        if *id == 0 {
            errors.push(format!(
                "{}[{}] must be non-zero",
                var_name("RELEASES_CHANNEL_IDS"),
                i
            ));
        }
    }

    // Validate CurseForge config
    if config.curseforge.api_key.is_empty() {
        errors.push(format!("{} is required", var_name("CURSEFORGE_API_KEY")));
    }
    if config.curseforge.mod_ids.is_empty() {
        errors.push(format!("At least one mod in {} is required", var_name("MOD_IDS")));
    }
    if Url::parse(&config.curseforge.base_url).is_err() {
        errors.push(format!(
            "{} '{}' is not a valid URL",
            var_name("API_BASE_URL"),
            config.curseforge.base_url
        ));
    }
    if config.curseforge.game_slug.is_empty() {
        errors.push(format!("{} must not be empty", var_name("GAME_SLUG")));
    }

    // Validate watcher config
    if config.watcher.poll_interval.is_zero() {
        errors.push(format!("{} must be non-zero", var_name("POLL_INTERVAL_SECS")));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            message: errors.join("\n"),
        })
    }
}
