//! Environment variable configuration.
//!
//! Every setting is read from a variable prefixed with `MODHERALD_`:
//! - `MODHERALD_BOT_TOKEN` - Discord bot token
//! - `MODHERALD_CURSEFORGE_API_KEY` - CurseForge API key
//! - `MODHERALD_MOD_IDS` - comma-separated mod ids
//! - `MODHERALD_DEBUG_CHANNEL_ID` - channel for status messages
//! - `MODHERALD_RELEASES_CHANNEL_IDS` - comma-separated release channels
//!
//! Optional: `POLL_INTERVAL_SECS`, `MOD_DELAY_MS`, `REQUEST_GAP_MS`,
//! `STATE_DIR`, `GAME_ID`, `GAME_SLUG`, `API_BASE_URL`, `MESSAGE_TAG`,
//! `MESSAGE_HEADER`, `MESSAGE_FOOTER`, `ADD_REACTIONS`, `ANNOUNCE_MESSAGES`,
//! `SHOW_LOGO`, `DEBUG`.
//!
//! Variables may also come from a `.env` file in the working directory.
//! Values set in the process environment take precedence over the file.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use tracing::{debug, info};

use crate::common::error::ConfigError;
use crate::config::types::*;

/// Environment variable prefix for all settings.
const ENV_PREFIX: &str = "MODHERALD";

const DEFAULT_POLL_INTERVAL_SECS: u64 = 300;
const DEFAULT_MOD_DELAY_MS: u64 = 2000;
const DEFAULT_REQUEST_GAP_MS: u64 = 1000;
const DEFAULT_STATE_DIR: &str = "releases";

/// Dotenv file read at startup, relative to the working directory.
pub const ENV_FILE: &str = ".env";

/// Load configuration from the process environment and the `.env` file.
pub fn load_from_env() -> Result<Config, ConfigError> {
    let file = read_env_file(Path::new(ENV_FILE))?;
    load_with(|key| env::var(key).ok().or_else(|| file.get(key).cloned()))
}

/// Variables defined in a dotenv file, empty when the file does not exist.
pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let entries = match dotenvy::from_path_iter(path) {
        Ok(entries) => entries,
        Err(e) if e.not_found() => {
            debug!("No {} file found, using the process environment", path.display());
            return Ok(HashMap::new());
        }
        Err(e) => return Err(env_file_error(path, e)),
    };

    let vars = entries
        .collect::<Result<HashMap<String, String>, _>>()
        .map_err(|e| env_file_error(path, e))?;

    info!("Loaded {} variables from {}", vars.len(), path.display());
    Ok(vars)
}

fn env_file_error(path: &Path, error: dotenvy::Error) -> ConfigError {
    ConfigError::InvalidValue {
        field: path.display().to_string(),
        message: error.to_string(),
    }
}

/// Load configuration using `lookup` to resolve fully prefixed variable names.
///
/// Required values that are absent come back empty so that validation can
/// report all of them at once. Values that are present but unparsable fail
/// immediately.
pub fn load_with<F>(lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let vars = Vars { lookup };

    let discord = DiscordConfig {
        token: vars.string("BOT_TOKEN").unwrap_or_default(),
        debug_channel_id: vars.parsed("DEBUG_CHANNEL_ID")?.unwrap_or(0),
        releases_channel_ids: vars.list("RELEASES_CHANNEL_IDS")?,
    };

    let curseforge = CurseForgeConfig {
        api_key: vars.string("CURSEFORGE_API_KEY").unwrap_or_default(),
        base_url: vars
            .string("API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
        game_id: vars.parsed("GAME_ID")?.unwrap_or(DEFAULT_GAME_ID),
        game_slug: vars
            .string("GAME_SLUG")
            .unwrap_or_else(|| DEFAULT_GAME_SLUG.to_string()),
        mod_ids: vars.list("MOD_IDS")?,
        request_gap: Duration::from_millis(
            vars.parsed("REQUEST_GAP_MS")?.unwrap_or(DEFAULT_REQUEST_GAP_MS),
        ),
    };

    let watcher = WatcherConfig {
        poll_interval: Duration::from_secs(
            vars.parsed("POLL_INTERVAL_SECS")?
                .unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
        ),
        mod_delay: Duration::from_millis(
            vars.parsed("MOD_DELAY_MS")?.unwrap_or(DEFAULT_MOD_DELAY_MS),
        ),
        state_dir: PathBuf::from(
            vars.string("STATE_DIR")
                .unwrap_or_else(|| DEFAULT_STATE_DIR.to_string()),
        ),
    };

    let messages = MessageConfig {
        tag: vars.string("MESSAGE_TAG"),
        header: vars.string("MESSAGE_HEADER"),
        footer: vars.string("MESSAGE_FOOTER"),
        add_reactions: vars.flag("ADD_REACTIONS")?.unwrap_or(false),
        announce_messages: vars.flag("ANNOUNCE_MESSAGES")?.unwrap_or(false),
        show_logo: vars.flag("SHOW_LOGO")?.unwrap_or(true),
    };

    Ok(Config {
        discord,
        curseforge,
        watcher,
        messages,
        debug: vars.flag("DEBUG")?.unwrap_or(false),
    })
}

/// Full variable name for a setting.
pub fn var_name(name: &str) -> String {
    format!("{}_{}", ENV_PREFIX, name)
}

struct Vars<F> {
    lookup: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Trimmed value, `None` when unset or blank.
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(&var_name(name))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parsed<T>(&self, name: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.string(name) {
            Some(raw) => raw.parse::<T>().map(Some).map_err(|e| ConfigError::InvalidValue {
                field: var_name(name),
                message: format!("'{}': {}", raw, e),
            }),
            None => Ok(None),
        }
    }

    fn list<T>(&self, name: &str) -> Result<Vec<T>, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let Some(raw) = self.string(name) else {
            return Ok(Vec::new());
        };

        raw.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| {
                item.parse::<T>().map_err(|e| ConfigError::InvalidValue {
                    field: var_name(name),
                    message: format!("'{}': {}", item, e),
                })
            })
            .collect()
    }

    fn flag(&self, name: &str) -> Result<Option<bool>, ConfigError> {
        match self.string(name).map(|v| v.to_lowercase()) {
            Some(v) => match v.as_str() {
                "true" | "1" | "yes" | "on" => Ok(Some(true)),
                "false" | "0" | "no" | "off" => Ok(Some(false)),
                _ => Err(ConfigError::InvalidValue {
                    field: var_name(name),
                    message: format!("'{}' is not a boolean", v),
                }),
            },
            None => Ok(None),
        }
    }
}
