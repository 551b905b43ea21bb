//! Error types for the application.

use thiserror::Error;

use crate::common::types::ChannelRef;

/// Top-level startup error.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

/// Errors talking to the mod-hosting API.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Request to CurseForge failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CurseForge API error: {status} - {message}")]
    Status { status: u16, message: String },

    #[error("Malformed CurseForge response: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Rate limited by CurseForge after {attempts} attempts")]
    RateLimited { attempts: usize },
}

/// Errors delivering a message to Discord.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Failed to send message to channel {channel_id}: {source}")]
    SendFailed {
        channel_id: ChannelRef,
        #[source]
        source: serenity::Error,
    },

    #[error("Invalid destination channel: {channel_id}")]
    InvalidDestination { channel_id: ChannelRef },
}

/// Errors reading or writing persisted state.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to access '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("State file '{path}' is corrupt: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type alias for startup operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Result type alias for CurseForge operations.
pub type UpstreamResult<T> = std::result::Result<T, UpstreamError>;

/// Result type alias for Discord delivery.
pub type DeliveryResult<T> = std::result::Result<T, DeliveryError>;

/// Result type alias for store operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;
