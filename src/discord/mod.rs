//! Discord bot integration.
//!
//! Connects to the gateway for owner commands and delivers announcements
//! over the REST API.

pub mod announcer;
pub mod client;
pub mod commands;

// Re-export main types for external use
pub use announcer::DiscordAnnouncer;
pub use client::{DiscordBot, DiscordBotBuilder};
pub use commands::{BotCommand, CommandHandler};
