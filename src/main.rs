//! Modherald - CurseForge release announcer for Discord
//!
//! Polls CurseForge for new files of the configured mods and announces
//! each new release once in Discord.

mod announce;
mod common;
mod config;
mod curseforge;
mod discord;
mod store;
mod watcher;

use anyhow::{anyhow, Result};
use tokio::signal;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

use announce::{AnnouncementTemplate, Destinations};
use config::{load_and_validate, Config};
use curseforge::CurseForgeClient;
use discord::{DiscordAnnouncer, DiscordBotBuilder};
use store::JsonReleaseStore;
use watcher::{ReleaseWatcher, Schedule, WatcherCommand};

/// Set up the CurseForge client and open the release store.
fn open_backends(config: &Config) -> common::error::Result<(CurseForgeClient, JsonReleaseStore)> {
    let source = CurseForgeClient::new(&config.curseforge)?;
    let store = JsonReleaseStore::open(&config.watcher.state_dir)?;
    Ok((source, store))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Modherald v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = load_and_validate().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        error!(
            "Please ensure the required variables are set (e.g. {}).",
            config::env::var_name("BOT_TOKEN")
        );
        e
    })?;

    info!("Configuration loaded successfully");
    info!("  Mods: {:?}", config.curseforge.mod_ids);
    info!("  Release channels: {:?}", config.discord.releases_channel_ids);
    info!("  Debug channel: {}", config.discord.debug_channel_id);
    info!("  Poll interval: {}s", config.watcher.poll_interval.as_secs());
    if config.debug {
        warn!("Debug mode: all announcements go to the debug channel");
    }

    let (source, store) = open_backends(&config).map_err(|e| {
        error!("Startup failed: {}", e);
        e
    })?;
    info!("Release records stored in {}", store.path().display());

    // ============================================================
    // Create channels for communication
    // ============================================================
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (command_tx, command_rx) = mpsc::unbounded_channel::<WatcherCommand>();

    // Create a one-shot channel to signal when Discord initialization is complete
    let (init_complete_tx, init_complete_rx) = oneshot::channel::<()>();

    let discord_bot = DiscordBotBuilder::new(config.discord.token.clone(), command_tx, shutdown_rx.clone())
        .build(init_complete_tx)
        .await?;

    let http = discord_bot
        .http()
        .ok_or_else(|| anyhow!("Discord client has no HTTP handle"))?;

    // ============================================================
    // Start Discord bot
    // ============================================================
    info!("Starting Discord bot...");

    let mut discord_task = tokio::spawn(async move {
        discord_bot.run().await;
    });

    info!("Waiting for Discord to connect...");
    // Wait for Discord initialization to complete (or timeout after 15s)
    let discord_init_success = match tokio::time::timeout(tokio::time::Duration::from_secs(15), init_complete_rx).await {
        Ok(Ok(())) => {
            info!("Discord initialization complete! Starting release watcher...");
            true
        }
        Ok(Err(_)) => {
            error!("Discord init signal sender was dropped before firing - initialization failed");
            false
        }
        Err(_) => {
            error!("Timed out waiting for Discord initialization (15s) - initialization failed");
            false
        }
    };

    if !discord_init_success {
        error!("Failed to initialize Discord client - shutting down");
        // Give a moment for error logs to flush
        tokio::time::sleep(tokio::time::Duration::from_secs(1)).await;
        std::process::exit(1);
    }

    // ============================================================
    // Start release watcher
    // ============================================================
    let template = AnnouncementTemplate::new(&config.messages, config.curseforge.game_slug.clone());
    let announcer = DiscordAnnouncer::new(
        http,
        template,
        config.messages.add_reactions,
        config.messages.announce_messages && !config.debug,
    );

    let release_watcher = ReleaseWatcher::new(
        source,
        announcer,
        store,
        config.curseforge.mod_ids.clone(),
        Destinations::from_config(&config),
        Schedule {
            poll_interval: config.watcher.poll_interval,
            mod_delay: config.watcher.mod_delay,
        },
    );

    let mut watcher_task = tokio::spawn(release_watcher.run(command_rx, shutdown_rx));

    // ============================================================
    // Run until a signal or a task exits
    // ============================================================
    let shutdown = tokio::select! {
        biased;
        _ = shutdown_signal() => {
            info!("Shutdown signal received - stopping...");
            true
        }
        _ = &mut watcher_task => {
            error!("Release watcher stopped unexpectedly");
            false
        }
        _ = &mut discord_task => {
            error!("Discord task stopped unexpectedly");
            false
        }
    };

    // Signal both tasks (fire-and-forget - if all receivers are gone, they already exited)
    if let Err(e) = shutdown_tx.send(true) {
        debug!("Shutdown channel closed: {}", e);
    }

    if shutdown {
        // A running cycle always finishes; the watcher stops right after it
        info!("Waiting for the current update check to finish...");
        match watcher_task.await {
            Ok(()) => info!("Release watcher stopped gracefully"),
            Err(e) => warn!("Release watcher task panicked: {}", e),
        }

        match tokio::time::timeout(tokio::time::Duration::from_secs(5), discord_task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Discord task panicked: {}", e),
            Err(_) => warn!("Discord shutdown timed out"),
        }
    }

    info!("Exiting...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
