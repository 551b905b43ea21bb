//! Release polling loop.
//!
//! The watcher owns the release source, the announcer and the store. It
//! wakes up on a fixed interval (or on an owner command), checks every
//! configured mod in order and announces releases it has not seen before.
//!
//! A release is only recorded as seen after its announcement went out, so a
//! failed delivery is retried on the next cycle. Failures for one mod never
//! stop the others from being checked.

pub mod report;

pub use report::{CycleReport, ModOutcome};

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::announce::{Announcer, Destinations};
use crate::common::error::UpstreamResult;
use crate::common::{ChannelRef, ModId, NewRelease, Release, SeenRecord};
use crate::curseforge::ReleaseSource;
use crate::store::ReleaseStore;

/// Number of entries listed by the recent command.
const RECENT_LIMIT: usize = 10;

/// Commands accepted by a running watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatcherCommand {
    /// Run a cycle now (!force_check).
    ForceCheck { reply_channel: ChannelRef },
    /// Announce the first mod's latest release to a channel (!test_release).
    TestRelease { reply_channel: ChannelRef },
    /// List recently announced releases (!recent).
    Recent { reply_channel: ChannelRef },
}

/// Timing settings of the watcher.
#[derive(Debug, Clone, Copy)]
pub struct Schedule {
    pub poll_interval: Duration,
    /// Pause between two mods within a cycle.
    pub mod_delay: Duration,
}

/// Polls for new releases and announces them.
pub struct ReleaseWatcher<S, A, St> {
    source: S,
    announcer: A,
    store: St,
    mods: Vec<ModId>,
    destinations: Destinations,
    schedule: Schedule,
}

impl<S, A, St> ReleaseWatcher<S, A, St>
where
    S: ReleaseSource,
    A: Announcer,
    St: ReleaseStore,
{
    pub fn new(
        source: S,
        announcer: A,
        store: St,
        mods: Vec<ModId>,
        destinations: Destinations,
        schedule: Schedule,
    ) -> Self {
        Self {
            source,
            announcer,
            store,
            mods,
            destinations,
            schedule,
        }
    }

    /// Run until shutdown is signalled.
    ///
    /// The first cycle starts immediately. Shutdown is only observed between
    /// cycles; a started cycle always runs to completion.
    pub async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<WatcherCommand>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        info!(
            "Watching {} mods every {}s",
            self.mods.len(),
            self.schedule.poll_interval.as_secs()
        );

        let mut ticker = interval(self.schedule.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut commands_open = true;

        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping watcher");
                        break;
                    }
                }

                _ = ticker.tick() => {
                    let report = self.run_cycle().await;
                    self.send_status(&report).await;
                }

                command = commands.recv(), if commands_open => {
                    match command {
                        Some(command) => self.handle_command(command).await,
                        None => {
                            debug!("Watcher command channel closed");
                            commands_open = false;
                        }
                    }
                }
            }
        }

        info!("Watcher stopped");
    }

    /// Check every configured mod once.
    pub async fn run_cycle(&mut self) -> CycleReport {
        debug!("Starting update check cycle");
        let mut report = CycleReport::default();
        let mods = self.mods.clone();

        for (i, mod_id) in mods.iter().enumerate() {
            if i > 0 && !self.schedule.mod_delay.is_zero() {
                sleep(self.schedule.mod_delay).await;
            }

            let outcome = self.check_mod(*mod_id).await;
            report.record(*mod_id, outcome);
        }

        info!("Update check complete: {}", report.summary());
        report
    }

    async fn check_mod(&mut self, mod_id: ModId) -> ModOutcome {
        debug!("Checking updates for mod {}", mod_id);

        let release = match self.source.latest_release(mod_id).await {
            Ok(Some(release)) => release,
            Ok(None) => {
                warn!("No release found for mod {}", mod_id);
                return ModOutcome::NotFound;
            }
            Err(e) => {
                warn!("Failed to fetch latest release of mod {}: {}", mod_id, e);
                return ModOutcome::Failed;
            }
        };

        let seen = match self.store.get(mod_id) {
            Ok(seen) => seen,
            Err(e) => {
                warn!("Failed to read release record of mod {}: {}", mod_id, e);
                None
            }
        };

        if seen.as_ref().is_some_and(|seen| seen.release_id == release.id) {
            debug!("Release {} of mod {} already announced", release.id, mod_id);
            return ModOutcome::Unchanged;
        }

        let new = match self.prepare(release).await {
            Ok(new) => new,
            Err(e) => {
                warn!("Failed to fetch details of mod {}: {}", mod_id, e);
                return ModOutcome::Failed;
            }
        };

        let destination = self.destinations.for_mod(mod_id);
        if let Err(e) = self.announcer.announce(destination, &new).await {
            error!(
                "Failed to announce {} version {}: {}",
                new.mod_info.name, new.release.version, e
            );
            return ModOutcome::Failed;
        }

        info!(
            "Announced {} version {} (release {}) in channel {}",
            new.mod_info.name, new.release.version, new.release.id, destination
        );

        let description = format!("{} {}", new.mod_info.name, new.release.version);
        if let Err(e) = self.store.set(mod_id, SeenRecord::for_release(&new.release)) {
            error!(
                "Failed to record release {} of mod {}, it may be announced again: {}",
                new.release.id, mod_id, e
            );
        }

        ModOutcome::Announced(description)
    }

    /// Gather mod metadata and changelog for a release.
    async fn prepare(&self, release: Release) -> UpstreamResult<NewRelease> {
        let mod_info = self.source.mod_info(release.mod_id).await?;

        let changelog = match self.source.changelog(release.mod_id, &release.id).await {
            Ok(changelog) => changelog,
            Err(e) => {
                warn!("Failed to fetch changelog of release {}: {}", release.id, e);
                None
            }
        };

        Ok(NewRelease {
            mod_info,
            release,
            changelog,
        })
    }

    async fn send_status(&self, report: &CycleReport) {
        let channel = self.destinations.debug_channel();
        if let Err(e) = self.announcer.send_text(channel, &report.summary()).await {
            warn!("Failed to send status to debug channel: {}", e);
        }
    }

    async fn reply(&self, channel: ChannelRef, text: &str) {
        if let Err(e) = self.announcer.send_text(channel, text).await {
            warn!("Failed to reply in channel {}: {}", channel, e);
        }
    }

    async fn handle_command(&mut self, command: WatcherCommand) {
        info!("Handling command {:?}", command);

        match command {
            WatcherCommand::ForceCheck { reply_channel } => {
                self.reply(reply_channel, "Forcing update check...").await;
                let report = self.run_cycle().await;
                self.send_status(&report).await;
                self.reply(
                    reply_channel,
                    &format!("Update check completed. {}", report.summary()),
                )
                .await;
            }
            WatcherCommand::TestRelease { reply_channel } => {
                self.test_release(reply_channel).await;
            }
            WatcherCommand::Recent { reply_channel } => {
                let text = self.recent_text();
                self.reply(reply_channel, &text).await;
            }
        }
    }

    /// Announce the first mod's latest release without recording it.
    async fn test_release(&self, channel: ChannelRef) {
        let Some(mod_id) = self.mods.first().copied() else {
            self.reply(channel, "No mod IDs configured.").await;
            return;
        };

        let new = match self.source.latest_release(mod_id).await {
            Ok(Some(release)) => self.prepare(release).await,
            Ok(None) => {
                self.reply(channel, &format!("No release found for mod ID: {}", mod_id))
                    .await;
                return;
            }
            Err(e) => Err(e),
        };

        let result = match new {
            Ok(new) => self.announcer.announce(channel, &new).await.map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        if let Err(e) = result {
            error!("Error sending test release for mod {}: {}", mod_id, e);
            self.reply(
                channel,
                &format!("Failed to send test release for mod ID: {}", mod_id),
            )
            .await;
        }
    }

    fn recent_text(&self) -> String {
        let recent = self.store.recent(RECENT_LIMIT);
        if recent.is_empty() {
            return "No releases announced yet.".to_string();
        }

        let lines: Vec<String> = recent
            .iter()
            .map(|(mod_id, seen)| {
                format!(
                    "`{}` version {} (file {}) announced <t:{}:R>",
                    mod_id,
                    seen.version,
                    seen.release_id,
                    seen.announced_at.timestamp()
                )
            })
            .collect();

        format!("**Recent releases:**\n{}", lines.join("\n"))
    }
}
