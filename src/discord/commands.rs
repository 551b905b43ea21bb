//! Owner commands (!force_check, !test_release, etc).
//!
//! Commands are parsed here and forwarded to the release watcher, which
//! replies in the invoking channel once it has handled them.

use std::collections::HashSet;

use serenity::model::channel::Message;
use serenity::model::id::UserId;
use serenity::prelude::*;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::watcher::WatcherCommand;

const HELP_TEXT: &str = r#"**Available Commands:**
• `!force_check` - Check all mods for new releases now
• `!test_release` - Post the latest release of the first mod here
• `!recent` - List recently announced releases
• `!help` - Show this help message"#;

/// A recognised bot command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    ForceCheck,
    TestRelease,
    Recent,
    Help,
}

impl BotCommand {
    /// Parse a message into a command. Arguments are ignored.
    pub fn parse(content: &str) -> Option<Self> {
        let content = content.trim();
        if content.len() > 100 {
            return None;
        }
        let name = content.strip_prefix('!')?.split_whitespace().next()?;

        match name.to_lowercase().as_str() {
            "force_check" => Some(Self::ForceCheck),
            "test_release" => Some(Self::TestRelease),
            "recent" => Some(Self::Recent),
            "help" => Some(Self::Help),
            _ => None,
        }
    }

    /// Watcher request for this command, if it needs one.
    pub fn to_watcher(self, reply_channel: u64) -> Option<WatcherCommand> {
        match self {
            Self::ForceCheck => Some(WatcherCommand::ForceCheck { reply_channel }),
            Self::TestRelease => Some(WatcherCommand::TestRelease { reply_channel }),
            Self::Recent => Some(WatcherCommand::Recent { reply_channel }),
            Self::Help => None,
        }
    }
}

/// Command handler for Discord bot.
pub struct CommandHandler {
    /// Channel to send commands to the watcher.
    command_tx: mpsc::UnboundedSender<WatcherCommand>,
    /// Users allowed to run commands.
    owners: HashSet<UserId>,
}

impl CommandHandler {
    pub fn new(command_tx: mpsc::UnboundedSender<WatcherCommand>) -> Self {
        Self {
            command_tx,
            owners: HashSet::new(),
        }
    }

    /// Replace the set of users allowed to run commands.
    pub fn set_owners(&mut self, owners: HashSet<UserId>) {
        info!("{} users allowed to run commands", owners.len());
        self.owners = owners;
    }

    pub fn is_owner(&self, user: UserId) -> bool {
        self.owners.contains(&user)
    }

    /// Parse and execute a command from Discord.
    ///
    /// Returns `true` if the message was a command, `false` otherwise.
    pub async fn handle_message(&self, ctx: &Context, msg: &Message) -> anyhow::Result<bool> {
        if msg.author.bot || msg.guild_id.is_none() {
            return Ok(false);
        }

        let Some(command) = BotCommand::parse(&msg.content) else {
            return Ok(false);
        };

        if !self.is_owner(msg.author.id) {
            debug!("Ignoring {:?} from non-owner {}", command, msg.author.name);
            return Ok(false);
        }

        info!("{:?} command from {}", command, msg.author.name);

        let Some(request) = command.to_watcher(msg.channel_id.get()) else {
            msg.channel_id.say(&ctx.http, HELP_TEXT).await?;
            return Ok(true);
        };

        if self.command_tx.send(request).is_err() {
            msg.channel_id
                .say(&ctx.http, "Error: Release watcher is not running.")
                .await?;
        } else {
            // The response will be sent asynchronously
            msg.react(&ctx.http, '👀').await.ok();
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(BotCommand::parse("!force_check"), Some(BotCommand::ForceCheck));
        assert_eq!(BotCommand::parse("  !TEST_RELEASE now"), Some(BotCommand::TestRelease));
        assert_eq!(BotCommand::parse("!recent"), Some(BotCommand::Recent));
        assert_eq!(BotCommand::parse("!help"), Some(BotCommand::Help));
    }

    #[test]
    fn test_parse_ignores_other_messages() {
        assert_eq!(BotCommand::parse("force_check"), None);
        assert_eq!(BotCommand::parse("!who"), None);
        assert_eq!(BotCommand::parse("!"), None);
        assert_eq!(BotCommand::parse(""), None);
        assert_eq!(BotCommand::parse(&format!("!recent {}", "x".repeat(100))), None);
    }

    #[test]
    fn test_to_watcher() {
        assert_eq!(
            BotCommand::ForceCheck.to_watcher(5),
            Some(WatcherCommand::ForceCheck { reply_channel: 5 })
        );
        assert_eq!(BotCommand::Help.to_watcher(5), None);
    }

    #[test]
    fn test_owner_check() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut handler = CommandHandler::new(tx);
        assert!(!handler.is_owner(UserId::new(1)));

        handler.set_owners(HashSet::from([UserId::new(1)]));
        assert!(handler.is_owner(UserId::new(1)));
        assert!(!handler.is_owner(UserId::new(2)));
    }
}
