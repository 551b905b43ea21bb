//! Discord delivery of release announcements.

use std::sync::Arc;

use serenity::all::{
    ChannelId, Colour, CreateEmbed, CreateEmbedFooter, CreateMessage, Http, Message, Timestamp,
};
use serenity::async_trait;
use tracing::{debug, warn};

use crate::announce::formatter::ANNOUNCEMENT_COLOUR;
use crate::announce::{Announcement, AnnouncementTemplate, Announcer};
use crate::common::error::{DeliveryError, DeliveryResult};
use crate::common::{ChannelRef, NewRelease};

/// Posts announcements through the Discord HTTP API.
pub struct DiscordAnnouncer {
    http: Arc<Http>,
    template: AnnouncementTemplate,
    add_reactions: bool,
    /// Crosspost announcements in announcement channels.
    publish: bool,
}

impl DiscordAnnouncer {
    pub fn new(
        http: Arc<Http>,
        template: AnnouncementTemplate,
        add_reactions: bool,
        publish: bool,
    ) -> Self {
        Self {
            http,
            template,
            add_reactions,
            publish,
        }
    }

    fn channel(destination: ChannelRef) -> DeliveryResult<ChannelId> {
        if destination == 0 {
            return Err(DeliveryError::InvalidDestination {
                channel_id: destination,
            });
        }
        Ok(ChannelId::new(destination))
    }

    async fn decorate(&self, message: &Message) {
        if self.add_reactions {
            for reaction in ['👍', '❤'] {
                if let Err(e) = message.react(&self.http, reaction).await {
                    warn!("Failed to add reaction to message {}: {}", message.id, e);
                }
            }
        }

        if self.publish {
            match message.crosspost(&self.http).await {
                Ok(_) => debug!("Published message {}", message.id),
                Err(e) => warn!("Failed to publish message {}: {}", message.id, e),
            }
        }
    }
}

/// Convert an announcement into a Discord embed.
pub fn build_embed(announcement: &Announcement) -> CreateEmbed {
    let mut embed = CreateEmbed::new()
        .title(&announcement.title)
        .url(&announcement.url)
        .description(&announcement.description)
        .colour(Colour::new(ANNOUNCEMENT_COLOUR))
        .timestamp(Timestamp::now());

    if let Some(ref thumbnail) = announcement.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }

    for field in &announcement.fields {
        embed = embed.field(&field.name, &field.value, field.inline);
    }

    if let Some(ref footer) = announcement.footer {
        embed = embed.footer(CreateEmbedFooter::new(footer));
    }

    embed
}

fn build_message(announcement: &Announcement) -> CreateMessage {
    let mut builder = CreateMessage::new().embed(build_embed(announcement));
    if let Some(ref content) = announcement.content {
        builder = builder.content(content);
    }
    builder
}

#[async_trait]
impl Announcer for DiscordAnnouncer {
    async fn announce(&self, destination: ChannelRef, release: &NewRelease) -> DeliveryResult<()> {
        let channel_id = Self::channel(destination)?;
        let announcement = self.template.render(release);

        let message = channel_id
            .send_message(&self.http, build_message(&announcement))
            .await
            .map_err(|source| DeliveryError::SendFailed {
                channel_id: destination,
                source,
            })?;

        self.decorate(&message).await;
        Ok(())
    }

    async fn send_text(&self, destination: ChannelRef, text: &str) -> DeliveryResult<()> {
        let channel_id = Self::channel(destination)?;
        channel_id
            .say(&self.http, text)
            .await
            .map_err(|source| DeliveryError::SendFailed {
                channel_id: destination,
                source,
            })?;
        Ok(())
    }
}
