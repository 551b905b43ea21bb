//! Release announcements.
//!
//! Formatting and routing are platform-neutral; delivery goes through the
//! [`Announcer`] trait, implemented for Discord in `discord::announcer`.

pub mod formatter;
pub mod routing;

pub use formatter::{Announcement, AnnouncementTemplate, EmbedField};
pub use routing::Destinations;

use serenity::async_trait;

use crate::common::error::DeliveryResult;
use crate::common::{ChannelRef, NewRelease};

/// Delivers messages to chat destinations.
#[async_trait]
pub trait Announcer: Send + Sync {
    /// Post a release announcement.
    async fn announce(&self, destination: ChannelRef, release: &NewRelease) -> DeliveryResult<()>;

    /// Post a plain text message, used for status updates and command replies.
    async fn send_text(&self, destination: ChannelRef, text: &str) -> DeliveryResult<()>;
}
