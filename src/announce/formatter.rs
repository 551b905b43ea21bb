//! Announcement formatting.
//!
//! Turns a new release into the pieces of a Discord message. Header and
//! footer templates support these placeholders:
//! - `%mod` - Mod display name
//! - `%version` - Version label
//! - `%file` - File name
//! - `%url` - Download link
//!
//! `{mod_name}` and `{version}` are accepted as aliases of `%mod` and
//! `%version`.

use crate::common::NewRelease;
use crate::config::types::MessageConfig;
use crate::curseforge::file_page_url;

/// Default header when none is configured.
pub const DEFAULT_HEADER_FORMAT: &str = "@everyone %mod version %version is now available!";

/// Discord's limit on the length of an embed field value, in characters.
pub const MAX_FIELD_LENGTH: usize = 1024;

/// Embed colour (green).
pub const ANNOUNCEMENT_COLOUR: u32 = 0x2ECC71;

const CHANGELOG_SUFFIX: &str = "...\n\n[View full changelog on CurseForge]";

/// A field of the announcement embed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Platform-neutral announcement message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    /// Plain content above the embed.
    pub content: Option<String>,
    pub title: String,
    /// Link of the embed title.
    pub url: String,
    pub description: String,
    pub thumbnail: Option<String>,
    pub fields: Vec<EmbedField>,
    pub footer: Option<String>,
}

/// Renders announcements from configured templates.
#[derive(Debug, Clone)]
pub struct AnnouncementTemplate {
    tag: Option<String>,
    header: String,
    footer: Option<String>,
    show_logo: bool,
    game_slug: String,
}

impl AnnouncementTemplate {
    /// Create a template from the message configuration.
    pub fn new(messages: &MessageConfig, game_slug: impl Into<String>) -> Self {
        Self {
            tag: messages.tag.clone(),
            header: messages
                .header
                .clone()
                .unwrap_or_else(|| DEFAULT_HEADER_FORMAT.to_string()),
            footer: messages.footer.clone(),
            show_logo: messages.show_logo,
            game_slug: game_slug.into(),
        }
    }

    /// Build the announcement for a release.
    pub fn render(&self, new: &NewRelease) -> Announcement {
        let NewRelease {
            mod_info,
            release,
            changelog,
        } = new;

        let page_url = file_page_url(&self.game_slug, &mod_info.slug, &release.id);
        let download_url = self.download_url(new);

        let mut fields = vec![
            EmbedField {
                name: "File".to_string(),
                value: release.file_name.clone(),
                inline: true,
            },
            EmbedField {
                name: "Download".to_string(),
                value: format!("[{}]({})", release.file_name, download_url),
                inline: true,
            },
        ];

        if let Some(changelog) = changelog.as_deref().filter(|c| !c.is_empty()) {
            fields.push(EmbedField {
                name: "Changelog".to_string(),
                value: truncate_changelog(changelog, &page_url),
                inline: false,
            });
        }

        Announcement {
            content: self.tag.clone(),
            title: mod_info.name.clone(),
            url: page_url,
            description: self.fill(&self.header, new),
            thumbnail: if self.show_logo {
                mod_info.logo_url.clone()
            } else {
                None
            },
            fields,
            footer: self.footer.as_ref().map(|footer| self.fill(footer, new)),
        }
    }

    /// Direct download link, or the file page when there is none.
    fn download_url(&self, new: &NewRelease) -> String {
        match new.release.download_url {
            Some(ref url) => url.clone(),
            None => file_page_url(&self.game_slug, &new.mod_info.slug, &new.release.id),
        }
    }

    fn fill(&self, format: &str, new: &NewRelease) -> String {
        format
            .replace("{mod_name}", &new.mod_info.name)
            .replace("{version}", &new.release.version)
            .replace("%mod", &new.mod_info.name)
            .replace("%version", &new.release.version)
            .replace("%file", &new.release.file_name)
            .replace("%url", &self.download_url(new))
    }
}

/// Fit a changelog into one embed field, linking to the full text when cut.
pub fn truncate_changelog(changelog: &str, page_url: &str) -> String {
    if changelog.chars().count() <= MAX_FIELD_LENGTH {
        return changelog.to_string();
    }

    let link = format!("({})", page_url);
    let room = MAX_FIELD_LENGTH
        .saturating_sub(CHANGELOG_SUFFIX.chars().count() + link.chars().count());

    let mut text: String = changelog.chars().take(room).collect();
    text.push_str(CHANGELOG_SUFFIX);
    text.push_str(&link);
    text
}
