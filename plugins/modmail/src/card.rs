//! Folding a message and its attachments into embeds.

use chrono::{DateTime, Utc};
use plugin_api::{Attachment, Embed, EmbedAuthor, EmbedField, User};

const IMAGE_SUFFIXES: [&str; 3] = ["jpg", "png", "gif"];

pub fn is_image(filename: &str) -> bool {
    IMAGE_SUFFIXES.iter().any(|ext| filename.ends_with(ext))
}

/// One relayed embed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RelayCard {
    pub author_label: Option<String>,
    pub author_icon: Option<String>,
    pub body: Option<String>,
    pub image: Option<String>,
    pub attachment_links: Vec<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl RelayCard {
    pub fn to_embed(&self) -> Embed {
        let mut embed = Embed {
            author: self.author_label.as_ref().map(|name| EmbedAuthor {
                name: name.clone(),
                icon_url: self.author_icon.clone(),
            }),
            description: self.body.clone(),
            image: self.image.clone(),
            timestamp: self.timestamp,
            ..Embed::default()
        };
        if !self.attachment_links.is_empty() {
            embed.fields.push(EmbedField {
                name: "Attachments".to_owned(),
                value: self.attachment_links.join("\n"),
            });
        }
        embed
    }
}

/// The first card carries the author, the text, the first image and links
/// to all non-image attachments. Each further image gets a card of its own.
/// Only the last card is timestamped.
pub fn build_cards(
    author: &User,
    text: &str,
    attachments: &[Attachment],
    sent_at: DateTime<Utc>,
) -> Vec<RelayCard> {
    let text = text.trim();
    let mut first = RelayCard {
        author_label: Some(format!("{} | {}", author.tag(), author.id)),
        author_icon: Some(author.avatar.url()),
        body: if text.is_empty() {
            None
        } else {
            Some(text.to_owned())
        },
        ..RelayCard::default()
    };
    let mut extra = Vec::new();
    for attachment in attachments {
        if !is_image(&attachment.filename) {
            first
                .attachment_links
                .push(format!("[{}]({})", attachment.filename, attachment.url));
        } else if first.image.is_none() {
            first.image = Some(attachment.url.clone());
        } else {
            extra.push(RelayCard {
                image: Some(attachment.url.clone()),
                ..RelayCard::default()
            });
        }
    }
    let mut cards = vec![first];
    cards.extend(extra);
    if let Some(last) = cards.last_mut() {
        last.timestamp = Some(sent_at);
    }
    cards
}
