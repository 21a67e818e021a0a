//! Chat objects handed to plugins by the host.

use chrono::{DateTime, Utc};
use serde_derive::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

macro_rules! id_type {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                $name(id)
            }
        }
    };
}

id_type!(
    /// Identifies a user account.
    UserId
);
id_type!(
    /// Identifies a text channel or a direct message channel.
    ChannelId
);
id_type!(
    /// Identifies a guild (server).
    GuildId
);
id_type!(
    /// Identifies a message within its channel.
    MessageId
);

/// A user's avatar, stored as a URL without the file extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Avatar {
    /// URL without extension or size.
    pub base_url: String,
    /// Whether a gif version exists.
    pub animated: bool,
}

impl Avatar {
    /// An avatar served from `base_url`.
    pub fn new(base_url: impl Into<String>, animated: bool) -> Self {
        Self {
            base_url: base_url.into(),
            animated,
        }
    }
    /// The avatar in its native format: gif when animated, png otherwise.
    pub fn url(&self) -> String {
        let ext = if self.animated { "gif" } else { "png" };
        format!("{}.{}?size=1024", self.base_url, ext)
    }
    /// The avatar as a still png, even when it is animated.
    pub fn static_url(&self) -> String {
        format!("{}.png?size=1024", self.base_url)
    }
}

/// A user account as seen from a guild.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    /// Unique id.
    pub id: UserId,
    /// Account name.
    pub name: String,
    /// Guild nickname if there is one, else the account name.
    pub display_name: String,
    /// Legacy four digit discriminator. `None` for accounts with unique names.
    pub discriminator: Option<String>,
    /// Profile picture.
    pub avatar: Avatar,
}

impl User {
    /// `name#discriminator`, or just the name when there is no discriminator.
    pub fn tag(&self) -> String {
        match self.discriminator {
            Some(ref disc) => format!("{}#{}", self.name, disc),
            None => self.name.clone(),
        }
    }
}

/// A guild text channel or a direct message channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Channel {
    /// Unique id.
    pub id: ChannelId,
    /// `None` for direct message channels.
    pub guild: Option<GuildId>,
    /// Name without the leading `#`.
    pub name: String,
}

impl Channel {
    /// Whether this is a direct message channel.
    pub fn is_private(&self) -> bool {
        self.guild.is_none()
    }
}

/// A file attached to a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    /// Name of the uploaded file.
    pub filename: String,
    /// Where the file can be downloaded.
    pub url: String,
}

impl Attachment {
    /// An attachment named `filename` at `url`.
    pub fn new(filename: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            url: url.into(),
        }
    }
}

/// A message as received by the bot.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    /// Unique id.
    pub id: MessageId,
    /// Text of the message, command prefix included.
    pub content: String,
    /// Files sent along with the text.
    pub attachments: Vec<Attachment>,
    /// When the message was sent.
    pub created_at: DateTime<Utc>,
}

/// What the bot is allowed to do in a channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Permissions {
    /// May post messages.
    pub send_messages: bool,
    /// May upload files.
    pub attach_files: bool,
    /// May post rich cards.
    pub embed_links: bool,
}

impl Permissions {
    /// Every permission granted.
    pub fn all() -> Self {
        Self {
            send_messages: true,
            attach_files: true,
            embed_links: true,
        }
    }
    /// No permission at all.
    pub fn none() -> Self {
        Self {
            send_messages: false,
            attach_files: false,
            embed_links: false,
        }
    }
}

/// Header line of an [`Embed`].
#[derive(Clone, Debug, PartialEq)]
pub struct EmbedAuthor {
    /// Displayed name.
    pub name: String,
    /// Small picture next to the name.
    pub icon_url: Option<String>,
}

/// A titled block of text in an [`Embed`].
#[derive(Clone, Debug, PartialEq)]
pub struct EmbedField {
    /// Title of the field.
    pub name: String,
    /// Body of the field.
    pub value: String,
}

/// A rich message card.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Embed {
    /// Header line.
    pub author: Option<EmbedAuthor>,
    /// Main text.
    pub description: Option<String>,
    /// URL of the large picture.
    pub image: Option<String>,
    /// Extra titled blocks, in order.
    pub fields: Vec<EmbedField>,
    /// Shown in the footer.
    pub timestamp: Option<DateTime<Utc>>,
}

/// Something the bot can post.
#[derive(Clone, Debug, PartialEq)]
pub enum Outgoing {
    /// Plain text.
    Text(String),
    /// An uploaded file.
    File { name: String, data: Vec<u8> },
    /// A rich card.
    Embed(Embed),
}

/// Credentials shared between plugins, grouped by service name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApiTokens(HashMap<String, String>);

impl ApiTokens {
    /// No tokens.
    pub fn new() -> Self {
        Self::default()
    }
    /// The token under `key`. Empty tokens count as unset.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }
    /// Set the token under `key`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }
}

impl From<HashMap<String, String>> for ApiTokens {
    fn from(map: HashMap<String, String>) -> Self {
        ApiTokens(map)
    }
}
