//! In-memory [`Host`] for unit testing plugins without a chat platform.
//!
//! Enabled with the `mock` feature:
//!
//! ```toml
//! [dev-dependencies.memerelay]
//! path = "../.."
//! features = ["mock"]
//! ```

use crate::args::mention_id;
use crate::host::{Host, SendError};
use crate::model::*;
use crate::store::{ConfigStore, MemoryStore};
use crate::Context;
use chrono::{TimeZone, Utc};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// The bot itself.
pub const BOT_ID: UserId = UserId(1);
/// The bot owner.
pub const OWNER_ID: UserId = UserId(100);
/// A regular member.
pub const GUEST_ID: UserId = UserId(101);
/// The one guild every mock channel belongs to.
pub const GUILD_ID: GuildId = GuildId(10);
/// Where guild events happen.
pub const GENERAL_ID: ChannelId = ChannelId(20);
/// Where direct messages happen.
pub const DM_ID: ChannelId = ChannelId(30);

/// A user with a static avatar under `https://cdn.test/avatars/`.
pub fn user(id: u64, name: &str) -> User {
    User {
        id: UserId(id),
        name: name.to_owned(),
        display_name: name.to_owned(),
        discriminator: None,
        avatar: Avatar::new(format!("https://cdn.test/avatars/{}/{}", id, name), false),
    }
}

/// The bot owner.
pub fn owner() -> User {
    user(OWNER_ID.0, "owner")
}

/// A member that is not the owner.
pub fn guest() -> User {
    user(GUEST_ID.0, "guest")
}

/// A text channel in [`GUILD_ID`].
pub fn guild_channel(id: u64, name: &str) -> Channel {
    Channel {
        id: ChannelId(id),
        guild: Some(GUILD_ID),
        name: name.to_owned(),
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Records everything plugins do and answers their questions from canned data.
pub struct MockHost {
    bot: User,
    prefixes: Vec<String>,
    sent: Mutex<Vec<(ChannelId, Outgoing)>>,
    reactions: Mutex<Vec<(ChannelId, MessageId, String)>>,
    typing: Mutex<HashSet<ChannelId>>,
    typing_started: Mutex<usize>,
    permissions: Mutex<HashMap<ChannelId, Permissions>>,
    send_failures: Mutex<HashMap<ChannelId, SendError>>,
    upload_failures: Mutex<HashMap<ChannelId, SendError>>,
    channels: Mutex<HashMap<ChannelId, Channel>>,
    members: Mutex<Vec<User>>,
    emojis: Mutex<HashMap<String, String>>,
    replies: Mutex<VecDeque<Option<String>>>,
    tokens: Mutex<HashMap<String, ApiTokens>>,
    store: MemoryStore,
}

impl Default for MockHost {
    fn default() -> Self {
        let mut channels = HashMap::new();
        channels.insert(GENERAL_ID, guild_channel(GENERAL_ID.0, "general"));
        Self {
            bot: user(BOT_ID.0, "bot"),
            prefixes: vec!["!".to_owned(), "?".to_owned()],
            sent: Mutex::default(),
            reactions: Mutex::default(),
            typing: Mutex::default(),
            typing_started: Mutex::default(),
            permissions: Mutex::default(),
            send_failures: Mutex::default(),
            upload_failures: Mutex::default(),
            channels: Mutex::new(channels),
            members: Mutex::new(vec![owner(), guest()]),
            emojis: Mutex::default(),
            replies: Mutex::default(),
            tokens: Mutex::default(),
            store: MemoryStore::new(),
        }
    }
}

impl MockHost {
    /// A host with the general channel, the owner and the guest.
    pub fn new() -> Self {
        Self::default()
    }
    /// The bot account.
    pub fn bot(&self) -> &User {
        &self.bot
    }
    /// Override the bot's permissions in `channel`. Defaults to all.
    pub fn set_permissions(&self, channel: ChannelId, permissions: Permissions) {
        lock(&self.permissions).insert(channel, permissions);
    }
    /// Make every send to `channel` fail with `error`.
    pub fn fail_sends(&self, channel: ChannelId, error: SendError) {
        lock(&self.send_failures).insert(channel, error);
    }
    /// Make file uploads to `channel` fail with `error`. Text and embeds still go out.
    pub fn fail_uploads(&self, channel: ChannelId, error: SendError) {
        lock(&self.upload_failures).insert(channel, error);
    }
    /// Make `channel` known.
    pub fn add_channel(&self, channel: Channel) {
        lock(&self.channels).insert(channel.id, channel);
    }
    /// Make `user` findable in the guild.
    pub fn add_member(&self, user: User) {
        lock(&self.members).push(user);
    }
    /// Resolve the custom emoji `token` to `url`.
    pub fn add_emoji(&self, token: &str, url: &str) {
        lock(&self.emojis).insert(token.to_owned(), url.to_owned());
    }
    /// Queue the answer for the next `wait_for_message`. `None` is a timeout.
    pub fn push_reply(&self, reply: Option<&str>) {
        lock(&self.replies).push_back(reply.map(str::to_owned));
    }
    /// Set a shared token, returning every token of the service.
    pub fn set_api_token(&self, service: &str, key: &str, value: &str) -> ApiTokens {
        let mut tokens = lock(&self.tokens);
        let entry = tokens.entry(service.to_owned()).or_default();
        entry.set(key, value);
        entry.clone()
    }
    /// Everything sent so far, in order.
    pub fn sent(&self) -> Vec<(ChannelId, Outgoing)> {
        lock(&self.sent).clone()
    }
    /// Everything sent to `channel`.
    pub fn sent_to(&self, channel: ChannelId) -> Vec<Outgoing> {
        lock(&self.sent)
            .iter()
            .filter(|(id, _)| *id == channel)
            .map(|(_, out)| out.clone())
            .collect()
    }
    /// Text messages sent to `channel`.
    pub fn sent_texts(&self, channel: ChannelId) -> Vec<String> {
        self.sent_to(channel)
            .into_iter()
            .filter_map(|out| match out {
                Outgoing::Text(text) => Some(text),
                _ => None,
            })
            .collect()
    }
    /// Cards sent to `channel`.
    pub fn sent_embeds(&self, channel: ChannelId) -> Vec<Embed> {
        self.sent_to(channel)
            .into_iter()
            .filter_map(|out| match out {
                Outgoing::Embed(embed) => Some(embed),
                _ => None,
            })
            .collect()
    }
    /// Reactions added so far.
    pub fn reactions(&self) -> Vec<(ChannelId, MessageId, String)> {
        lock(&self.reactions).clone()
    }
    /// Whether a typing indicator is currently shown in `channel`.
    pub fn is_typing(&self, channel: ChannelId) -> bool {
        lock(&self.typing).contains(&channel)
    }
    /// How many typing indicators were started so far.
    pub fn typing_started(&self) -> usize {
        *lock(&self.typing_started)
    }
}

impl Host for MockHost {
    fn bot_user(&self) -> User {
        self.bot.clone()
    }
    fn prefixes(&self) -> Vec<String> {
        self.prefixes.clone()
    }
    fn is_owner(&self, user: UserId) -> bool {
        user == OWNER_ID
    }
    fn send(&self, channel: ChannelId, message: Outgoing) -> Result<(), SendError> {
        if let Some(err) = lock(&self.send_failures).get(&channel) {
            return Err(err.clone());
        }
        if let Outgoing::File { .. } = message {
            if let Some(err) = lock(&self.upload_failures).get(&channel) {
                return Err(err.clone());
            }
        }
        lock(&self.sent).push((channel, message));
        Ok(())
    }
    fn add_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
    ) -> Result<(), SendError> {
        lock(&self.reactions).push((channel, message, emoji.to_owned()));
        Ok(())
    }
    fn permissions(&self, channel: ChannelId) -> Permissions {
        lock(&self.permissions)
            .get(&channel)
            .cloned()
            .unwrap_or_else(Permissions::all)
    }
    fn start_typing(&self, channel: ChannelId) {
        lock(&self.typing).insert(channel);
        *lock(&self.typing_started) += 1;
    }
    fn stop_typing(&self, channel: ChannelId) {
        lock(&self.typing).remove(&channel);
    }
    fn channel(&self, id: ChannelId) -> Option<Channel> {
        lock(&self.channels).get(&id).cloned()
    }
    fn find_channel(&self, guild: GuildId, query: &str) -> Option<Channel> {
        let channels = lock(&self.channels);
        let name = query.trim_start_matches('#');
        channels
            .values()
            .filter(|c| c.guild == Some(guild))
            .find(|c| mention_id(query) == Some(c.id.0) || c.name == name)
            .cloned()
    }
    fn find_member(&self, guild: Option<GuildId>, query: &str) -> Option<User> {
        let members = lock(&self.members);
        if let Some(id) = mention_id(query) {
            return members.iter().find(|u| u.id.0 == id).cloned();
        }
        guild?;
        members
            .iter()
            .find(|u| u.name.eq_ignore_ascii_case(query) || u.display_name.eq_ignore_ascii_case(query))
            .cloned()
    }
    fn custom_emoji_url(&self, query: &str) -> Option<String> {
        lock(&self.emojis).get(query).cloned()
    }
    fn wait_for_message(
        &self,
        _channel: ChannelId,
        _author: UserId,
        _timeout: Duration,
    ) -> Option<String> {
        lock(&self.replies).pop_front().flatten()
    }
    fn api_tokens(&self, service: &str) -> ApiTokens {
        lock(&self.tokens).get(service).cloned().unwrap_or_default()
    }
    fn store(&self) -> &dyn ConfigStore {
        &self.store
    }
}

/// An owned event to build a [`Context`] from.
pub struct MockEvent {
    /// Where it happened.
    pub channel: Channel,
    /// Who caused it.
    pub sender: User,
    /// The message itself.
    pub message: Message,
    /// Invoked command, empty for plain messages.
    pub command: String,
}

impl MockEvent {
    /// `command` invoked by the owner in the general channel with `content`
    /// as its argument text.
    pub fn guild(command: &str, content: &str) -> Self {
        Self {
            channel: guild_channel(GENERAL_ID.0, "general"),
            sender: owner(),
            message: message(content),
            command: command.to_owned(),
        }
    }
    /// A direct message from the guest.
    pub fn dm(content: &str) -> Self {
        Self {
            channel: Channel {
                id: DM_ID,
                guild: None,
                name: "dm".to_owned(),
            },
            sender: guest(),
            message: message(content),
            command: String::new(),
        }
    }
    /// Replace the sender.
    pub fn from_user(mut self, sender: User) -> Self {
        self.sender = sender;
        self
    }
    /// Attach a file to the message.
    pub fn with_attachment(mut self, filename: &str, url: &str) -> Self {
        self.message.attachments.push(Attachment::new(filename, url));
        self
    }
    /// A context for this event on `host`.
    pub fn ctx<'a>(&'a self, host: &'a MockHost) -> Context<'a> {
        Context::new(host, &self.channel, &self.sender, &self.message, &self.command)
    }
}

/// Fixed creation time of every mock message.
pub fn created_at() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 5, 17, 12, 30, 0)
        .single()
        .unwrap_or_default()
}

fn message(content: &str) -> Message {
    Message {
        id: MessageId(500),
        content: content.to_owned(),
        attachments: Vec::new(),
        created_at: created_at(),
    }
}
