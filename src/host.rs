//! What a plugin can ask of the bot that hosts it.

use crate::model::{
    ApiTokens, Channel, ChannelId, GuildId, MessageId, Outgoing, Permissions, User, UserId,
};
use crate::store::ConfigStore;
use std::time::Duration;
use thiserror::Error;

/// Why a message did not go out.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SendError {
    /// The platform refused the message, typically for lack of permissions.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// The channel does not exist or is not visible to the bot.
    #[error("unknown channel {0}")]
    UnknownChannel(ChannelId),
    /// The message may or may not have gone out.
    #[error("transport error: {0}")]
    Transport(String),
}

/// The chat platform as seen by plugins.
///
/// Implementations must be usable from several command threads at once.
pub trait Host: Send + Sync {
    /// The account the bot runs as.
    fn bot_user(&self) -> User;
    /// Command prefixes, in order of preference.
    fn prefixes(&self) -> Vec<String>;
    /// Whether `user` is the bot owner.
    fn is_owner(&self, user: UserId) -> bool;

    /// Post `message` to `channel`.
    fn send(&self, channel: ChannelId, message: Outgoing) -> Result<(), SendError>;
    /// React to `message` with `emoji`.
    fn add_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
    ) -> Result<(), SendError>;
    /// The bot's own permissions in `channel`.
    fn permissions(&self, channel: ChannelId) -> Permissions;
    /// Show the typing indicator in `channel`.
    fn start_typing(&self, channel: ChannelId);
    /// Hide the typing indicator in `channel`.
    fn stop_typing(&self, channel: ChannelId);

    /// Look up a channel by id.
    fn channel(&self, id: ChannelId) -> Option<Channel>;
    /// Resolves a channel mention, id or name within a guild.
    fn find_channel(&self, guild: GuildId, query: &str) -> Option<Channel>;
    /// Resolves a user mention, id or name. Outside of a guild only the id
    /// and mention forms can match.
    fn find_member(&self, guild: Option<GuildId>, query: &str) -> Option<User>;
    /// Image URL of a custom emoji, if `query` is one.
    fn custom_emoji_url(&self, query: &str) -> Option<String>;

    /// Blocks until `author` says something in `channel`, or `timeout` passes.
    fn wait_for_message(
        &self,
        channel: ChannelId,
        author: UserId,
        timeout: Duration,
    ) -> Option<String>;

    /// Credentials registered for `service`. Empty when none are set.
    fn api_tokens(&self, service: &str) -> ApiTokens;
    /// Persisted settings shared by all plugins, namespaced per plugin.
    fn store(&self) -> &dyn ConfigStore;
}
