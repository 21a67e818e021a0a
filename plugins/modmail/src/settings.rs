use plugin_api::{ChannelId, ConfigStore, GuildId, PluginConfig};
use serde_derive::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const NAMESPACE: &str = "modmail";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelayMode {
    /// Every DM to the bot is relayed.
    DmForward,
    /// Only the `modmail` command relays.
    CommandOnly,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Toggle {
    pub status: bool,
}

impl Default for Toggle {
    fn default() -> Self {
        Self { status: true }
    }
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Kind {
    pub command: bool,
}

/// Persisted as `{modmail = {guild = channel}, toggle = {status}, type = {command}}`.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ModmailSettings {
    /// Relay channel per guild, keyed by the guild id as a string.
    pub modmail: BTreeMap<String, ChannelId>,
    pub toggle: Toggle,
    #[serde(rename = "type")]
    pub kind: Kind,
}

impl ModmailSettings {
    pub fn enabled(&self) -> bool {
        self.toggle.status
    }
    pub fn mode(&self) -> RelayMode {
        if self.kind.command {
            RelayMode::CommandOnly
        } else {
            RelayMode::DmForward
        }
    }
    pub fn set_mode(&mut self, mode: RelayMode) {
        self.kind.command = mode == RelayMode::CommandOnly;
    }
    /// Replaces any channel already set for `guild`.
    pub fn set_channel(&mut self, guild: GuildId, channel: ChannelId) {
        self.modmail.insert(guild.to_string(), channel);
    }
    pub fn channels<'a>(&'a self) -> impl Iterator<Item = ChannelId> + 'a {
        self.modmail.values().cloned()
    }
}

pub fn config(store: &dyn ConfigStore) -> PluginConfig<ModmailSettings> {
    PluginConfig::new(store, NAMESPACE)
}
