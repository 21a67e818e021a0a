#![warn(missing_docs)]

//! The plugin API.
//!
//! Each plugin is a shared library exposing an `init()` function (see
//! [`plugin_export!`]) that hands the host a [`Plugin`]. The host calls
//! [`Plugin::register`] to learn about commands, [`Plugin::init`] once the
//! plugin can reach the [`Host`], and then feeds it commands and messages.

use downcast_rs::{impl_downcast, Downcast};
use std::time::{Duration, Instant};

pub mod args;
pub mod host;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod model;
pub mod store;
mod util;

pub use crate::host::{Host, SendError};
pub use crate::model::*;
pub use crate::store::{ConfigStore, FileStore, MemoryStore, PluginConfig, StoreError};

use crate::util::SplitChunks;

/// The most commonly used types when implementing a plugin.
pub mod prelude {
    pub use super::{Confirmation, Context, Host, Plugin, PluginMeta};
}

/// Longest message the platform accepts in one piece.
pub const MESSAGE_LIMIT: usize = 2000;

/// Everything known about the event a plugin is reacting to.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    /// The bot hosting the plugin.
    pub host: &'a dyn Host,
    /// The channel that the event happened on.
    pub channel: &'a Channel,
    /// The user that caused the event.
    pub sender: &'a User,
    /// The message that triggered the event.
    pub message: &'a Message,
    /// Canonical name of the invoked command. Empty for plain messages.
    pub command: &'a str,
}

impl<'a> Context<'a> {
    /// Bundle up an event for a plugin.
    pub fn new(
        host: &'a dyn Host,
        channel: &'a Channel,
        sender: &'a User,
        message: &'a Message,
        command: &'a str,
    ) -> Self {
        Self {
            host,
            channel,
            sender,
            message,
            command,
        }
    }
    /// Send text to the channel belonging to this context, split into
    /// platform-sized chunks. Failures are logged, not reported.
    pub fn send_channel(&self, msg: &str) {
        for chunk in SplitChunks::new(msg, MESSAGE_LIMIT) {
            if chunk.trim().is_empty() {
                continue;
            }
            if let Err(e) = self.send(Outgoing::Text(chunk.to_owned())) {
                log::warn!("Could not send to #{}: {}", self.channel.name, e);
                return;
            }
        }
    }
    /// Send `message` to this channel, reporting failure.
    pub fn send(&self, message: Outgoing) -> Result<(), SendError> {
        self.host.send(self.channel.id, message)
    }
    /// Upload `data` as a file named `name`.
    pub fn send_file(&self, name: &str, data: Vec<u8>) -> Result<(), SendError> {
        self.send(Outgoing::File {
            name: name.to_owned(),
            data,
        })
    }
    /// Send a rich card.
    pub fn send_embed(&self, embed: Embed) -> Result<(), SendError> {
        self.send(Outgoing::Embed(embed))
    }
    /// The bot's permissions in this channel.
    pub fn permissions(&self) -> Permissions {
        self.host.permissions(self.channel.id)
    }
    /// Show a typing indicator until the returned guard is dropped.
    pub fn typing(&self) -> Typing<'a> {
        self.host.start_typing(self.channel.id);
        Typing {
            host: self.host,
            channel: self.channel.id,
        }
    }
    /// Wait for the sender to answer yes or no in this channel.
    ///
    /// Replies that are neither are ignored; the clock keeps running.
    pub fn confirm(&self, timeout: Duration) -> Confirmation {
        let deadline = Instant::now() + timeout;
        loop {
            let now = Instant::now();
            if now >= deadline {
                return Confirmation::TimedOut;
            }
            let reply = self
                .host
                .wait_for_message(self.channel.id, self.sender.id, deadline - now);
            match reply.as_deref().map(args::parse_yes_no) {
                None => return Confirmation::TimedOut,
                Some(Some(true)) => return Confirmation::Yes,
                Some(Some(false)) => return Confirmation::No,
                Some(None) => continue,
            }
        }
    }
    /// React to the invoking message with a check mark.
    pub fn tick(&self) {
        if let Err(e) = self
            .host
            .add_reaction(self.channel.id, self.message.id, "\u{2705}")
        {
            log::debug!("Could not add reaction: {}", e);
        }
    }
    /// The prefix to show in help texts.
    pub fn prefix(&self) -> String {
        self.host.prefixes().into_iter().next().unwrap_or_default()
    }
    /// Whether the event happened in a direct message.
    pub fn is_private(&self) -> bool {
        self.channel.is_private()
    }
    /// Whether the sender is the bot owner.
    pub fn sender_is_owner(&self) -> bool {
        self.host.is_owner(self.sender.id)
    }
}

/// Typing indicator guard returned by [`Context::typing`].
pub struct Typing<'a> {
    host: &'a dyn Host,
    channel: ChannelId,
}

impl Drop for Typing<'_> {
    fn drop(&mut self) {
        self.host.stop_typing(self.channel);
    }
}

/// Outcome of [`Context::confirm`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Confirmation {
    /// The user agreed.
    Yes,
    /// The user declined.
    No,
    /// No answer in time.
    TimedOut,
}

/// Type of the function that gets called when a command is invoked.
pub type CommandFn = fn(&mut dyn Plugin, &str, Context);

/// Type of the function that gets called when shared API tokens change.
pub type TokensFn = fn(&mut dyn Plugin, &ApiTokens);

/// A command that can be invoked by a user.
pub struct Command {
    /// Name of the command that is used for invocation.
    pub name: &'static str,
    /// Other names the command answers to.
    pub aliases: &'static [&'static str],
    /// The help string for this command.
    pub help: &'static str,
    /// Only the bot owner may invoke it.
    pub owner_only: bool,
    /// The function that gets called when the command is invoked.
    pub fun: CommandFn,
}

impl Command {
    /// Whether `name` is the name or an alias of this command.
    pub fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.aliases.contains(&name)
    }
}

/// Interest in credential changes for one service.
pub struct TokenWatcher {
    /// Service whose tokens are watched, e.g. `imgen`.
    pub service: &'static str,
    /// Called with the new tokens.
    pub fun: TokensFn,
}

/// Metadata for a plugin.
#[derive(Default)]
pub struct PluginMeta {
    /// The commands that this plugin has.
    pub commands: Vec<Command>,
    /// Callbacks for shared API token updates.
    pub token_watchers: Vec<TokenWatcher>,
}

impl PluginMeta {
    /// Add a command.
    pub fn command(&mut self, name: &'static str, help: &'static str, fun: CommandFn) {
        self.aliased_command(name, &[], help, fun)
    }
    /// Add a command that also answers to `aliases`.
    pub fn aliased_command(
        &mut self,
        name: &'static str,
        aliases: &'static [&'static str],
        help: &'static str,
        fun: CommandFn,
    ) {
        self.commands.push(Command {
            name,
            aliases,
            help,
            owner_only: false,
            fun,
        })
    }
    /// Add a command that only the bot owner can use.
    pub fn owner_command(&mut self, name: &'static str, help: &'static str, fun: CommandFn) {
        self.commands.push(Command {
            name,
            aliases: &[],
            help,
            owner_only: true,
            fun,
        })
    }
    /// Get called back whenever the tokens of `service` are updated.
    pub fn watch_api_tokens(&mut self, service: &'static str, fun: TokensFn) {
        self.token_watchers.push(TokenWatcher { service, fun })
    }
    /// The command answering to `name`, if any.
    pub fn find_command(&self, name: &str) -> Option<&Command> {
        self.commands.iter().find(|cmd| cmd.answers_to(name))
    }
}

/// Every plugin must implement this trait.
pub trait Plugin: Send + Downcast {
    /// Every plugin must be constructible without arguments.
    fn new() -> Self
    where
        Self: Sized;
    /// Register stuff for this plugin. For example, commands.
    fn register(&self, _meta: &mut PluginMeta) {}
    /// Called once after loading, before any event is delivered.
    fn init(&mut self, _host: &dyn Host) {}
    /// Executed for every message the bot sees, commands included, in guild
    /// channels and direct messages alike.
    fn message(&mut self, _msg: &str, _ctx: Context) {}
}

impl_downcast!(Plugin);

/// Declare a type to be the plugin.
///
/// Only one type per crate can be the plugin.
#[macro_export]
macro_rules! plugin_export {
    ($plugin:ty) => {
        /// Entry point the host looks up after loading the library.
        #[no_mangle]
        pub fn init() -> ::std::sync::Arc<::std::sync::Mutex<dyn $crate::Plugin>> {
            ::std::sync::Arc::new(::std::sync::Mutex::new(<$plugin as $crate::Plugin>::new()))
        }
    };
}
