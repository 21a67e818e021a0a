use crate::console::ConsoleHost;
use crate::plugin_container::{lock, PluginContainer, SharedPlugin};
use distance::damerau_levenshtein;
use plugin_api::{Channel, Context, Host, Message, Outgoing, User};
use split_whitespace_rest::SplitWhitespace;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

/// A message as it arrived, before any plugin looked at it.
#[derive(Clone, Debug)]
pub struct Event {
    pub channel: Channel,
    pub sender: User,
    pub message: Message,
}

/// The core of the bot.
///
/// All user-facing functionality is implemented through plugins.
/// The core is responsible for routing messages to them.
pub struct Core {
    host: Arc<ConsoleHost>,
    plugin_dir: PathBuf,
    plugins: HashMap<String, PluginContainer>,
}

impl Core {
    pub fn new(host: Arc<ConsoleHost>, plugin_dir: PathBuf) -> Self {
        Self {
            host,
            plugin_dir,
            plugins: HashMap::new(),
        }
    }
    pub fn handle(&self, event: Event) {
        if let Some(command) = command_text(&event.message.content, &self.host.prefixes()) {
            if !self.handle_help(&event, command) {
                self.handle_command(&event, command);
            }
        }
        self.delegate_message(&event);
    }
    fn reply(&self, event: &Event, text: String) {
        if let Err(e) = self.host.send(event.channel.id, Outgoing::Text(text)) {
            log::warn!("Could not reply in {}: {}", event.channel.name, e);
        }
    }
    /// Recognize and handle the help command. Returns whether the command we looked at was
    /// the help command.
    fn handle_help(&self, event: &Event, command: &str) -> bool {
        let mut sw = SplitWhitespace::new(command);
        if !sw.next().map_or(false, |word| word.eq_ignore_ascii_case("help")) {
            return false;
        }
        let prefix = self.host.prefixes().into_iter().next().unwrap_or_default();
        if let Some(arg) = sw.next() {
            let arg = arg.trim_start_matches(prefix.as_str()).to_lowercase();
            for plugin in self.plugins.values() {
                if let Some(cmd) = plugin.meta.find_command(&arg) {
                    self.reply(event, format!("{}{}: {}", prefix, cmd.name, cmd.help));
                    return true;
                }
            }
        }
        let mut names: Vec<&str> = self
            .plugins
            .values()
            .flat_map(|p| p.meta.commands.iter().map(|c| c.name))
            .collect();
        names.sort_unstable();
        self.reply(
            event,
            format!(
                "The following commands are available ({}help <command>): {}",
                prefix,
                names.join(", ")
            ),
        );
        true
    }
    fn handle_command(&self, event: &Event, command: &str) {
        let mut sw = SplitWhitespace::new(command);
        let name = match sw.next() {
            Some(name) => name.to_lowercase(),
            None => return,
        };
        let arg = sw.rest_as_slice().trim_start().to_owned();
        for container in self.plugins.values() {
            let cmd = match container.meta.find_command(&name) {
                Some(cmd) => cmd,
                None => continue,
            };
            if cmd.owner_only && !self.host.is_owner(event.sender.id) {
                self.reply(event, format!("`{}` is for the bot owner only.", cmd.name));
                return;
            }
            log::debug!("{} invoked {} in {}", event.sender.name, cmd.name, event.channel.name);
            let plugin = SharedPlugin::clone(&container.plugin);
            let host = Arc::clone(&self.host);
            let event = event.clone();
            let (fun, canonical) = (cmd.fun, cmd.name);
            thread::spawn(move || {
                let ctx = Context::new(
                    &*host,
                    &event.channel,
                    &event.sender,
                    &event.message,
                    canonical,
                );
                fun(&mut *lock(&plugin), &arg, ctx);
            });
            return;
        }
        let names = self.plugins.values().flat_map(|p| {
            p.meta
                .commands
                .iter()
                .flat_map(|c| std::iter::once(c.name).chain(c.aliases.iter().copied()))
        });
        let text = match suggest(&name, names) {
            Some(close) => format!("Unknown command: {}. Did you mean '{}'?", name, close),
            None => format!("Unknown command: {}.", name),
        };
        self.reply(event, text);
    }
    fn delegate_message(&self, event: &Event) {
        for container in self.plugins.values() {
            let plugin = SharedPlugin::clone(&container.plugin);
            let host = Arc::clone(&self.host);
            let event = event.clone();
            thread::spawn(move || {
                let ctx = Context::new(&*host, &event.channel, &event.sender, &event.message, "");
                lock(&plugin).message(&event.message.content, ctx);
            });
        }
    }
    /// Store a shared token and tell every plugin watching `service`.
    pub fn set_api_token(&self, service: &str, key: &str, value: &str) {
        let tokens = self.host.set_api_token(service, key, value);
        for container in self.plugins.values() {
            for watcher in container.meta.token_watchers.iter().filter(|w| w.service == service) {
                let plugin = SharedPlugin::clone(&container.plugin);
                let tokens = tokens.clone();
                let fun = watcher.fun;
                thread::spawn(move || fun(&mut *lock(&plugin), &tokens));
            }
        }
    }
    pub fn plugin_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.plugins.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
    pub fn load_plugin(&mut self, name: &str) -> Result<(), libloading::Error> {
        let container = PluginContainer::load(&self.plugin_dir, name)?;
        container.lock().init(&*self.host);
        log::info!("Loaded plugin {}", name);
        self.plugins.insert(name.to_owned(), container);
        Ok(())
    }
    pub fn unload_plugin(&mut self, name: &str) -> bool {
        self.plugins.remove(name).is_some()
    }
    pub fn reload_plugin(&mut self, name: &str) -> Result<(), libloading::Error> {
        self.plugins.remove(name);
        self.load_plugin(name)
    }
}

/// The command part of `message`, if it starts with one of `prefixes`.
///
/// A valid command is a prefix immediately succeeded by an alphabetic character.
fn command_text<'a>(message: &'a str, prefixes: &[String]) -> Option<&'a str> {
    prefixes.iter().find_map(|prefix| {
        let rest = message.strip_prefix(prefix.as_str())?;
        match rest.chars().next() {
            Some(ch) if ch.is_alphabetic() => Some(rest),
            _ => None,
        }
    })
}

/// The name closest to `command`, if any is known at all.
fn suggest<'a>(command: &str, names: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    names
        .into_iter()
        .min_by_key(|name| damerau_levenshtein(command, name))
}

#[test]
fn test_command_text() {
    let prefixes = vec!["!".to_owned(), "meme ".to_owned()];
    assert_eq!(command_text("!abandon me", &prefixes), Some("abandon me"));
    assert_eq!(command_text("meme slap @guest", &prefixes), Some("slap @guest"));
    assert_eq!(command_text("! abandon", &prefixes), None);
    assert_eq!(command_text("!!!", &prefixes), None);
    assert_eq!(command_text("abandon", &prefixes), None);
    assert_eq!(command_text("!", &prefixes), None);
}

#[test]
fn test_suggest() {
    let names = ["abandon", "aborted", "affect", "modmail", "modmailset"];
    assert_eq!(suggest("abandn", names.iter().copied()), Some("abandon"));
    assert_eq!(suggest("modmailst", names.iter().copied()), Some("modmailset"));
    assert_eq!(suggest("anything", std::iter::empty()), None);
}
