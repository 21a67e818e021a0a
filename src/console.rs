//! A [`Host`] that lives in the terminal.
//!
//! Output goes to stdout, uploaded files to `<data-dir>/out/`. Input lines
//! are turned into messages by the session.

use crate::config::Config;
use chrono::Utc;
use plugin_api::args::mention_id;
use plugin_api::*;
use split_whitespace_rest::SplitWhitespace;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Mutex, MutexGuard};
use std::time::Duration;

const DEFAULT_AVATAR: &str = "https://cdn.discordapp.com/embed/avatars/0";

fn lock<T>(m: &Mutex<T>) -> MutexGuard<T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Someone blocked in `wait_for_message`.
struct Waiter {
    id: u64,
    channel: ChannelId,
    author: UserId,
    tx: mpsc::Sender<String>,
}

pub struct ConsoleHost {
    bot: User,
    prefixes: Vec<String>,
    owner: UserId,
    guild: GuildId,
    channels: Vec<Channel>,
    users: Vec<User>,
    attach_files: bool,
    out_dir: PathBuf,
    store: FileStore,
    tokens: Mutex<HashMap<String, ApiTokens>>,
    waiters: Mutex<Vec<Waiter>>,
    next_id: AtomicU64,
}

impl ConsoleHost {
    pub fn new(config: &Config) -> Self {
        let guild = GuildId(config.console.guild);
        let channels = config
            .console
            .channels
            .iter()
            .map(|c| Channel {
                id: ChannelId(c.id),
                guild: Some(guild),
                name: c.name.clone(),
            })
            .collect();
        let mut users: Vec<User> = config
            .console
            .users
            .iter()
            .map(|u| User {
                id: UserId(u.id),
                name: u.name.clone(),
                display_name: u.display_name.clone().unwrap_or_else(|| u.name.clone()),
                discriminator: None,
                avatar: Avatar::new(
                    u.avatar.clone().unwrap_or_else(|| DEFAULT_AVATAR.to_owned()),
                    u.animated,
                ),
            })
            .collect();
        let owner = UserId(config.bot.owner);
        if !users.iter().any(|u| u.id == owner) {
            users.insert(0, plain_user(owner, "owner"));
        }
        let tokens = config
            .api
            .iter()
            .map(|(service, keys)| (service.clone(), ApiTokens::from(keys.clone())))
            .collect();
        Self {
            bot: plain_user(UserId(0), &config.bot.name),
            prefixes: config.bot.prefixes.clone(),
            owner,
            guild,
            channels,
            users,
            attach_files: config.console.attach_files,
            out_dir: config.bot.data_dir.join("out"),
            store: FileStore::new(config.bot.data_dir.clone()),
            tokens: Mutex::new(tokens),
            waiters: Mutex::default(),
            next_id: AtomicU64::new(1),
        }
    }
    pub fn guild(&self) -> GuildId {
        self.guild
    }
    pub fn owner_user(&self) -> Option<User> {
        self.users.iter().find(|u| u.id == self.owner).cloned()
    }
    pub fn default_channel(&self) -> Option<Channel> {
        self.channels.first().cloned()
    }
    /// Look up a console user by name or id.
    pub fn user(&self, query: &str) -> Option<User> {
        let id = mention_id(query);
        self.users
            .iter()
            .find(|u| Some(u.id.0) == id || u.name.eq_ignore_ascii_case(query))
            .cloned()
    }
    pub fn dm_channel(&self, user: &User) -> Channel {
        Channel {
            id: ChannelId(user.id.0),
            guild: None,
            name: user.name.clone(),
        }
    }
    pub fn new_message(&self, content: &str, attachments: Vec<Attachment>) -> Message {
        Message {
            id: MessageId(self.next_id.fetch_add(1, Ordering::Relaxed)),
            content: content.to_owned(),
            attachments,
            created_at: Utc::now(),
        }
    }
    /// Hand `text` to every plugin waiting for `author` in `channel`.
    /// Returns whether anyone took it. The line still goes out as a message.
    pub fn offer_reply(&self, channel: ChannelId, author: UserId, text: &str) -> bool {
        let mut waiters = lock(&self.waiters);
        let mut taken = false;
        waiters.retain(|w| {
            if w.channel != channel || w.author != author {
                return true;
            }
            taken |= w.tx.send(text.to_owned()).is_ok();
            false
        });
        taken
    }
    #[cfg(test)]
    pub(crate) fn waiting(&self) -> usize {
        lock(&self.waiters).len()
    }
    pub fn set_api_token(&self, service: &str, key: &str, value: &str) -> ApiTokens {
        let mut tokens = lock(&self.tokens);
        let entry = tokens.entry(service.to_owned()).or_default();
        entry.set(key, value);
        entry.clone()
    }
    fn label(&self, channel: ChannelId) -> String {
        match self.channel(channel) {
            Some(ref c) if c.is_private() => format!("@{}", c.name),
            Some(c) => format!("#{}", c.name),
            None => channel.to_string(),
        }
    }
    fn write_file(&self, name: &str, data: &[u8]) -> Result<PathBuf, SendError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let path = self.out_dir.join(format!("{}-{}", id, name));
        fs::create_dir_all(&self.out_dir)
            .and_then(|_| fs::write(&path, data))
            .map_err(|e| SendError::Transport(e.to_string()))?;
        Ok(path)
    }
}

fn plain_user(id: UserId, name: &str) -> User {
    User {
        id,
        name: name.to_owned(),
        display_name: name.to_owned(),
        discriminator: None,
        avatar: Avatar::new(DEFAULT_AVATAR, false),
    }
}

/// `<:name:id>` or `<a:name:id>` to the emoji's image URL.
pub fn emoji_url(token: &str) -> Option<String> {
    let inner = token.strip_prefix('<')?.strip_suffix('>')?;
    let (animated, rest) = match inner.strip_prefix("a:") {
        Some(rest) => (true, rest),
        None => (false, inner.strip_prefix(':')?),
    };
    let id = rest.rsplit(':').next()?;
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) || !rest.contains(':') {
        return None;
    }
    let ext = if animated { "gif" } else { "png" };
    Some(format!("https://cdn.discordapp.com/emojis/{}.{}", id, ext))
}

/// Plain text rendition of an embed.
pub fn render_embed(embed: &Embed) -> String {
    let mut lines = vec!["[embed]".to_owned()];
    if let Some(ref author) = embed.author {
        lines.push(format!("  {}", author.name));
    }
    if let Some(ref description) = embed.description {
        lines.extend(description.lines().map(|l| format!("  | {}", l)));
    }
    if let Some(ref image) = embed.image {
        lines.push(format!("  image: {}", image));
    }
    for field in &embed.fields {
        lines.push(format!("  {}:", field.name));
        lines.extend(field.value.lines().map(|l| format!("    {}", l)));
    }
    if let Some(timestamp) = embed.timestamp {
        lines.push(format!("  {}", timestamp.to_rfc2822()));
    }
    lines.join("\n")
}

impl Host for ConsoleHost {
    fn bot_user(&self) -> User {
        self.bot.clone()
    }
    fn prefixes(&self) -> Vec<String> {
        self.prefixes.clone()
    }
    fn is_owner(&self, user: UserId) -> bool {
        user == self.owner
    }
    fn send(&self, channel: ChannelId, message: Outgoing) -> Result<(), SendError> {
        if self.channel(channel).is_none() {
            return Err(SendError::UnknownChannel(channel));
        }
        let label = self.label(channel);
        match message {
            Outgoing::Text(text) => println!("[{}] {}: {}", label, self.bot.name, text),
            Outgoing::File { name, data } => {
                if !self.permissions(channel).attach_files {
                    return Err(SendError::Forbidden("missing attach files permission".into()));
                }
                let path = self.write_file(&name, &data)?;
                println!(
                    "[{}] {}: <file {} ({} bytes) saved to {}>",
                    label,
                    self.bot.name,
                    name,
                    data.len(),
                    path.display()
                );
            }
            Outgoing::Embed(embed) => {
                println!("[{}] {}: {}", label, self.bot.name, render_embed(&embed))
            }
        }
        Ok(())
    }
    fn add_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
    ) -> Result<(), SendError> {
        println!("[{}] {} reacted {} to #{}", self.label(channel), self.bot.name, emoji, message);
        Ok(())
    }
    fn permissions(&self, channel: ChannelId) -> Permissions {
        match self.channel(channel) {
            Some(ref c) if !c.is_private() => Permissions {
                attach_files: self.attach_files,
                ..Permissions::all()
            },
            Some(_) => Permissions::all(),
            None => Permissions::none(),
        }
    }
    fn start_typing(&self, channel: ChannelId) {
        println!("[{}] {} is typing...", self.label(channel), self.bot.name);
    }
    fn stop_typing(&self, _channel: ChannelId) {}
    fn channel(&self, id: ChannelId) -> Option<Channel> {
        if let Some(channel) = self.channels.iter().find(|c| c.id == id) {
            return Some(channel.clone());
        }
        self.users
            .iter()
            .find(|u| u.id.0 == id.0)
            .map(|u| self.dm_channel(u))
    }
    fn find_channel(&self, guild: GuildId, query: &str) -> Option<Channel> {
        if guild != self.guild {
            return None;
        }
        let id = mention_id(query);
        let name = query.trim_start_matches('#');
        self.channels
            .iter()
            .find(|c| Some(c.id.0) == id || c.name == name)
            .cloned()
    }
    fn find_member(&self, guild: Option<GuildId>, query: &str) -> Option<User> {
        if let Some(id) = mention_id(query) {
            return self.users.iter().find(|u| u.id.0 == id).cloned();
        }
        guild.filter(|g| *g == self.guild)?;
        self.users
            .iter()
            .find(|u| u.name.eq_ignore_ascii_case(query) || u.display_name.eq_ignore_ascii_case(query))
            .cloned()
    }
    fn custom_emoji_url(&self, query: &str) -> Option<String> {
        emoji_url(query)
    }
    fn wait_for_message(
        &self,
        channel: ChannelId,
        author: UserId,
        timeout: Duration,
    ) -> Option<String> {
        let (tx, rx) = mpsc::channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.waiters).push(Waiter {
            id,
            channel,
            author,
            tx,
        });
        let reply = rx.recv_timeout(timeout).ok();
        lock(&self.waiters).retain(|w| w.id != id);
        reply
    }
    fn api_tokens(&self, service: &str) -> ApiTokens {
        lock(&self.tokens).get(service).cloned().unwrap_or_default()
    }
    fn store(&self) -> &dyn ConfigStore {
        &self.store
    }
}

/// One line of console input.
#[derive(Debug, PartialEq, Eq)]
pub enum Line<'a> {
    /// Said in the current channel.
    Say(&'a str),
    As(&'a str),
    In(&'a str),
    Dm(&'a str),
    Attach(&'a str),
    Api {
        service: &'a str,
        key: &'a str,
        value: &'a str,
    },
    Load(&'a str),
    Unload(&'a str),
    Reload(&'a str),
    Quit,
    /// A directive with missing arguments; carries its usage.
    Usage(&'static str),
    Unknown(&'a str),
}

pub fn parse_line(line: &str) -> Line {
    let line = line.trim();
    if !line.starts_with(':') {
        return Line::Say(line);
    }
    let mut sw = SplitWhitespace::new(&line[1..]);
    let directive = sw.next().unwrap_or("");
    let rest = sw.rest_as_slice().trim();
    match directive {
        "as" => with_arg(rest, ":as <user>", Line::As),
        "in" => with_arg(rest, ":in <channel>", Line::In),
        "dm" => with_arg(rest, ":dm <text>", Line::Dm),
        "attach" => with_arg(rest, ":attach <url>", Line::Attach),
        "load" => with_arg(rest, ":load <plugin>", Line::Load),
        "unload" => with_arg(rest, ":unload <plugin>", Line::Unload),
        "reload" => with_arg(rest, ":reload <plugin>", Line::Reload),
        "api" => {
            let mut words = SplitWhitespace::new(rest);
            match (words.next(), words.next()) {
                (Some(service), Some(key)) => Line::Api {
                    service,
                    key,
                    value: words.rest_as_slice().trim(),
                },
                _ => Line::Usage(":api <service> <key> <value>"),
            }
        }
        "quit" | "q" => Line::Quit,
        other => Line::Unknown(other),
    }
}

fn with_arg<'a>(rest: &'a str, usage: &'static str, make: fn(&'a str) -> Line<'a>) -> Line<'a> {
    if rest.is_empty() {
        Line::Usage(usage)
    } else {
        make(rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;

    fn host(data_dir: &std::path::Path) -> ConsoleHost {
        let mut config = config::parse(include_str!("../memerelay.template.toml")).unwrap();
        config.bot.data_dir = data_dir.to_owned();
        ConsoleHost::new(&config)
    }

    #[test]
    fn emoji_urls() {
        assert_eq!(
            emoji_url("<:pog:123>").as_deref(),
            Some("https://cdn.discordapp.com/emojis/123.png")
        );
        assert_eq!(
            emoji_url("<a:dance:45>").as_deref(),
            Some("https://cdn.discordapp.com/emojis/45.gif")
        );
        assert_eq!(emoji_url("<@123>"), None);
        assert_eq!(emoji_url(":pog:"), None);
        assert_eq!(emoji_url("<:pog:abc>"), None);
    }

    #[test]
    fn directives() {
        assert_eq!(parse_line("hello there"), Line::Say("hello there"));
        assert_eq!(parse_line(":as guest"), Line::As("guest"));
        assert_eq!(parse_line(":dm  hi staff "), Line::Dm("hi staff"));
        assert_eq!(parse_line(":in"), Line::Usage(":in <channel>"));
        assert_eq!(
            parse_line(":api imgen authorization s3cret"),
            Line::Api {
                service: "imgen",
                key: "authorization",
                value: "s3cret"
            }
        );
        assert_eq!(parse_line(":api imgen"), Line::Usage(":api <service> <key> <value>"));
        assert_eq!(parse_line(":q"), Line::Quit);
        assert_eq!(parse_line(":frobnicate"), Line::Unknown("frobnicate"));
    }

    #[test]
    fn waiting_plugin_receives_matching_reply_only() {
        let dir = tempfile::tempdir().unwrap();
        let host = std::sync::Arc::new(host(dir.path()));
        let waiting = std::sync::Arc::clone(&host);
        let handle = std::thread::spawn(move || {
            waiting.wait_for_message(ChannelId(10), UserId(100), Duration::from_secs(10))
        });
        // Spin until the waiter is in place
        while !host.offer_reply(ChannelId(10), UserId(100), "yes") {
            assert!(!host.offer_reply(ChannelId(10), UserId(101), "no"));
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(handle.join().unwrap().as_deref(), Some("yes"));
        assert!(!host.offer_reply(ChannelId(10), UserId(100), "again"));
    }

    #[test]
    fn concurrent_waiters_all_get_the_reply() {
        let dir = tempfile::tempdir().unwrap();
        let host = std::sync::Arc::new(host(dir.path()));
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let waiting = std::sync::Arc::clone(&host);
                std::thread::spawn(move || {
                    waiting.wait_for_message(ChannelId(10), UserId(100), Duration::from_secs(10))
                })
            })
            .collect();
        while host.waiting() < 2 {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(host.offer_reply(ChannelId(10), UserId(100), "maybe"));
        for handle in handles {
            assert_eq!(handle.join().unwrap().as_deref(), Some("maybe"));
        }
        assert_eq!(host.waiting(), 0);
    }

    #[test]
    fn wait_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let host = host(dir.path());
        let reply = host.wait_for_message(ChannelId(10), UserId(100), Duration::from_millis(10));
        assert_eq!(reply, None);
        assert!(!host.offer_reply(ChannelId(10), UserId(100), "late"));
    }

    #[test]
    fn files_land_in_out_dir() {
        let dir = tempfile::tempdir().unwrap();
        let host = host(dir.path());
        host.send(
            ChannelId(10),
            Outgoing::File {
                name: "abandon.png".into(),
                data: b"PNG".to_vec(),
            },
        )
        .unwrap();
        let out: Vec<_> = fs::read_dir(dir.path().join("out")).unwrap().collect();
        assert_eq!(out.len(), 1);
        assert_eq!(
            host.send(ChannelId(999), Outgoing::Text("x".into())),
            Err(SendError::UnknownChannel(ChannelId(999)))
        );
    }

    #[test]
    fn lookups() {
        let dir = tempfile::tempdir().unwrap();
        let host = host(dir.path());
        let guild = GuildId(1);
        assert_eq!(host.find_channel(guild, "#modmail").map(|c| c.id), Some(ChannelId(11)));
        assert_eq!(host.find_channel(guild, "<#10>").map(|c| c.id), Some(ChannelId(10)));
        assert_eq!(host.find_member(Some(guild), "Guest").map(|u| u.id), Some(UserId(101)));
        assert_eq!(host.find_member(None, "guest"), None);
        assert_eq!(host.find_member(None, "<@101>").map(|u| u.id), Some(UserId(101)));
        assert!(host.channel(ChannelId(101)).map_or(false, |c| c.is_private()));
        assert!(host.is_owner(UserId(100)));
        assert!(!host.is_owner(UserId(101)));
    }
}
