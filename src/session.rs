use crate::console::{parse_line, ConsoleHost, Line};
use crate::core::{Core, Event};
use plugin_api::{Attachment, Channel, Host, User};
use std::mem;
use url::Url;

/// Who is talking, and where.
pub struct Session {
    pub user: User,
    pub channel: Channel,
    attachments: Vec<Attachment>,
}

impl Session {
    pub fn new(user: User, channel: Channel) -> Self {
        Self {
            user,
            channel,
            attachments: Vec::new(),
        }
    }
    pub fn prompt(&self) -> String {
        let place = if self.channel.is_private() {
            "dm".to_owned()
        } else {
            format!("#{}", self.channel.name)
        };
        format!("{}@{}> ", self.user.name, place)
    }
    /// Act on one line of input. Returns `false` when the user wants out.
    pub fn handle(&mut self, core: &mut Core, host: &ConsoleHost, line: &str) -> bool {
        match parse_line(line) {
            Line::Say(text) => {
                let channel = self.channel.clone();
                self.say(core, host, channel, text);
            }
            Line::Dm(text) => {
                let channel = host.dm_channel(&self.user);
                self.say(core, host, channel, text);
            }
            Line::As(name) => match host.user(name) {
                Some(user) => {
                    if self.channel.is_private() {
                        self.channel = host.dm_channel(&user);
                    }
                    self.user = user;
                }
                None => println!("No user named \"{}\".", name),
            },
            Line::In(name) => {
                let found = if name.eq_ignore_ascii_case("dm") {
                    Some(host.dm_channel(&self.user))
                } else {
                    host.find_channel(host.guild(), name)
                };
                match found {
                    Some(channel) => self.channel = channel,
                    None => println!("No channel named \"{}\".", name),
                }
            }
            Line::Attach(url) => match attachment(url) {
                Ok(a) => {
                    println!("Attached {} to the next message.", a.filename);
                    self.attachments.push(a);
                }
                Err(e) => println!("Not an attachment URL: {}", e),
            },
            Line::Api {
                service,
                key,
                value,
            } => {
                core.set_api_token(service, key, value);
                println!("Updated {} token \"{}\".", service, key);
            }
            Line::Load(name) => match core.load_plugin(name) {
                Ok(()) => println!("Loaded \"{}\" plugin.", name),
                Err(e) => println!("Failed to load \"{}\": {}", name, e),
            },
            Line::Unload(name) => {
                if core.unload_plugin(name) {
                    println!("Removed \"{}\" plugin.", name);
                } else {
                    println!("No \"{}\" plugin loaded.", name);
                }
            }
            Line::Reload(name) => match core.reload_plugin(name) {
                Ok(()) => println!("Reloaded \"{}\" plugin.", name),
                Err(e) => println!("Failed to reload \"{}\": {}", name, e),
            },
            Line::Quit => return false,
            Line::Usage(usage) => println!("Usage: {}", usage),
            Line::Unknown(directive) => println!("Unknown directive :{}", directive),
        }
        true
    }
    fn say(&mut self, core: &Core, host: &ConsoleHost, channel: Channel, text: &str) {
        if text.is_empty() && self.attachments.is_empty() {
            return;
        }
        // Waiting plugins see the line first, then it goes out like any other
        if host.offer_reply(channel.id, self.user.id, text) {
            log::debug!("{} answered a pending question", self.user.name);
        }
        let attachments = mem::take(&mut self.attachments);
        core.handle(Event {
            channel,
            sender: self.user.clone(),
            message: host.new_message(text, attachments),
        });
    }
}

/// An attachment named after the last segment of `url`'s path.
fn attachment(url: &str) -> Result<Attachment, url::ParseError> {
    let parsed = Url::parse(url)?;
    let filename = parsed
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .unwrap_or("attachment")
        .to_owned();
    Ok(Attachment::new(filename, url))
}
