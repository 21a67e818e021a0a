#[macro_use]
extern crate plugin_api;

mod card;
mod settings;

use crate::card::{build_cards, RelayCard};
use crate::settings::{ModmailSettings, RelayMode};
use plugin_api::args::{self, Tokens};
use plugin_api::prelude::*;
use plugin_api::{Outgoing, StoreError};

struct Modmail;

fn load(host: &dyn Host) -> Option<ModmailSettings> {
    match settings::config(host.store()).get() {
        Ok(settings) => Some(settings),
        Err(e) => {
            log::error!("Could not read modmail settings: {}", e);
            None
        }
    }
}

/// Send every card to every relay channel. The enabled flag is checked
/// again before each card.
fn broadcast(host: &dyn Host, cards: &[RelayCard]) {
    for card in cards {
        let settings = match load(host) {
            Some(settings) => settings,
            None => return,
        };
        if !settings.enabled() {
            return;
        }
        let embed = card.to_embed();
        for channel in settings.channels() {
            if host.channel(channel).is_none() {
                log::warn!("Relay channel {} does not exist, skipping", channel);
                continue;
            }
            if let Err(e) = host.send(channel, Outgoing::Embed(embed.clone())) {
                log::warn!("Could not relay to {}: {}", channel, e);
            }
        }
    }
}

fn save_failed(ctx: Context, e: StoreError) {
    log::error!("Could not save modmail settings: {}", e);
    ctx.send_channel("Could not save settings.");
}

impl Modmail {
    fn modmail(_this: &mut dyn Plugin, arg: &str, ctx: Context) {
        let settings = match load(ctx.host) {
            Some(settings) => settings,
            None => return,
        };
        if settings.mode() == RelayMode::DmForward {
            ctx.send_channel(&format!(
                "Modmail is currently set to be received via DMs, this can be changed via {}modmailset",
                ctx.prefix()
            ));
            return;
        }
        let text = arg.trim();
        if text.is_empty() && ctx.message.attachments.is_empty() {
            return;
        }
        let cards = build_cards(
            ctx.sender,
            text,
            &ctx.message.attachments,
            ctx.message.created_at,
        );
        broadcast(ctx.host, &cards);
    }
    fn modmailset(_this: &mut dyn Plugin, arg: &str, ctx: Context) {
        let mut tokens = Tokens::new(arg);
        match tokens.next().as_deref() {
            Some("channel") => set_channel(tokens.rest(), ctx),
            Some("list") => list(ctx),
            Some("toggle") => toggle(tokens.rest(), ctx),
            Some("command") => command_mode(tokens.rest(), ctx),
            _ => {
                let p = ctx.prefix();
                ctx.send_channel(&format!(
                    "Modmail commands:\n\
                     {p}modmailset channel <channel> - Set the channel that the bot will post to.\n\
                     {p}modmailset list - List all current modmail channels.\n\
                     {p}modmailset toggle <bool> - Toggle modmail.\n\
                     {p}modmailset command <bool> - Toggle modmail between command or forwarding.",
                    p = p
                ));
            }
        }
    }
}

fn set_channel(arg: &str, ctx: Context) {
    let guild = match ctx.channel.guild {
        Some(guild) => guild,
        None => {
            ctx.send_channel("Relay channels can only be set from within a server.");
            return;
        }
    };
    if arg.is_empty() {
        ctx.send_channel(&format!("Usage: `{}modmailset channel <channel>`", ctx.prefix()));
        return;
    }
    let channel = match ctx.host.find_channel(guild, arg) {
        Some(channel) => channel,
        None => {
            ctx.send_channel(&format!("Channel \"{}\" not found.", arg));
            return;
        }
    };
    match settings::config(ctx.host.store()).update(|s| s.set_channel(guild, channel.id)) {
        Ok(()) => ctx.send_channel("Channel added successfully."),
        Err(e) => save_failed(ctx, e),
    }
}

fn list(ctx: Context) {
    let settings = match load(ctx.host) {
        Some(settings) => settings,
        None => return,
    };
    let mut channels = settings.channels().peekable();
    if channels.peek().is_none() {
        ctx.send_channel("No channels are currently set.");
    }
    for channel in channels {
        ctx.send_channel(&channel.to_string());
    }
}

fn parse_flag(arg: &str, ctx: Context, sub: &str) -> Option<bool> {
    let flag = args::parse_bool(arg);
    if flag.is_none() {
        ctx.send_channel(&format!(
            "Usage: `{}modmailset {} <true|false>`",
            ctx.prefix(),
            sub
        ));
    }
    flag
}

fn toggle(arg: &str, ctx: Context) {
    let enabled = match parse_flag(arg, ctx, "toggle") {
        Some(enabled) => enabled,
        None => return,
    };
    match settings::config(ctx.host.store()).update(|s| s.toggle.status = enabled) {
        Ok(()) if enabled => ctx.send_channel("ModMail is now enabled."),
        Ok(()) => ctx.send_channel("ModMail is now disabled."),
        Err(e) => save_failed(ctx, e),
    }
}

fn command_mode(arg: &str, ctx: Context) {
    let command_only = match parse_flag(arg, ctx, "command") {
        Some(flag) => flag,
        None => return,
    };
    let mode = if command_only {
        RelayMode::CommandOnly
    } else {
        RelayMode::DmForward
    };
    match settings::config(ctx.host.store()).update(|s| s.set_mode(mode)) {
        Ok(()) if command_only => ctx.send_channel(&format!(
            "ModMail will now only be triggered via {}modmail.",
            ctx.prefix()
        )),
        Ok(()) => ctx.send_channel("ModMail will now forward every message sent via DM."),
        Err(e) => save_failed(ctx, e),
    }
}

impl Plugin for Modmail {
    fn new() -> Self {
        Modmail
    }
    fn register(&self, meta: &mut PluginMeta) {
        meta.command("modmail", "Manually send modmail.", Self::modmail);
        meta.owner_command("modmailset", "Modmail settings.", Self::modmailset);
    }
    fn message(&mut self, msg: &str, ctx: Context) {
        if !ctx.is_private() || ctx.sender.id == ctx.host.bot_user().id {
            return;
        }
        let settings = match load(ctx.host) {
            Some(settings) => settings,
            None => return,
        };
        if settings.mode() == RelayMode::CommandOnly {
            return;
        }
        let attachments = &ctx.message.attachments;
        if attachments.is_empty() {
            if ctx.host.prefixes().iter().any(|p| msg.starts_with(p.as_str())) {
                return;
            }
            if msg.trim().is_empty() {
                return;
            }
        }
        let cards = build_cards(ctx.sender, msg, attachments, ctx.message.created_at);
        broadcast(ctx.host, &cards);
    }
}

plugin_export!(Modmail);

#[cfg(test)]
mod tests {
    use super::*;
    use plugin_api::mock::{self, MockEvent, MockHost, GENERAL_ID, GUILD_ID};
    use plugin_api::{Channel, ChannelId, GuildId, SendError};

    const RELAY_A: ChannelId = ChannelId(40);
    const RELAY_B: ChannelId = ChannelId(41);

    /// Two guilds, each with a relay channel.
    fn host_with_relays() -> MockHost {
        let host = MockHost::new();
        host.add_channel(mock::guild_channel(RELAY_A.0, "modmail"));
        host.add_channel(Channel {
            id: RELAY_B,
            guild: Some(GuildId(11)),
            name: "staff".into(),
        });
        settings::config(host.store())
            .update(|s| {
                s.set_channel(GUILD_ID, RELAY_A);
                s.set_channel(GuildId(11), RELAY_B);
            })
            .unwrap();
        host
    }

    fn set(host: &MockHost, f: impl FnOnce(&mut ModmailSettings)) {
        settings::config(host.store()).update(f).unwrap();
    }

    fn dm(host: &MockHost, event: &MockEvent) {
        Modmail.message(&event.message.content, event.ctx(host));
    }

    fn admin(host: &MockHost, arg: &str) -> Vec<String> {
        let event = MockEvent::guild("modmailset", arg);
        Modmail::modmailset(&mut Modmail, arg, event.ctx(host));
        host.sent_texts(GENERAL_ID)
    }

    #[test]
    fn dm_with_images_and_file_is_split_and_sent_everywhere() {
        let host = host_with_relays();
        let event = MockEvent::dm("please help")
            .with_attachment("one.png", "https://cdn.test/one.png")
            .with_attachment("log.txt", "https://cdn.test/log.txt")
            .with_attachment("two.gif", "https://cdn.test/two.gif");
        dm(&host, &event);
        for relay in &[RELAY_A, RELAY_B] {
            let embeds = host.sent_embeds(*relay);
            assert_eq!(embeds.len(), 2);
            let first = &embeds[0];
            assert_eq!(
                first.author.as_ref().map(|a| a.name.as_str()),
                Some("guest | 101")
            );
            assert_eq!(first.description.as_deref(), Some("please help"));
            assert_eq!(first.image.as_deref(), Some("https://cdn.test/one.png"));
            assert_eq!(first.fields[0].value, "[log.txt](https://cdn.test/log.txt)");
            assert_eq!(first.timestamp, None);
            let second = &embeds[1];
            assert_eq!(second.image.as_deref(), Some("https://cdn.test/two.gif"));
            assert!(second.fields.is_empty());
            assert_eq!(second.timestamp, Some(mock::created_at()));
        }
    }

    #[test]
    fn disabled_sends_nothing() {
        let host = host_with_relays();
        set(&host, |s| s.toggle.status = false);
        dm(&host, &MockEvent::dm("hello?"));
        assert!(host.sent().is_empty());
    }

    #[test]
    fn disabled_drops_attachments_and_manual_sends() {
        let host = host_with_relays();
        set(&host, |s| s.toggle.status = false);
        let event = MockEvent::dm("see attached")
            .with_attachment("one.png", "https://cdn.test/one.png")
            .with_attachment("log.txt", "https://cdn.test/log.txt");
        dm(&host, &event);
        assert!(host.sent().is_empty());

        set(&host, |s| s.set_mode(RelayMode::CommandOnly));
        let event = MockEvent::guild("modmail", "hello staff").from_user(mock::guest());
        Modmail::modmail(&mut Modmail, "hello staff", event.ctx(&host));
        assert!(host.sent().is_empty());
    }

    #[test]
    fn failing_relay_does_not_block_the_others() {
        let host = host_with_relays();
        host.fail_sends(RELAY_A, SendError::Transport("timed out".into()));
        dm(&host, &MockEvent::dm("anyone there?"));
        assert!(host.sent_to(RELAY_A).is_empty());
        assert_eq!(host.sent_embeds(RELAY_B).len(), 1);
    }

    #[test]
    fn ignored_messages() {
        let host = host_with_relays();
        dm(&host, &MockEvent::guild("", "not a dm"));
        dm(&host, &MockEvent::dm("!help"));
        dm(&host, &MockEvent::dm("   "));
        dm(&host, &MockEvent::dm("echo").from_user(host.bot().clone()));
        assert!(host.sent().is_empty());
    }

    #[test]
    fn prefixed_dm_with_attachment_is_relayed() {
        let host = host_with_relays();
        let event = MockEvent::dm("!look").with_attachment("a.jpg", "https://cdn.test/a.jpg");
        dm(&host, &event);
        assert_eq!(host.sent_embeds(RELAY_A).len(), 1);
    }

    #[test]
    fn command_only_mode() {
        let host = host_with_relays();
        set(&host, |s| s.set_mode(RelayMode::CommandOnly));
        dm(&host, &MockEvent::dm("hello staff"));
        assert!(host.sent().is_empty());

        let event = MockEvent::guild("modmail", "hello staff").from_user(mock::guest());
        Modmail::modmail(&mut Modmail, "hello staff", event.ctx(&host));
        let embeds = host.sent_embeds(RELAY_B);
        assert_eq!(embeds.len(), 1);
        assert_eq!(embeds[0].description.as_deref(), Some("hello staff"));
    }

    #[test]
    fn manual_send_refused_in_dm_mode() {
        let host = host_with_relays();
        let event = MockEvent::guild("modmail", "hello");
        Modmail::modmail(&mut Modmail, "hello", event.ctx(&host));
        assert_eq!(
            host.sent_texts(GENERAL_ID),
            vec!["Modmail is currently set to be received via DMs, this can be changed via !modmailset"]
        );
        assert!(host.sent_embeds(RELAY_A).is_empty());
    }

    #[test]
    fn missing_relay_channel_is_skipped() {
        let host = host_with_relays();
        set(&host, |s| s.set_channel(GuildId(12), ChannelId(999)));
        dm(&host, &MockEvent::dm("hi"));
        assert_eq!(host.sent_embeds(RELAY_A).len(), 1);
        assert_eq!(host.sent_embeds(RELAY_B).len(), 1);
        assert!(host.sent_to(ChannelId(999)).is_empty());
    }

    #[test]
    fn admin_channel_and_list() {
        let host = MockHost::new();
        assert_eq!(admin(&host, "list"), vec!["No channels are currently set."]);
        host.add_channel(mock::guild_channel(RELAY_A.0, "modmail"));
        admin(&host, "channel #modmail");
        assert_eq!(
            admin(&host, "list"),
            vec![
                "No channels are currently set.",
                "Channel added successfully.",
                "40"
            ]
        );
    }

    #[test]
    fn admin_channel_not_found() {
        let host = MockHost::new();
        assert_eq!(
            admin(&host, "channel #nowhere"),
            vec!["Channel \"#nowhere\" not found."]
        );
        assert_eq!(load(&host).unwrap().channels().count(), 0);
    }

    #[test]
    fn admin_toggle_and_mode() {
        let host = MockHost::new();
        admin(&host, "toggle off");
        admin(&host, "command yes");
        let texts = admin(&host, "command maybe");
        assert_eq!(
            texts,
            vec![
                "ModMail is now disabled.",
                "ModMail will now only be triggered via !modmail.",
                "Usage: `!modmailset command <true|false>`"
            ]
        );
        let settings = load(&host).unwrap();
        assert!(!settings.enabled());
        assert_eq!(settings.mode(), RelayMode::CommandOnly);
        admin(&host, "toggle true");
        admin(&host, "command false");
        let settings = load(&host).unwrap();
        assert!(settings.enabled());
        assert_eq!(settings.mode(), RelayMode::DmForward);
    }

    #[test]
    fn admin_without_subcommand_lists_them() {
        let host = MockHost::new();
        let texts = admin(&host, "");
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("!modmailset toggle <bool>"));
    }
}
