#[macro_use]
extern crate plugin_api;

mod client;
mod endpoints;
mod query;

use crate::client::{ImgenClient, Payload, DEFAULT_URL};
use crate::endpoints::ENDPOINTS;
use plugin_api::prelude::*;
use plugin_api::{args, ApiTokens, PluginConfig, SendError};
use serde_derive::{Deserialize, Serialize};
use std::time::Duration;

const NAMESPACE: &str = "dankmemer";
const SERVICE: &str = "imgen";
const CONFIRM_TIMEOUT: Duration = Duration::from_secs(20);

const URL_WARNING: &str = "This has the ability to make every command fail if the URL is not \
reachable and/or not working. Only use this if you're experienced enough to understand. \
Type yes to continue, otherwise type no.";

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
struct Settings {
    url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_owned(),
        }
    }
}

struct DankMemer {
    client: ImgenClient,
}

impl DankMemer {
    /// Pick up the stored URL and the current token.
    fn initialize(&mut self, host: &dyn Host) {
        match PluginConfig::<Settings>::new(host.store(), NAMESPACE).get() {
            Ok(settings) => self.client.set_base_url(settings.url),
            Err(e) => log::error!("Could not read {} settings: {}", NAMESPACE, e),
        }
        self.client.set_tokens(&host.api_tokens(SERVICE));
    }
    fn render(this: &mut dyn Plugin, arg: &str, ctx: Context) {
        let this: &mut Self = match this.downcast_mut() {
            Some(this) => this,
            None => return,
        };
        let endpoint = match endpoints::find(ctx.command) {
            Some(endpoint) => endpoint,
            None => {
                log::warn!("No imgen endpoint behind command {}", ctx.command);
                return;
            }
        };
        if !this.client.is_configured() {
            ctx.send_channel(&format!(
                "The imgen API token is not set. See `{}dankmemersetup`.",
                ctx.prefix()
            ));
            return;
        }
        let values = match query::parse(endpoint, arg, &ctx) {
            Ok(values) => values,
            Err(e) => {
                ctx.send_channel(&format!("{} Usage: `{}{}`", e, ctx.prefix(), endpoint.usage()));
                return;
            }
        };
        let path = query::build(endpoint, &values);
        let result = {
            let _typing = ctx.typing();
            this.client.fetch(&path, endpoint.output)
        };
        match result {
            Ok(Payload::File { name, data }) => send_image(ctx, name, data),
            Ok(Payload::Text(text)) => ctx.send_channel(&text),
            Err(e) => {
                log::debug!("{} failed: {:?}", endpoint.name, e);
                ctx.send_channel(&format!("Oops, an error occured. `{}`", e));
            }
        }
    }
    fn setup(_this: &mut dyn Plugin, _arg: &str, ctx: Context) {
        let prefix = ctx.prefix();
        ctx.send_channel(&format!(
            "You must host your own instance of imgen or apply for a publicly available instance.\n\
             You can then set the url endpoints using the `{}dmurl <url>` command. \
             (Support will be limited if using your own instance.)\n\n\
             The token is the `{}` key of the `{}` API service.",
            prefix,
            client::TOKEN_KEY,
            SERVICE
        ));
    }
    fn dmurl(this: &mut dyn Plugin, arg: &str, ctx: Context) {
        let this: &mut Self = match this.downcast_mut() {
            Some(this) => this,
            None => return,
        };
        let url = arg.trim();
        if url.is_empty() {
            ctx.send_channel(&format!("Usage: `{}dmurl <url>`", ctx.prefix()));
            return;
        }
        if !args::is_http_url(url) {
            ctx.send_channel(&format!(
                "{} doesn't seem to be a valid URL. Please try again.",
                url
            ));
            return;
        }
        ctx.send_channel(URL_WARNING);
        match ctx.confirm(CONFIRM_TIMEOUT) {
            Confirmation::TimedOut => ctx.send_channel("Exiting operation."),
            Confirmation::No => ctx.send_channel("Operation cancelled."),
            Confirmation::Yes => {
                let saved = PluginConfig::<Settings>::new(ctx.host.store(), NAMESPACE)
                    .update(|s| s.url = url.to_owned());
                if let Err(e) = saved {
                    log::error!("Could not save imgen url: {}", e);
                    ctx.send_channel("Could not save settings.");
                    return;
                }
                ctx.tick();
                this.initialize(ctx.host);
                log::info!("imgen url is now {}", this.client.base_url());
            }
        }
    }
    fn tokens_updated(this: &mut dyn Plugin, tokens: &ApiTokens) {
        if let Some(this) = this.downcast_mut::<Self>() {
            this.client.set_tokens(tokens);
            log::debug!("imgen token updated");
        }
    }
}

fn send_image(ctx: Context, name: &str, data: Vec<u8>) {
    let perms = ctx.permissions();
    if !perms.send_messages {
        log::debug!("Can't talk in #{}, dropping {}", ctx.channel.name, name);
        return;
    }
    if !perms.attach_files {
        ctx.send_channel("I don't have permission to attach files.");
        return;
    }
    match ctx.send_file(name, data) {
        Ok(()) => {}
        Err(SendError::Transport(e)) => {
            log::warn!("Uploading {} failed: {}", name, e);
            ctx.send_channel("An error occured sending the picture.");
        }
        Err(e) => log::warn!("Uploading {} failed: {}", name, e),
    }
}

impl Plugin for DankMemer {
    fn new() -> Self {
        Self {
            client: ImgenClient::new(),
        }
    }
    fn register(&self, meta: &mut PluginMeta) {
        for endpoint in ENDPOINTS {
            meta.aliased_command(endpoint.name, endpoint.aliases, endpoint.help, Self::render);
        }
        meta.command(
            "dankmemersetup",
            "Instructions on how to setup DankMemer.",
            Self::setup,
        );
        meta.owner_command(
            "dmurl",
            "Set the DankMemer API Url. Ensure the url ends in api without the trailing slash, \
             e.g. https://imgen.flaree.xyz/api",
            Self::dmurl,
        );
        meta.watch_api_tokens(SERVICE, Self::tokens_updated);
    }
    fn init(&mut self, host: &dyn Host) {
        self.initialize(host);
    }
}

plugin_export!(DankMemer);

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use plugin_api::mock::{MockEvent, MockHost, GENERAL_ID};
    use plugin_api::{Outgoing, Permissions};

    fn setup(url: &str) -> (MockHost, DankMemer) {
        let host = MockHost::new();
        host.set_api_token(SERVICE, client::TOKEN_KEY, "secret");
        PluginConfig::<Settings>::new(host.store(), NAMESPACE)
            .set(&Settings { url: url.to_owned() })
            .unwrap();
        let mut plugin = DankMemer::new();
        plugin.init(&host);
        (host, plugin)
    }

    fn run(plugin: &mut DankMemer, host: &MockHost, command: &str, arg: &str) {
        let event = MockEvent::guild(command, arg);
        DankMemer::render(plugin, arg, event.ctx(host));
    }

    fn stored_url(host: &MockHost) -> String {
        PluginConfig::<Settings>::new(host.store(), NAMESPACE)
            .get()
            .unwrap()
            .url
    }

    #[test]
    fn registers_every_endpoint_and_admin_commands() {
        let mut meta = PluginMeta::default();
        DankMemer::new().register(&mut meta);
        assert_eq!(meta.commands.len(), ENDPOINTS.len() + 2);
        assert!(meta.find_command("rainbow").is_some());
        assert!(meta.find_command("dmurl").map_or(false, |c| c.owner_only));
        assert_eq!(meta.token_watchers[0].service, "imgen");
    }

    #[test]
    fn image_is_uploaded_under_endpoint_file_name() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/abandon")
            .match_query(Matcher::UrlEncoded("text".into(), "my son".into()))
            .match_header("authorization", "secret")
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body("PNGDATA")
            .create();
        let (host, mut plugin) = setup(&server.url());
        run(&mut plugin, &host, "abandon", "my son");
        mock.assert();
        assert_eq!(
            host.sent_to(GENERAL_ID),
            vec![Outgoing::File {
                name: "abandon.png".into(),
                data: b"PNGDATA".to_vec()
            }]
        );
        assert_eq!(host.typing_started(), 1);
        assert!(!host.is_typing(GENERAL_ID));
    }

    #[test]
    fn not_found_is_reported() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/trigger")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body("whatever")
            .create();
        let (host, mut plugin) = setup(&server.url());
        run(&mut plugin, &host, "trigger", "");
        assert_eq!(
            host.sent_texts(GENERAL_ID),
            vec!["Oops, an error occured. `Server not found, ensure the correct URL is setup and is reachable. `"]
        );
        assert!(!host.is_typing(GENERAL_ID));
    }

    #[test]
    fn non_json_failure_means_server_down() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/trigger")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_header("content-type", "text/html")
            .with_body("<html>oops</html>")
            .create();
        let (host, mut plugin) = setup(&server.url());
        run(&mut plugin, &host, "trigger", "");
        assert_eq!(
            host.sent_texts(GENERAL_ID),
            vec!["Oops, an error occured. `Server may be down, please try again later.`"]
        );
    }

    #[test]
    fn service_error_is_relayed() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/trigger")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": "bad avatar"}"#)
            .create();
        let (host, mut plugin) = setup(&server.url());
        run(&mut plugin, &host, "trigger", "");
        assert_eq!(
            host.sent_texts(GENERAL_ID),
            vec!["Oops, an error occured. `bad avatar`"]
        );
    }

    #[test]
    fn unreachable_server_means_server_down() {
        let (host, mut plugin) = setup("http://127.0.0.1:1");
        run(&mut plugin, &host, "trigger", "");
        assert_eq!(
            host.sent_texts(GENERAL_ID),
            vec!["Oops, an error occured. `Server may be down, please try again later.`"]
        );
    }

    #[test]
    fn yomomma_sends_text() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/yomomma")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"text": "Yo momma is so old..."}"#)
            .create();
        let (host, mut plugin) = setup(&server.url());
        run(&mut plugin, &host, "yomomma", "");
        assert_eq!(host.sent_texts(GENERAL_ID), vec!["Yo momma is so old..."]);
    }

    #[test]
    fn missing_token_stops_before_the_network() {
        let host = MockHost::new();
        let mut plugin = DankMemer::new();
        plugin.init(&host);
        run(&mut plugin, &host, "abandon", "hi");
        let texts = host.sent_texts(GENERAL_ID);
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("!dankmemersetup"));
        assert_eq!(host.typing_started(), 0);
    }

    #[test]
    fn token_update_configures_without_restart() {
        let host = MockHost::new();
        let mut plugin = DankMemer::new();
        plugin.init(&host);
        assert!(!plugin.client.is_configured());
        let tokens = host.set_api_token(SERVICE, client::TOKEN_KEY, "fresh");
        DankMemer::tokens_updated(&mut plugin, &tokens);
        assert!(plugin.client.is_configured());
    }

    #[test]
    fn usage_on_bad_arguments() {
        let (host, mut plugin) = setup("http://127.0.0.1:1");
        run(&mut plugin, &host, "slap", "");
        assert_eq!(
            host.sent_texts(GENERAL_ID),
            vec!["Missing argument `member`. Usage: `!slap <member> [member]`"]
        );
        assert_eq!(host.typing_started(), 0);
    }

    #[test]
    fn no_attach_permission() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/trigger")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "image/gif")
            .with_body("GIF")
            .create();
        let (host, mut plugin) = setup(&server.url());
        host.set_permissions(
            GENERAL_ID,
            Permissions {
                attach_files: false,
                ..Permissions::all()
            },
        );
        run(&mut plugin, &host, "trigger", "");
        assert_eq!(
            host.sent_to(GENERAL_ID),
            vec![Outgoing::Text("I don't have permission to attach files.".into())]
        );
    }

    #[test]
    fn muted_channel_gets_nothing() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/trigger")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("GIF")
            .create();
        let (host, mut plugin) = setup(&server.url());
        host.set_permissions(GENERAL_ID, Permissions::none());
        run(&mut plugin, &host, "trigger", "");
        assert!(host.sent().is_empty());
    }

    #[test]
    fn failed_upload_is_reported() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/trigger")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "image/gif")
            .with_body("GIF")
            .create();
        let (host, mut plugin) = setup(&server.url());
        host.fail_uploads(GENERAL_ID, SendError::Transport("connection reset".into()));
        run(&mut plugin, &host, "trigger", "");
        assert_eq!(
            host.sent_to(GENERAL_ID),
            vec![Outgoing::Text("An error occured sending the picture.".into())]
        );
    }

    #[test]
    fn forbidden_upload_is_only_logged() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/trigger")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "image/gif")
            .with_body("GIF")
            .create();
        let (host, mut plugin) = setup(&server.url());
        host.fail_uploads(GENERAL_ID, SendError::Forbidden("missing access".into()));
        run(&mut plugin, &host, "trigger", "");
        assert!(host.sent().is_empty());
    }

    fn dmurl(plugin: &mut DankMemer, host: &MockHost, url: &str) {
        let event = MockEvent::guild("dmurl", url);
        DankMemer::dmurl(plugin, url, event.ctx(host));
    }

    #[test]
    fn dmurl_yes_persists_and_reconfigures() {
        let (host, mut plugin) = setup(DEFAULT_URL);
        host.push_reply(Some("what?"));
        host.push_reply(Some("yes"));
        dmurl(&mut plugin, &host, "https://imgen.example.org/api");
        assert_eq!(stored_url(&host), "https://imgen.example.org/api");
        assert_eq!(plugin.client.base_url(), "https://imgen.example.org/api");
        assert_eq!(host.reactions().len(), 1);
        assert_eq!(host.sent_texts(GENERAL_ID), vec![URL_WARNING]);
    }

    #[test]
    fn dmurl_no_or_silence_changes_nothing() {
        let (host, mut plugin) = setup(DEFAULT_URL);
        host.push_reply(Some("no"));
        dmurl(&mut plugin, &host, "https://imgen.example.org/api");
        dmurl(&mut plugin, &host, "https://imgen.example.org/api");
        assert_eq!(stored_url(&host), DEFAULT_URL);
        assert_eq!(plugin.client.base_url(), DEFAULT_URL);
        assert_eq!(
            host.sent_texts(GENERAL_ID),
            vec![
                URL_WARNING,
                "Operation cancelled.",
                URL_WARNING,
                "Exiting operation."
            ]
        );
        assert!(host.reactions().is_empty());
    }

    #[test]
    fn dmurl_rejects_invalid_url() {
        let (host, mut plugin) = setup(DEFAULT_URL);
        dmurl(&mut plugin, &host, "not-a-url");
        assert_eq!(
            host.sent_texts(GENERAL_ID),
            vec!["not-a-url doesn't seem to be a valid URL. Please try again."]
        );
        assert_eq!(stored_url(&host), DEFAULT_URL);
    }
}
