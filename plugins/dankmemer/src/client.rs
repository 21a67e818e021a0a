use crate::endpoints::Output;
use http_request_common::Response;
use plugin_api::ApiTokens;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_URL: &str = "https://imgen.flaree.xyz/api";
/// Token key under the `imgen` service.
pub const TOKEN_KEY: &str = "authorization";

const TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ImgenError {
    #[error("no imgen authorization token is set")]
    NotConfigured,
    #[error("Server not found, ensure the correct URL is setup and is reachable. ")]
    NotFound,
    #[error("Server may be down, please try again later.")]
    ServerDown,
    #[error("Server may be down, please try again later.")]
    Transport(#[source] reqwest::Error),
    /// Error message reported by imgen itself.
    #[error("{0}")]
    Api(String),
}

#[derive(Debug, PartialEq)]
pub enum Payload {
    File { name: &'static str, data: Vec<u8> },
    Text(String),
}

pub struct ImgenClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl ImgenClient {
    pub fn new() -> Self {
        let http = http_request_common::client(TIMEOUT).unwrap_or_else(|e| {
            log::error!("Could not build http client ({}), using defaults", e);
            Client::new()
        });
        Self {
            http,
            base_url: DEFAULT_URL.to_owned(),
            token: None,
        }
    }
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
    pub fn set_base_url(&mut self, url: impl Into<String>) {
        self.base_url = url.into();
    }
    pub fn set_tokens(&mut self, tokens: &ApiTokens) {
        self.token = tokens.get(TOKEN_KEY).map(str::to_owned);
    }
    pub fn is_configured(&self) -> bool {
        self.token.is_some()
    }
    /// GET `{base_url}{path}` and interpret the answer according to `output`.
    pub fn fetch(&self, path: &str, output: Output) -> Result<Payload, ImgenError> {
        let token = self.token.as_deref().ok_or(ImgenError::NotConfigured)?;
        let url = format!("{}{}", self.base_url, path);
        let resp = http_request_common::fetch(&self.http, &url, &[("Authorization", token)])
            .map_err(ImgenError::Transport)?;
        interpret(resp, output)
    }
}

fn interpret(resp: Response, output: Output) -> Result<Payload, ImgenError> {
    match resp.status {
        StatusCode::OK => match output {
            Output::File(name) => Ok(Payload::File {
                name,
                data: resp.body,
            }),
            Output::Json => {
                let body = json::parse(&resp.text()).map_err(|_| ImgenError::ServerDown)?;
                if let Some(err) = body["error"].as_str().filter(|e| !e.is_empty()) {
                    return Err(ImgenError::Api(err.to_owned()));
                }
                match body["text"].as_str() {
                    Some(text) => Ok(Payload::Text(text.to_owned())),
                    None => Err(ImgenError::ServerDown),
                }
            }
        },
        StatusCode::NOT_FOUND => Err(ImgenError::NotFound),
        status => {
            log::debug!("imgen answered {}", status);
            if !resp.is_json() {
                return Err(ImgenError::ServerDown);
            }
            let body = json::parse(&resp.text()).map_err(|_| ImgenError::ServerDown)?;
            match body["error"].as_str() {
                Some(err) => Err(ImgenError::Api(err.to_owned())),
                None => Err(ImgenError::ServerDown),
            }
        }
    }
}
