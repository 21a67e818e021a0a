//! Turning command arguments into an imgen query.

use crate::endpoints::{Arg, Endpoint, Param};
use http_request_common::{encode_component, encode_url_value};
use plugin_api::args::{is_http_url, Tokens};
use plugin_api::{Context, User};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgError {
    #[error("Missing argument `{0}`.")]
    Missing(&'static str),
    #[error("Member \"{0}\" not found.")]
    MemberNotFound(String),
    #[error("Could not find an image from \"{0}\".")]
    NoImage(String),
}

/// Everything an endpoint may send, filled in from the arguments.
#[derive(Debug, Default)]
pub struct Values {
    pub avatar1: Option<String>,
    pub avatar2: Option<String>,
    pub user: Option<User>,
    pub text: Option<String>,
    pub top_text: Option<String>,
    pub bottom_text: Option<String>,
    pub color: Option<String>,
    pub font: Option<String>,
}

impl Values {
    fn get(&self, param: Param) -> Option<&str> {
        match param {
            Param::Avatar1 => self.avatar1.as_deref(),
            Param::Avatar2 => self.avatar2.as_deref(),
            Param::Username1 | Param::Username2 => self.user.as_ref().map(|u| u.name.as_str()),
            Param::DisplayName1 => self.user.as_ref().map(|u| u.display_name.as_str()),
            Param::Text => self.text.as_deref(),
            Param::TopText => self.top_text.as_deref(),
            Param::BottomText => self.bottom_text.as_deref(),
            Param::Color => self.color.as_deref(),
            Param::Font => self.font.as_deref(),
        }
    }
}

/// An attachment on the message wins, then a URL, a custom emoji or a member.
fn resolve_image(ctx: &Context, token: &str) -> Option<String> {
    if is_http_url(token) {
        return Some(token.to_owned());
    }
    if let Some(url) = ctx.host.custom_emoji_url(token) {
        return Some(url);
    }
    find_member(ctx, token).map(|u| u.avatar.static_url())
}

fn find_member(ctx: &Context, token: &str) -> Option<User> {
    ctx.host.find_member(ctx.channel.guild, token)
}

/// Try the next token as an optional argument. A token that doesn't fit is
/// left for the arguments after it, or is an error when nothing follows.
fn optional<T>(
    tokens: &mut Tokens,
    last: bool,
    resolve: impl FnOnce(&str) -> Option<T>,
    fail: impl FnOnce(String) -> ArgError,
) -> Result<Option<T>, ArgError> {
    let token = match tokens.peek() {
        Some(token) => token,
        None => return Ok(None),
    };
    match resolve(&token) {
        Some(value) => {
            tokens.next();
            Ok(Some(value))
        }
        None if last => Err(fail(token)),
        None => Ok(None),
    }
}

fn required(tokens: &mut Tokens, name: &'static str) -> Result<String, ArgError> {
    tokens.next().ok_or(ArgError::Missing(name))
}

fn required_member(ctx: &Context, token: String) -> Result<User, ArgError> {
    find_member(ctx, &token).ok_or(ArgError::MemberNotFound(token))
}

pub fn parse(endpoint: &Endpoint, arg: &str, ctx: &Context) -> Result<Values, ArgError> {
    let mut tokens = Tokens::new(arg);
    let mut values = Values::default();
    for (i, kind) in endpoint.args.iter().enumerate() {
        let last = i + 1 == endpoint.args.len();
        match *kind {
            Arg::Image => {
                let image = match ctx.message.attachments.first() {
                    Some(attachment) => Some(attachment.url.clone()),
                    None => optional(
                        &mut tokens,
                        last,
                        |t| resolve_image(ctx, t),
                        ArgError::NoImage,
                    )?,
                };
                values.avatar1 = Some(image.unwrap_or_else(|| ctx.sender.avatar.static_url()));
            }
            Arg::Member => {
                let user = optional(
                    &mut tokens,
                    last,
                    |t| find_member(ctx, t),
                    ArgError::MemberNotFound,
                )?
                .unwrap_or_else(|| ctx.sender.clone());
                values.avatar1 = Some(user.avatar.static_url());
                values.user = Some(user);
            }
            Arg::Pair => {
                let target = required_member(ctx, required(&mut tokens, "member")?)?;
                let other = match tokens.next() {
                    Some(token) => required_member(ctx, token)?,
                    None => ctx.sender.clone(),
                };
                values.avatar1 = Some(other.avatar.static_url());
                values.avatar2 = Some(target.avatar.static_url());
            }
            Arg::Word => values.text = Some(required(&mut tokens, "word")?),
            Arg::Text => {
                let text = tokens.rest();
                if text.is_empty() {
                    return Err(ArgError::Missing("text"));
                }
                values.text = Some(text.to_owned());
                tokens = Tokens::new("");
            }
            Arg::TopText => values.top_text = Some(required(&mut tokens, "top_text")?),
            Arg::BottomText => values.bottom_text = Some(required(&mut tokens, "bottom_text")?),
            Arg::Color => values.color = tokens.next(),
            Arg::Font => values.font = tokens.next(),
        }
    }
    Ok(values)
}

/// `{route}?k1=v1&k2=v2` in the endpoint's parameter order. Unset optional
/// parameters are left out.
pub fn build(endpoint: &Endpoint, values: &Values) -> String {
    let mut query = endpoint.route.to_owned();
    let mut sep = '?';
    for &param in endpoint.params {
        let value = match values.get(param) {
            Some(value) => value,
            None => continue,
        };
        query.push(sep);
        sep = '&';
        query.push_str(param.key());
        query.push('=');
        if param.is_url() {
            query.push_str(&encode_url_value(value));
        } else {
            query.push_str(&encode_component(value));
        }
    }
    query
}
