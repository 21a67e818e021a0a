//! Helpers for picking command arguments apart.

/// Quote-aware whitespace tokenizer.
///
/// `"two words"` is one token. [`Tokens::rest`] hands back everything not yet
/// consumed, untouched, for commands that take free-form text.
#[derive(Clone, Debug)]
pub struct Tokens<'a> {
    text: &'a str,
}

impl<'a> Tokens<'a> {
    /// Tokenize `text`.
    pub fn new(text: &'a str) -> Self {
        Self {
            text: text.trim_start(),
        }
    }
    /// Look at the next token without consuming it.
    pub fn peek(&self) -> Option<String> {
        self.clone().next()
    }
    /// The unconsumed remainder, trimmed.
    pub fn rest(&self) -> &'a str {
        self.text.trim()
    }
    /// Whether nothing but whitespace is left.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = String;
    fn next(&mut self) -> Option<String> {
        let text = self.text.trim_start();
        if text.is_empty() {
            self.text = text;
            return None;
        }
        if let Some(quoted) = text.strip_prefix('"') {
            if let Some(end) = quoted.find('"') {
                self.text = &quoted[end + 1..];
                return Some(quoted[..end].to_owned());
            }
        }
        let end = text.find(char::is_whitespace).unwrap_or_else(|| text.len());
        self.text = &text[end..];
        Some(text[..end].to_owned())
    }
}

/// Parses the boolean spellings users tend to type.
pub fn parse_bool(arg: &str) -> Option<bool> {
    match arg.trim().to_lowercase().as_str() {
        "yes" | "y" | "true" | "t" | "1" | "on" | "enable" | "enabled" => Some(true),
        "no" | "n" | "false" | "f" | "0" | "off" | "disable" | "disabled" => Some(false),
        _ => None,
    }
}

/// Strict yes/no used by confirmation prompts. Anything else is `None`.
pub fn parse_yes_no(reply: &str) -> Option<bool> {
    match reply.trim().to_lowercase().as_str() {
        "yes" | "y" => Some(true),
        "no" | "n" => Some(false),
        _ => None,
    }
}

/// Extracts the numeric id out of `<@123>`, `<@!123>`, `<#123>` or a bare `123`.
pub fn mention_id(arg: &str) -> Option<u64> {
    let arg = arg.trim();
    let inner = if arg.starts_with('<') && arg.ends_with('>') {
        arg[1..arg.len() - 1].trim_start_matches(|c: char| c == '@' || c == '!' || c == '#')
    } else {
        arg
    };
    inner.parse().ok()
}

/// Whether `arg` looks like an http(s) URL.
pub fn is_http_url(arg: &str) -> bool {
    match url::Url::parse(arg) {
        Ok(url) => (url.scheme() == "http" || url.scheme() == "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}

#[test]
fn test_tokens() {
    let mut tokens = Tokens::new(r#"  "top text" bottom  trailing words "#);
    assert_eq!(tokens.next().as_deref(), Some("top text"));
    assert_eq!(tokens.peek().as_deref(), Some("bottom"));
    assert_eq!(tokens.next().as_deref(), Some("bottom"));
    assert_eq!(tokens.rest(), "trailing words");
    assert_eq!(tokens.next().as_deref(), Some("trailing"));
    assert_eq!(tokens.next().as_deref(), Some("words"));
    assert_eq!(tokens.next(), None);
    assert!(tokens.is_empty());
}

#[test]
fn test_unterminated_quote_is_literal() {
    let mut tokens = Tokens::new(r#""oops no end"#);
    assert_eq!(tokens.next().as_deref(), Some("\"oops"));
}

#[test]
fn test_parse_bool() {
    assert_eq!(parse_bool("On"), Some(true));
    assert_eq!(parse_bool("disable"), Some(false));
    assert_eq!(parse_bool("maybe"), None);
    assert_eq!(parse_yes_no("Y"), Some(true));
    assert_eq!(parse_yes_no("off"), None);
}

#[test]
fn test_mention_id() {
    assert_eq!(mention_id("<@!42>"), Some(42));
    assert_eq!(mention_id("<#1337>"), Some(1337));
    assert_eq!(mention_id("99"), Some(99));
    assert_eq!(mention_id("bob"), None);
}

#[test]
fn test_is_http_url() {
    assert!(is_http_url("https://imgen.flaree.xyz/api"));
    assert!(!is_http_url("ftp://example.com"));
    assert!(!is_http_url("not a url"));
}
