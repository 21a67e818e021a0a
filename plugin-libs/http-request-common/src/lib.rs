use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS, NON_ALPHANUMERIC};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use std::time::Duration;

/// Everything but the RFC 3986 unreserved characters gets escaped, so
/// `&`, `=`, `/` and `%` in user text can't break out of a query value.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode `text` for use as a single query value.
pub fn encode_component(text: &str) -> String {
    utf8_percent_encode(text, COMPONENT).to_string()
}

/// Characters of a URL that would end or corrupt the query value carrying it.
const NESTED_URL: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'<')
    .add(b'>');

/// Percent-encode a URL passed as a query value. `:`, `/`, `?` and `=` stay
/// readable; `&`, `#`, `+` and `%` are escaped.
pub fn encode_url_value(url: &str) -> String {
    utf8_percent_encode(url, NESTED_URL).to_string()
}

/// Build a blocking client with the given request timeout.
pub fn client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("memerelay/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// A fully read response.
#[derive(Debug)]
pub struct Response {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .map_or(false, |ct| ct.starts_with("application/json"))
    }
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// GET `url` with extra `headers` and read the whole body.
///
/// Any status is a successful fetch; only transport failures are errors.
pub fn fetch(client: &Client, url: &str, headers: &[(&str, &str)]) -> reqwest::Result<Response> {
    let mut req = client.get(url);
    for &(name, value) in headers {
        req = req.header(name, value);
    }
    let resp = req.send()?;
    let status = resp.status();
    let content_type = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let body = resp.bytes()?.to_vec();
    log::debug!("GET {} -> {} ({} bytes)", url, status, body.len());
    Ok(Response {
        status,
        content_type,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn encodes_reserved_characters() {
        assert_eq!(encode_component("a b&c=d/e%f"), "a%20b%26c%3Dd%2Fe%25f");
        assert_eq!(encode_component("keep-_.~"), "keep-_.~");
        assert_eq!(encode_component("é"), "%C3%A9");
    }

    #[test]
    fn nested_urls_stay_readable() {
        assert_eq!(
            encode_url_value("https://cdn.test/a.png?size=1024"),
            "https://cdn.test/a.png?size=1024"
        );
        assert_eq!(
            encode_url_value("https://cdn.test/a.png?ex=1&sig=a+b%2F#x"),
            "https://cdn.test/a.png?ex=1%26sig=a%2Bb%252F%23x"
        );
    }

    #[test]
    fn fetch_sends_headers_and_reads_body() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/abandon")
            .match_query(Matcher::UrlEncoded("text".into(), "hi there".into()))
            .match_header("authorization", "secret")
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body("PNG")
            .create();
        let client = client(Duration::from_secs(5)).unwrap();
        let url = format!("{}/abandon?text={}", server.url(), encode_component("hi there"));
        let resp = fetch(&client, &url, &[("Authorization", "secret")]).unwrap();
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.content_type.as_deref(), Some("image/png"));
        assert!(!resp.is_json());
        assert_eq!(resp.body, b"PNG");
        mock.assert();
    }

    #[test]
    fn error_status_is_not_a_fetch_error() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", Matcher::Any)
            .with_status(500)
            .with_header("content-type", "application/json; charset=utf-8")
            .with_body(r#"{"error": "boom"}"#)
            .create();
        let client = client(Duration::from_secs(5)).unwrap();
        let resp = fetch(&client, &format!("{}/x", server.url()), &[]).unwrap();
        assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(resp.is_json());
        assert_eq!(resp.text(), r#"{"error": "boom"}"#);
    }
}
