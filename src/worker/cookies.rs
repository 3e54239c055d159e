//! Session credentials
//!
//! Sessions authenticate to the broker with the cookies of the user they
//! simulate. Cookies arrive as `Cookie` header strings, either on the control
//! request itself or as an explicit override, and are replayed on the
//! websocket handshake.

use tungstenite::http::HeaderValue;
use url::Url;

use super::endpoint::http_origin;
use crate::utils::error::SetupError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Parse a `Cookie` header value (`a=1; b=2`).
///
/// A bare `name` is a cookie with an empty value. Pairs with an invalid
/// name or value are skipped.
pub fn parse_cookie_header(header: &str) -> Vec<Cookie> {
    header
        .split(';')
        .filter_map(|pair| {
            let pair = pair.trim();
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            let name = name.trim();
            if !is_token(name) {
                return None;
            }
            let value = strip_quotes(value);
            if !value.bytes().all(is_cookie_value_byte) {
                return None;
            }
            Some(Cookie::new(name, value))
        })
        .collect()
}

/// Parse every `Cookie` header of a request.
pub fn parse_cookie_headers<'a>(headers: impl IntoIterator<Item = &'a str>) -> Vec<Cookie> {
    headers.into_iter().flat_map(parse_cookie_header).collect()
}

fn strip_quotes(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn is_token(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b))
}

/// Printable ASCII, space and comma included, except `"`, `;` and `\`.
fn is_cookie_value_byte(b: u8) -> bool {
    (0x20..0x7f).contains(&b) && b != b'"' && b != b';' && b != b'\\'
}

/// Cookies scoped to one broker origin.
///
/// Later cookies with the same name replace earlier ones.
#[derive(Debug, Clone)]
pub struct CookieJar {
    origin: Url,
    cookies: Vec<Cookie>,
}

impl CookieJar {
    pub fn new(broker: &Url, cookies: &[Cookie]) -> Result<Self, SetupError> {
        let origin = http_origin(broker);
        if origin.host_str().is_none() {
            return Err(SetupError::MissingHost(broker.to_string()));
        }

        let mut jar = Self {
            origin,
            cookies: Vec::with_capacity(cookies.len()),
        };
        for cookie in cookies {
            jar.set(cookie.clone());
        }
        if jar.cookies.is_empty() {
            return Err(SetupError::EmptyJar);
        }
        Ok(jar)
    }

    fn set(&mut self, cookie: Cookie) {
        match self.cookies.iter_mut().find(|c| c.name == cookie.name) {
            Some(existing) => existing.value = cookie.value,
            None => self.cookies.push(cookie),
        }
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Render the jar as a `Cookie` request header.
    pub fn header_value(&self) -> Result<HeaderValue, SetupError> {
        let rendered = self
            .cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ");
        Ok(HeaderValue::from_str(&rendered)?)
    }
}
