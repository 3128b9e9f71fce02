//! Normalized response value returned by both interfaces.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{StatusCode, Version};
use serde::de::DeserializeOwned;

use crate::error::Result;
use crate::render::ResponseRenderer;
use crate::request::PreparedRequest;

/// A completed HTTP exchange as seen by the caller.
///
/// The value is immutable; every field is exactly what the transport
/// received from the server. Headers come from the transport's header map:
/// names are grouped in the order each name first arrived, and repeated
/// names stay as separate entries in their received order. Values of
/// different names are not interleaved the way they were on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: u16,
    version: Version,
    headers: Vec<(String, String)>,
    body: Bytes,
    url: String,
    remote_addr: Option<SocketAddr>,
    elapsed: Duration,
    request: Option<PreparedRequest>,
}

impl Response {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            version: Version::HTTP_11,
            headers,
            body: body.into(),
            url: String::new(),
            remote_addr: None,
            elapsed: Duration::ZERO,
            request: None,
        }
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_remote_addr(mut self, addr: Option<SocketAddr>) -> Self {
        self.remote_addr = addr;
        self
    }

    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }

    /// Attach the request this response answers.
    pub fn with_request(mut self, request: PreparedRequest) -> Self {
        self.request = Some(request);
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// Canonical reason phrase for the status code, empty when unknown.
    pub fn reason(&self) -> &'static str {
        StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("")
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Version in HAR / status-line form, e.g. `HTTP/1.1`.
    pub fn http_version(&self) -> &'static str {
        http_version_str(self.version)
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First value of `name`, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Every value of `name` in received order.
    pub fn header_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// The request as it was sent, when the response came from an interface.
    pub fn request(&self) -> Option<&PreparedRequest> {
        self.request.as_ref()
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

/// Everything the transport reports about a response before its body is read.
pub(crate) struct ResponseHead {
    pub status: StatusCode,
    pub version: Version,
    pub headers: Vec<(String, String)>,
    pub url: String,
    pub remote_addr: Option<SocketAddr>,
}

impl ResponseHead {
    pub fn into_response(self, body: Bytes, elapsed: Duration) -> Response {
        Response {
            status: self.status.as_u16(),
            version: self.version,
            headers: self.headers,
            body,
            url: self.url,
            remote_addr: self.remote_addr,
            elapsed,
            request: None,
        }
    }
}

pub(crate) fn collect_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}

pub(crate) fn http_version_str(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_2 => "HTTP/2",
        Version::HTTP_3 => "HTTP/3",
        _ => "HTTP/1.1",
    }
}

/// `text/*`, JSON and XML bodies are shown (and recorded) as text.
pub(crate) fn is_text_content(content_type: &str) -> bool {
    content_type.starts_with("text/")
        || content_type.starts_with("application/json")
        || content_type.starts_with("application/xml")
}

/// Renders with [`ResponseRenderer::default`].
impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&ResponseRenderer::default().render(self))
    }
}
