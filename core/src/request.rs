//! Request options and the preparation step shared by both interfaces.
//!
//! # Design
//! Options are plain data collected through a fluent builder. [`prepare`]
//! applies them to a `reqwest` request builder (blocking or async), builds
//! the request, and snapshots what was built into a [`PreparedRequest`].
//! Query encoding, auth headers and body serialization are `reqwest`'s, so
//! what the recorder writes into a HAR entry is the request that is
//! actually sent.
//!
//! Headers the connection layer would otherwise add on its own (`host`,
//! `accept`, `content-length` for buffered bodies) are filled in before the
//! snapshot is taken. A streamed multipart body in the blocking flavour is
//! the one case whose `content-length` is only added by the connection.

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_LENGTH, HOST};
use reqwest::Method;
use serde::Serialize;
use url::Url;

use crate::error::{Error, Result};
use crate::response::collect_headers;
use crate::transport::{TransportBuilder, TransportRequest};
use crate::url::resolve_url;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const OCTET_STREAM: &str = "application/octet-stream";

/// Request body variants.
#[derive(Debug, Clone)]
pub enum Body {
    /// Serialized as JSON with `application/json`.
    Json(serde_json::Value),
    /// URL-encoded with `application/x-www-form-urlencoded`.
    Form(Vec<(String, String)>),
    /// Sent as UTF-8 with `text/plain; charset=utf-8`.
    Text(String),
    /// Raw bytes with a caller-chosen content type.
    Content { bytes: Bytes, content_type: String },
    /// `multipart/form-data` with a generated boundary.
    Multipart(Vec<Part>),
}

/// One field of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub name: String,
    pub value: PartValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartValue {
    Text(String),
    File {
        file_name: String,
        bytes: Bytes,
        content_type: String,
    },
}

impl Part {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: PartValue::Text(value.into()),
        }
    }

    /// A file upload, sent as `application/octet-stream` unless
    /// [`mime`](Self::mime) says otherwise.
    pub fn file(
        name: impl Into<String>,
        file_name: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            value: PartValue::File {
                file_name: file_name.into(),
                bytes: bytes.into(),
                content_type: OCTET_STREAM.to_string(),
            },
        }
    }

    /// Content type of a file part. Text parts ignore it.
    pub fn mime(mut self, mime: impl Into<String>) -> Self {
        if let PartValue::File { content_type, .. } = &mut self.value {
            *content_type = mime.into();
        }
        self
    }
}

#[derive(Debug, Clone)]
enum Auth {
    Basic {
        username: String,
        password: Option<String>,
    },
    Bearer(String),
}

/// Named options accepted by `request`.
///
/// ```ignore
/// let options = RequestOptions::new()
///     .query("page", "2")
///     .header("x-request-id", "abc")
///     .json(serde_json::json!({"username": "a"}));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    cookies: Vec<(String, String)>,
    body: Option<Body>,
    auth: Option<Auth>,
    timeout: Option<Duration>,
    segments: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a query parameter. Repeated names are kept in order.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Append a request header. Repeated names are kept in order.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Append a cookie to the `Cookie` header.
    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.body = Some(Body::Json(value));
        self
    }

    /// Like [`json`](Self::json) but serializes any `Serialize` value.
    pub fn try_json<T: Serialize + ?Sized>(self, value: &T) -> Result<Self> {
        Ok(self.json(serde_json::to_value(value)?))
    }

    pub fn form<K, V>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let fields = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.body = Some(Body::Form(fields));
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.body = Some(Body::Text(text.into()));
        self
    }

    pub fn content(mut self, bytes: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        self.body = Some(Body::Content {
            bytes: bytes.into(),
            content_type: content_type.into(),
        });
        self
    }

    pub fn multipart(mut self, parts: impl IntoIterator<Item = Part>) -> Self {
        self.body = Some(Body::Multipart(parts.into_iter().collect()));
        self
    }

    pub fn basic_auth(mut self, username: impl Into<String>, password: Option<&str>) -> Self {
        self.auth = Some(Auth::Basic {
            username: username.into(),
            password: password.map(str::to_string),
        });
        self
    }

    pub fn bearer_auth(mut self, token: impl Into<String>) -> Self {
        self.auth = Some(Auth::Bearer(token.into()));
        self
    }

    /// Per-request timeout. Without one the transport's own default applies.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Value for a `{name}` placeholder in the request path.
    pub fn segment(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.segments.push((name.into(), value.to_string()));
        self
    }
}

/// What was built for the wire: final URL, headers and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRequest {
    pub method: Method,
    /// Final URL including the encoded query string.
    pub url: Url,
    /// Base URL joined with the unformatted path template, set only when
    /// path segments were used.
    pub parameterized_url: Option<String>,
    /// Lowercase names, grouped by name.
    pub headers: Vec<(String, String)>,
    /// `None` without a body and for multipart bodies, see [`parts`](Self::parts).
    pub body: Option<Bytes>,
    /// Fields of a multipart body.
    pub parts: Vec<Part>,
    pub timeout: Option<Duration>,
}

impl PreparedRequest {
    /// Prepare a request without an interface, e.g. to inspect or record it.
    pub fn new(base_url: &str, method: Method, path: &str, options: RequestOptions) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        let (_, prepared) = prepare(
            |method, url| client.request(method, url),
            base_url,
            method,
            path,
            options,
        )?;
        Ok(prepared)
    }

    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The multipart body as text, with file contents shown as `(binary)`.
    pub fn multipart_text(&self) -> Option<String> {
        if self.parts.is_empty() {
            return None;
        }
        let boundary = self.header("content-type").and_then(boundary)?;

        let mut out = String::new();
        for part in &self.parts {
            out.push_str(&format!("--{boundary}\r\n"));
            match &part.value {
                PartValue::Text(text) => out.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{}\"\r\n\r\n{text}\r\n",
                    part.name
                )),
                PartValue::File {
                    file_name,
                    content_type,
                    ..
                } => out.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{file_name}\"\r\n\
                     Content-Type: {content_type}\r\n\r\n(binary)\r\n",
                    part.name
                )),
            }
        }
        out.push_str(&format!("--{boundary}--\r\n"));
        Some(out)
    }
}

/// Apply `options` to the builder `start` returns, build the request and
/// snapshot it.
pub(crate) fn prepare<B, F>(
    start: F,
    base_url: &str,
    method: Method,
    path: &str,
    options: RequestOptions,
) -> Result<(B::Request, PreparedRequest)>
where
    B: TransportBuilder,
    F: FnOnce(Method, &str) -> B,
{
    let RequestOptions {
        query,
        headers,
        cookies,
        body,
        auth,
        timeout,
        segments,
    } = options;

    let (path, parameterized_url) = if segments.is_empty() {
        (path.to_string(), None)
    } else {
        let formatted = format_path(path, &segments)?;
        let template = resolve_url(base_url, path)
            .replace("%7B", "{")
            .replace("%7D", "}");
        (formatted, Some(template))
    };

    let mut builder = start(method, &resolve_url(base_url, &path));
    for (name, value) in &headers {
        builder = builder.header(name, value);
    }
    if !cookies.is_empty() {
        let value = cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        builder = builder.header("cookie", &value);
    }
    if !query.is_empty() {
        builder = builder.query(&query);
    }
    builder = match &auth {
        Some(Auth::Basic { username, password }) => {
            builder.basic_auth(username, password.as_deref())
        }
        Some(Auth::Bearer(token)) => builder.bearer_auth(token),
        None => builder,
    };

    let has_content_type = headers
        .iter()
        .any(|(k, _)| k.eq_ignore_ascii_case("content-type"));
    let mut parts = Vec::new();
    builder = match body {
        None => builder,
        Some(Body::Json(value)) => builder.json(&value),
        Some(Body::Form(fields)) => builder.form(&fields),
        Some(Body::Text(text)) => {
            if !has_content_type {
                builder = builder.header("content-type", TEXT_PLAIN);
            }
            builder.body(Bytes::from(text))
        }
        Some(Body::Content {
            bytes,
            content_type,
        }) => {
            if !has_content_type {
                builder = builder.header("content-type", &content_type);
            }
            builder.body(bytes)
        }
        Some(Body::Multipart(fields)) => {
            let builder = builder.multipart(&fields)?;
            parts = fields;
            builder
        }
    };
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }

    let mut request = builder.build()?;
    fill_connection_headers(&mut request);

    let prepared = PreparedRequest {
        method: request.method().clone(),
        url: request.url().clone(),
        parameterized_url,
        headers: collect_headers(request.headers()),
        body: request.body_bytes().map(Bytes::copy_from_slice),
        parts,
        timeout,
    };
    Ok((request, prepared))
}

/// Set the headers an HTTP/1 connection adds when they are missing, so they
/// are sent and recorded with the same values.
fn fill_connection_headers<R: TransportRequest>(request: &mut R) {
    let url = request.url();
    let host = url.host_str().map(|host| match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    });
    let length = request.body_bytes().map(<[u8]>::len);

    let headers = request.headers_mut();
    if let Some(host) = host.and_then(|h| HeaderValue::from_str(&h).ok()) {
        headers.entry(HOST).or_insert(host);
    }
    headers
        .entry(ACCEPT)
        .or_insert(HeaderValue::from_static("*/*"));
    if let Some(length) = length {
        headers.entry(CONTENT_LENGTH).or_insert(HeaderValue::from(length));
    }
}

/// `boundary` parameter of a `multipart/form-data` content type.
fn boundary(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.trim().split_once('=')?;
        key.eq_ignore_ascii_case("boundary")
            .then(|| value.trim_matches('"'))
    })
}

/// Substitute `{name}` placeholders in `template`. `{{` and `}}` produce
/// literal braces; an unterminated `{` is kept as is.
fn format_path(template: &str, segments: &[(String, String)]) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") || tail.starts_with("}}") {
            out.push_str(&tail[..1]);
            rest = &tail[2..];
            continue;
        }
        if tail.starts_with('}') {
            out.push('}');
            rest = &tail[1..];
            continue;
        }

        match tail.find('}') {
            Some(end) => {
                let name = &tail[1..end];
                let value = segments
                    .iter()
                    .find(|(k, _)| k == name)
                    .map(|(_, v)| v)
                    .ok_or_else(|| Error::MissingSegment {
                        name: name.to_string(),
                        template: template.to_string(),
                    })?;
                out.push_str(value);
                rest = &tail[end + 1..];
            }
            None => {
                out.push_str(tail);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    Ok(out)
}
