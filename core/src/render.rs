//! Plain-text rendering of an exchange for test reports.

use serde::Serialize;

use crate::request::PreparedRequest;
use crate::response::Response;

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Renders a [`Response`], and optionally the request that produced it.
///
/// ```text
/// → Request
/// POST http://localhost:8080/auth/register HTTP/1.1
/// content-type: application/json
///
/// {"username": "a"}
/// ← Response
/// HTTP/1.1 201 Created
/// content-type: application/json
///
/// {
///     "id": 1
/// }
/// ```
///
/// Bodies with a textual content type are decoded as UTF-8 (JSON is
/// re-indented, url-encoded request bodies are split one field per line)
/// and cut at `body_max_length` characters. Anything else becomes a short
/// `<binary preview=… len=N>` summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseRenderer {
    pub include_request: bool,
    pub include_request_body: bool,
    pub include_response_body: bool,
    /// Bytes shown in a binary preview.
    pub body_binary_preview_size: usize,
    pub body_json_indent: usize,
    /// In characters.
    pub body_max_length: usize,
}

impl Default for ResponseRenderer {
    fn default() -> Self {
        Self {
            include_request: false,
            include_request_body: false,
            include_response_body: true,
            body_binary_preview_size: 10,
            body_json_indent: 4,
            body_max_length: 4096,
        }
    }
}

impl ResponseRenderer {
    pub fn render(&self, response: &Response) -> String {
        let mut out = String::new();
        if self.include_request {
            // The transport does not report the request's version; reuse the response's.
            if let Some(request) = response.request() {
                out.push_str(&self.render_request(request, response.http_version()));
            }
        }
        out.push_str(&self.render_response(response));
        out
    }

    pub fn render_request(&self, request: &PreparedRequest, http_version: &str) -> String {
        let mut out = format!(
            "→ Request\n{} {} {http_version}\n",
            request.method, request.url
        );
        push_headers(&mut out, &request.headers);

        if self.include_request_body {
            let content_type = request.header("content-type").unwrap_or("");
            let body = match (request.multipart_text(), &request.body) {
                (Some(text), _) => Some(self.truncate(text)),
                (None, Some(body)) if !body.is_empty() => {
                    Some(self.format_body(body, content_type, true))
                }
                _ => None,
            };
            if let Some(body) = body {
                out.push('\n');
                out.push_str(&body);
                out.push('\n');
            }
        }
        out
    }

    pub fn render_response(&self, response: &Response) -> String {
        let mut out = format!(
            "← Response\n{} {} {}\n",
            response.http_version(),
            response.status(),
            response.reason()
        );
        push_headers(&mut out, response.headers());

        if self.include_response_body && !response.body().is_empty() {
            let content_type = response.content_type().unwrap_or("");
            out.push('\n');
            out.push_str(&self.format_body(response.body(), content_type, false));
        }
        out
    }

    fn format_body(&self, body: &[u8], content_type: &str, is_request: bool) -> String {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        if !is_textual(&mime) {
            return self.binary_preview(body);
        }

        let text = String::from_utf8_lossy(body);
        let formatted = if is_json(&mime) {
            self.pretty_json(&text)
        } else if is_request && mime == FORM_URLENCODED {
            format_urlencoded(&text)
        } else {
            None
        };
        self.truncate(formatted.unwrap_or_else(|| text.into_owned()))
    }

    fn binary_preview(&self, body: &[u8]) -> String {
        let preview = &body[..body.len().min(self.body_binary_preview_size)];
        format!(
            "<binary preview=b'{}' len={}>",
            preview.escape_ascii(),
            body.len()
        )
    }

    fn pretty_json(&self, text: &str) -> Option<String> {
        let value: serde_json::Value = serde_json::from_str(text).ok()?;
        let indent = " ".repeat(self.body_json_indent);
        let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
        let mut out = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
        value.serialize(&mut ser).ok()?;
        String::from_utf8(out).ok()
    }

    fn truncate(&self, text: String) -> String {
        match text.char_indices().nth(self.body_max_length) {
            Some((end, _)) => format!(
                "{}… [truncated to {} chars]",
                &text[..end],
                self.body_max_length
            ),
            None => text,
        }
    }
}

fn push_headers(out: &mut String, headers: &[(String, String)]) {
    for (name, value) in headers {
        out.push_str(name);
        out.push_str(": ");
        out.push_str(value);
        out.push('\n');
    }
}

fn is_json(mime: &str) -> bool {
    mime == "application/json" || mime.ends_with("+json")
}

fn is_textual(mime: &str) -> bool {
    mime.starts_with("text/")
        || is_json(mime)
        || mime.ends_with("+xml")
        || matches!(
            mime,
            "application/xml"
                | "application/javascript"
                | "application/yaml"
                | "application/x-yaml"
                | FORM_URLENCODED
        )
}

/// One `key=value&` per line, values decoded.
fn format_urlencoded(text: &str) -> Option<String> {
    let fields: Vec<(String, String)> = serde_urlencoded::from_str(text).ok()?;
    Some(
        fields
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("&\n"),
    )
}
