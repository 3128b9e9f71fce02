//! Conversion of a completed exchange into a HAR entry.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, SecondsFormat, Utc};

use super::model::{self as har, Content, Cookie, Entry, Header, PostData, PostParam, QueryParam};
use crate::request::{PartValue, PreparedRequest};
use crate::response::{is_text_content, Response};

const UNKNOWN_MIME: &str = "x-unknown";

/// One request/response pair as it went over the wire.
#[derive(Debug, Clone, Copy)]
pub struct Exchange<'a> {
    pub request: &'a PreparedRequest,
    pub response: &'a Response,
    pub started_at: DateTime<Utc>,
}

/// Build a HAR entry for `exchange`.
pub fn format_entry(exchange: &Exchange<'_>) -> Entry {
    let response = exchange.response;
    Entry {
        started_date_time: exchange
            .started_at
            .to_rfc3339_opts(SecondsFormat::Micros, true),
        time: u64::try_from(response.elapsed().as_millis()).unwrap_or(u64::MAX),
        // The transport does not report the request's HTTP version; reuse the response's.
        request: format_request(exchange.request, response.http_version()),
        response: format_response(response),
        cache: har::Cache::default(),
        timings: har::Timings::default(),
        server_ip_address: response.remote_addr().map(|addr| addr.ip().to_string()),
    }
}

/// Headers are the request's as built and sent, see [`PreparedRequest::headers`].
pub fn format_request(request: &PreparedRequest, http_version: &str) -> har::Request {
    let content_type = request.header("content-type").unwrap_or(UNKNOWN_MIME);
    let post_data = match &request.body {
        _ if !request.parts.is_empty() => Some(format_multipart(request, content_type)),
        Some(body) if !body.is_empty() => Some(format_post_data(body, content_type)),
        _ => None,
    };

    let cookies = request
        .headers
        .iter()
        .filter(|(name, _)| name.eq_ignore_ascii_case("cookie"))
        .flat_map(|(_, value)| parse_cookie_header(value))
        .collect();

    har::Request {
        method: request.method.as_str().to_string(),
        url: request.url.to_string(),
        http_version: http_version.to_string(),
        cookies,
        headers: format_headers(&request.headers),
        query_string: request
            .url
            .query_pairs()
            .map(|(name, value)| QueryParam {
                name: name.into_owned(),
                value: value.into_owned(),
            })
            .collect(),
        post_data,
        headers_size: -1,
        body_size: -1,
        parameterized_url: request.parameterized_url.clone(),
    }
}

pub fn format_response(response: &Response) -> har::Response {
    let cookies = response
        .header_all("set-cookie")
        .filter_map(parse_set_cookie)
        .collect();

    har::Response {
        status: response.status(),
        status_text: response.reason().to_string(),
        http_version: response.http_version().to_string(),
        cookies,
        headers: format_headers(response.headers()),
        content: format_content(response.body(), response.content_type().unwrap_or(UNKNOWN_MIME)),
        redirect_url: response.header("location").unwrap_or("").to_string(),
        headers_size: -1,
        body_size: -1,
    }
}

fn format_headers(headers: &[(String, String)]) -> Vec<Header> {
    headers
        .iter()
        .map(|(name, value)| Header {
            name: name.clone(),
            value: value.clone(),
        })
        .collect()
}

fn format_post_data(body: &[u8], content_type: &str) -> PostData {
    let text = String::from_utf8_lossy(body).into_owned();

    if content_type.starts_with("application/x-www-form-urlencoded") {
        let params = serde_urlencoded::from_str::<Vec<(String, String)>>(&text)
            .unwrap_or_default()
            .into_iter()
            .map(|(name, value)| PostParam {
                name,
                value,
                file_name: None,
                content_type: None,
            })
            .collect();
        return PostData {
            mime_type: content_type.to_string(),
            text,
            params: Some(params),
        };
    }

    PostData {
        mime_type: content_type.to_string(),
        text: if is_text_content(content_type) {
            text
        } else {
            "binary".to_string()
        },
        params: None,
    }
}

/// Text parts keep their value; file parts show `(binary)` with their file
/// name and content type.
fn format_multipart(request: &PreparedRequest, content_type: &str) -> PostData {
    let params = request
        .parts
        .iter()
        .map(|part| match &part.value {
            PartValue::Text(text) => PostParam {
                name: part.name.clone(),
                value: text.clone(),
                file_name: None,
                content_type: None,
            },
            PartValue::File {
                file_name,
                content_type,
                ..
            } => PostParam {
                name: part.name.clone(),
                value: "(binary)".to_string(),
                file_name: Some(file_name.clone()),
                content_type: Some(content_type.clone()),
            },
        })
        .collect();

    PostData {
        mime_type: content_type.to_string(),
        text: request.multipart_text().unwrap_or_default(),
        params: Some(params),
    }
}

fn format_content(body: &[u8], content_type: &str) -> Content {
    let size = body.len() as u64;
    let mut content = Content {
        size,
        mime_type: content_type.to_string(),
        text: None,
        encoding: None,
        comment: None,
    };
    if body.is_empty() {
        return content;
    }
    if is_text_content(content_type) {
        content.text = Some(String::from_utf8_lossy(body).into_owned());
    } else {
        content.text = Some(STANDARD.encode(body));
        content.encoding = Some("base64".to_string());
    }
    content
}

/// Parse a request `Cookie` header (`a=1; b=2`).
fn parse_cookie_header(value: &str) -> Vec<Cookie> {
    value
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            (!name.is_empty()).then(|| Cookie::new(name, value.trim()))
        })
        .collect()
}

/// Parse one `Set-Cookie` header. Unknown attributes are ignored.
fn parse_set_cookie(header: &str) -> Option<Cookie> {
    let mut parts = header.split(';');
    let (name, value) = parts.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let mut cookie = Cookie::new(name, value.trim());

    for attr in parts {
        let (key, val) = match attr.split_once('=') {
            Some((k, v)) => (k.trim(), v.trim()),
            None => (attr.trim(), ""),
        };
        match key.to_ascii_lowercase().as_str() {
            "path" if !val.is_empty() => cookie.path = Some(val.to_string()),
            "domain" if !val.is_empty() => cookie.domain = Some(val.to_string()),
            "expires" if !val.is_empty() => match DateTime::parse_from_rfc2822(val) {
                Ok(date) => cookie.expires = Some(date.to_rfc3339()),
                Err(_) => cookie.comment = Some(format!("Invalid date format: {val}")),
            },
            "httponly" => cookie.http_only = Some(true),
            "secure" => cookie.secure = Some(true),
            _ => {}
        }
    }
    Some(cookie)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{Part, RequestOptions};
    use chrono::TimeZone;
    use reqwest::Method;
    use serde_json::json;
    use std::time::Duration;

    fn prepared(method: Method, path: &str, options: RequestOptions) -> PreparedRequest {
        PreparedRequest::new("http://localhost", method, path, options).unwrap()
    }

    fn header(name: &str, value: &str) -> (String, String) {
        (name.to_string(), value.to_string())
    }

    #[test]
    fn entry_carries_timing_and_server_address() {
        let request = prepared(Method::GET, "/", RequestOptions::new());
        let response = Response::new(200, Vec::new(), "")
            .with_elapsed(Duration::from_millis(42))
            .with_remote_addr(Some("127.0.0.1:8080".parse().unwrap()));
        let started_at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();

        let entry = format_entry(&Exchange {
            request: &request,
            response: &response,
            started_at,
        });

        assert_eq!(entry.started_date_time, "2024-01-02T03:04:05.000000Z");
        assert_eq!(entry.time, 42);
        assert_eq!(entry.server_ip_address.as_deref(), Some("127.0.0.1"));
        assert_eq!(entry.request.http_version, "HTTP/1.1");
        assert_eq!(entry.timings, har::Timings::default());
    }

    #[test]
    fn request_without_body_has_no_post_data() {
        let request = prepared(
            Method::GET,
            "/search",
            RequestOptions::new().query("q", "a b").query("page", "2"),
        );
        let formatted = format_request(&request, "HTTP/1.1");
        assert_eq!(formatted.method, "GET");
        assert_eq!(formatted.url, "http://localhost/search?q=a+b&page=2");
        assert!(formatted.post_data.is_none());
        assert_eq!(
            formatted.query_string,
            vec![
                QueryParam { name: "q".into(), value: "a b".into() },
                QueryParam { name: "page".into(), value: "2".into() },
            ]
        );
        assert_eq!((formatted.headers_size, formatted.body_size), (-1, -1));
    }

    #[test]
    fn json_request_body_is_text() {
        let request = prepared(
            Method::POST,
            "/auth/register",
            RequestOptions::new().json(json!({"username": "a"})),
        );
        let post_data = format_request(&request, "HTTP/1.1").post_data.unwrap();
        assert_eq!(post_data.mime_type, "application/json");
        assert_eq!(post_data.text, r#"{"username":"a"}"#);
        assert!(post_data.params.is_none());
    }

    #[test]
    fn form_request_body_lists_params() {
        let request = prepared(
            Method::POST,
            "/login",
            RequestOptions::new().form([("user", "bob"), ("note", "a&b")]),
        );
        let post_data = format_request(&request, "HTTP/1.1").post_data.unwrap();
        assert_eq!(post_data.text, "user=bob&note=a%26b");
        let params = post_data.params.unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!((params[1].name.as_str(), params[1].value.as_str()), ("note", "a&b"));
    }

    #[test]
    fn binary_request_body_is_not_inlined() {
        let request = prepared(
            Method::PUT,
            "/blob",
            RequestOptions::new().content(vec![0u8, 1, 2], "application/octet-stream"),
        );
        let post_data = format_request(&request, "HTTP/1.1").post_data.unwrap();
        assert_eq!(post_data.text, "binary");
    }

    #[test]
    fn request_cookies_are_listed() {
        let request = prepared(
            Method::GET,
            "/",
            RequestOptions::new().cookie("session", "s1").cookie("theme", "dark"),
        );
        let cookies = format_request(&request, "HTTP/1.1").cookies;
        assert_eq!(cookies, vec![Cookie::new("session", "s1"), Cookie::new("theme", "dark")]);
    }

    #[test]
    fn segments_keep_parameterized_url() {
        let request = prepared(Method::GET, "/users/{id}", RequestOptions::new().segment("id", 1));
        let formatted = format_request(&request, "HTTP/1.1");
        assert_eq!(formatted.url, "http://localhost/users/1");
        assert_eq!(
            formatted.parameterized_url.as_deref(),
            Some("http://localhost/users/{id}")
        );
    }

    #[test]
    fn empty_response_content() {
        let formatted = format_response(&Response::new(200, Vec::new(), ""));
        assert_eq!(formatted.status_text, "OK");
        assert_eq!(
            formatted.content,
            Content {
                size: 0,
                mime_type: "x-unknown".to_string(),
                text: None,
                encoding: None,
                comment: None,
            }
        );
        assert_eq!(formatted.redirect_url, "");
    }

    #[test]
    fn text_response_content() {
        let response = Response::new(
            200,
            vec![header("content-type", "application/json")],
            r#"{"id":1}"#,
        );
        let content = format_response(&response).content;
        assert_eq!(content.size, 8);
        assert_eq!(content.text.as_deref(), Some(r#"{"id":1}"#));
        assert!(content.encoding.is_none());
    }

    #[test]
    fn binary_response_content_is_base64() {
        let response = Response::new(
            200,
            vec![header("content-type", "image/png")],
            vec![0x89u8, 0x50, 0x4e, 0x47],
        );
        let content = format_response(&response).content;
        assert_eq!(content.size, 4);
        assert_eq!(content.text.as_deref(), Some("iVBORw=="));
        assert_eq!(content.encoding.as_deref(), Some("base64"));
    }

    #[test]
    fn redirect_location_is_recorded() {
        let response = Response::new(302, vec![header("location", "/echo")], "");
        assert_eq!(format_response(&response).redirect_url, "/echo");
    }

    #[test]
    fn set_cookie_attributes_are_parsed() {
        let response = Response::new(
            200,
            vec![
                header(
                    "set-cookie",
                    "session=abc; Path=/; Domain=example.com; Expires=Wed, 21 Oct 2015 07:28:00 GMT; HttpOnly; Secure",
                ),
                header("set-cookie", "theme=dark"),
            ],
            "",
        );
        let cookies = format_response(&response).cookies;
        assert_eq!(cookies.len(), 2);

        let session = &cookies[0];
        assert_eq!(session.name, "session");
        assert_eq!(session.value, "abc");
        assert_eq!(session.path.as_deref(), Some("/"));
        assert_eq!(session.domain.as_deref(), Some("example.com"));
        assert_eq!(session.expires.as_deref(), Some("2015-10-21T07:28:00+00:00"));
        assert_eq!(session.http_only, Some(true));
        assert_eq!(session.secure, Some(true));
        assert!(session.comment.is_none());

        assert_eq!(cookies[1], Cookie::new("theme", "dark"));
    }

    #[test]
    fn invalid_cookie_expiry_becomes_comment() {
        let cookie = parse_set_cookie("a=1; Expires=someday").unwrap();
        assert!(cookie.expires.is_none());
        assert_eq!(cookie.comment.as_deref(), Some("Invalid date format: someday"));
    }

    #[test]
    fn malformed_set_cookie_is_skipped() {
        assert!(parse_set_cookie("no-equals-sign").is_none());
        assert!(parse_set_cookie("=value").is_none());
    }

    #[test]
    fn query_fragment_is_ignored() {
        let request = prepared(Method::GET, "/x#frag", RequestOptions::new().query("a", "1"));
        let formatted = format_request(&request, "HTTP/1.1");
        assert_eq!(formatted.url, "http://localhost/x?a=1#frag");
        assert_eq!(
            formatted.query_string,
            vec![QueryParam { name: "a".into(), value: "1".into() }]
        );
    }

    #[test]
    fn headers_are_recorded_as_built() {
        let request = prepared(
            Method::POST,
            "/echo",
            RequestOptions::new().header("X-Trace", "t").text("hi"),
        );
        let names: Vec<_> = format_request(&request, "HTTP/1.1")
            .headers
            .into_iter()
            .map(|h| h.name)
            .collect();
        assert_eq!(
            names,
            ["x-trace", "content-type", "host", "accept", "content-length"]
        );
    }

    #[test]
    fn multipart_request_lists_parts() {
        let request = prepared(
            Method::POST,
            "/upload",
            RequestOptions::new().multipart([
                Part::text("title", "cat"),
                Part::file("photo", "cat.png", vec![0x89u8, 0x50]).mime("image/png"),
            ]),
        );
        let post_data = format_request(&request, "HTTP/1.1").post_data.unwrap();
        assert!(post_data.mime_type.starts_with("multipart/form-data; boundary="));
        assert_eq!(
            post_data.params.unwrap(),
            vec![
                PostParam {
                    name: "title".into(),
                    value: "cat".into(),
                    file_name: None,
                    content_type: None,
                },
                PostParam {
                    name: "photo".into(),
                    value: "(binary)".into(),
                    file_name: Some("cat.png".into()),
                    content_type: Some("image/png".into()),
                },
            ]
        );
        assert!(post_data.text.contains("filename=\"cat.png\""));
        assert!(post_data.text.contains("\r\n\r\n(binary)\r\n"));
    }
}
