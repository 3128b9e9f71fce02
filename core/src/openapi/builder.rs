//! Aggregation of HAR entries into per-route API statistics.

use std::collections::BTreeMap;

use super::schema::Node;
use crate::har::Entry;

/// How often a query parameter or header was seen on a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamStats {
    pub requests: u64,
    pub example: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseStats {
    pub reason: String,
    pub body: Option<Node>,
}

/// Everything observed for one `(method, path)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub method: String,
    pub path: String,
    pub total: u64,
    pub params: BTreeMap<String, ParamStats>,
    /// Keyed by lowercase header name.
    pub headers: BTreeMap<String, ParamStats>,
    pub request_body: Option<Node>,
    pub responses: BTreeMap<u16, ResponseStats>,
}

impl Route {
    fn new(method: &str, path: &str) -> Self {
        Self {
            method: method.to_string(),
            path: path.to_string(),
            total: 0,
            params: BTreeMap::new(),
            headers: BTreeMap::new(),
            request_body: None,
            responses: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiSpec {
    pub base_url: String,
    /// Keyed by `(path, METHOD)` so routes come out sorted by path.
    pub routes: BTreeMap<(String, String), Route>,
}

#[derive(Debug, Clone, Default)]
pub struct ApiSpecBuilder {
    base_url: Option<String>,
}

impl ApiSpecBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only keep entries whose URL starts with `base_url` and make paths
    /// relative to it.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn build(&self, entries: &[Entry]) -> ApiSpec {
        let urls: Vec<(&Entry, String)> = entries
            .iter()
            .map(|entry| (entry, entry_url(entry)))
            .collect();

        let (base_url, urls) = match &self.base_url {
            Some(base) => {
                let base = base.trim_end_matches('/').to_string();
                let kept = urls
                    .into_iter()
                    .filter(|(_, url)| url.starts_with(&base))
                    .collect();
                (base, kept)
            }
            None => {
                let base = common_base(urls.iter().map(|(_, url)| url.as_str()));
                (base, urls)
            }
        };

        let mut routes: BTreeMap<(String, String), Route> = BTreeMap::new();
        for (entry, url) in urls {
            let path = match &url[base_url.len()..] {
                _ if base_url.is_empty() => url.clone(),
                "" => "/".to_string(),
                p if p.starts_with('/') => p.to_string(),
                p => format!("/{p}"),
            };
            let method = entry.request.method.to_uppercase();
            let route = routes
                .entry((path.clone(), method.clone()))
                .or_insert_with(|| Route::new(&method, &path));
            observe(route, entry);
        }

        ApiSpec { base_url, routes }
    }
}

fn observe(route: &mut Route, entry: &Entry) {
    route.total += 1;

    for param in &entry.request.query_string {
        count(&mut route.params, param.name.clone(), &param.value);
    }
    for header in &entry.request.headers {
        count(&mut route.headers, header.name.to_lowercase(), &header.value);
    }

    if let Some(post_data) = &entry.request.post_data {
        if is_json(&post_data.mime_type) {
            if let Some(node) = parse_json(&post_data.text) {
                route.request_body = Some(merge(route.request_body.take(), node));
            }
        }
    }

    let response = &entry.response;
    let body = match (&response.content.text, &response.content.encoding) {
        (Some(text), None) if is_json(&response.content.mime_type) => parse_json(text),
        _ => None,
    };
    let stats = route
        .responses
        .entry(response.status)
        .or_insert_with(|| ResponseStats {
            reason: response.status_text.clone(),
            body: None,
        });
    stats.reason = response.status_text.clone();
    if let Some(node) = body {
        stats.body = Some(merge(stats.body.take(), node));
    }
}

fn count(stats: &mut BTreeMap<String, ParamStats>, name: String, example: &str) {
    stats
        .entry(name)
        .or_insert_with(|| ParamStats {
            requests: 0,
            example: example.to_string(),
        })
        .requests += 1;
}

fn merge(existing: Option<Node>, node: Node) -> Node {
    match existing {
        Some(existing) => existing.merge(node),
        None => node,
    }
}

fn is_json(mime_type: &str) -> bool {
    mime_type.starts_with("application/json")
}

fn parse_json(text: &str) -> Option<Node> {
    serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .map(|value| Node::from_value(&value))
}

/// Template URL when the request used path segments, otherwise the real
/// URL; query string and fragment removed.
fn entry_url(entry: &Entry) -> String {
    let url = entry
        .request
        .parameterized_url
        .as_deref()
        .unwrap_or(&entry.request.url);
    let end = url.find(['?', '#']).unwrap_or(url.len());
    url[..end].to_string()
}

/// Longest shared `/`-separated prefix of `urls`, keeping at least one path
/// segment for every URL. Falls back to an empty base when the URLs do not
/// even share an origin.
fn common_base<'a>(urls: impl Iterator<Item = &'a str>) -> String {
    let split: Vec<Vec<&str>> = urls.map(|url| url.split('/').collect()).collect();
    let Some(first) = split.first() else {
        return String::new();
    };
    let shortest = split.iter().map(Vec::len).min().unwrap_or(0);

    let mut common = 0;
    while common < first.len() && split.iter().all(|parts| parts.get(common) == first.get(common)) {
        common += 1;
    }
    let common = common.min(shortest.saturating_sub(1));

    // `scheme:`, ``, `host` form the origin.
    if common < 3 {
        return String::new();
    }
    first[..common].join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(value: serde_json::Value) -> Entry {
        serde_json::from_value(value).unwrap()
    }

    fn get(url: &str, status: u16) -> Entry {
        entry(json!({
            "startedDateTime": "2024-01-01T00:00:00Z",
            "time": 1,
            "request": {"method": "GET", "url": url, "httpVersion": "HTTP/1.1"},
            "response": {
                "status": status,
                "statusText": "OK",
                "httpVersion": "HTTP/1.1",
                "content": {"size": 0, "mimeType": "x-unknown"}
            }
        }))
    }

    #[test]
    fn common_base_stops_before_last_segment() {
        let base = common_base(["http://h/api/users", "http://h/api/posts"].into_iter());
        assert_eq!(base, "http://h/api");

        let base = common_base(["http://h/users"].into_iter());
        assert_eq!(base, "http://h");

        let base = common_base(["http://a/x", "http://b/x"].into_iter());
        assert_eq!(base, "");
    }

    #[test]
    fn unrelated_origins_keep_full_urls() {
        let spec = ApiSpecBuilder::new().build(&[get("http://a/x", 200), get("http://b/x", 200)]);
        let paths: Vec<_> = spec.routes.keys().map(|(path, _)| path.as_str()).collect();
        assert_eq!(paths, ["http://a/x", "http://b/x"]);
    }

    #[test]
    fn groups_by_method_and_path() {
        let entries = vec![
            get("http://h/api/users?page=1", 200),
            get("http://h/api/users?page=2&limit=5", 200),
            get("http://h/api/posts", 200),
        ];
        let spec = ApiSpecBuilder::new().build(&entries);
        assert_eq!(spec.base_url, "http://h/api");
        assert_eq!(spec.routes.len(), 2);

        let users = &spec.routes[&("/users".to_string(), "GET".to_string())];
        assert_eq!(users.total, 2);
        assert_eq!(
            users.params["page"],
            ParamStats {
                requests: 2,
                example: "1".to_string()
            }
        );
        assert_eq!(users.params["limit"].requests, 1);
    }

    #[test]
    fn base_url_filter_drops_other_hosts() {
        let entries = vec![get("http://h/api/v1/users", 200), get("http://other/x", 200)];
        let spec = ApiSpecBuilder::new()
            .base_url("http://h/api/v1/")
            .build(&entries);
        assert_eq!(spec.base_url, "http://h/api/v1");
        let keys: Vec<_> = spec.routes.keys().cloned().collect();
        assert_eq!(keys, [("/users".to_string(), "GET".to_string())]);
    }

    #[test]
    fn parameterized_url_groups_formatted_paths() {
        let mut first = get("http://h/users/1", 200);
        first.request.parameterized_url = Some("http://h/users/{id}".to_string());
        let mut second = get("http://h/users/2", 404);
        second.request.parameterized_url = Some("http://h/users/{id}".to_string());
        second.response.status_text = "Not Found".to_string();

        let spec = ApiSpecBuilder::new()
            .base_url("http://h")
            .build(&[first, second]);
        let route = &spec.routes[&("/users/{id}".to_string(), "GET".to_string())];
        assert_eq!(route.total, 2);
        assert_eq!(route.responses[&200].reason, "OK");
        assert_eq!(route.responses[&404].reason, "Not Found");
    }

    #[test]
    fn headers_are_counted_case_insensitively() {
        let mut a = get("http://h/x", 200);
        a.request.headers = vec![crate::har::Header {
            name: "X-Token".to_string(),
            value: "t1".to_string(),
        }];
        let mut b = get("http://h/x", 200);
        b.request.headers = vec![crate::har::Header {
            name: "x-token".to_string(),
            value: "t2".to_string(),
        }];
        let spec = ApiSpecBuilder::new().build(&[a, b]);
        let route = spec.routes.values().next().unwrap();
        assert_eq!(route.headers["x-token"].requests, 2);
        assert_eq!(route.headers["x-token"].example, "t1");
    }

    #[test]
    fn json_bodies_are_merged() {
        let post = |body: &str, response: &str| {
            entry(json!({
                "startedDateTime": "2024-01-01T00:00:00Z",
                "time": 1,
                "request": {
                    "method": "post",
                    "url": "http://h/auth/register",
                    "httpVersion": "HTTP/1.1",
                    "postData": {"mimeType": "application/json", "text": body}
                },
                "response": {
                    "status": 201,
                    "statusText": "Created",
                    "httpVersion": "HTTP/1.1",
                    "content": {"size": 8, "mimeType": "application/json", "text": response}
                }
            }))
        };
        let entries = vec![
            post(r#"{"username":"a","email":"a@x"}"#, r#"{"id":1}"#),
            post(r#"{"username":"b"}"#, r#"{"id":2}"#),
        ];
        let spec = ApiSpecBuilder::new().base_url("http://h").build(&entries);
        let route = &spec.routes[&("/auth/register".to_string(), "POST".to_string())];

        let request = route.request_body.as_ref().unwrap().to_json_schema(false);
        assert_eq!(request["required"], json!(["username"]));
        let response = route.responses[&201].body.as_ref().unwrap().to_json_schema(true);
        assert_eq!(response["properties"]["id"], json!({"type": "integer", "minimum": 1, "maximum": 2}));
    }
}
