use std::collections::BTreeSet;

use serde_json::{json, Map, Value};

use super::builder::{ApiSpec, ParamStats, Route};
use super::humanize::humanize_identifier;
use crate::error::Result;

/// Headers every client sends; never documented as parameters.
pub const STANDARD_HEADERS: [&str; 7] = [
    "host",
    "accept",
    "accept-encoding",
    "connection",
    "user-agent",
    "content-length",
    "content-type",
];

/// Renders an [`ApiSpec`] as an OpenAPI 3.0 document.
#[derive(Debug, Clone)]
pub struct OpenApiGenerator {
    include_constraints: bool,
    standard_headers: BTreeSet<String>,
}

impl Default for OpenApiGenerator {
    fn default() -> Self {
        Self {
            include_constraints: true,
            standard_headers: STANDARD_HEADERS.iter().map(|h| h.to_string()).collect(),
        }
    }
}

impl OpenApiGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit `minimum`, `maximum`, `minItems` and `maxItems` in schemas.
    pub fn include_constraints(mut self, include: bool) -> Self {
        self.include_constraints = include;
        self
    }

    pub fn standard_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.standard_headers = headers
            .into_iter()
            .map(|h| h.as_ref().to_lowercase())
            .collect();
        self
    }

    pub fn generate(&self, spec: &ApiSpec) -> Result<String> {
        Ok(serde_yaml::to_string(&self.document(spec))?)
    }

    pub fn document(&self, spec: &ApiSpec) -> Value {
        let server = if spec.base_url.is_empty() {
            "/"
        } else {
            spec.base_url.as_str()
        };

        let mut paths = Map::new();
        for route in spec.routes.values() {
            let operations = paths
                .entry(route.path.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            operations[route.method.to_lowercase()] = self.operation(route);
        }

        json!({
            "openapi": "3.0.0",
            "info": {"title": "API", "version": "1.0.0"},
            "servers": [{"url": server}],
            "paths": paths,
        })
    }

    fn operation(&self, route: &Route) -> Value {
        let mut parameters: Vec<Value> = path_params(&route.path)
            .into_iter()
            .map(|name| parameter(name, "path", true))
            .collect();
        parameters.extend(
            route
                .params
                .iter()
                .map(|(name, stats)| parameter(name, "query", is_required(stats, route))),
        );
        parameters.extend(
            route
                .headers
                .iter()
                .filter(|(name, _)| !self.standard_headers.contains(name.as_str()))
                .map(|(name, stats)| parameter(name, "header", is_required(stats, route))),
        );

        let mut responses = Map::new();
        for (status, stats) in &route.responses {
            let mut response = json!({"description": stats.reason});
            if let Some(body) = &stats.body {
                response["content"] = self.json_content(body.to_json_schema(self.include_constraints));
            }
            responses.insert(status.to_string(), response);
        }

        let mut operation = json!({
            "summary": format!("Endpoint for {} {}", route.method, route.path),
            "operationId": operation_id(&route.method, &route.path),
            "parameters": parameters,
        });
        if let Some(body) = &route.request_body {
            operation["requestBody"] = json!({
                "content": self.json_content(body.to_json_schema(self.include_constraints)),
            });
        }
        operation["responses"] = Value::Object(responses);
        operation
    }

    fn json_content(&self, schema: Value) -> Value {
        json!({"application/json": {"schema": schema}})
    }
}

fn parameter(name: &str, location: &str, required: bool) -> Value {
    json!({
        "name": name,
        "in": location,
        "required": required,
        "description": humanize_identifier(name),
        "schema": {"type": "string"},
    })
}

fn is_required(stats: &ParamStats, route: &Route) -> bool {
    stats.requests == route.total
}

/// `get` + `/users/{id}` → `get_users_{id}`.
pub fn operation_id(method: &str, path: &str) -> String {
    format!(
        "{}_{}",
        method.to_lowercase(),
        path.replace('/', "_").trim_matches('_')
    )
}

fn path_params(path: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = path;
    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        let name = &rest[start + 1..start + len];
        if !name.is_empty() {
            names.push(name);
        }
        rest = &rest[start + len + 1..];
    }
    names
}
