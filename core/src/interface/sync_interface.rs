use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use reqwest::Method;
use tracing::debug;

use super::{record, RequestExecutor};
use crate::error::Result;
use crate::recorder::RequestRecorder;
use crate::request::{prepare, RequestOptions};
use crate::response::{collect_headers, Response, ResponseHead};

/// HTTP interface that blocks the calling thread for each request.
///
/// Holds a base URL fixed at construction and one `reqwest` blocking client
/// for its whole lifetime. Must not be created or dropped inside an async
/// runtime; use [`AsyncHttpInterface`](super::AsyncHttpInterface) there.
#[derive(Debug, Clone)]
pub struct HttpInterface {
    base_url: String,
    client: Client,
    recorder: Option<Arc<RequestRecorder>>,
}

impl HttpInterface {
    /// The default client ignores proxy environment variables and does not
    /// follow redirects, so every response is the server's own answer.
    ///
    /// # Panics
    ///
    /// If the TLS backend cannot be initialized; see [`try_new`](Self::try_new).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::try_new(base_url).expect("Failed to build reqwest blocking client")
    }

    /// Like [`new`](Self::new), returning the client build error instead.
    pub fn try_new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .redirect(Policy::none())
            .no_proxy()
            .build()?;
        Ok(Self::with_client(base_url, client))
    }

    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: base_url.into(),
            client,
            recorder: None,
        }
    }

    /// Record every completed exchange into `recorder`.
    pub fn with_recorder(mut self, recorder: Arc<RequestRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send `method path` resolved against the base URL and wait for the
    /// full response. Transport failures are returned as
    /// [`Error::Transport`](crate::Error::Transport) unchanged.
    pub fn request(&self, method: Method, path: &str, options: RequestOptions) -> Result<Response> {
        let (request, prepared) = prepare(
            |method, url| self.client.request(method, url),
            &self.base_url,
            method,
            path,
            options,
        )?;

        debug!(method = %prepared.method, url = %prepared.url, "sending request");
        let started_at = Utc::now();
        let start = Instant::now();

        let resp = self.client.execute(request)?;
        let head = ResponseHead {
            status: resp.status(),
            version: resp.version(),
            headers: collect_headers(resp.headers()),
            url: resp.url().to_string(),
            remote_addr: resp.remote_addr(),
        };
        let body = resp.bytes()?;
        let response = head.into_response(body, start.elapsed());

        debug!(
            method = %prepared.method,
            url = %prepared.url,
            status = response.status(),
            elapsed_ms = response.elapsed().as_millis() as u64,
            "received response"
        );
        record(self.recorder.as_ref(), &prepared, &response, started_at);
        Ok(response.with_request(prepared))
    }
}

impl RequestExecutor for HttpInterface {
    fn request(&self, method: Method, path: &str, options: RequestOptions) -> Result<Response> {
        HttpInterface::request(self, method, path, options)
    }
}
