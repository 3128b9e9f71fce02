use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::redirect::Policy;
use reqwest::{Client, Method};
use tracing::debug;

use super::{record, AsyncRequestExecutor};
use crate::error::Result;
use crate::recorder::RequestRecorder;
use crate::request::{prepare, RequestOptions};
use crate::response::{collect_headers, Response, ResponseHead};

/// HTTP interface whose requests suspend the calling task at network I/O.
///
/// Dropping the future returned by [`request`](Self::request) aborts the
/// in-flight request.
#[derive(Debug, Clone)]
pub struct AsyncHttpInterface {
    base_url: String,
    client: Client,
    recorder: Option<Arc<RequestRecorder>>,
}

impl AsyncHttpInterface {
    /// Same client defaults as [`HttpInterface::new`](super::HttpInterface::new).
    ///
    /// # Panics
    ///
    /// If the TLS backend cannot be initialized; see [`try_new`](Self::try_new).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::try_new(base_url).expect("Failed to build reqwest client")
    }

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

    pub fn with_recorder(mut self, recorder: Arc<RequestRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<Response> {
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

        let resp = self.client.execute(request).await?;
        let head = ResponseHead {
            status: resp.status(),
            version: resp.version(),
            headers: collect_headers(resp.headers()),
            url: resp.url().to_string(),
            remote_addr: resp.remote_addr(),
        };
        let body = resp.bytes().await?;
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

#[async_trait]
impl AsyncRequestExecutor for AsyncHttpInterface {
    async fn request(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<Response> {
        AsyncHttpInterface::request(self, method, path, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_new_keeps_base_url() {
        let http = AsyncHttpInterface::try_new("http://localhost:8080").unwrap();
        assert_eq!(http.base_url(), "http://localhost:8080");
    }
}
