//! Blocking and async HTTP interfaces over a fixed base URL.
//!
//! # Design
//! Both interfaces share one synchronous core: options are turned into a
//! [`PreparedRequest`](crate::request::PreparedRequest) before any I/O, and
//! the transport's answer is normalized into a [`Response`] the same way.
//! Only the send/receive step differs: [`HttpInterface`] blocks the calling
//! thread, [`AsyncHttpInterface`] suspends the calling task.
//!
//! Domain clients compose an executor instead of extending a base type:
//!
//! ```ignore
//! struct AuthApi<E> {
//!     http: E,
//! }
//!
//! impl<E: RequestExecutor> AuthApi<E> {
//!     fn register(&self, username: &str) -> Result<Response> {
//!         self.http.request(
//!             Method::POST,
//!             "/auth/register",
//!             RequestOptions::new().json(json!({ "username": username })),
//!         )
//!     }
//! }
//! ```

mod async_interface;
mod sync_interface;

pub use async_interface::AsyncHttpInterface;
pub use sync_interface::HttpInterface;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;

use crate::error::Result;
use crate::har::Exchange;
use crate::recorder::RequestRecorder;
use crate::request::{PreparedRequest, RequestOptions};
use crate::response::Response;

/// The single request primitive, blocking flavour.
pub trait RequestExecutor {
    fn request(&self, method: Method, path: &str, options: RequestOptions) -> Result<Response>;
}

/// The single request primitive, async flavour.
#[async_trait]
pub trait AsyncRequestExecutor: Send + Sync {
    async fn request(&self, method: Method, path: &str, options: RequestOptions)
        -> Result<Response>;
}

fn record(
    recorder: Option<&Arc<RequestRecorder>>,
    request: &PreparedRequest,
    response: &Response,
    started_at: DateTime<Utc>,
) {
    if let Some(recorder) = recorder {
        recorder.record(&Exchange {
            request,
            response,
            started_at,
        });
    }
}
