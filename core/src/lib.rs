//! HTTP interfaces for scenario-based API tests.
//!
//! # Overview
//! [`HttpInterface`] and [`AsyncHttpInterface`] send requests relative to a
//! fixed base URL and hand back the server's answer as an immutable
//! [`Response`]. Exchanges can be captured by a shared [`RequestRecorder`]
//! and written out as HAR 1.2; recorded HAR files can in turn be turned
//! into an OpenAPI document (see [`openapi`]).
//!
//! # Design
//! - Request preparation ([`PreparedRequest`]) and response normalization
//!   are synchronous and shared by both interfaces; only the network step
//!   differs. Requests are built by `reqwest` itself, and what is recorded
//!   is the built request.
//! - Transport, pooling and TLS are `reqwest`'s job. Its errors are surfaced
//!   unchanged as [`Error::Transport`].
//! - Domain clients build on [`RequestExecutor`] / [`AsyncRequestExecutor`]
//!   rather than on a concrete interface type.
//! - [`RecorderPlugin`] wires recording into a scenario runner's lifecycle.

pub mod config;
pub mod error;
pub mod har;
pub mod interface;
pub mod openapi;
pub mod plugin;
pub mod recorder;
pub mod render;
pub mod request;
pub mod response;
mod transport;
pub mod url;

pub use config::{PluginConfig, RecorderArgs};
pub use error::{Error, Result};
pub use interface::{AsyncHttpInterface, AsyncRequestExecutor, HttpInterface, RequestExecutor};
pub use plugin::{Dispatcher, FileArtifact, LifecycleEvent, Plugin, RecorderPlugin, ScenarioResult};
pub use recorder::RequestRecorder;
pub use render::ResponseRenderer;
pub use request::{Body, Part, PartValue, PreparedRequest, RequestOptions};
pub use response::Response;
pub use url::resolve_url;

pub use reqwest::Method;
