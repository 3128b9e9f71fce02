//! OpenAPI generation from recorded traffic.
//!
//! # Design
//! Three stages, each usable on its own:
//! - [`HarReader`] collects entries from every `.har` file under a directory.
//! - [`ApiSpecBuilder`] groups entries by path and method, counting query
//!   parameters and headers and inferring JSON body shapes as [`Node`]s.
//! - [`OpenApiGenerator`] renders the result as an OpenAPI 3.0 YAML document.
//!
//! [`generate_spec`] runs all three.

mod builder;
mod generator;
mod humanize;
mod reader;
mod schema;

use std::path::Path;

pub use builder::{ApiSpec, ApiSpecBuilder, ParamStats, ResponseStats, Route};
pub use generator::{operation_id, OpenApiGenerator, STANDARD_HEADERS};
pub use humanize::humanize_identifier;
pub use reader::HarReader;
pub use schema::Node;

use crate::error::Result;

/// Read every HAR file under `har_directory` and produce an OpenAPI YAML
/// document. With `base_url`, only entries under that URL are included.
pub fn generate_spec(
    har_directory: impl AsRef<Path>,
    base_url: Option<&str>,
    include_constraints: bool,
) -> Result<String> {
    let entries = HarReader::new(har_directory.as_ref()).entries()?;

    let mut builder = ApiSpecBuilder::new();
    if let Some(base_url) = base_url {
        builder = builder.base_url(base_url);
    }
    let spec = builder.build(&entries);

    OpenApiGenerator::new()
        .include_constraints(include_constraints)
        .generate(&spec)
}
