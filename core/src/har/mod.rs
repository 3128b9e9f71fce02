//! HAR (HTTP Archive) model and formatting of recorded exchanges.

mod formatter;
mod model;

pub use formatter::{format_entry, format_request, format_response, Exchange};
pub use model::*;
