//! Common Utilities
//!
//! Shared error types, HTTP client construction and path resolution.

pub mod error;
pub mod http;
pub mod paths;

pub use error::ConfigurationError;
pub use http::create_http_client;
pub use paths::{ceangal_dir, resolve_path};
