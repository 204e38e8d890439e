//! Host settings read from the environment.

use std::env;

const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// Base URL of the tracking backend.
pub fn api_url() -> String {
    env::var("API_URL").unwrap_or_else(|_| {
        tracing::trace!("API_URL not set, using default: {DEFAULT_API_URL}");
        DEFAULT_API_URL.to_string()
    })
}
