//! # Provider
//!
//! Provider defines external data interfaces for the crate.

use std::any::Any;
use std::error::Error;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use http::{Request, Response};
use http_body::Body;
use serde::{Deserialize, Serialize};

/// The `HttpRequest` trait defines the behavior for calling the tracking backend.
pub trait HttpRequest: Send + Sync {
    /// Make outbound HTTP request.
    fn fetch<T>(&self, request: Request<T>) -> impl Future<Output = Result<Response<Bytes>>> + Send
    where
        T: Body + Any + Send,
        T::Data: Into<Vec<u8>>,
        T::Error: Into<Box<dyn Error + Send + Sync + 'static>>;
}

/// The `Config` trait is used by implementers to provide service settings to
/// dependent crates.
pub trait Config: Send + Sync {
    /// Request configuration setting.
    fn get(&self, key: &str) -> impl Future<Output = Result<String>> + Send;
}

/// The `Identity` trait supplies the bearer credential of the current session.
pub trait Identity: Send + Sync {
    /// Access token for the signed-in user, if any.
    fn access_token(&self) -> impl Future<Output = Result<Option<String>>> + Send;
}

/// A single geolocation reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fix {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

impl Fix {
    /// Create a fix captured now.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude, timestamp: Utc::now() }
    }
}

/// Subscription settings passed to the geolocation subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    pub high_accuracy: bool,
    /// Oldest cached fix the subsystem may return. Zero disables caching.
    pub maximum_age: Duration,
    /// How long the subsystem may take to acquire each fix.
    pub timeout: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            maximum_age: Duration::ZERO,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Failure to acquire a fix on an open subscription.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GeoError {
    #[error("permission denied")]
    PermissionDenied,

    #[error("position unavailable: {0}")]
    PositionUnavailable(String),

    #[error("timed out acquiring position")]
    Timeout,
}

/// A live, infinite sequence of fixes. Dropping it ends the subscription.
pub type FixStream = BoxStream<'static, Result<Fix, GeoError>>;

/// The `Geolocation` trait opens position subscriptions.
#[async_trait]
pub trait Geolocation: Send + Sync {
    /// Begin a continuous subscription.
    ///
    /// Returns an error when no geolocation subsystem is available.
    async fn watch(&self, options: WatchOptions) -> Result<FixStream>;
}
