//! # Provider
//!
//! Host implementation of the provider traits. Backend calls go over
//! `reqwest`, settings come from the environment, the bearer token comes from
//! the signed-in [`Session`] and positions come from a [`GeoFeed`].

use std::any::Any;
use std::env;
use std::error::Error;
use std::pin::pin;
use std::sync::{Arc, RwLock};

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use bytes::Bytes;
use common::auth::{self, Credentials, Role, Session};
use http::{Request, Response};
use http_body::Body;
use http_body_util::BodyExt;
use realtime::{Config, FixStream, Geolocation, HttpRequest, Identity, WatchOptions};
use tracing::{debug, info};

use crate::config;
use crate::geolocation::GeoFeed;

#[derive(Clone)]
pub struct Provider {
    client: reqwest::Client,
    api_url: String,
    session: Arc<RwLock<Option<Session>>>,
    geolocation: GeoFeed,
}

impl Provider {
    /// Provider for the backend named by `API_URL`, with no geolocation source.
    #[must_use]
    pub fn new() -> Self {
        Self::with_api_url(config::api_url())
    }

    #[must_use]
    pub fn with_api_url(api_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
            session: Arc::default(),
            geolocation: GeoFeed::new(),
        }
    }

    /// Use `feed` as the position source.
    #[must_use]
    pub fn with_geolocation(mut self, feed: GeoFeed) -> Self {
        self.geolocation = feed;
        self
    }

    #[must_use]
    pub const fn geolocation(&self) -> &GeoFeed {
        &self.geolocation
    }

    /// Sign in and attach the session to every subsequent request.
    ///
    /// # Errors
    ///
    /// Returns an error when the credentials are rejected or the backend
    /// cannot be reached. Any previous session is kept in that case.
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<Session> {
        let session = auth::login(credentials, self).await?;
        self.set_session(Some(session.clone()))?;
        Ok(session)
    }

    /// Drop the session. Later requests go out without credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the session lock is poisoned.
    pub fn sign_out(&self) -> Result<()> {
        self.set_session(None)?;
        info!("signed out");
        Ok(())
    }

    /// Hand over a session obtained elsewhere.
    ///
    /// # Errors
    ///
    /// Returns an error if the session lock is poisoned.
    pub fn set_session(&self, session: Option<Session>) -> Result<()> {
        *self.session.write().map_err(|e| anyhow!("session lock poisoned: {e}"))? = session;
        Ok(())
    }

    #[must_use]
    pub fn session(&self) -> Option<Session> {
        self.session.read().ok()?.clone()
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.session().map(|session| session.role)
    }
}

impl Default for Provider {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for Provider {
    async fn get(&self, key: &str) -> Result<String> {
        match key {
            "API_URL" => Ok(self.api_url.clone()),
            _ => env::var(key).with_context(|| format!("{key} not set")),
        }
    }
}

impl Identity for Provider {
    async fn access_token(&self) -> Result<Option<String>> {
        let session = self.session.read().map_err(|e| anyhow!("session lock poisoned: {e}"))?;
        Ok(session.as_ref().map(|session| session.token.clone()))
    }
}

impl HttpRequest for Provider {
    async fn fetch<T>(&self, request: Request<T>) -> Result<Response<Bytes>>
    where
        T: Body + Any + Send,
        T::Data: Into<Vec<u8>>,
        T::Error: Into<Box<dyn Error + Send + Sync + 'static>>,
    {
        let (parts, body) = request.into_parts();
        let body = collect(body).await?;
        debug!(method = %parts.method, uri = %parts.uri, "sending request");

        let response = self
            .client
            .request(parts.method, parts.uri.to_string())
            .headers(parts.headers)
            .body(body)
            .send()
            .await
            .context("sending request")?;

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.bytes().await.context("reading response body")?;

        let mut builder = Response::builder().status(status);
        if let Some(response_headers) = builder.headers_mut() {
            *response_headers = headers;
        }
        builder.body(bytes).context("building response")
    }
}

#[async_trait]
impl Geolocation for Provider {
    async fn watch(&self, options: WatchOptions) -> Result<FixStream> {
        self.geolocation.watch(options).await
    }
}

async fn collect<T>(body: T) -> Result<Vec<u8>>
where
    T: Body + Send,
    T::Data: Into<Vec<u8>>,
    T::Error: Into<Box<dyn Error + Send + Sync + 'static>>,
{
    let mut body = pin!(body);
    let mut bytes = Vec::new();

    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(|e| anyhow::Error::from_boxed(e.into()))?;
        if let Ok(data) = frame.into_data() {
            let data: Vec<u8> = data.into();
            bytes.extend(data);
        }
    }
    Ok(bytes)
}
