use anyhow::Context;
use bytes::Bytes;
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use http::{Method, Request};
use http_body_util::{Empty, Full};
use realtime::{Config, Error, HttpRequest, Identity, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

const API_URL: &str = "API_URL";

// Starts a request against the backend, attaching the session's bearer
// credential when one exists.
async fn builder<P>(method: Method, path: &str, provider: &P) -> Result<http::request::Builder>
where
    P: Config + Identity,
{
    let api_url = Config::get(provider, API_URL).await.context("getting `API_URL`")?;
    let api_url = api_url.trim_end_matches('/');

    let mut builder = Request::builder()
        .method(method)
        .uri(format!("{api_url}{path}"))
        .header(ACCEPT, "application/json");

    if let Some(token) = Identity::access_token(provider).await.context("getting access token")? {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }

    Ok(builder)
}

/// `GET` a JSON resource.
pub async fn get<T, P>(path: &str, provider: &P) -> Result<T>
where
    T: DeserializeOwned,
    P: Config + HttpRequest + Identity,
{
    let request = builder(Method::GET, path, provider)
        .await?
        .body(Empty::<Bytes>::new())
        .with_context(|| format!("building GET {path} request"))?;

    let response = HttpRequest::fetch(provider, request)
        .await
        .map_err(|e| Error::BadGateway(format!("GET {path}: {e:#}")))?;

    let body = success(response)?;
    Ok(serde_json::from_slice(&body)?)
}

/// Send a JSON body, returning the raw response body.
pub async fn send<B, P>(method: Method, path: &str, body: &B, provider: &P) -> Result<Bytes>
where
    B: Serialize + Sync,
    P: Config + HttpRequest + Identity,
{
    let payload = serde_json::to_vec(body).context("serializing request body")?;
    let request = builder(method.clone(), path, provider)
        .await?
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(payload)))
        .with_context(|| format!("building {method} {path} request"))?;

    let response = HttpRequest::fetch(provider, request)
        .await
        .map_err(|e| Error::BadGateway(format!("{method} {path}: {e:#}")))?;

    success(response)
}

/// `DELETE` a resource, ignoring any response body.
pub async fn delete<P>(path: &str, provider: &P) -> Result<()>
where
    P: Config + HttpRequest + Identity,
{
    let request = builder(Method::DELETE, path, provider)
        .await?
        .body(Empty::<Bytes>::new())
        .with_context(|| format!("building DELETE {path} request"))?;

    let response = HttpRequest::fetch(provider, request)
        .await
        .map_err(|e| Error::BadGateway(format!("DELETE {path}: {e:#}")))?;

    success(response)?;
    Ok(())
}

fn success(response: http::Response<Bytes>) -> Result<Bytes> {
    let status = response.status();
    let body = response.into_body();

    if !status.is_success() {
        return Err(Error::from_status(status, &body));
    }
    Ok(body)
}
