//! Sessions and sign-in.
//!
//! A [`Session`] is produced by [`login`] and handed explicitly to whichever
//! provider needs to attach credentials. Nothing here is stored globally.
//!
//! Account management ([`users`], [`update_user`], [`delete_user`]) is
//! admin-only; the backend answers other roles with `401`.

use std::fmt;

use anyhow::Context;
use http::Method;
use realtime::{Config, HttpRequest, Identity, Result};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;

use crate::fleet::id_string;
use crate::request;

/// Signs in and returns the resulting session.
///
/// # Errors
///
/// Returns [`realtime::Error::Unauthorized`] when the credentials are rejected,
/// or another error when the backend cannot be reached.
pub async fn login<P>(credentials: &Credentials, provider: &P) -> Result<Session>
where
    P: Config + HttpRequest + Identity,
{
    let body = request::send(Method::POST, "/auth/login", credentials, provider).await?;
    let response: LoginResponse =
        serde_json::from_slice(&body).context("deserializing login response")?;

    let session = Session { token: response.token, role: Role::from(response.role.as_str()) };
    info!(role = %session.role, "signed in");
    Ok(session)
}

/// Creates an account. The new user signs in separately.
///
/// # Errors
///
/// Returns [`realtime::Error::BadRequest`] when the backend rejects the
/// registration, for example for an email already in use.
pub async fn register<P>(registration: &Registration, provider: &P) -> Result<()>
where
    P: Config + HttpRequest + Identity,
{
    request::send(Method::POST, "/auth/register", registration, provider).await?;
    info!(role = %registration.role, "account registered");
    Ok(())
}

/// Lists every registered account.
///
/// # Errors
///
/// Returns [`realtime::Error::Unauthorized`] for a non-admin session, or
/// another error when the backend cannot be reached.
pub async fn users<P>(provider: &P) -> Result<Vec<User>>
where
    P: Config + HttpRequest + Identity,
{
    request::get("/auth/users", provider).await
}

/// Saves the name, email and role of an existing account.
///
/// # Errors
///
/// Returns [`realtime::Error::NotFound`] for an unknown account and
/// [`realtime::Error::BadRequest`] when the backend rejects the change.
pub async fn update_user<P>(user: &User, provider: &P) -> Result<()>
where
    P: Config + HttpRequest + Identity,
{
    request::send(Method::PUT, &format!("/auth/users/{}", user.id), user, provider).await?;
    info!(user_id = %user.id, role = %user.role, "account updated");
    Ok(())
}

/// Removes an account.
///
/// # Errors
///
/// Returns [`realtime::Error::NotFound`] for an unknown account.
pub async fn delete_user<P>(user_id: &str, provider: &P) -> Result<()>
where
    P: Config + HttpRequest + Identity,
{
    request::delete(&format!("/auth/users/{user_id}"), provider).await?;
    info!(user_id, "account deleted");
    Ok(())
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials").field("email", &self.email).finish_non_exhaustive()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// A registered account as listed to admins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, deserialize_with = "role_name")]
    pub role: Role,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
    role: String,
}

/// Bearer token and role of a signed-in user.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub role: Role,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").field("role", &self.role).finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Driver,
    #[default]
    User,
}

impl Role {
    /// Landing view for the role.
    #[must_use]
    pub const fn home(self) -> &'static str {
        match self {
            Self::Admin => "/admin",
            Self::Driver => "/driver",
            Self::User => "/user",
        }
    }
}

// anything other than the two privileged roles is a rider
impl From<&str> for Role {
    fn from(role: &str) -> Self {
        match role {
            "ADMIN" => Self::Admin,
            "DRIVER" => Self::Driver,
            _ => Self::User,
        }
    }
}

fn role_name<'de, D>(deserializer: D) -> std::result::Result<Role, D::Error>
where
    D: Deserializer<'de>,
{
    let role = String::deserialize(deserializer)?;
    Ok(Role::from(role.as_str()))
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Admin => "ADMIN",
            Self::Driver => "DRIVER",
            Self::User => "USER",
        })
    }
}
