use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced to the person operating a dashboard.
#[derive(Error, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Error {
    #[error("code: tracking_active, description: stop tracking before changing bus")]
    TrackingActive,

    #[error("code: geolocation_unavailable, description: {0}")]
    GeolocationUnavailable(String),

    #[error("code: no_position, description: bus {0} is not currently sharing location")]
    NoPosition(String),

    #[error("code: not_found, description: {0}")]
    NotFound(String),

    #[error("code: forbidden, description: {0}")]
    Forbidden(String),

    #[error("code: server_error, description: {0}")]
    ServerError(String),
}

impl Error {
    /// Returns the error code.
    #[must_use]
    pub const fn code(&self) -> &str {
        match self {
            Self::TrackingActive => "tracking_active",
            Self::GeolocationUnavailable(_) => "geolocation_unavailable",
            Self::NoPosition(_) => "no_position",
            Self::NotFound(_) => "not_found",
            Self::Forbidden(_) => "forbidden",
            Self::ServerError(_) => "server_error",
        }
    }

    /// Returns the error description.
    #[must_use]
    pub fn description(&self) -> String {
        self.to_string()
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<Self>() {
            Some(Self::TrackingActive) => Self::TrackingActive,
            Some(Self::GeolocationUnavailable(e)) => {
                Self::GeolocationUnavailable(format!("{err}: {e}"))
            }
            Some(Self::NoPosition(e)) => Self::NoPosition(e.clone()),
            Some(Self::NotFound(e)) => Self::NotFound(format!("{err}: {e}")),
            Some(Self::Forbidden(e)) => Self::Forbidden(format!("{err}: {e}")),
            Some(Self::ServerError(e)) => Self::ServerError(format!("{err}: {e}")),
            None => {
                let stack = err.chain().fold(String::new(), |cause, e| format!("{cause} -> {e}"));
                let stack = stack.trim_start_matches(" -> ").to_string();
                Self::ServerError(stack)
            }
        }
    }
}

impl From<realtime::Error> for Error {
    fn from(err: realtime::Error) -> Self {
        match err {
            realtime::Error::NotFound(e) => Self::NotFound(e),
            realtime::Error::Unauthorized(e) => Self::Forbidden(e),
            _ => Self::ServerError(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
