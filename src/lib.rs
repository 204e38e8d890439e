//! # BusEye
//!
//! Host wiring for live bus tracking. [`Provider`] talks to the backend over
//! HTTP and reads positions from a [`GeoFeed`]; [`Dashboard`] opens the view
//! matching the signed-in user's role.

mod config;
mod geolocation;
mod provider;

use std::sync::Arc;

pub use common::{Credentials, Role, Session, User};
pub use tracking::{DriverConsole, FleetView, TrackingConfig};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

pub use crate::geolocation::GeoFeed;
pub use crate::provider::Provider;

/// Install a `fmt` subscriber filtered by `RUST_LOG`, defaulting to `info`.
///
/// Does nothing if a global subscriber is already set.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if tracing_subscriber::registry().with(filter).with(fmt::layer()).try_init().is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// The screen a signed-in user lands on.
pub enum Dashboard {
    Admin(FleetView<Provider>),
    Driver(DriverConsole<Provider>),
    Rider(FleetView<Provider>),
}

impl Dashboard {
    /// Open the dashboard for `role`.
    #[must_use]
    pub fn open(role: Role, provider: Arc<Provider>, config: &TrackingConfig) -> Self {
        match role {
            Role::Admin => Self::Admin(FleetView::admin(provider, config)),
            Role::Driver => Self::Driver(DriverConsole::new(provider, config)),
            Role::User => Self::Rider(FleetView::rider(provider, config)),
        }
    }

    /// Route the dashboard is served under.
    #[must_use]
    pub const fn path(&self) -> &'static str {
        self.role().home()
    }

    #[must_use]
    pub const fn role(&self) -> Role {
        match self {
            Self::Admin(_) => Role::Admin,
            Self::Driver(_) => Role::Driver,
            Self::Rider(_) => Role::User,
        }
    }
}
