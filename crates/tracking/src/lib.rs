//! # Tracking
//!
//! Live-position synchronization between drivers and viewers.
//!
//! Drivers run a [`Publisher`] that forwards each geolocation fix to the
//! backend. Viewers run a [`Poller`] that re-reads the fleet on a fixed timer.
//! The two never talk directly: they meet only in backend state.

pub mod config;
pub mod error;
pub mod markers;
pub mod poller;
pub mod publisher;
pub mod viewport;
pub mod views;

pub use config::{MapConfig, TrackingConfig};
pub use error::*;
pub use markers::{Icon, Marker, ViewContext};
pub use poller::{Poller, Snapshot};
pub use publisher::{Publisher, PublisherState, Status};
pub use realtime::{Config, Fix, Geolocation, HttpRequest, Identity};
pub use viewport::Viewport;
pub use views::{DriverConsole, FleetView};

/// Backend access needed by both sides.
pub trait Backend: Config + HttpRequest + Identity + 'static {}

impl<T> Backend for T where T: Config + HttpRequest + Identity + 'static {}

/// Everything a driver console needs: backend access plus geolocation.
pub trait Provider: Backend + Geolocation {}

impl<T> Provider for T where T: Backend + Geolocation {}
