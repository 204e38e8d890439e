//! # Common
//!
//! Backend REST contract shared by the driver and viewer sides: the bus
//! registry and session handling.

pub mod auth;
pub mod fleet;
mod request;

pub use auth::{Credentials, Registration, Role, Session, User};
pub use fleet::{Bus, Coordinate, LocationUpdate, NewBus};
