//! # Realtime Core
//!
//! Core modules shared by the live tracking crates.

mod error;
mod provider;

pub use crate::error::*;
pub use crate::provider::*;
