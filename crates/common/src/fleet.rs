//! Bus registry: the backend's authoritative list of vehicles and their
//! last-known positions.

use http::Method;
use realtime::{Config, HttpRequest, Identity, Result};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::request;

/// Retrieves every registered bus.
///
/// # Errors
///
/// Returns an error when the bus API request fails or the response cannot be
/// deserialized.
pub async fn buses<P>(provider: &P) -> Result<Vec<Bus>>
where
    P: Config + HttpRequest + Identity,
{
    let buses: Vec<Bus> = request::get("/bus", provider).await?;
    debug!(buses = buses.len(), located = buses.iter().filter(|b| b.is_located()).count());
    Ok(buses)
}

/// Upserts the position of a single bus.
///
/// # Errors
///
/// Returns an error when the backend rejects the update or cannot be reached.
pub async fn update_location<P>(update: &LocationUpdate, provider: &P) -> Result<()>
where
    P: Config + HttpRequest + Identity,
{
    request::send(Method::PUT, "/bus/location", update, provider).await?;
    Ok(())
}

/// Registers a new bus.
///
/// # Errors
///
/// Returns an error when the backend rejects the bus or cannot be reached.
pub async fn create_bus<P>(bus: &NewBus, provider: &P) -> Result<()>
where
    P: Config + HttpRequest + Identity,
{
    request::send(Method::POST, "/bus", bus, provider).await?;
    Ok(())
}

/// A point on the map, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bus {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub bus_no: String,
    #[serde(default)]
    pub route: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl Bus {
    /// Last-known position. Absent until a driver has broadcast at least once.
    #[must_use]
    pub fn coordinate(&self) -> Option<Coordinate> {
        Some(Coordinate::new(self.latitude?, self.longitude?))
    }

    #[must_use]
    pub fn is_located(&self) -> bool {
        self.coordinate().is_some()
    }
}

/// Body of `PUT /bus/location`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationUpdate {
    pub bus_id: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Body of `POST /bus`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBus {
    pub bus_no: String,
    pub route: String,
}

// ids are opaque strings, but some backends hand out integers
pub(crate) fn id_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(id) => id,
        Id::Number(id) => id.to_string(),
    })
}
