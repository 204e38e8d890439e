//! # Markers
//!
//! Projects bus records onto the pins drawn by the map widget. Projection is
//! pure: the same buses and focus always yield the same markers, in input
//! order.

use common::{Bus, Coordinate};
use serde::{Deserialize, Serialize};

/// Icon variants understood by the map widget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Icon {
    /// Generic pin, for anything that is not a vehicle.
    #[default]
    Default,
    /// Neutral bus glyph.
    Bus,
    /// Highlighted bus glyph.
    Active,
}

/// Dashboard a projection is rendered for. Only changes popup wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewContext {
    Admin,
    Rider,
}

impl ViewContext {
    fn label(self, bus: &Bus) -> String {
        match self {
            Self::Admin => format!("🚍 Bus: {}", bus.bus_no),
            Self::Rider => format!("Bus: {} ({})", bus.bus_no, bus.route),
        }
    }

    fn focused_label(self, bus: &Bus) -> String {
        match self {
            Self::Admin => format!("🚍 Bus: {} - {}", bus.bus_no, bus.route),
            Self::Rider => self.label(bus),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    #[serde(flatten)]
    pub position: Coordinate,
    #[serde(rename = "type")]
    pub icon: Icon,
    pub popup_text: String,
}

impl Marker {
    /// The driver's own pin.
    #[must_use]
    pub fn own_position(position: Coordinate) -> Self {
        Self { position, icon: Icon::Active, popup_text: "You are here".to_string() }
    }
}

/// Project buses onto map markers.
///
/// With a focus, at most the focused bus is drawn, and only if it has a
/// position. Otherwise every bus with a position is drawn; buses that have
/// never broadcast are left off the map.
#[must_use]
pub fn project(buses: &[Bus], focus: Option<&Bus>, context: ViewContext) -> Vec<Marker> {
    if let Some(bus) = focus {
        return bus
            .coordinate()
            .map(|position| Marker {
                position,
                icon: Icon::Active,
                popup_text: context.focused_label(bus),
            })
            .into_iter()
            .collect();
    }

    buses
        .iter()
        .filter_map(|bus| {
            let position = bus.coordinate()?;
            Some(Marker { position, icon: Icon::Active, popup_text: context.label(bus) })
        })
        .collect()
}
