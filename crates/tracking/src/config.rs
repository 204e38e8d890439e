use std::env;
use std::time::Duration;

use common::Coordinate;
use realtime::WatchOptions;

/// Fallback map centre (India) used before any bus has been located.
pub const DEFAULT_CENTER: Coordinate = Coordinate::new(20.5937, 78.9629);

#[derive(Debug, Clone)]
pub struct TrackingConfig {
    pub poll_interval: Duration,
    pub watch: WatchOptions,
    pub map: MapConfig,
}

impl TrackingConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let poll_interval = Duration::from_millis(env_u64("POLL_INTERVAL_MS", 5_000));
        let watch = WatchOptions {
            high_accuracy: env_bool("GEO_HIGH_ACCURACY", true),
            maximum_age: Duration::from_millis(env_u64("GEO_MAXIMUM_AGE_MS", 0)),
            timeout: Duration::from_millis(env_u64("GEO_TIMEOUT_MS", 10_000)),
        };
        let map = MapConfig::from_env();

        Self { poll_interval, watch, map }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            watch: WatchOptions::default(),
            map: MapConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapConfig {
    /// Zoom applied whenever the view recenters on a focus.
    pub zoom: u8,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub default_center: Coordinate,
}

impl MapConfig {
    fn from_env() -> Self {
        let default_center = Coordinate::new(
            env_f64("DEFAULT_CENTER_LAT", DEFAULT_CENTER.lat),
            env_f64("DEFAULT_CENTER_LNG", DEFAULT_CENTER.lng),
        );

        Self {
            zoom: env_u8("MAP_ZOOM", 15),
            min_zoom: env_u8("MAP_MIN_ZOOM", 3),
            max_zoom: env_u8("MAP_MAX_ZOOM", 19),
            default_center,
        }
        .normalized()
    }

    /// Orders the zoom bounds and pulls `zoom` inside them.
    #[must_use]
    pub const fn normalized(self) -> Self {
        let (min_zoom, max_zoom) = if self.min_zoom <= self.max_zoom {
            (self.min_zoom, self.max_zoom)
        } else {
            (self.max_zoom, self.min_zoom)
        };
        let zoom = if self.zoom < min_zoom {
            min_zoom
        } else if self.zoom > max_zoom {
            max_zoom
        } else {
            self.zoom
        };

        Self { zoom, min_zoom, max_zoom, default_center: self.default_center }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self { zoom: 15, min_zoom: 3, max_zoom: 19, default_center: DEFAULT_CENTER }
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|value| matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key).ok().and_then(|value| value.parse::<f64>().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|value| value.parse::<u64>().ok()).unwrap_or(default)
}

fn env_u8(key: &str, default: u8) -> u8 {
    env::var(key).ok().and_then(|value| value.parse::<u8>().ok()).unwrap_or(default)
}
