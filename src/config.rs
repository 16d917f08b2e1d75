// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Application configuration management.
//!
//! Persistent configuration stored in TOML format. Every field has a
//! serde default so a partial config file loads cleanly.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::airspace::{Airspace, AirspaceCategory, InMemoryAirspaceCatalog};
use crate::geo::{BoundingBox, Location};
use crate::weather::PrecipitationConfig;

/// Default UDP port for the highlight/airspace feed
pub const DEFAULT_FEED_PORT: u16 = 52000;

/// Geographic rectangle as stored in the config file.
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct AreaBounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl AreaBounds {
    #[must_use]
    pub fn to_bounding_box(self) -> BoundingBox {
        BoundingBox::new(self.north, self.south, self.east, self.west)
    }
}

/// One airspace defined in the config file.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AirspaceEntry {
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// Category name; unknown values fall back to Other
    #[serde(default)]
    pub category: String,

    /// Polygon vertices as [latitude, longitude] pairs
    pub vertices: Vec<[f64; 2]>,
}

impl AirspaceEntry {
    fn to_airspace(&self) -> Airspace {
        Airspace {
            id: self.id.clone(),
            name: if self.name.is_empty() {
                self.id.clone()
            } else {
                self.name.clone()
            },
            category: self.category.parse().unwrap_or(AirspaceCategory::Other),
            geometry: self
                .vertices
                .iter()
                .map(|&[lat, lon]| Location::new(lat, lon))
                .collect(),
        }
    }
}

/// Precipitation radar service settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PrecipitationSettings {
    /// Endpoint answering HEAD with the last-updated header
    #[serde(default = "default_status_url")]
    pub status_url: String,

    /// Image URL with a {timestamp} placeholder
    #[serde(default = "default_image_url")]
    pub image_url: String,

    /// Response header carrying the last-updated timestamp
    #[serde(default = "default_timestamp_header")]
    pub timestamp_header: String,

    /// chrono format of the timestamp
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Poll interval in seconds
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Local image path; unset means the default cache location
    #[serde(default)]
    pub image_path: Option<PathBuf>,

    /// Geographic extent the radar composite covers
    #[serde(default = "default_coverage")]
    pub coverage: AreaBounds,

    /// Overlay opacity (0.0 - 1.0)
    #[serde(default = "default_overlay_opacity")]
    pub opacity: f32,
}

impl Default for PrecipitationSettings {
    fn default() -> Self {
        Self {
            status_url: default_status_url(),
            image_url: default_image_url(),
            timestamp_header: default_timestamp_header(),
            timestamp_format: default_timestamp_format(),
            request_timeout_secs: default_request_timeout_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            image_path: None,
            coverage: default_coverage(),
            opacity: default_overlay_opacity(),
        }
    }
}

impl PrecipitationSettings {
    /// Resolve into the service configuration.
    #[must_use]
    pub fn to_service_config(&self) -> PrecipitationConfig {
        let image_path = self.image_path.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from(".cache"))
                .join("radarscope")
                .join("precipitation.png")
        });

        PrecipitationConfig {
            status_url: self.status_url.clone(),
            image_url: self.image_url.clone(),
            timestamp_header: self.timestamp_header.clone(),
            timestamp_format: self.timestamp_format.clone(),
            image_path,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    /// Configuration schema version for migrations
    #[serde(default = "default_config_version")]
    pub config_version: u32,

    /// UDP port of the highlight/airspace feed
    #[serde(default = "default_feed_port")]
    pub feed_port: u16,

    /// Precipitation radar service settings
    #[serde(default)]
    pub precipitation: PrecipitationSettings,

    /// Monitored area drawn as a rectangle over the map
    #[serde(default = "default_monitored_area")]
    pub monitored_area: AreaBounds,

    /// Default viewport extent
    #[serde(default = "default_viewport_bounds")]
    pub viewport_bounds: AreaBounds,

    /// Default map zoom level
    #[serde(default = "default_zoom")]
    pub zoom: u8,

    /// Airport catalogue CSV path
    #[serde(default = "default_airports_csv")]
    pub airports_csv: PathBuf,

    /// Airport filter mode: "All", "FrequentlyUsed", or "MajorOnly"
    #[serde(default = "default_airport_filter")]
    pub airport_filter: String,

    /// Airspaces drawn by the airspace layer
    #[serde(default)]
    pub airspaces: Vec<AirspaceEntry>,

    /// Layer color overrides, category -> [r, g, b, a]
    #[serde(default)]
    pub palette: HashMap<String, [u8; 4]>,

    /// Trail point ages in seconds, relative to sampling time
    #[serde(default = "default_trail_offsets")]
    pub trail_offsets_secs: Vec<i64>,
}

// Default value functions for serde
fn default_config_version() -> u32 {
    1
}

fn default_feed_port() -> u16 {
    DEFAULT_FEED_PORT
}

fn default_status_url() -> String {
    "http://localhost:8080/radar/status".to_string()
}

fn default_image_url() -> String {
    "http://localhost:8080/radar/{timestamp}.png".to_string()
}

fn default_timestamp_header() -> String {
    "x-last-updated".to_string()
}

fn default_timestamp_format() -> String {
    "%Y%m%d%H%M".to_string()
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_poll_interval_secs() -> u64 {
    120
}

fn default_overlay_opacity() -> f32 {
    0.6
}

fn default_coverage() -> AreaBounds {
    AreaBounds {
        north: 52.5,
        south: 47.0,
        east: 20.0,
        west: 11.0,
    }
}

fn default_monitored_area() -> AreaBounds {
    AreaBounds {
        north: 50.7,
        south: 49.9,
        east: 15.2,
        west: 13.8,
    }
}

fn default_viewport_bounds() -> AreaBounds {
    AreaBounds {
        north: 51.5,
        south: 48.3,
        east: 19.0,
        west: 11.5,
    }
}

fn default_zoom() -> u8 {
    7
}

fn default_airports_csv() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("radarscope")
        .join("airports.csv")
}

fn default_airport_filter() -> String {
    "FrequentlyUsed".to_string()
}

fn default_trail_offsets() -> Vec<i64> {
    vec![30, 60, 90, 120]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            feed_port: default_feed_port(),
            precipitation: PrecipitationSettings::default(),
            monitored_area: default_monitored_area(),
            viewport_bounds: default_viewport_bounds(),
            zoom: default_zoom(),
            airports_csv: default_airports_csv(),
            airport_filter: default_airport_filter(),
            airspaces: Vec::new(),
            palette: HashMap::new(),
            trail_offsets_secs: default_trail_offsets(),
        }
    }
}

impl AppConfig {
    /// Load configuration from disk
    pub fn load() -> Result<Self, confy::ConfyError> {
        confy::load("radarscope", "config")
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), confy::ConfyError> {
        confy::store("radarscope", "config", self)
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<std::path::PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path("radarscope", "config")
    }

    /// Build the airspace catalogue from the configured entries.
    #[must_use]
    pub fn airspace_catalog(&self) -> InMemoryAirspaceCatalog {
        InMemoryAirspaceCatalog::new(
            self.airspaces
                .iter()
                .map(AirspaceEntry::to_airspace)
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::airspace::AirspaceCatalog;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"feed_port": 49999}"#).unwrap();
        assert_eq!(config.feed_port, 49999);
        assert_eq!(config.zoom, default_zoom());
        assert_eq!(
            config.precipitation.timestamp_format,
            default_timestamp_format()
        );
    }

    #[test]
    fn test_airspace_entries_to_catalog() {
        let config: AppConfig = serde_json::from_str(
            r#"{
                "airspaces": [{
                    "id": "R22",
                    "category": "restricted",
                    "vertices": [[50.0, 14.0], [50.1, 14.1], [50.0, 14.2]]
                }]
            }"#,
        )
        .unwrap();

        let catalog = config.airspace_catalog();
        assert_eq!(catalog.len(), 1);
        let airspace = &catalog.list_all()[0];
        assert_eq!(airspace.name, "R22");
        assert_eq!(airspace.category, AirspaceCategory::Restricted);
        assert_eq!(airspace.geometry.len(), 3);
    }
}
