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

//! Airport catalogue loading and spatial filtering.
//!
//! Airports come from an OurAirports-style CSV export. Loading happens once
//! at startup (the airport layer awaits it); afterwards the catalogue is a
//! read-only in-memory list.

use std::io::Read;
use std::path::Path;

use log::info;
use serde::Deserialize;
use thiserror::Error;

use crate::geo::{BoundingBox, Location};

/// Airport record from the catalogue CSV.
#[derive(Debug, Clone, Deserialize)]
pub struct Airport {
    #[serde(rename = "ident")]
    pub icao: String,

    #[serde(rename = "type")]
    pub airport_type: String,

    #[serde(rename = "name")]
    pub name: String,

    #[serde(rename = "latitude_deg")]
    pub latitude: f64,

    #[serde(rename = "longitude_deg")]
    pub longitude: f64,

    #[serde(rename = "scheduled_service")]
    pub scheduled_service: String,
}

impl Airport {
    #[must_use]
    pub fn location(&self) -> Location {
        Location::new(self.latitude, self.longitude)
    }

    /// Large airports get rendering priority.
    #[must_use]
    pub fn is_major(&self) -> bool {
        self.airport_type == "large_airport"
    }

    #[must_use]
    pub fn is_medium(&self) -> bool {
        self.airport_type == "medium_airport"
    }

    /// Check if this airport has scheduled commercial airline service
    #[must_use]
    pub fn has_scheduled_service(&self) -> bool {
        self.scheduled_service == "yes"
    }

    /// Check if this is a frequently-used public airport
    /// (has scheduled service OR is a large/medium airport)
    #[must_use]
    pub fn is_frequently_used(&self) -> bool {
        self.has_scheduled_service() || self.is_major() || self.is_medium()
    }

    /// Get rendering radius based on airport type
    #[must_use]
    pub fn render_radius(&self) -> f32 {
        match self.airport_type.as_str() {
            "large_airport" => 6.0,
            "medium_airport" => 4.0,
            "small_airport" => 3.0,
            _ => 2.0,
        }
    }
}

/// Airport catalogue load failure.
#[derive(Debug, Error)]
pub enum AirportLoadError {
    #[error("failed to open airport catalogue {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse airport catalogue record: {0}")]
    Parse(#[from] csv::Error),
}

/// In-memory airport catalogue.
#[derive(Debug, Clone, Default)]
pub struct AirportCatalog {
    airports: Vec<Airport>,
}

impl AirportCatalog {
    /// Load the catalogue from a CSV file.
    pub fn load_csv(path: &Path) -> Result<Self, AirportLoadError> {
        let file = std::fs::File::open(path).map_err(|e| AirportLoadError::Open {
            path: path.display().to_string(),
            source: e,
        })?;
        let catalog = Self::from_reader(file)?;
        info!(
            "Loaded {} airports from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Load the catalogue from any CSV reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, AirportLoadError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut airports = Vec::new();
        for record in csv_reader.deserialize() {
            let airport: Airport = record?;
            airports.push(airport);
        }
        Ok(Self { airports })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.airports.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.airports.is_empty()
    }

    #[must_use]
    pub fn all(&self) -> &[Airport] {
        &self.airports
    }

    /// Airports located inside the box, in catalogue order.
    #[must_use]
    pub fn all_in_bounding_box(&self, bbox: &BoundingBox) -> Vec<&Airport> {
        self.airports
            .iter()
            .filter(|airport| bbox.contains(airport.location()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CSV: &str = "\
ident,type,name,latitude_deg,longitude_deg,scheduled_service
LKPR,large_airport,Vaclav Havel Airport Prague,50.1008,14.26,yes
LKKB,medium_airport,Kbely Air Base,50.1214,14.5436,no
LKBE,small_airport,Benesov,49.7409,14.6447,no
";

    #[test]
    fn test_from_reader() {
        let catalog = AirportCatalog::from_reader(SAMPLE_CSV.as_bytes()).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.all()[0].icao, "LKPR");
        assert!(catalog.all()[0].is_major());
        assert!(catalog.all()[0].has_scheduled_service());
        assert!(!catalog.all()[2].is_frequently_used());
    }

    #[test]
    fn test_bounding_box_filter() {
        let catalog = AirportCatalog::from_reader(SAMPLE_CSV.as_bytes()).unwrap();
        let bbox = BoundingBox::new(50.5, 50.0, 15.0, 14.0);

        let hits = catalog.all_in_bounding_box(&bbox);
        let idents: Vec<_> = hits.iter().map(|a| a.icao.as_str()).collect();
        assert_eq!(idents, ["LKPR", "LKKB"]);
    }

    #[test]
    fn test_render_radius_by_type() {
        let catalog = AirportCatalog::from_reader(SAMPLE_CSV.as_bytes()).unwrap();
        let radii: Vec<_> = catalog.all().iter().map(Airport::render_radius).collect();
        assert_eq!(radii, [6.0, 4.0, 3.0]);
    }
}
