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

//! Airspace catalogue access and spatial queries.

use std::str::FromStr;

use crate::geo::{BoundingBox, Location};

/// Airspace classification, used for palette lookup and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AirspaceCategory {
    Controlled,
    Restricted,
    Danger,
    Prohibited,
    TemporaryReserved,
    Other,
}

impl FromStr for AirspaceCategory {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value.to_ascii_lowercase().as_str() {
            "controlled" => Self::Controlled,
            "restricted" => Self::Restricted,
            "danger" => Self::Danger,
            "prohibited" => Self::Prohibited,
            "temporary_reserved" | "tra" | "tsa" => Self::TemporaryReserved,
            _ => Self::Other,
        })
    }
}

/// One airspace from the static catalogue.
#[derive(Debug, Clone)]
pub struct Airspace {
    pub id: String,
    pub name: String,
    pub category: AirspaceCategory,
    /// Polygon vertices, in catalogue order. Not closed; the last vertex
    /// connects back to the first when drawn.
    pub geometry: Vec<Location>,
}

/// Static airspace store collaborator. The query service only reads.
pub trait AirspaceCatalog {
    /// All airspaces, in catalogue order.
    fn list_all(&self) -> Vec<Airspace>;
}

impl<T: AirspaceCatalog + ?Sized> AirspaceCatalog for std::sync::Arc<T> {
    fn list_all(&self) -> Vec<Airspace> {
        (**self).list_all()
    }
}

/// Catalogue held fully in memory, loaded by an external reader.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAirspaceCatalog {
    airspaces: Vec<Airspace>,
}

impl InMemoryAirspaceCatalog {
    #[must_use]
    pub fn new(airspaces: Vec<Airspace>) -> Self {
        Self { airspaces }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.airspaces.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.airspaces.is_empty()
    }
}

impl AirspaceCatalog for InMemoryAirspaceCatalog {
    fn list_all(&self) -> Vec<Airspace> {
        self.airspaces.clone()
    }
}

/// Spatial query over the airspace catalogue.
#[derive(Debug)]
pub struct AirspaceQuery<C> {
    catalog: C,
}

impl<C: AirspaceCatalog> AirspaceQuery<C> {
    #[must_use]
    pub fn new(catalog: C) -> Self {
        Self { catalog }
    }

    /// All airspaces with at least one vertex inside the box, in catalogue
    /// order, each at most once.
    ///
    /// The membership test is vertex-level: a polygon whose edges cross the
    /// box but whose vertices all lie outside does not match. Downstream
    /// consumers rely on this filtering, so it must not be widened to full
    /// polygon/rectangle intersection.
    #[must_use]
    pub fn all_in_bounding_box(&self, bbox: &BoundingBox) -> Vec<Airspace> {
        self.catalog
            .list_all()
            .into_iter()
            .filter(|airspace| {
                airspace
                    .geometry
                    .iter()
                    .any(|vertex| bbox.contains(*vertex))
            })
            .collect()
    }
}
