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

//! Geographic value types shared across the pipeline.

/// A point on the earth in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A point on the viewport in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

impl ScreenPoint {
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Geographic rectangle in north/south/east/west degree bounds.
///
/// Used both as a viewport extent and a spatial filter. `north > south`
/// always; `west > east` means the box crosses the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BoundingBox {
    #[must_use]
    pub const fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self {
            north,
            south,
            east,
            west,
        }
    }

    /// Pure membership test. Points on the boundary are inside.
    #[must_use]
    pub fn contains(&self, location: Location) -> bool {
        if location.latitude < self.south || location.latitude > self.north {
            return false;
        }

        if self.west <= self.east {
            location.longitude >= self.west && location.longitude <= self.east
        } else {
            // Box wraps at the antimeridian
            location.longitude >= self.west || location.longitude <= self.east
        }
    }

    /// Center of the box, following the wrap when west > east.
    #[must_use]
    pub fn center(&self) -> Location {
        let latitude = (self.north + self.south) / 2.0;
        let longitude = if self.west <= self.east {
            (self.west + self.east) / 2.0
        } else {
            let mid = (self.west + self.east + 360.0) / 2.0;
            if mid > 180.0 {
                mid - 360.0
            } else {
                mid
            }
        };
        Location::new(latitude, longitude)
    }
}

/// The extent the projection maps into: geographic bounds plus the pixel
/// size of the drawing area and the map zoom level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub bounds: BoundingBox,
    pub width_px: f32,
    pub height_px: f32,
    pub zoom: u8,
}
