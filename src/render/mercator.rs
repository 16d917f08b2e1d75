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

//! Web Mercator math for tile addressing and the concrete projection.

use crate::geo::{Location, ScreenPoint, Viewport};
use crate::render::Projection;

/// Web Mercator projection utilities
#[derive(Debug)]
pub struct WebMercator;

impl WebMercator {
    /// Convert latitude to Web Mercator Y coordinate in tile units
    #[must_use]
    pub fn lat_to_y(lat: f64, zoom: u8) -> f64 {
        let lat_rad = lat.to_radians();
        let n = 2_f64.powi(i32::from(zoom));
        let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / std::f64::consts::PI) / 2.0;
        y * n
    }

    /// Convert longitude to Web Mercator X coordinate in tile units
    #[must_use]
    pub fn lon_to_x(lon: f64, zoom: u8) -> f64 {
        let n = 2_f64.powi(i32::from(zoom));
        ((lon + 180.0) / 360.0) * n
    }

    /// Convert tile coordinates back to latitude
    #[must_use]
    pub fn tile_to_lat(y: f64, zoom: u8) -> f64 {
        let n = 2_f64.powi(i32::from(zoom));
        let lat_rad = ((std::f64::consts::PI * (1.0 - 2.0 * y / n)).sinh()).atan();
        lat_rad.to_degrees()
    }

    /// Convert tile coordinates back to longitude
    #[must_use]
    pub fn tile_to_lon(x: f64, zoom: u8) -> f64 {
        let n = 2_f64.powi(i32::from(zoom));
        x / n * 360.0 - 180.0
    }
}

/// Projection mapping the viewport's geographic bounds onto its pixel
/// rectangle, linear in Mercator space.
#[derive(Debug, Clone, Copy)]
pub struct MapProjection {
    zoom: u8,
    origin_x: f64,
    origin_y: f64,
    scale_x: f64,
    scale_y: f64,
    wraps: bool,
}

impl MapProjection {
    #[must_use]
    pub fn new(viewport: &Viewport) -> Self {
        let bounds = viewport.bounds;
        let zoom = viewport.zoom;
        let n = 2_f64.powi(i32::from(zoom));

        let origin_x = WebMercator::lon_to_x(bounds.west, zoom);
        let origin_y = WebMercator::lat_to_y(bounds.north, zoom);
        let wraps = bounds.west > bounds.east;
        let mut east_x = WebMercator::lon_to_x(bounds.east, zoom);
        if wraps {
            east_x += n;
        }
        let south_y = WebMercator::lat_to_y(bounds.south, zoom);

        Self {
            zoom,
            origin_x,
            origin_y,
            scale_x: f64::from(viewport.width_px) / (east_x - origin_x),
            scale_y: f64::from(viewport.height_px) / (south_y - origin_y),
            wraps,
        }
    }
}

impl Projection for MapProjection {
    #[allow(clippy::cast_possible_truncation)]
    fn location_to_viewport_point(&self, location: Location) -> ScreenPoint {
        let mut x = WebMercator::lon_to_x(location.longitude, self.zoom);
        if self.wraps && x < self.origin_x {
            x += 2_f64.powi(i32::from(self.zoom));
        }
        let y = WebMercator::lat_to_y(location.latitude, self.zoom);

        ScreenPoint::new(
            ((x - self.origin_x) * self.scale_x) as f32,
            ((y - self.origin_y) * self.scale_y) as f32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::BoundingBox;

    fn viewport() -> Viewport {
        Viewport {
            bounds: BoundingBox::new(51.0, 48.0, 19.0, 12.0),
            width_px: 800.0,
            height_px: 600.0,
            zoom: 7,
        }
    }

    #[test]
    fn test_round_trip_tile_math() {
        let lat = 50.1;
        let lon = 14.3;
        let y = WebMercator::lat_to_y(lat, 8);
        let x = WebMercator::lon_to_x(lon, 8);
        assert!((WebMercator::tile_to_lat(y, 8) - lat).abs() < 1e-9);
        assert!((WebMercator::tile_to_lon(x, 8) - lon).abs() < 1e-9);
    }

    #[test]
    fn test_projection_corners() {
        let viewport = viewport();
        let projection = MapProjection::new(&viewport);

        let nw = projection.location_to_viewport_point(Location::new(51.0, 12.0));
        assert!(nw.x.abs() < 1e-3);
        assert!(nw.y.abs() < 1e-3);

        let se = projection.location_to_viewport_point(Location::new(48.0, 19.0));
        assert!((se.x - 800.0).abs() < 1e-3);
        assert!((se.y - 600.0).abs() < 1e-3);
    }

    #[test]
    fn test_projection_interior_point_is_inside() {
        let viewport = viewport();
        let projection = MapProjection::new(&viewport);

        let point = projection.location_to_viewport_point(Location::new(50.0, 15.0));
        assert!(point.x > 0.0 && point.x < 800.0);
        assert!(point.y > 0.0 && point.y < 600.0);
    }

    #[test]
    fn test_projection_across_antimeridian() {
        let viewport = Viewport {
            bounds: BoundingBox::new(10.0, -10.0, -170.0, 170.0),
            width_px: 400.0,
            height_px: 400.0,
            zoom: 4,
        };
        let projection = MapProjection::new(&viewport);

        let west_edge = projection.location_to_viewport_point(Location::new(0.0, 170.0));
        let east_edge = projection.location_to_viewport_point(Location::new(0.0, -170.0));
        assert!(west_edge.x.abs() < 1e-3);
        assert!((east_edge.x - 400.0).abs() < 1e-3);
    }
}
