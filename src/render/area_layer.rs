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

//! Monitored-area rectangle layer.
//!
//! The on-screen corners are recomputed only when the projection signals
//! a viewport change; `draw` rasterizes the cached corners, keeping the
//! per-frame cost independent of recomputation cost.

use crate::geo::{BoundingBox, Location, ScreenPoint, Viewport};
use crate::render::background::BackgroundLayer;
use crate::render::{Color, DrawSurface, Projection};

const STROKE_WIDTH: f32 = 2.0;

/// Outline of the monitored geographic rectangle.
#[derive(Debug)]
pub struct MonitoredAreaLayer {
    area: BoundingBox,
    color: Color,
    corners: Option<[ScreenPoint; 4]>,
}

impl MonitoredAreaLayer {
    #[must_use]
    pub fn new(area: BoundingBox, color: Color) -> Self {
        Self {
            area,
            color,
            corners: None,
        }
    }

    fn project_corners(&self, projection: &dyn Projection) -> [ScreenPoint; 4] {
        let BoundingBox {
            north,
            south,
            east,
            west,
        } = self.area;
        [
            projection.location_to_viewport_point(Location::new(north, west)),
            projection.location_to_viewport_point(Location::new(north, east)),
            projection.location_to_viewport_point(Location::new(south, east)),
            projection.location_to_viewport_point(Location::new(south, west)),
        ]
    }
}

impl BackgroundLayer for MonitoredAreaLayer {
    fn label(&self) -> &'static str {
        "monitored-area"
    }

    fn draw(
        &mut self,
        surface: &mut dyn DrawSurface,
        _projection: &dyn Projection,
        _viewport: &Viewport,
    ) {
        // Only rasterizes cached corners; recomputation happens in
        // viewport_changed
        if let Some(corners) = self.corners {
            surface.draw_polygon(&corners, STROKE_WIDTH, self.color, None);
        }
    }

    fn viewport_changed(&mut self, projection: &dyn Projection, _viewport: &Viewport) {
        self.corners = Some(self.project_corners(projection));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ScaledProjection {
        scale: f32,
    }

    impl Projection for ScaledProjection {
        #[allow(clippy::cast_possible_truncation)]
        fn location_to_viewport_point(&self, location: Location) -> ScreenPoint {
            ScreenPoint::new(
                location.longitude as f32 * self.scale,
                location.latitude as f32 * self.scale,
            )
        }
    }

    #[derive(Default)]
    struct PolygonCapture {
        polygons: Vec<Vec<ScreenPoint>>,
    }

    impl DrawSurface for PolygonCapture {
        fn draw_polyline(&mut self, _points: &[ScreenPoint], _width: f32, _color: Color) {}

        fn draw_polygon(
            &mut self,
            points: &[ScreenPoint],
            _stroke_width: f32,
            _stroke: Color,
            _fill: Option<Color>,
        ) {
            self.polygons.push(points.to_vec());
        }

        fn draw_circle(&mut self, _center: ScreenPoint, _radius: f32, _color: Color) {}

        fn draw_image(
            &mut self,
            _image: &image::RgbaImage,
            _top_left: ScreenPoint,
            _size: (f32, f32),
            _opacity: f32,
        ) {
        }

        fn draw_text(&mut self, _anchor: ScreenPoint, _text: &str, _color: Color) {}
    }

    fn viewport() -> Viewport {
        Viewport {
            bounds: BoundingBox::new(51.0, 48.0, 19.0, 12.0),
            width_px: 800.0,
            height_px: 600.0,
            zoom: 7,
        }
    }

    fn layer() -> MonitoredAreaLayer {
        MonitoredAreaLayer::new(
            BoundingBox::new(50.0, 49.0, 15.0, 14.0),
            Color::rgb(255, 255, 120),
        )
    }

    #[test]
    fn test_draws_nothing_before_first_viewport_change() {
        let mut layer = layer();
        let mut surface = PolygonCapture::default();

        layer.draw(&mut surface, &ScaledProjection { scale: 1.0 }, &viewport());
        assert!(surface.polygons.is_empty());
    }

    #[test]
    fn test_corners_cached_across_draws() {
        let mut layer = layer();
        let mut surface = PolygonCapture::default();

        layer.viewport_changed(&ScaledProjection { scale: 1.0 }, &viewport());
        layer.draw(&mut surface, &ScaledProjection { scale: 1.0 }, &viewport());

        // A different projection at draw time must not change the corners:
        // draw never recomputes
        layer.draw(&mut surface, &ScaledProjection { scale: 2.0 }, &viewport());

        assert_eq!(surface.polygons.len(), 2);
        assert_eq!(surface.polygons[0], surface.polygons[1]);
        assert_eq!(surface.polygons[0][0], ScreenPoint::new(14.0, 50.0));
    }

    #[test]
    fn test_viewport_change_recomputes_corners() {
        let mut layer = layer();
        let mut surface = PolygonCapture::default();

        layer.viewport_changed(&ScaledProjection { scale: 1.0 }, &viewport());
        layer.draw(&mut surface, &ScaledProjection { scale: 1.0 }, &viewport());

        layer.viewport_changed(&ScaledProjection { scale: 2.0 }, &viewport());
        layer.draw(&mut surface, &ScaledProjection { scale: 1.0 }, &viewport());

        assert_eq!(surface.polygons[1][0], ScreenPoint::new(28.0, 100.0));
    }
}
