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

//! Airspace polygon background layer.

use std::sync::Arc;

use crate::airspace::{AirspaceCatalog, AirspaceQuery};
use crate::geo::Viewport;
use crate::render::background::BackgroundLayer;
use crate::render::{DrawSurface, LayerPalette, Projection};

const STROKE_WIDTH: f32 = 1.5;
const FILL_ALPHA: u8 = 40;

type SharedCatalog = Arc<dyn AirspaceCatalog + Send + Sync>;

/// Draws every catalogued airspace visible in the viewport, colored by
/// category.
pub struct AirspaceLayer {
    query: AirspaceQuery<SharedCatalog>,
    palette: LayerPalette,
}

impl std::fmt::Debug for AirspaceLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AirspaceLayer").finish_non_exhaustive()
    }
}

impl AirspaceLayer {
    #[must_use]
    pub fn new(catalog: SharedCatalog, palette: LayerPalette) -> Self {
        Self {
            query: AirspaceQuery::new(catalog),
            palette,
        }
    }
}

impl BackgroundLayer for AirspaceLayer {
    fn label(&self) -> &'static str {
        "airspace"
    }

    fn draw(
        &mut self,
        surface: &mut dyn DrawSurface,
        projection: &dyn Projection,
        viewport: &Viewport,
    ) {
        for airspace in self.query.all_in_bounding_box(&viewport.bounds) {
            let points: Vec<_> = airspace
                .geometry
                .iter()
                .map(|&vertex| projection.location_to_viewport_point(vertex))
                .collect();
            if points.len() < 2 {
                continue;
            }

            let stroke = self.palette.airspace_color(airspace.category);
            surface.draw_polygon(
                &points,
                STROKE_WIDTH,
                stroke,
                Some(stroke.with_alpha(FILL_ALPHA)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::airspace::{Airspace, AirspaceCategory, InMemoryAirspaceCatalog};
    use crate::geo::{BoundingBox, Location, ScreenPoint};
    use crate::render::Color;

    struct IdentityProjection;

    impl Projection for IdentityProjection {
        #[allow(clippy::cast_possible_truncation)]
        fn location_to_viewport_point(&self, location: Location) -> ScreenPoint {
            ScreenPoint::new(location.longitude as f32, location.latitude as f32)
        }
    }

    #[derive(Default)]
    struct PolygonCapture {
        polygons: Vec<(usize, Color)>,
    }

    impl DrawSurface for PolygonCapture {
        fn draw_polyline(&mut self, _points: &[ScreenPoint], _width: f32, _color: Color) {}

        fn draw_polygon(
            &mut self,
            points: &[ScreenPoint],
            _stroke_width: f32,
            stroke: Color,
            _fill: Option<Color>,
        ) {
            self.polygons.push((points.len(), stroke));
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

    #[test]
    fn test_draws_only_airspaces_in_view() {
        let catalog: SharedCatalog = Arc::new(InMemoryAirspaceCatalog::new(vec![
            Airspace {
                id: "TMA1".to_owned(),
                name: "TMA1".to_owned(),
                category: AirspaceCategory::Danger,
                geometry: vec![
                    Location::new(50.0, 14.0),
                    Location::new(50.2, 14.2),
                    Location::new(49.9, 14.4),
                ],
            },
            Airspace {
                id: "FAR".to_owned(),
                name: "FAR".to_owned(),
                category: AirspaceCategory::Controlled,
                geometry: vec![Location::new(0.0, 0.0), Location::new(0.1, 0.1)],
            },
        ]));

        let mut layer = AirspaceLayer::new(catalog, LayerPalette::default());
        let mut surface = PolygonCapture::default();
        let viewport = Viewport {
            bounds: BoundingBox::new(51.0, 48.0, 19.0, 12.0),
            width_px: 800.0,
            height_px: 600.0,
            zoom: 7,
        };

        layer.draw(&mut surface, &IdentityProjection, &viewport);

        assert_eq!(surface.polygons.len(), 1);
        let (vertex_count, stroke) = surface.polygons[0];
        assert_eq!(vertex_count, 3);
        assert_eq!(
            stroke,
            LayerPalette::default().airspace_color(AirspaceCategory::Danger)
        );
    }
}
