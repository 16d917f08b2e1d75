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

//! Airport marker background layer.
//!
//! The catalogue load is the one layer initialization the composition
//! manager waits for; until it completes the layer draws nothing.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use crate::airports::AirportCatalog;
use crate::geo::Viewport;
use crate::render::background::{BackgroundLayer, LayerInit};
use crate::render::{DrawSurface, LayerPalette, Projection};

/// Which airports to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AirportFilter {
    All,
    #[default]
    FrequentlyUsed,
    MajorOnly,
}

impl FromStr for AirportFilter {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value.to_ascii_lowercase().as_str() {
            "all" => Self::All,
            "majoronly" | "major_only" => Self::MajorOnly,
            _ => Self::FrequentlyUsed,
        })
    }
}

/// Draws airport markers, radius by airport size, labels for major ones.
pub struct AirportLayer {
    csv_path: PathBuf,
    filter: AirportFilter,
    palette: LayerPalette,
    catalog: Arc<RwLock<Option<AirportCatalog>>>,
}

impl std::fmt::Debug for AirportLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AirportLayer")
            .field("csv_path", &self.csv_path)
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl AirportLayer {
    #[must_use]
    pub fn new(csv_path: PathBuf, filter: AirportFilter, palette: LayerPalette) -> Self {
        Self {
            csv_path,
            filter,
            palette,
            catalog: Arc::new(RwLock::new(None)),
        }
    }

    /// Inject an already-loaded catalogue. The layer is ready immediately.
    #[must_use]
    pub fn with_catalog(
        catalog: AirportCatalog,
        filter: AirportFilter,
        palette: LayerPalette,
    ) -> Self {
        Self {
            csv_path: PathBuf::new(),
            filter,
            palette,
            catalog: Arc::new(RwLock::new(Some(catalog))),
        }
    }

    fn passes_filter(&self, airport: &crate::airports::Airport) -> bool {
        match self.filter {
            AirportFilter::All => true,
            AirportFilter::FrequentlyUsed => airport.is_frequently_used(),
            AirportFilter::MajorOnly => airport.is_major(),
        }
    }
}

impl BackgroundLayer for AirportLayer {
    fn label(&self) -> &'static str {
        "airports"
    }

    fn start_init(&mut self) -> LayerInit {
        if self.catalog.read().is_ok_and(|c| c.is_some()) {
            return LayerInit::Ready;
        }

        let path = self.csv_path.clone();
        let slot = Arc::clone(&self.catalog);
        LayerInit::Pending(tokio::task::spawn_blocking(move || {
            let catalog = AirportCatalog::load_csv(&path)?;
            if let Ok(mut guard) = slot.write() {
                *guard = Some(catalog);
            }
            Ok(())
        }))
    }

    fn draw(
        &mut self,
        surface: &mut dyn DrawSurface,
        projection: &dyn Projection,
        viewport: &Viewport,
    ) {
        let Ok(guard) = self.catalog.read() else {
            return;
        };
        let Some(catalog) = guard.as_ref() else {
            return;
        };

        for airport in catalog.all_in_bounding_box(&viewport.bounds) {
            if !self.passes_filter(airport) {
                continue;
            }

            let center = projection.location_to_viewport_point(airport.location());
            surface.draw_circle(center, airport.render_radius(), self.palette.airport);

            if airport.is_major() {
                surface.draw_text(center, &airport.icao, self.palette.airport_label);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{BoundingBox, Location, ScreenPoint};
    use crate::render::Color;

    const SAMPLE_CSV: &str = "\
ident,type,name,latitude_deg,longitude_deg,scheduled_service
LKPR,large_airport,Vaclav Havel Airport Prague,50.1008,14.26,yes
LKBE,small_airport,Benesov,49.7409,14.6447,no
";

    struct IdentityProjection;

    impl Projection for IdentityProjection {
        #[allow(clippy::cast_possible_truncation)]
        fn location_to_viewport_point(&self, location: Location) -> ScreenPoint {
            ScreenPoint::new(location.longitude as f32, location.latitude as f32)
        }
    }

    #[derive(Default)]
    struct MarkerCapture {
        circles: Vec<f32>,
        labels: Vec<String>,
    }

    impl DrawSurface for MarkerCapture {
        fn draw_polyline(&mut self, _points: &[ScreenPoint], _width: f32, _color: Color) {}

        fn draw_polygon(
            &mut self,
            _points: &[ScreenPoint],
            _stroke_width: f32,
            _stroke: Color,
            _fill: Option<Color>,
        ) {
        }

        fn draw_circle(&mut self, _center: ScreenPoint, radius: f32, _color: Color) {
            self.circles.push(radius);
        }

        fn draw_image(
            &mut self,
            _image: &image::RgbaImage,
            _top_left: ScreenPoint,
            _size: (f32, f32),
            _opacity: f32,
        ) {
        }

        fn draw_text(&mut self, _anchor: ScreenPoint, text: &str, _color: Color) {
            self.labels.push(text.to_owned());
        }
    }

    fn viewport() -> Viewport {
        Viewport {
            bounds: BoundingBox::new(51.0, 48.0, 19.0, 12.0),
            width_px: 800.0,
            height_px: 600.0,
            zoom: 7,
        }
    }

    #[test]
    fn test_filter_parsing() {
        assert_eq!("All".parse(), Ok(AirportFilter::All));
        assert_eq!("MajorOnly".parse(), Ok(AirportFilter::MajorOnly));
        assert_eq!("anything".parse(), Ok(AirportFilter::FrequentlyUsed));
    }

    #[test]
    fn test_draws_nothing_before_load() {
        let mut layer = AirportLayer::new(
            PathBuf::from("/nonexistent.csv"),
            AirportFilter::All,
            LayerPalette::default(),
        );
        let mut surface = MarkerCapture::default();
        layer.draw(&mut surface, &IdentityProjection, &viewport());
        assert!(surface.circles.is_empty());
    }

    #[test]
    fn test_draws_filtered_markers_with_major_labels() {
        let catalog = AirportCatalog::from_reader(SAMPLE_CSV.as_bytes()).unwrap();
        let mut layer = AirportLayer::with_catalog(
            catalog,
            AirportFilter::FrequentlyUsed,
            LayerPalette::default(),
        );

        let mut surface = MarkerCapture::default();
        layer.draw(&mut surface, &IdentityProjection, &viewport());

        // Only the large airport passes the filter; it also gets a label
        assert_eq!(surface.circles, [6.0]);
        assert_eq!(surface.labels, ["LKPR"]);
    }

    #[tokio::test]
    async fn test_start_init_with_catalog_is_ready() {
        let catalog = AirportCatalog::from_reader(SAMPLE_CSV.as_bytes()).unwrap();
        let mut layer =
            AirportLayer::with_catalog(catalog, AirportFilter::All, LayerPalette::default());
        assert!(matches!(layer.start_init(), LayerInit::Ready));
    }

    #[tokio::test]
    async fn test_start_init_missing_file_fails() {
        let mut layer = AirportLayer::new(
            PathBuf::from("/definitely/not/here.csv"),
            AirportFilter::All,
            LayerPalette::default(),
        );
        let LayerInit::Pending(handle) = layer.start_init() else {
            panic!("expected pending init");
        };
        assert!(handle.await.unwrap().is_err());
    }
}
