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

//! Ordered background layer composition.
//!
//! The manager owns the five background layers and draws them in a fixed
//! order every frame: map, airspace, airports, monitored-area rectangle,
//! precipitation overlay. Later layers composite on top of earlier ones,
//! so airports stay visible above airspace boundaries and the
//! precipitation overlay is never occluded by either.

use log::warn;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::geo::Viewport;
use crate::render::{DrawSurface, Projection};

/// Layer initialization failure.
#[derive(Debug, Error)]
pub enum LayerError {
    #[error(transparent)]
    AirportLoad(#[from] crate::airports::AirportLoadError),

    #[error("{0}")]
    Init(String),
}

/// Outcome of starting a layer's initialization.
#[derive(Debug)]
pub enum LayerInit {
    /// Nothing to wait for.
    Ready,
    /// Load in flight on a background task.
    Pending(JoinHandle<Result<(), LayerError>>),
}

/// One independently initializable, independently drawable background
/// element.
pub trait BackgroundLayer: Send {
    fn label(&self) -> &'static str;

    /// Begin initialization. Layers with nothing to load return `Ready`.
    fn start_init(&mut self) -> LayerInit {
        LayerInit::Ready
    }

    /// Draw one frame. Must complete within the frame budget; any state
    /// refresh triggered by background events happens here, at the frame
    /// boundary, never on the event's own thread.
    fn draw(
        &mut self,
        surface: &mut dyn DrawSurface,
        projection: &dyn Projection,
        viewport: &Viewport,
    );

    /// The projection signalled a pan/zoom. Layers that cache projected
    /// geometry recompute it here, not in `draw`.
    fn viewport_changed(&mut self, _projection: &dyn Projection, _viewport: &Viewport) {}
}

/// Composition manager readiness failure.
#[derive(Debug, Error)]
pub enum CompositionError {
    #[error("airport layer initialization failed: {0}")]
    AirportInit(#[source] LayerError),

    #[error("airport layer initialization task aborted")]
    AirportInitAborted,
}

/// Owns the background layers and composites them in fixed order.
pub struct BackgroundComposition {
    map: Box<dyn BackgroundLayer>,
    airspace: Box<dyn BackgroundLayer>,
    airports: Box<dyn BackgroundLayer>,
    monitored_area: Box<dyn BackgroundLayer>,
    precipitation: Box<dyn BackgroundLayer>,
}

impl std::fmt::Debug for BackgroundComposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundComposition").finish_non_exhaustive()
    }
}

impl BackgroundComposition {
    #[must_use]
    pub fn new(
        map: Box<dyn BackgroundLayer>,
        airspace: Box<dyn BackgroundLayer>,
        airports: Box<dyn BackgroundLayer>,
        monitored_area: Box<dyn BackgroundLayer>,
        precipitation: Box<dyn BackgroundLayer>,
    ) -> Self {
        Self {
            map,
            airspace,
            airports,
            monitored_area,
            precipitation,
        }
    }

    /// Initialize all layers.
    ///
    /// Only the airport layer's load gates readiness: its completion is
    /// awaited and its failure returned. Every other layer's pending init
    /// is detached; failures there are logged by a watcher task and the
    /// manager still comes up.
    pub async fn initialize(&mut self) -> Result<(), CompositionError> {
        for layer in [
            &mut self.map,
            &mut self.airspace,
            &mut self.monitored_area,
            &mut self.precipitation,
        ] {
            if let LayerInit::Pending(handle) = layer.start_init() {
                let label = layer.label();
                tokio::spawn(async move {
                    match handle.await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => warn!("{} layer initialization failed: {}", label, e),
                        Err(e) => warn!("{} layer initialization aborted: {}", label, e),
                    }
                });
            }
        }

        match self.airports.start_init() {
            LayerInit::Ready => Ok(()),
            LayerInit::Pending(handle) => match handle.await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(CompositionError::AirportInit(e)),
                Err(_) => Err(CompositionError::AirportInitAborted),
            },
        }
    }

    /// Draw all layers for one frame, in composition order.
    pub fn draw(
        &mut self,
        surface: &mut dyn DrawSurface,
        projection: &dyn Projection,
        viewport: &Viewport,
    ) {
        self.map.draw(surface, projection, viewport);
        self.airspace.draw(surface, projection, viewport);
        self.airports.draw(surface, projection, viewport);
        self.monitored_area.draw(surface, projection, viewport);
        self.precipitation.draw(surface, projection, viewport);
    }

    /// Forward a pan/zoom notification to every layer.
    pub fn viewport_changed(&mut self, projection: &dyn Projection, viewport: &Viewport) {
        for layer in [
            &mut self.map,
            &mut self.airspace,
            &mut self.airports,
            &mut self.monitored_area,
            &mut self.precipitation,
        ] {
            layer.viewport_changed(projection, viewport);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crate::geo::{BoundingBox, Location, ScreenPoint};
    use crate::render::{Color, NullSurface};

    struct IdentityProjection;

    impl Projection for IdentityProjection {
        #[allow(clippy::cast_possible_truncation)]
        fn location_to_viewport_point(&self, location: Location) -> ScreenPoint {
            ScreenPoint::new(location.longitude as f32, location.latitude as f32)
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

    struct RecordingLayer {
        label: &'static str,
        order: Arc<Mutex<Vec<&'static str>>>,
        init: Option<LayerInit>,
    }

    impl RecordingLayer {
        fn new(label: &'static str, order: &Arc<Mutex<Vec<&'static str>>>) -> Box<Self> {
            Box::new(Self {
                label,
                order: Arc::clone(order),
                init: None,
            })
        }

        fn with_init(
            label: &'static str,
            order: &Arc<Mutex<Vec<&'static str>>>,
            init: LayerInit,
        ) -> Box<Self> {
            Box::new(Self {
                label,
                order: Arc::clone(order),
                init: Some(init),
            })
        }
    }

    impl BackgroundLayer for RecordingLayer {
        fn label(&self) -> &'static str {
            self.label
        }

        fn start_init(&mut self) -> LayerInit {
            self.init.take().unwrap_or(LayerInit::Ready)
        }

        fn draw(
            &mut self,
            _surface: &mut dyn DrawSurface,
            _projection: &dyn Projection,
            _viewport: &Viewport,
        ) {
            self.order.lock().unwrap().push(self.label);
        }
    }

    #[tokio::test]
    async fn test_draw_order_is_fixed() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut composition = BackgroundComposition::new(
            RecordingLayer::new("map", &order),
            RecordingLayer::new("airspace", &order),
            RecordingLayer::new("airports", &order),
            RecordingLayer::new("monitored-area", &order),
            RecordingLayer::new("precipitation", &order),
        );
        composition.initialize().await.unwrap();

        let mut surface = NullSurface::default();
        composition.draw(&mut surface, &IdentityProjection, &viewport());

        assert_eq!(
            *order.lock().unwrap(),
            ["map", "airspace", "airports", "monitored-area", "precipitation"]
        );
    }

    #[tokio::test]
    async fn test_initialize_awaits_airport_layer() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let loaded = Arc::new(AtomicBool::new(false));

        let load_flag = Arc::clone(&loaded);
        let airport_init = LayerInit::Pending(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            load_flag.store(true, Ordering::SeqCst);
            Ok(())
        }));

        let mut composition = BackgroundComposition::new(
            RecordingLayer::new("map", &order),
            RecordingLayer::new("airspace", &order),
            RecordingLayer::with_init("airports", &order, airport_init),
            RecordingLayer::new("monitored-area", &order),
            RecordingLayer::new("precipitation", &order),
        );

        composition.initialize().await.unwrap();
        assert!(loaded.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_map_init_failure_does_not_block_readiness() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let map_init = LayerInit::Pending(tokio::spawn(async {
            Err(LayerError::Init("tile cache unavailable".to_owned()))
        }));

        let mut composition = BackgroundComposition::new(
            RecordingLayer::with_init("map", &order, map_init),
            RecordingLayer::new("airspace", &order),
            RecordingLayer::new("airports", &order),
            RecordingLayer::new("monitored-area", &order),
            RecordingLayer::new("precipitation", &order),
        );

        assert!(composition.initialize().await.is_ok());
    }

    #[tokio::test]
    async fn test_airport_init_failure_propagates() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let airport_init = LayerInit::Pending(tokio::spawn(async {
            Err(LayerError::Init("catalogue missing".to_owned()))
        }));

        let mut composition = BackgroundComposition::new(
            RecordingLayer::new("map", &order),
            RecordingLayer::new("airspace", &order),
            RecordingLayer::with_init("airports", &order, airport_init),
            RecordingLayer::new("monitored-area", &order),
            RecordingLayer::new("precipitation", &order),
        );

        assert!(matches!(
            composition.initialize().await,
            Err(CompositionError::AirportInit(_))
        ));
    }

    #[test]
    fn test_color_helpers() {
        let color = Color::rgb(1, 2, 3);
        assert_eq!(color.a, 255);
        assert_eq!(color.with_alpha(9).a, 9);
    }
}
