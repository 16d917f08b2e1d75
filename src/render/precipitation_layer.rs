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

//! Precipitation radar overlay layer.
//!
//! Subscribes to the poll/download service's notifications. The download
//! completes on a background task; this layer picks the new image up at
//! the top of the next `draw`, so the reload never happens on the event's
//! own thread.

use std::sync::Arc;

use image::RgbaImage;
use log::warn;
use tokio::sync::broadcast;

use crate::geo::{BoundingBox, Location, Viewport};
use crate::render::background::BackgroundLayer;
use crate::render::{DrawSurface, Projection};
use crate::weather::PrecipitationEvent;

/// Draws the downloaded radar image stretched over its geographic bounds.
pub struct PrecipitationLayer {
    events: broadcast::Receiver<PrecipitationEvent>,
    /// Geographic extent the radar composite covers.
    coverage: BoundingBox,
    opacity: f32,
    image: Option<Arc<RgbaImage>>,
}

impl std::fmt::Debug for PrecipitationLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrecipitationLayer")
            .field("coverage", &self.coverage)
            .field("opacity", &self.opacity)
            .field("has_image", &self.image.is_some())
            .finish_non_exhaustive()
    }
}

impl PrecipitationLayer {
    #[must_use]
    pub fn new(
        events: broadcast::Receiver<PrecipitationEvent>,
        coverage: BoundingBox,
        opacity: f32,
    ) -> Self {
        Self {
            events,
            coverage,
            opacity,
            image: None,
        }
    }

    /// Drain pending download notifications and reload the image file.
    /// Runs at the frame boundary only.
    fn refresh_image(&mut self) {
        let mut latest = None;
        while let Ok(event) = self.events.try_recv() {
            let PrecipitationEvent::ImageDownloaded { path, .. } = event;
            latest = Some(path);
        }

        let Some(path) = latest else { return };
        match std::fs::read(&path)
            .map_err(|e| e.to_string())
            .and_then(|bytes| image::load_from_memory(&bytes).map_err(|e| e.to_string()))
        {
            Ok(img) => {
                self.image = Some(Arc::new(img.to_rgba8()));
            }
            Err(e) => {
                // Keep the previous image on a bad file
                warn!("Failed to load precipitation image {}: {}", path.display(), e);
            }
        }
    }
}

impl BackgroundLayer for PrecipitationLayer {
    fn label(&self) -> &'static str {
        "precipitation"
    }

    fn draw(
        &mut self,
        surface: &mut dyn DrawSurface,
        projection: &dyn Projection,
        _viewport: &Viewport,
    ) {
        self.refresh_image();

        let Some(image) = &self.image else { return };

        let top_left = projection
            .location_to_viewport_point(Location::new(self.coverage.north, self.coverage.west));
        let bottom_right = projection
            .location_to_viewport_point(Location::new(self.coverage.south, self.coverage.east));

        surface.draw_image(
            image,
            top_left,
            (bottom_right.x - top_left.x, bottom_right.y - top_left.y),
            self.opacity,
        );
    }
}
