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

//! Background rendering: layer composition, projection seam, palette.
//!
//! The core computes geometry and hands it to a [`DrawSurface`]; it never
//! rasterizes. The shell supplies the surface and the projection and calls
//! [`background::BackgroundComposition::draw`] once per frame.

pub mod airport_layer;
pub mod airspace_layer;
pub mod area_layer;
pub mod background;
pub mod map_layer;
pub mod mercator;
pub mod precipitation_layer;

use std::collections::HashMap;

use crate::airspace::AirspaceCategory;
use crate::geo::{Location, ScreenPoint};

pub use background::{
    BackgroundComposition, BackgroundLayer, CompositionError, LayerError, LayerInit,
};
pub use mercator::{MapProjection, WebMercator};

/// RGBA color, straight alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    #[must_use]
    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }
}

impl From<[u8; 4]> for Color {
    fn from(value: [u8; 4]) -> Self {
        Self::rgba(value[0], value[1], value[2], value[3])
    }
}

/// Category-to-color table, explicitly constructed and passed down to the
/// layers. Never process-wide state; tests build their own.
#[derive(Debug, Clone)]
pub struct LayerPalette {
    airspace: HashMap<AirspaceCategory, Color>,
    airspace_fallback: Color,
    pub airport: Color,
    pub airport_label: Color,
    pub monitored_area: Color,
}

impl Default for LayerPalette {
    fn default() -> Self {
        let mut airspace = HashMap::new();
        airspace.insert(AirspaceCategory::Controlled, Color::rgb(90, 160, 255));
        airspace.insert(AirspaceCategory::Restricted, Color::rgb(255, 140, 0));
        airspace.insert(AirspaceCategory::Danger, Color::rgb(255, 70, 70));
        airspace.insert(AirspaceCategory::Prohibited, Color::rgb(220, 40, 40));
        airspace.insert(
            AirspaceCategory::TemporaryReserved,
            Color::rgb(200, 120, 255),
        );

        Self {
            airspace,
            airspace_fallback: Color::rgb(150, 150, 150),
            airport: Color::rgb(120, 220, 120),
            airport_label: Color::rgb(220, 220, 220),
            monitored_area: Color::rgb(255, 255, 120),
        }
    }
}

impl LayerPalette {
    /// Build from configured `category -> [r,g,b,a]` entries, falling back
    /// to the defaults for anything not named.
    #[must_use]
    pub fn from_entries(entries: &HashMap<String, [u8; 4]>) -> Self {
        let mut palette = Self::default();
        for (key, rgba) in entries {
            let color = Color::from(*rgba);
            match key.to_ascii_lowercase().as_str() {
                "airport" => palette.airport = color,
                "airport_label" => palette.airport_label = color,
                "monitored_area" => palette.monitored_area = color,
                other => {
                    let category: AirspaceCategory =
                        other.parse().unwrap_or(AirspaceCategory::Other);
                    if category == AirspaceCategory::Other {
                        palette.airspace_fallback = color;
                    } else {
                        palette.airspace.insert(category, color);
                    }
                }
            }
        }
        palette
    }

    #[must_use]
    pub fn airspace_color(&self, category: AirspaceCategory) -> Color {
        self.airspace
            .get(&category)
            .copied()
            .unwrap_or(self.airspace_fallback)
    }
}

/// Map projection capability: geographic location to viewport pixels.
///
/// The shell owns the real projection; [`MapProjection`] is the concrete
/// implementation the headless runner and the map layer use.
pub trait Projection {
    fn location_to_viewport_point(&self, location: Location) -> ScreenPoint;
}

/// On-screen drawing primitives, supplied by the shell.
///
/// Coordinates are viewport pixels; the core never rasterizes.
pub trait DrawSurface {
    /// Open polyline.
    fn draw_polyline(&mut self, points: &[ScreenPoint], width: f32, color: Color);

    /// Closed polygon; the last vertex connects back to the first.
    fn draw_polygon(
        &mut self,
        points: &[ScreenPoint],
        stroke_width: f32,
        stroke: Color,
        fill: Option<Color>,
    );

    /// Filled circle.
    fn draw_circle(&mut self, center: ScreenPoint, radius: f32, color: Color);

    /// Bitmap stretched into the given rectangle.
    fn draw_image(
        &mut self,
        image: &image::RgbaImage,
        top_left: ScreenPoint,
        size: (f32, f32),
        opacity: f32,
    );

    /// Short text label anchored at a point.
    fn draw_text(&mut self, anchor: ScreenPoint, text: &str, color: Color);
}

/// Surface that discards everything. Used by the headless runner.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSurface {
    pub primitives: usize,
}

impl DrawSurface for NullSurface {
    fn draw_polyline(&mut self, _points: &[ScreenPoint], _width: f32, _color: Color) {
        self.primitives += 1;
    }

    fn draw_polygon(
        &mut self,
        _points: &[ScreenPoint],
        _stroke_width: f32,
        _stroke: Color,
        _fill: Option<Color>,
    ) {
        self.primitives += 1;
    }

    fn draw_circle(&mut self, _center: ScreenPoint, _radius: f32, _color: Color) {
        self.primitives += 1;
    }

    fn draw_image(
        &mut self,
        _image: &image::RgbaImage,
        _top_left: ScreenPoint,
        _size: (f32, f32),
        _opacity: f32,
    ) {
        self.primitives += 1;
    }

    fn draw_text(&mut self, _anchor: ScreenPoint, _text: &str, _color: Color) {
        self.primitives += 1;
    }
}
