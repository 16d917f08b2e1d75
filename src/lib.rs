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

//! Live-data ingestion and layered background composition for an
//! air-traffic radar view.
//!
//! Two independent live sources feed the display: the UDP highlight/
//! airspace feed (see the `feed-client` crate) and a periodically polled
//! precipitation-radar image service. Their output, together with static
//! airspace and airport catalogues, is composited into an ordered set of
//! background layers; a switchable aircraft source provides the
//! foreground samples.
//!
//! The crate computes geometry only. Rasterization, windowing, and
//! view-models stay in the shell, which supplies a
//! [`render::DrawSurface`] and a [`render::Projection`] and drives
//! [`render::BackgroundComposition::draw`] once per frame.

pub mod aircraft;
pub mod airports;
pub mod airspace;
pub mod config;
pub mod geo;
pub mod render;
pub mod weather;

pub use aircraft::{AircraftSample, AircraftSource, LiveAircraftSource, SourceSwitch};
pub use config::AppConfig;
pub use geo::{BoundingBox, Location, ScreenPoint, Viewport};
pub use render::BackgroundComposition;
pub use weather::PrecipitationService;
