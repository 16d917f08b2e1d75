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

//! Slippy map tile background layer.
//!
//! Tiles come from the Carto CDN, are cached on disk keyed by a hash of
//! their URL, and are fetched lazily: a tile missing during `draw` is
//! queued for download and simply skipped that frame. A tile that failed
//! to download is not refetched for the rest of the session.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use image::RgbaImage;
use log::{debug, warn};
use sha2::{Digest, Sha256};

use crate::geo::{Location, Viewport};
use crate::render::background::{BackgroundLayer, LayerError, LayerInit};
use crate::render::{DrawSurface, Projection, WebMercator};

const CACHE_DURATION_DAYS: u64 = 7;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub zoom: u8,
}

impl TileCoord {
    #[must_use]
    pub fn new(x: u32, y: u32, zoom: u8) -> Self {
        Self { x, y, zoom }
    }

    /// Get the tile URL from Carto CDN
    #[must_use]
    pub fn url(&self) -> String {
        let subdomain = ['a', 'b', 'c', 'd'][((self.x + self.y) % 4) as usize];
        format!(
            "https://{}.basemaps.cartocdn.com/dark_all/{}/{}/{}.png",
            subdomain, self.zoom, self.x, self.y
        )
    }

    /// Get cache filename based on hash of URL
    fn cache_filename(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.url().as_bytes());
        let hash = hasher.finalize();
        format!("{:x}", hash)
    }

    /// North-west corner of this tile.
    #[must_use]
    pub fn north_west(&self) -> Location {
        Location::new(
            WebMercator::tile_to_lat(f64::from(self.y), self.zoom),
            WebMercator::tile_to_lon(f64::from(self.x), self.zoom),
        )
    }

    /// South-east corner of this tile.
    #[must_use]
    pub fn south_east(&self) -> Location {
        Location::new(
            WebMercator::tile_to_lat(f64::from(self.y) + 1.0, self.zoom),
            WebMercator::tile_to_lon(f64::from(self.x) + 1.0, self.zoom),
        )
    }
}

enum TileState {
    Loading,
    Loaded(Arc<RgbaImage>),
    Failed,
}

/// Background layer drawing the base map tiles.
pub struct MapLayer {
    cache_dir: PathBuf,
    tiles: Arc<Mutex<HashMap<TileCoord, TileState>>>,
    client: reqwest::Client,
}

impl std::fmt::Debug for MapLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapLayer")
            .field("cache_dir", &self.cache_dir)
            .finish_non_exhaustive()
    }
}

impl MapLayer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache_dir: Self::default_cache_dir(),
            tiles: Arc::new(Mutex::new(HashMap::new())),
            client: reqwest::Client::new(),
        }
    }

    fn default_cache_dir() -> PathBuf {
        let mut path = dirs::cache_dir().unwrap_or_else(|| PathBuf::from(".cache"));
        path.push("radarscope");
        path.push("tiles");
        path
    }

    fn cleanup_old_tiles(cache_dir: &PathBuf) {
        let now = SystemTime::now();
        let max_age = Duration::from_secs(CACHE_DURATION_DAYS * 24 * 60 * 60);

        if let Ok(entries) = fs::read_dir(cache_dir) {
            for entry in entries.flatten() {
                if let Ok(metadata) = entry.metadata() {
                    if let Ok(modified) = metadata.modified() {
                        if let Ok(age) = now.duration_since(modified) {
                            if age > max_age {
                                let _ = fs::remove_file(entry.path());
                                debug!("Removed old tile cache: {:?}", entry.path());
                            }
                        }
                    }
                }
            }
        }
    }

    /// Tiles covering the viewport bounds at its zoom level, row-major.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn visible_tiles(viewport: &Viewport) -> Vec<TileCoord> {
        let bounds = viewport.bounds;
        let zoom = viewport.zoom;
        let max_tile = 2_i64.pow(u32::from(zoom));

        let west_x = WebMercator::lon_to_x(bounds.west, zoom).floor() as i64;
        let mut east_x = WebMercator::lon_to_x(bounds.east, zoom).floor() as i64;
        if bounds.west > bounds.east {
            east_x += max_tile;
        }
        let north_y = WebMercator::lat_to_y(bounds.north, zoom).floor() as i64;
        let south_y = WebMercator::lat_to_y(bounds.south, zoom).floor() as i64;

        let mut tiles = Vec::new();
        for y in north_y..=south_y {
            if y < 0 || y >= max_tile {
                continue;
            }
            for x in west_x..=east_x {
                // Longitude wraps around
                let wrapped_x = ((x % max_tile) + max_tile) % max_tile;
                tiles.push(TileCoord::new(wrapped_x as u32, y as u32, zoom));
            }
        }
        tiles
    }

    /// Get tile from memory or disk cache, queueing a download on a miss.
    fn get_tile(&self, coord: TileCoord) -> Option<Arc<RgbaImage>> {
        let mut tiles = self.tiles.lock().unwrap();

        match tiles.get(&coord) {
            Some(TileState::Loaded(tile)) => Some(Arc::clone(tile)),
            Some(TileState::Loading | TileState::Failed) => None,
            None => {
                let cache_path = self.cache_dir.join(format!("{}.png", coord.cache_filename()));

                if cache_path.exists() {
                    match Self::load_tile_from_disk(&cache_path) {
                        Ok(tile) => {
                            let tile = Arc::new(tile);
                            tiles.insert(coord, TileState::Loaded(Arc::clone(&tile)));
                            return Some(tile);
                        }
                        Err(e) => {
                            warn!("Failed to load cached tile: {}", e);
                        }
                    }
                }

                tiles.insert(coord, TileState::Loading);
                self.queue_download(coord);
                None
            }
        }
    }

    fn load_tile_from_disk(path: &PathBuf) -> Result<RgbaImage, String> {
        let img_data = fs::read(path).map_err(|e| e.to_string())?;
        let img = image::load_from_memory(&img_data).map_err(|e| e.to_string())?;
        Ok(img.to_rgba8())
    }

    fn queue_download(&self, coord: TileCoord) {
        let tiles = Arc::clone(&self.tiles);
        let cache_dir = self.cache_dir.clone();
        let client = self.client.clone();

        tokio::spawn(async move {
            let state = Self::download_tile(&client, coord, &cache_dir).await;
            tiles.lock().unwrap().insert(coord, state);
        });
    }

    async fn download_tile(
        client: &reqwest::Client,
        coord: TileCoord,
        cache_dir: &std::path::Path,
    ) -> TileState {
        let url = coord.url();
        debug!("Downloading tile: {}", url);

        let response = match client.get(&url).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                warn!("Failed to download tile: HTTP {}", response.status());
                return TileState::Failed;
            }
            Err(e) => {
                warn!("Failed to fetch tile: {}", e);
                return TileState::Failed;
            }
        };

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to read tile bytes: {}", e);
                return TileState::Failed;
            }
        };

        let cache_path = cache_dir.join(format!("{}.png", coord.cache_filename()));
        if let Err(e) = tokio::fs::write(&cache_path, &bytes).await {
            warn!("Failed to save tile to cache: {}", e);
        }

        match image::load_from_memory(&bytes) {
            Ok(img) => TileState::Loaded(Arc::new(img.to_rgba8())),
            Err(e) => {
                warn!("Failed to decode tile image: {}", e);
                TileState::Failed
            }
        }
    }
}

impl Default for MapLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl BackgroundLayer for MapLayer {
    fn label(&self) -> &'static str {
        "map"
    }

    fn start_init(&mut self) -> LayerInit {
        let cache_dir = self.cache_dir.clone();
        LayerInit::Pending(tokio::task::spawn_blocking(move || {
            fs::create_dir_all(&cache_dir).map_err(|e| {
                LayerError::Init(format!(
                    "failed to create tile cache {}: {}",
                    cache_dir.display(),
                    e
                ))
            })?;
            Self::cleanup_old_tiles(&cache_dir);
            Ok(())
        }))
    }

    fn draw(
        &mut self,
        surface: &mut dyn DrawSurface,
        projection: &dyn Projection,
        viewport: &Viewport,
    ) {
        for coord in Self::visible_tiles(viewport) {
            let Some(tile) = self.get_tile(coord) else {
                continue;
            };

            let top_left = projection.location_to_viewport_point(coord.north_west());
            let bottom_right = projection.location_to_viewport_point(coord.south_east());
            surface.draw_image(
                &tile,
                top_left,
                (bottom_right.x - top_left.x, bottom_right.y - top_left.y),
                1.0,
            );
        }
    }
}
