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

//! Headless runner wiring the ingestion pipeline to a logging surface.
//!
//! Binds the feed listener, initializes the background composition, then
//! drives the frame tick and the precipitation poll. The real display
//! shell replaces the `NullSurface` with its own drawing primitives.

use std::sync::{Arc, RwLock};

use chrono::Utc;
use clap::Parser;
use log::{debug, info, warn};

use feed_client::{FeedClient, FeedEvent, ListenerConfig, UdpListener};
use radarscope::aircraft::{AircraftStore, LiveAircraftSource, SourceSwitch, StoreConfig};
use radarscope::config::AppConfig;
use radarscope::geo::Viewport;
use radarscope::render::airport_layer::{AirportFilter, AirportLayer};
use radarscope::render::airspace_layer::AirspaceLayer;
use radarscope::render::area_layer::MonitoredAreaLayer;
use radarscope::render::map_layer::MapLayer;
use radarscope::render::precipitation_layer::PrecipitationLayer;
use radarscope::render::{
    BackgroundComposition, LayerPalette, MapProjection, NullSurface,
};
use radarscope::weather::PrecipitationService;

#[derive(Parser, Debug)]
#[command(name = "radarscope", about = "Air-traffic radar view pipeline")]
struct Args {
    /// Override the feed UDP port from the config file
    #[arg(long)]
    port: Option<u16>,

    /// Frame interval in milliseconds
    #[arg(long, default_value_t = 1000)]
    frame_interval_ms: u64,

    /// Initialize, draw one frame, and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let config = AppConfig::load()?;
    info!(
        "Configuration loaded from {:?}",
        AppConfig::get_config_path()?
    );

    let feed_port = args.port.unwrap_or(config.feed_port);
    let listener = UdpListener::bind(ListenerConfig {
        port: feed_port,
        ..Default::default()
    })
    .await?;
    let feed = FeedClient::from_listener(listener);
    let mut feed_events = feed.subscribe();

    let mut precipitation =
        PrecipitationService::new(config.precipitation.to_service_config())?;

    let store = Arc::new(RwLock::new(AircraftStore::new(StoreConfig::default())));
    let aircraft_source = SourceSwitch::new(Box::new(LiveAircraftSource::new(Arc::clone(
        &store,
    ))));

    let palette = LayerPalette::from_entries(&config.palette);
    let airport_filter: AirportFilter = config.airport_filter.parse()?;

    let mut composition = BackgroundComposition::new(
        Box::new(MapLayer::new()),
        Box::new(AirspaceLayer::new(
            Arc::new(config.airspace_catalog()),
            palette.clone(),
        )),
        Box::new(AirportLayer::new(
            config.airports_csv.clone(),
            airport_filter,
            palette.clone(),
        )),
        Box::new(MonitoredAreaLayer::new(
            config.monitored_area.to_bounding_box(),
            palette.monitored_area,
        )),
        Box::new(PrecipitationLayer::new(
            precipitation.subscribe(),
            config.precipitation.coverage.to_bounding_box(),
            config.precipitation.opacity,
        )),
    );

    composition.initialize().await?;
    info!("Background composition ready");

    let viewport = Viewport {
        bounds: config.viewport_bounds.to_bounding_box(),
        width_px: 1280.0,
        height_px: 800.0,
        zoom: config.zoom,
    };
    let projection = MapProjection::new(&viewport);
    composition.viewport_changed(&projection, &viewport);

    let mut frame = tokio::time::interval(std::time::Duration::from_millis(
        args.frame_interval_ms,
    ));
    let mut poll = tokio::time::interval(std::time::Duration::from_secs(
        config.precipitation.poll_interval_secs,
    ));

    loop {
        tokio::select! {
            _ = frame.tick() => {
                let mut surface = NullSurface::default();
                composition.draw(&mut surface, &projection, &viewport);

                let now = Utc::now();
                let trail_times: Vec<_> = config
                    .trail_offsets_secs
                    .iter()
                    .map(|&secs| now - chrono::Duration::seconds(secs))
                    .collect();
                let sample = aircraft_source.sample(now, &trail_times);
                debug!(
                    "Frame: {} primitives, {} aircraft",
                    surface.primitives,
                    sample.len()
                );

                if args.once {
                    break;
                }
            }

            _ = poll.tick() => {
                match precipitation.download_current_image().await {
                    Ok(timestamp) => debug!("Precipitation image current as of {}", timestamp),
                    Err(e) => warn!("Precipitation poll failed: {}", e),
                }
            }

            event = feed_events.recv() => {
                match event {
                    Ok(FeedEvent::ActiveAirspacesReceived(names)) => {
                        info!("Active airspaces: {:?}", names);
                    }
                    Ok(FeedEvent::HighlightedAircraftReceived(map)) => {
                        info!("Highlighted aircraft: {:?}", map);
                    }
                    Ok(FeedEvent::MessageReceived(_)) => {}
                    Err(e) => {
                        warn!("Feed event stream lagged: {}", e);
                    }
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    feed.shutdown();
    Ok(())
}
