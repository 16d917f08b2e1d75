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

//! Aircraft state, sampling, and the switchable data source.
//!
//! The display samples the active aircraft source once per frame tick. The
//! switch forwards sampling requests verbatim to whichever provider is
//! active; providers can be swapped (live feed now, file replay later)
//! without callers changing.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use crate::geo::Location;

/// One historical position for trail rendering.
#[derive(Debug, Clone, Copy)]
pub struct TrailPoint {
    pub location: Location,
    pub altitude: Option<i32>,
    pub timestamp: DateTime<Utc>,
}

/// Position/kinematic snapshot of one aircraft at sampling time.
#[derive(Debug, Clone)]
pub struct Aircraft {
    pub id: String,
    pub callsign: Option<String>,
    pub location: Option<Location>,
    /// Altitude in feet.
    pub altitude: Option<i32>,
    /// Track angle in degrees (0-360, north = 0).
    pub track: Option<f64>,
    /// Ground speed in knots.
    pub ground_speed: Option<f64>,
    /// Vertical rate in feet per minute.
    pub vertical_rate: Option<i32>,
    pub last_seen: DateTime<Utc>,
    /// Historical positions matching the requested trail times, oldest first.
    pub trail: Vec<TrailPoint>,
}

/// Snapshot mapping of aircraft identifiers to current state.
///
/// Recomputed fresh on every sampling call; never cached by the switch.
pub type AircraftSample = HashMap<String, Aircraft>;

/// Aircraft-sample provider.
pub trait AircraftSource: Send + Sync {
    /// Whether samples from this source may be persisted to a log file.
    fn is_loggable(&self) -> bool;

    /// Produce a fresh sample.
    ///
    /// `trail_times` lists the historical instants the caller wants trail
    /// points for; the source returns, per aircraft, the most recent
    /// recorded position at or before each requested time.
    fn sample(&self, now: DateTime<Utc>, trail_times: &[DateTime<Utc>]) -> AircraftSample;
}

/// Holds the one active aircraft source and forwards sampling requests.
///
/// Pure indirection: no caching, filtering, or transformation happens here.
pub struct SourceSwitch {
    active: Box<dyn AircraftSource>,
}

impl std::fmt::Debug for SourceSwitch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceSwitch").finish_non_exhaustive()
    }
}

impl SourceSwitch {
    #[must_use]
    pub fn new(source: Box<dyn AircraftSource>) -> Self {
        Self { active: source }
    }

    /// Swap the active provider. Callers of `sample` are unaffected.
    pub fn set_source(&mut self, source: Box<dyn AircraftSource>) {
        self.active = source;
    }

    #[must_use]
    pub fn is_loggable(&self) -> bool {
        self.active.is_loggable()
    }

    #[must_use]
    pub fn sample(&self, now: DateTime<Utc>, trail_times: &[DateTime<Utc>]) -> AircraftSample {
        self.active.sample(now, trail_times)
    }
}

/// Internal per-aircraft state kept by the store.
#[derive(Debug, Clone)]
struct TrackedAircraft {
    callsign: Option<String>,
    location: Option<Location>,
    altitude: Option<i32>,
    track: Option<f64>,
    ground_speed: Option<f64>,
    vertical_rate: Option<i32>,
    last_seen: DateTime<Utc>,
    history: Vec<TrailPoint>,
}

impl TrackedAircraft {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            callsign: None,
            location: None,
            altitude: None,
            track: None,
            ground_speed: None,
            vertical_rate: None,
            last_seen: now,
            history: Vec::new(),
        }
    }
}

/// Configuration for the live aircraft store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Aircraft timeout in seconds.
    pub aircraft_timeout_secs: i64,
    /// Position history retention in seconds.
    pub position_history_secs: i64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            aircraft_timeout_secs: 180,
            position_history_secs: 900,
        }
    }
}

/// Live aircraft state, kept current by an external position feed.
///
/// The store is the mutable half of the live source: the feed integration
/// writes updates, the source reads snapshots.
#[derive(Debug, Default)]
pub struct AircraftStore {
    aircraft: HashMap<String, TrackedAircraft>,
    config: StoreConfig,
}

impl AircraftStore {
    #[must_use]
    pub fn new(config: StoreConfig) -> Self {
        Self {
            aircraft: HashMap::new(),
            config,
        }
    }

    /// Record a position report.
    pub fn update_position(
        &mut self,
        id: &str,
        location: Location,
        altitude: Option<i32>,
        now: DateTime<Utc>,
    ) {
        let entry = self
            .aircraft
            .entry(id.to_owned())
            .or_insert_with(|| TrackedAircraft::new(now));
        entry.last_seen = now;
        entry.location = Some(location);
        if altitude.is_some() {
            entry.altitude = altitude;
        }
        entry.history.push(TrailPoint {
            location,
            altitude: entry.altitude,
            timestamp: now,
        });
    }

    /// Record a velocity report.
    pub fn update_velocity(
        &mut self,
        id: &str,
        ground_speed: f64,
        track: f64,
        vertical_rate: Option<i32>,
        now: DateTime<Utc>,
    ) {
        let entry = self
            .aircraft
            .entry(id.to_owned())
            .or_insert_with(|| TrackedAircraft::new(now));
        entry.last_seen = now;
        entry.ground_speed = Some(ground_speed);
        entry.track = Some(track);
        entry.vertical_rate = vertical_rate;
    }

    /// Record a callsign.
    pub fn update_callsign(&mut self, id: &str, callsign: &str, now: DateTime<Utc>) {
        let entry = self
            .aircraft
            .entry(id.to_owned())
            .or_insert_with(|| TrackedAircraft::new(now));
        entry.last_seen = now;
        entry.callsign = Some(callsign.to_owned());
    }

    /// Drop stale aircraft and history older than the retention window.
    pub fn cleanup_stale(&mut self, now: DateTime<Utc>) {
        let history_secs = self.config.position_history_secs;
        for aircraft in self.aircraft.values_mut() {
            aircraft
                .history
                .retain(|point| (now - point.timestamp).num_seconds() < history_secs);
        }

        let timeout = self.config.aircraft_timeout_secs;
        self.aircraft
            .retain(|_, a| (now - a.last_seen).num_seconds() < timeout);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.aircraft.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.aircraft.is_empty()
    }

    fn snapshot(&self, trail_times: &[DateTime<Utc>]) -> AircraftSample {
        self.aircraft
            .iter()
            .map(|(id, tracked)| {
                let trail = trail_times
                    .iter()
                    .filter_map(|&wanted| {
                        // Most recent recorded position at or before the
                        // requested instant
                        tracked
                            .history
                            .iter()
                            .rev()
                            .find(|point| point.timestamp <= wanted)
                            .copied()
                    })
                    .collect();

                (
                    id.clone(),
                    Aircraft {
                        id: id.clone(),
                        callsign: tracked.callsign.clone(),
                        location: tracked.location,
                        altitude: tracked.altitude,
                        track: tracked.track,
                        ground_speed: tracked.ground_speed,
                        vertical_rate: tracked.vertical_rate,
                        last_seen: tracked.last_seen,
                        trail,
                    },
                )
            })
            .collect()
    }
}

/// Aircraft source backed by the live feed store.
///
/// Live data is never persisted by this component, so `is_loggable` is
/// false. A future replay-from-file source reports true and appends to its
/// log as a side effect of sampling.
#[derive(Debug, Clone)]
pub struct LiveAircraftSource {
    store: Arc<RwLock<AircraftStore>>,
}

impl LiveAircraftSource {
    #[must_use]
    pub fn new(store: Arc<RwLock<AircraftStore>>) -> Self {
        Self { store }
    }
}

impl AircraftSource for LiveAircraftSource {
    fn is_loggable(&self) -> bool {
        false
    }

    fn sample(&self, _now: DateTime<Utc>, trail_times: &[DateTime<Utc>]) -> AircraftSample {
        self.store
            .read()
            .map(|store| store.snapshot(trail_times))
            .unwrap_or_default()
    }
}
