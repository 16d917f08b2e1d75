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

//! Feed message deserialization and typed event dispatch.
//!
//! The feed delivers one JSON object per datagram. Either field may be
//! absent; absence means no notification of that kind for the message.
//! A malformed payload is dropped with a diagnostic and raises nothing.

use std::collections::HashMap;
use std::str::FromStr;

use log::warn;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::broadcast;

/// Malformed feed payload.
#[derive(Debug, Error)]
pub enum DeserializationError {
    #[error("invalid feed payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

/// Visual emphasis category applied to a tracked aircraft.
///
/// Unknown textual values parse to `Other`, case-insensitively. The feed
/// origin may introduce new categories at any time, so parsing never fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetHighlight {
    Notice1,
    Notice2,
    Alert,
    Other,
}

impl FromStr for TargetHighlight {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value.to_ascii_lowercase().as_str() {
            "notice1" => Self::Notice1,
            "notice2" => Self::Notice2,
            "alert" => Self::Alert,
            _ => Self::Other,
        })
    }
}

impl<'de> Deserialize<'de> for TargetHighlight {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(value.parse().unwrap_or(Self::Other))
    }
}

/// Wire payload of a single feed datagram.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedMessage {
    /// Names of airspaces currently active, order as sent. Not validated
    /// against the airspace catalogue; downstream consumers resolve names.
    #[serde(default)]
    pub active_airspaces: Option<Vec<String>>,

    /// Aircraft id to highlight category, verbatim.
    #[serde(default)]
    pub highlighted_aircrafts: Option<HashMap<String, TargetHighlight>>,
}

/// Events published by the dispatcher, in receipt order.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// Raw decoded datagram text, before parsing.
    MessageReceived(String),
    /// The message carried an `activeAirspaces` field.
    ActiveAirspacesReceived(Vec<String>),
    /// The message carried a `highlightedAircrafts` field.
    HighlightedAircraftReceived(HashMap<String, TargetHighlight>),
}

/// Parses feed messages and publishes typed events.
///
/// A single message may raise both typed events, one, or neither.
pub struct FeedDispatcher {
    event_tx: broadcast::Sender<FeedEvent>,
}

impl std::fmt::Debug for FeedDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedDispatcher").finish_non_exhaustive()
    }
}

impl FeedDispatcher {
    /// Create a dispatcher with the given event channel capacity.
    #[must_use]
    pub fn new(event_channel_capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(event_channel_capacity);
        Self { event_tx }
    }

    /// Subscribe to dispatched events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.event_tx.subscribe()
    }

    /// Parse one message and publish its events.
    ///
    /// The raw text is always published first. A malformed payload is
    /// logged and dropped; the error is also returned for callers that
    /// want to count failures, but it must never be allowed to stop the
    /// receive loop.
    pub fn dispatch(&self, raw: &str) -> Result<(), DeserializationError> {
        let _ = self
            .event_tx
            .send(FeedEvent::MessageReceived(raw.to_owned()));

        let message: FeedMessage = match serde_json::from_str(raw) {
            Ok(message) => message,
            Err(e) => {
                warn!("Dropping malformed feed message: {}", e);
                return Err(DeserializationError::InvalidPayload(e));
            }
        };

        if let Some(airspaces) = message.active_airspaces {
            let _ = self
                .event_tx
                .send(FeedEvent::ActiveAirspacesReceived(airspaces));
        }

        if let Some(highlights) = message.highlighted_aircrafts {
            let _ = self
                .event_tx
                .send(FeedEvent::HighlightedAircraftReceived(highlights));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut broadcast::Receiver<FeedEvent>) -> Vec<FeedEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_highlight_known_values_case_insensitive() {
        assert_eq!("Notice1".parse(), Ok(TargetHighlight::Notice1));
        assert_eq!("NOTICE2".parse(), Ok(TargetHighlight::Notice2));
        assert_eq!("alert".parse(), Ok(TargetHighlight::Alert));
    }

    #[test]
    fn test_highlight_unknown_values_are_other() {
        assert_eq!("Warning".parse(), Ok(TargetHighlight::Other));
        assert_eq!("".parse(), Ok(TargetHighlight::Other));
        assert_eq!("notice3".parse(), Ok(TargetHighlight::Other));
    }

    #[test]
    fn test_dispatch_both_fields() {
        let dispatcher = FeedDispatcher::new(16);
        let mut rx = dispatcher.subscribe();

        dispatcher
            .dispatch(r#"{"activeAirspaces":["AS1"],"highlightedAircrafts":{"OK123":"Alert"}}"#)
            .unwrap();

        let events = drain(&mut rx);
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], FeedEvent::MessageReceived(_)));
        assert!(matches!(
            &events[1],
            FeedEvent::ActiveAirspacesReceived(names) if names == &["AS1".to_owned()]
        ));
        assert!(matches!(
            &events[2],
            FeedEvent::HighlightedAircraftReceived(map)
            if map.len() == 1 && map["OK123"] == TargetHighlight::Alert
        ));
    }

    #[test]
    fn test_dispatch_airspaces_only() {
        let dispatcher = FeedDispatcher::new(16);
        let mut rx = dispatcher.subscribe();

        dispatcher
            .dispatch(r#"{"activeAirspaces":["TMA1","TMA1","R22"]}"#)
            .unwrap();

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        // Order preserved, duplicates preserved
        assert!(matches!(
            &events[1],
            FeedEvent::ActiveAirspacesReceived(names)
            if names == &["TMA1".to_owned(), "TMA1".to_owned(), "R22".to_owned()]
        ));
    }

    #[test]
    fn test_dispatch_empty_object_raises_nothing_typed() {
        let dispatcher = FeedDispatcher::new(16);
        let mut rx = dispatcher.subscribe();

        dispatcher.dispatch("{}").unwrap();

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], FeedEvent::MessageReceived(_)));
    }

    #[test]
    fn test_dispatch_malformed_payload() {
        let dispatcher = FeedDispatcher::new(16);
        let mut rx = dispatcher.subscribe();

        assert!(dispatcher.dispatch("not json at all").is_err());

        // Raw text still observable, no typed events
        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], FeedEvent::MessageReceived(_)));

        // Dispatcher still works afterwards
        dispatcher.dispatch(r#"{"activeAirspaces":[]}"#).unwrap();
        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_unknown_highlight_in_payload_resolves_to_other() {
        let dispatcher = FeedDispatcher::new(16);
        let mut rx = dispatcher.subscribe();

        dispatcher
            .dispatch(r#"{"highlightedAircrafts":{"OK123":"SomethingNew"}}"#)
            .unwrap();

        let events = drain(&mut rx);
        assert!(matches!(
            &events[1],
            FeedEvent::HighlightedAircraftReceived(map)
            if map["OK123"] == TargetHighlight::Other
        ));
    }
}
