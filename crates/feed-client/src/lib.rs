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

//! Client library for the UDP highlight/airspace feed.
//!
//! A third-party operational system broadcasts plain-text JSON datagrams
//! naming currently active airspaces and aircraft to visually emphasize.
//! This crate receives that feed and republishes it as typed events. The
//! layers can be used independently or composed together:
//!
//! - **Listener layer**: async UDP receive loop with per-datagram failure
//!   isolation
//! - **Dispatch layer**: payload deserialization and typed event publication
//!
//! # Quick Start
//!
//! Use [`FeedClient`] for full-stack operation:
//!
//! ```no_run
//! use feed_client::{FeedClient, FeedEvent, ListenerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), feed_client::NetworkSetupError> {
//!     let client = FeedClient::connect(ListenerConfig::default()).await?;
//!     let mut events = client.subscribe();
//!
//!     while let Ok(event) = events.recv().await {
//!         match event {
//!             FeedEvent::ActiveAirspacesReceived(names) => {
//!                 println!("active airspaces: {:?}", names);
//!             }
//!             FeedEvent::HighlightedAircraftReceived(map) => {
//!                 println!("highlighted aircraft: {:?}", map);
//!             }
//!             FeedEvent::MessageReceived(_) => {}
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Using Individual Layers
//!
//! The dispatcher works without a socket, which is how the parsing
//! contract is tested:
//!
//! ```
//! use feed_client::FeedDispatcher;
//!
//! let dispatcher = FeedDispatcher::new(16);
//! let mut events = dispatcher.subscribe();
//! dispatcher.dispatch(r#"{"activeAirspaces":["TMA1"]}"#).unwrap();
//! ```

pub mod dispatch;
pub mod udp;

use log::debug;
use tokio::sync::broadcast;

pub use dispatch::{
    DeserializationError, FeedDispatcher, FeedEvent, FeedMessage, TargetHighlight,
};
pub use udp::{ListenerConfig, ListenerHandle, NetworkSetupError, UdpListener};

/// Event channel capacity used by [`FeedClient::connect`].
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Full-stack feed client that wires the listener and dispatcher together.
///
/// A background task pumps decoded datagrams from the listener into the
/// dispatcher; subscribers receive [`FeedEvent`]s in receipt order, with
/// no batching. Parse failures are contained inside the pump — the feed's
/// availability outranks any single message's correctness.
pub struct FeedClient {
    dispatcher: std::sync::Arc<FeedDispatcher>,
    listener_cancel: tokio_util::sync::CancellationToken,
}

impl std::fmt::Debug for FeedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedClient").finish_non_exhaustive()
    }
}

impl FeedClient {
    /// Bind the feed socket and start the receive/dispatch pump.
    ///
    /// Binding failure is fatal and returned to the caller.
    pub async fn connect(config: ListenerConfig) -> Result<Self, NetworkSetupError> {
        let listener = UdpListener::bind(config).await?;
        Ok(Self::from_listener(listener))
    }

    /// Start the pump on an already-bound listener.
    #[must_use]
    pub fn from_listener(listener: UdpListener) -> Self {
        let dispatcher = std::sync::Arc::new(FeedDispatcher::new(EVENT_CHANNEL_CAPACITY));
        let mut handle = listener.spawn();
        let listener_cancel = handle.cancellation_token();

        let pump_dispatcher = std::sync::Arc::clone(&dispatcher);
        tokio::spawn(async move {
            // recv() returns None once the listener is cancelled
            while let Some(message) = handle.recv().await {
                if pump_dispatcher.dispatch(&message).is_err() {
                    debug!("Feed pump dropped a malformed message");
                }
            }
        });

        Self {
            dispatcher,
            listener_cancel,
        }
    }

    /// Subscribe to feed events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.dispatcher.subscribe()
    }

    /// Shut down the listener and pump.
    pub fn shutdown(&self) {
        self.listener_cancel.cancel();
    }
}

impl Drop for FeedClient {
    fn drop(&mut self) {
        self.listener_cancel.cancel();
    }
}
