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

//! Async UDP listener for the highlight/airspace feed.
//!
//! Binds a socket, then receives datagrams in a background task. Each
//! datagram is decoded as UTF-8 text and delivered through the handle's
//! channel. A bad datagram or a transient socket error never stops the
//! receive loop; only shutdown (or dropping the handle) does.

use std::net::SocketAddr;

use log::{info, warn};
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Largest datagram we accept. Datagrams beyond the transport MTU are not
/// reassembled; anything longer than this is truncated by the OS.
const MAX_DATAGRAM_SIZE: usize = 8192;

/// Fatal socket setup failure, surfaced to the caller of [`UdpListener::bind`].
#[derive(Debug, Error)]
pub enum NetworkSetupError {
    #[error("failed to bind UDP socket on port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration for the UDP listener.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Port to listen on (all interfaces).
    pub port: u16,
    /// Channel buffer size for received messages.
    pub buffer_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            port: 52000,
            buffer_size: 256,
        }
    }
}

/// A bound feed socket, ready to start receiving.
///
/// Binding and listening are separate steps so that a bind failure is
/// reported synchronously to the caller while the receive loop itself
/// runs detached.
#[derive(Debug)]
pub struct UdpListener {
    socket: UdpSocket,
    buffer_size: usize,
}

impl UdpListener {
    /// Bind the feed socket.
    ///
    /// Binding failure is fatal for the feed and is returned to the caller;
    /// there is no retry here.
    pub async fn bind(config: ListenerConfig) -> Result<Self, NetworkSetupError> {
        let socket = UdpSocket::bind(("0.0.0.0", config.port))
            .await
            .map_err(|e| NetworkSetupError::Bind {
                port: config.port,
                source: e,
            })?;

        info!("Feed listener bound on port {}", config.port);

        Ok(Self {
            socket,
            buffer_size: config.buffer_size,
        })
    }

    /// The locally bound address (useful when binding port 0).
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Start the receive loop on a background task.
    ///
    /// Returns a handle for receiving decoded messages and shutting the
    /// loop down. The loop runs until the handle is shut down or dropped.
    #[must_use]
    pub fn spawn(self) -> ListenerHandle {
        let (message_tx, message_rx) = mpsc::channel(self.buffer_size);
        let cancel_token = CancellationToken::new();

        let task_cancel = cancel_token.clone();
        tokio::spawn(async move {
            receive_loop(self.socket, message_tx, task_cancel).await;
        });

        ListenerHandle {
            message_rx,
            cancel_token,
        }
    }
}

/// Handle to a running feed listener.
///
/// Use `recv()` to receive decoded message text in receipt order. The
/// receive task is cancelled when the handle is shut down or dropped.
pub struct ListenerHandle {
    message_rx: mpsc::Receiver<String>,
    cancel_token: CancellationToken,
}

impl std::fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("cancel_token", &self.cancel_token)
            .finish_non_exhaustive()
    }
}

impl ListenerHandle {
    /// Receive the next message from the feed.
    ///
    /// Returns `None` after the listener has been shut down.
    pub async fn recv(&mut self) -> Option<String> {
        self.message_rx.recv().await
    }

    /// Stop the receive loop.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }

    /// Token cancelled when the listener shuts down. Lets an owner stop
    /// the loop after the handle has been moved into a pump task.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

async fn receive_loop(
    socket: UdpSocket,
    message_tx: mpsc::Sender<String>,
    cancel_token: CancellationToken,
) {
    let mut buffer = [0u8; MAX_DATAGRAM_SIZE];

    loop {
        tokio::select! {
            recv_result = socket.recv_from(&mut buffer) => {
                match recv_result {
                    Ok((len, peer)) => {
                        match std::str::from_utf8(&buffer[..len]) {
                            Ok(text) => {
                                if message_tx.send(text.to_owned()).await.is_err() {
                                    // Receiver dropped
                                    return;
                                }
                            }
                            Err(e) => {
                                warn!("Dropping non-UTF-8 datagram from {}: {}", peer, e);
                            }
                        }
                    }
                    Err(e) => {
                        warn!("Feed receive error: {}", e);
                    }
                }
            }

            () = cancel_token.cancelled() => {
                info!("Feed listener cancelled");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ListenerConfig::default();
        assert_eq!(config.port, 52000);
        assert_eq!(config.buffer_size, 256);
    }

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let listener = UdpListener::bind(ListenerConfig {
            port: 0,
            ..Default::default()
        })
        .await
        .unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn test_receive_datagram() {
        let listener = UdpListener::bind(ListenerConfig {
            port: 0,
            ..Default::default()
        })
        .await
        .unwrap();
        let addr = listener.local_addr().unwrap();
        let mut handle = listener.spawn();

        let sender = UdpSocket::bind(("127.0.0.1", 0)).await.unwrap();
        sender
            .send_to(b"hello feed", ("127.0.0.1", addr.port()))
            .await
            .unwrap();

        let message = handle.recv().await.unwrap();
        assert_eq!(message, "hello feed");
    }

    #[tokio::test]
    async fn test_bad_datagram_does_not_stop_loop() {
        let listener = UdpListener::bind(ListenerConfig {
            port: 0,
            ..Default::default()
        })
        .await
        .unwrap();
        let addr = listener.local_addr().unwrap();
        let mut handle = listener.spawn();

        let sender = UdpSocket::bind(("127.0.0.1", 0)).await.unwrap();
        // Invalid UTF-8, then a valid message. Only the valid one arrives.
        sender
            .send_to(&[0xff, 0xfe, 0xfd], ("127.0.0.1", addr.port()))
            .await
            .unwrap();
        sender
            .send_to(b"still alive", ("127.0.0.1", addr.port()))
            .await
            .unwrap();

        let message = handle.recv().await.unwrap();
        assert_eq!(message, "still alive");
    }
}
