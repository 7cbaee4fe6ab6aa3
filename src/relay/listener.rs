//! Edge ingest listener
//!
//! Accepts the capture engine's TCP connection, validates and queues
//! its compressed frames, and pumps the queue up to the central ingest
//! endpoint. The read loop and the uplink pump are decoupled by the
//! relay queue so a stalled uplink never blocks ingest.
//!
//! Frame validation is fail-fast: length-prefixed framing cannot
//! resynchronize after corruption, so an invalid magic or length
//! closes the connection. Sequence gaps are logged and skipped over.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use crate::error::Result;
use crate::protocol::{read_frame, FrameKind};
use crate::relay::config::RelayConfig;
use crate::relay::queue::RelayQueue;
use crate::relay::uplink::UplinkConnector;
use crate::session::SequenceTracker;
use crate::stats::MetricsWindow;

/// Events from the relay agent
///
/// Observational only; the relay runs the same with nobody listening.
#[derive(Debug)]
pub enum RelayEvent {
    /// Capture engine connected
    SensorConnected {
        /// Peer address of the capture engine
        peer: SocketAddr,
    },
    /// Capture engine stream ended (clean close or abrupt EOF)
    SensorDisconnected {
        /// Peer address of the capture engine
        peer: SocketAddr,
    },
}

/// Edge relay agent: ingest listener plus uplink pump
pub struct RelayListener {
    config: RelayConfig,
    event_tx: Option<mpsc::Sender<RelayEvent>>,
}

impl RelayListener {
    /// Create an agent with the given configuration.
    pub fn new(config: RelayConfig) -> Self {
        Self {
            config,
            event_tx: None,
        }
    }

    /// Create an agent plus a receiver for its lifecycle events.
    pub fn with_events(config: RelayConfig) -> (Self, mpsc::Receiver<RelayEvent>) {
        let (tx, rx) = mpsc::channel(256);
        (
            Self {
                config,
                event_tx: Some(tx),
            },
            rx,
        )
    }

    /// Run the accept loop.
    ///
    /// This method blocks until the process is shut down.
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(
            addr = %self.config.bind_addr,
            uplink = %self.config.uplink_addr,
            sensor = %self.config.sensor.sensor_id,
            "Relay listening for capture engine"
        );

        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    /// Run the accept loop until `shutdown` completes.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.run() => result,
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        if self.config.tcp_nodelay {
            let _ = socket.set_nodelay(true);
        }

        tracing::info!(peer = %peer_addr, "Capture engine connected");

        let config = self.config.clone();
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            if let Some(ref tx) = event_tx {
                let _ = tx.send(RelayEvent::SensorConnected { peer: peer_addr }).await;
            }

            run_session(config, socket, peer_addr).await;

            if let Some(ref tx) = event_tx {
                let _ = tx
                    .send(RelayEvent::SensorDisconnected { peer: peer_addr })
                    .await;
            }
        });
    }
}

/// Drive one capture-engine connection to completion.
///
/// The paired uplink pump task is cancelled and awaited before this
/// returns, on every exit path.
async fn run_session(config: RelayConfig, mut socket: TcpStream, peer_addr: SocketAddr) {
    let queue = Arc::new(RelayQueue::<Bytes>::new(config.queue_capacity));

    let connector = UplinkConnector::new(config.uplink_addr.clone())
        .with_handshake(config.sensor.to_json())
        .with_retry_delay(config.reconnect_delay);

    let pump = {
        let queue = Arc::clone(&queue);
        tokio::spawn(pump_uplink(queue, connector))
    };

    let mut metrics = MetricsWindow::with_interval(config.metrics_interval);
    let mut sequences = SequenceTracker::new();

    loop {
        match read_frame(&mut socket, FrameKind::Compressed).await {
            Ok(Some(frame)) => {
                if let Some(gap) = sequences.observe(frame.header.sequence) {
                    tracing::warn!(
                        peer = %peer_addr,
                        from = gap.from,
                        to = gap.to,
                        "Sequence gap"
                    );
                }

                metrics.record(frame.wire_len());
                queue.push(frame.encode()).await;

                if let Some(window) = metrics.take_if_elapsed() {
                    let queued = queue.len().await;
                    tracing::info!(
                        peer = %peer_addr,
                        frames = window.frames,
                        kib_per_sec = window.kib_per_sec(),
                        queued,
                        dropped = queue.dropped(),
                        "Ingest throughput"
                    );
                }
            }
            Ok(None) => {
                tracing::info!(peer = %peer_addr, "Capture engine disconnected");
                break;
            }
            Err(e) => {
                tracing::warn!(peer = %peer_addr, error = %e, "Closing sensor connection");
                break;
            }
        }
    }

    // Cancel and await the pump before releasing the socket
    pump.abort();
    let _ = pump.await;

    tracing::info!(peer = %peer_addr, dropped = queue.dropped(), "Relay session closed");
}

/// Forward queued frames up the link forever.
///
/// Runs until aborted by session teardown. Send failures are handled
/// inside the connector (one reconnect, one retry, then the frame is
/// dropped).
async fn pump_uplink(queue: Arc<RelayQueue<Bytes>>, connector: UplinkConnector) {
    let mut link = connector.connect_with_retry().await;
    loop {
        let payload = queue.pop().await;
        link = connector.send_with_reconnect(link, &payload).await;
    }
}
