//! Fan-out server listener
//!
//! Runs the two central accept loops: sensors (via their relay
//! agents) on the ingest address, listeners on the listener address.
//! Each connection is driven by its own task; a failing session never
//! takes the server down.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use crate::error::Result;
use crate::hub::{BroadcastHub, ListenerMessage};
use crate::protocol::{handshake, JoinRequest};
use crate::server::config::ServerConfig;
use crate::server::ingest;
use crate::server::{opus_decoder_factory, DecoderFactory};

/// Central fan-out server
pub struct FanoutServer {
    config: ServerConfig,
    hub: Arc<BroadcastHub>,
    make_decoder: Arc<DecoderFactory>,
    next_session_id: AtomicU64,
}

impl FanoutServer {
    /// Server with the given configuration and the Opus decoder.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_decoder_factory(config, Arc::new(opus_decoder_factory))
    }

    /// Server with a custom decoder factory.
    pub fn with_decoder_factory(config: ServerConfig, make_decoder: Arc<DecoderFactory>) -> Self {
        Self {
            config,
            hub: Arc::new(BroadcastHub::new()),
            make_decoder,
            next_session_id: AtomicU64::new(1),
        }
    }

    /// The broadcast hub.
    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }

    /// Run both accept loops.
    ///
    /// This method blocks until the server is shut down.
    pub async fn run(&self) -> Result<()> {
        let ingest = TcpListener::bind(self.config.ingest_addr).await?;
        let listeners = TcpListener::bind(self.config.listener_addr).await?;

        tracing::info!(
            ingest = %self.config.ingest_addr,
            listeners = %self.config.listener_addr,
            "Fan-out server listening"
        );

        self.accept_loop(&ingest, &listeners).await
    }

    /// Run both accept loops until `shutdown` completes.
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

    async fn accept_loop(&self, ingest: &TcpListener, listeners: &TcpListener) -> Result<()> {
        loop {
            tokio::select! {
                accepted = ingest.accept() => match accepted {
                    Ok((socket, peer_addr)) => self.spawn_ingest(socket, peer_addr),
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to accept sensor connection");
                    }
                },
                accepted = listeners.accept() => match accepted {
                    Ok((socket, peer_addr)) => self.spawn_listener(socket, peer_addr),
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to accept listener connection");
                    }
                },
            }
        }
    }

    fn spawn_ingest(&self, socket: TcpStream, peer_addr: SocketAddr) {
        if self.config.tcp_nodelay {
            let _ = socket.set_nodelay(true);
        }

        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(session_id, peer = %peer_addr, "New sensor connection");

        let hub = Arc::clone(&self.hub);
        let make_decoder = Arc::clone(&self.make_decoder);
        let interval = self.config.metrics_interval;

        tokio::spawn(async move {
            if let Err(e) =
                ingest::run_ingest_session(socket, session_id, &hub, make_decoder.as_ref(), interval)
                    .await
            {
                tracing::debug!(session_id, error = %e, "Sensor connection error");
            }
            tracing::debug!(session_id, "Sensor connection closed");
        });
    }

    fn spawn_listener(&self, socket: TcpStream, peer_addr: SocketAddr) {
        if self.config.tcp_nodelay {
            let _ = socket.set_nodelay(true);
        }

        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(session_id, peer = %peer_addr, "New listener connection");

        let hub = Arc::clone(&self.hub);

        tokio::spawn(async move {
            if let Err(e) = run_listener_session(socket, session_id, &hub).await {
                tracing::debug!(session_id, error = %e, "Listener connection error");
            }
            tracing::debug!(session_id, "Listener connection closed");
        });
    }
}

/// Drive one listener connection to completion.
///
/// Reads the join line, registers with the hub, then forwards hub
/// messages to the socket until the client leaves, a write fails, or
/// the hub evicts the subscriber. Leaves the hub on every exit path.
pub(super) async fn run_listener_session<S>(
    stream: S,
    session_id: u64,
    hub: &BroadcastHub,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut reader, mut writer) = tokio::io::split(stream);

    let join: JoinRequest = handshake::read_json_line(&mut reader).await?;
    let (subscriber_id, mut rx) = hub.join(&join.sensor_id).await;

    tracing::info!(
        session_id,
        sensor = %join.sensor_id,
        subscriber = subscriber_id,
        "Listener joined"
    );

    let result = forward_messages(&mut reader, &mut writer, &mut rx).await;

    hub.leave(&join.sensor_id, subscriber_id).await;
    tracing::info!(session_id, sensor = %join.sensor_id, "Listener left");

    result
}

async fn forward_messages<R, W>(
    reader: &mut R,
    writer: &mut W,
    rx: &mut mpsc::Receiver<ListenerMessage>,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut scratch = [0u8; 64];

    loop {
        tokio::select! {
            msg = rx.recv() => match msg {
                Some(ListenerMessage::Config(config)) => {
                    handshake::write_json_line(writer, &config).await?;
                    writer.flush().await?;
                }
                Some(ListenerMessage::Frame(wire)) => {
                    writer.write_all(&wire).await?;
                }
                // Channel closed: the hub evicted this subscriber
                None => return Ok(()),
            },
            read = reader.read(&mut scratch) => match read {
                Ok(0) => return Ok(()),
                // Listeners may send keepalive chatter; it is ignored
                Ok(_) => {}
                Err(e) => return Err(e.into()),
            },
        }
    }
}
