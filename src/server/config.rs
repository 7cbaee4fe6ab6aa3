//! Server configuration

use std::net::SocketAddr;
use std::time::Duration;

use crate::protocol::constants::METRICS_WINDOW;

/// Configuration for the central fan-out server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address sensors (via their relay agents) connect to
    pub ingest_addr: SocketAddr,

    /// Address listeners connect to
    pub listener_addr: SocketAddr,

    /// Enable TCP_NODELAY on accepted connections
    pub tcp_nodelay: bool,

    /// Rolling ingest metrics interval
    pub metrics_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ingest_addr: "0.0.0.0:8000".parse().unwrap(),
            listener_addr: "0.0.0.0:8001".parse().unwrap(),
            tcp_nodelay: true,
            metrics_interval: METRICS_WINDOW,
        }
    }
}

impl ServerConfig {
    /// Set the ingest bind address.
    pub fn ingest_bind(mut self, addr: SocketAddr) -> Self {
        self.ingest_addr = addr;
        self
    }

    /// Set the listener bind address.
    pub fn listener_bind(mut self, addr: SocketAddr) -> Self {
        self.listener_addr = addr;
        self
    }

    /// Set the ingest metrics interval.
    pub fn metrics_interval(mut self, interval: Duration) -> Self {
        self.metrics_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.ingest_addr.port(), 8000);
        assert_eq!(config.listener_addr.port(), 8001);
        assert!(config.tcp_nodelay);
        assert_eq!(config.metrics_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_builder_chaining() {
        let ingest: SocketAddr = "127.0.0.1:9800".parse().unwrap();
        let listen: SocketAddr = "127.0.0.1:9801".parse().unwrap();

        let config = ServerConfig::default()
            .ingest_bind(ingest)
            .listener_bind(listen)
            .metrics_interval(Duration::from_secs(5));

        assert_eq!(config.ingest_addr, ingest);
        assert_eq!(config.listener_addr, listen);
        assert_eq!(config.metrics_interval, Duration::from_secs(5));
    }
}
