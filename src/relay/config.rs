//! Relay agent configuration

use std::net::SocketAddr;
use std::time::Duration;

use crate::protocol::constants::{DEFAULT_QUEUE_CAPACITY, METRICS_WINDOW, RECONNECT_DELAY};
use crate::protocol::SensorConfig;

/// Configuration for the edge relay agent
///
/// The agent owns the sensor identity and session parameters; the
/// capture engine it accepts connections from sends raw frames only.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address the capture engine connects to
    pub bind_addr: SocketAddr,

    /// Central ingest endpoint (host:port)
    pub uplink_addr: String,

    /// Sensor identity and session parameters sent as the uplink
    /// handshake
    pub sensor: SensorConfig,

    /// Relay queue capacity (frames)
    pub queue_capacity: usize,

    /// Fixed delay between uplink reconnect attempts
    pub reconnect_delay: Duration,

    /// Rolling throughput log interval
    pub metrics_interval: Duration,

    /// Enable TCP_NODELAY on accepted connections
    pub tcp_nodelay: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:9000".parse().unwrap(),
            uplink_addr: "127.0.0.1:8000".to_string(),
            sensor: SensorConfig::opus("ANE1", 48_000, 1),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            reconnect_delay: RECONNECT_DELAY,
            metrics_interval: METRICS_WINDOW,
            tcp_nodelay: true,
        }
    }
}

impl RelayConfig {
    /// Set the bind address.
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the uplink target.
    pub fn uplink(mut self, addr: impl Into<String>) -> Self {
        self.uplink_addr = addr.into();
        self
    }

    /// Set the sensor identity and session parameters.
    pub fn sensor(mut self, sensor: SensorConfig) -> Self {
        self.sensor = sensor;
        self
    }

    /// Set the relay queue capacity.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the uplink reconnect delay.
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();

        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.queue_capacity, 200);
        assert_eq!(config.reconnect_delay, Duration::from_secs(2));
        assert_eq!(config.sensor.codec, "opus");
        assert!(config.tcp_nodelay);
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:9100".parse().unwrap();
        let config = RelayConfig::default()
            .bind(addr)
            .uplink("relay.example:8000")
            .sensor(SensorConfig::opus("d8:3a:dd:f7:1a:cc", 48_000, 2))
            .queue_capacity(50)
            .reconnect_delay(Duration::from_millis(500));

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.uplink_addr, "relay.example:8000");
        assert_eq!(config.sensor.sensor_id, "d8:3a:dd:f7:1a:cc");
        assert_eq!(config.sensor.channels, 2);
        assert_eq!(config.queue_capacity, 50);
        assert_eq!(config.reconnect_delay, Duration::from_millis(500));
    }
}
