//! Connection settings.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::Error;

type Result<T> = std::result::Result<T, Error>;

/// Settings for one driver connection.
///
/// Only the two addresses are required; everything else defaults to what the
/// light expects.
///
/// # Example
///
/// ```
/// use std::net::Ipv4Addr;
/// use neewer_rs::Config;
///
/// let config = Config::from_json(r#"{"device_ip": "192.168.1.40", "client_ip": "192.168.1.10"}"#).unwrap();
/// assert_eq!(config.device_port, 5052);
/// assert_eq!(config.device_addr().to_string(), "192.168.1.40:5052");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Address of the light. Datagrams from any other IP are dropped.
    pub device_ip: Ipv4Addr,
    /// Local address the light should talk back to.
    pub client_ip: Ipv4Addr,
    #[serde(default = "default_port")]
    pub device_port: u16,
    #[serde(default = "default_port")]
    pub listen_port: u16,
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    #[serde(default = "default_heartbeat_timeout_ms")]
    pub heartbeat_timeout_ms: u64,
    /// Minimum gap between two writes; the light drops back-to-back frames.
    #[serde(default = "default_write_interval_ms")]
    pub write_interval_ms: u64,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// How many times a failed write is re-queued before the message is dropped.
    #[serde(default = "default_max_write_retries")]
    pub max_write_retries: u32,
}

impl Config {
    pub const PORT: u16 = 5052;

    pub fn new(device_ip: Ipv4Addr, client_ip: Ipv4Addr) -> Self {
        Config {
            device_ip,
            client_ip,
            device_port: default_port(),
            listen_port: default_port(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            heartbeat_timeout_ms: default_heartbeat_timeout_ms(),
            write_interval_ms: default_write_interval_ms(),
            queue_capacity: default_queue_capacity(),
            max_write_retries: default_max_write_retries(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(Error::JsonLoad)
    }

    pub fn with_device_port(mut self, port: u16) -> Self {
        self.device_port = port;
        self
    }

    /// Port to listen on; `0` picks an ephemeral port.
    pub fn with_listen_port(mut self, port: u16) -> Self {
        self.listen_port = port;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.heartbeat_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_write_interval(mut self, interval: Duration) -> Self {
        self.write_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_max_write_retries(mut self, retries: u32) -> Self {
        self.max_write_retries = retries;
        self
    }

    pub fn device_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.device_ip, self.device_port))
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.client_ip, self.listen_port))
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(self.heartbeat_timeout_ms)
    }

    pub fn write_interval(&self) -> Duration {
        Duration::from_millis(self.write_interval_ms)
    }
}

fn default_port() -> u16 {
    Config::PORT
}

fn default_heartbeat_interval_ms() -> u64 {
    1000
}

fn default_heartbeat_timeout_ms() -> u64 {
    5000
}

fn default_write_interval_ms() -> u64 {
    100
}

fn default_queue_capacity() -> usize {
    10
}

fn default_max_write_retries() -> u32 {
    3
}
