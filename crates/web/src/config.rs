use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::thread;
use std::time::Duration;

use http::HeaderValue;
use miniboot_http::connection::ConnectionConfig;
use miniboot_http::protocol::DEFAULT_SERVER_NAME;
use tracing::Level;

/// Runtime settings of a [`Server`](crate::Server).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: SocketAddr,
    /// Largest accepted request body in bytes.
    pub max_body_size: usize,
    /// Time a client gets to deliver one complete request.
    pub read_timeout: Duration,
    /// Connections handled at the same time. Further connections wait for a free slot.
    pub max_workers: usize,
    /// Time in-flight connections get to finish once the server stops.
    pub shutdown_grace: Duration,
    pub server_name: HeaderValue,
    pub log_level: Level,
}

impl ServerConfig {
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig { max_body_size: self.max_body_size, read_timeout: self.read_timeout, server_name: self.server_name.clone() }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_body_size: 1_000_000,
            read_timeout: Duration::from_secs(10),
            max_workers: default_workers(),
            shutdown_grace: Duration::from_secs(5),
            server_name: HeaderValue::from_static(DEFAULT_SERVER_NAME),
            log_level: Level::INFO,
        }
    }
}

/// `max(4, 2 × available parallelism)`
pub fn default_workers() -> usize {
    let parallelism = thread::available_parallelism().map_or(1, NonZeroUsize::get);
    (parallelism * 2).max(4)
}
