//! Server configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::Deserialize;

/// How long in-flight connections get to finish after a shutdown signal.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Listener and lifecycle settings.
///
/// Deserializable so applications can embed it in their own config file;
/// every field is optional:
///
/// ```yaml
/// host: 127.0.0.1
/// port: 3000
/// shutdown_timeout: 10s
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

impl ServerConfig {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
            shutdown_timeout: SHUTDOWN_TIMEOUT,
        }
    }
}
