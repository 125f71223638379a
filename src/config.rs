use std::{net::SocketAddr, time::Duration};

use thiserror::Error;
use tokio::net::lookup_host;

pub const DEFAULT_BIND: &str = "127.0.0.1:2053";
pub const DEFAULT_MAX_IN_FLIGHT: usize = 64;
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("The resolver address {addr:?} is not a valid host:port: {source}")]
    InvalidResolver {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("The resolver address {0:?} did not resolve to any address")]
    UnresolvedResolver(String),
    #[error("At least one request must be allowed in flight")]
    NoRequestsInFlight,
    #[error("The upstream timeout must be longer than zero")]
    ZeroTimeout,
}

/// Settings fixed at startup and shared read-only by everything that handles requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind: SocketAddr,
    /// Where questions are forwarded. `None` answers every question locally.
    pub resolver: Option<SocketAddr>,
    pub max_in_flight: usize,
    pub upstream_timeout: Duration,
}

impl Config {
    pub async fn new(
        bind: SocketAddr,
        resolver: Option<&str>,
        max_in_flight: usize,
        upstream_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        if max_in_flight == 0 {
            return Err(ConfigError::NoRequestsInFlight);
        }
        if upstream_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        let resolver = match resolver.map(str::trim) {
            None | Some("") => None,
            Some(addr) => Some(resolve_upstream(addr).await?),
        };
        Ok(Self {
            bind,
            resolver,
            max_in_flight,
            upstream_timeout,
        })
    }
}

/// Turns a `host:port` string into the address queries are sent to. Literal addresses are taken
/// as is; host names are looked up once and the first address wins.
pub async fn resolve_upstream(addr: &str) -> Result<SocketAddr, ConfigError> {
    if let Ok(parsed) = addr.parse::<SocketAddr>() {
        return Ok(parsed);
    }
    let mut resolved = lookup_host(addr)
        .await
        .map_err(|source| ConfigError::InvalidResolver {
            addr: addr.to_string(),
            source,
        })?;
    resolved
        .next()
        .ok_or_else(|| ConfigError::UnresolvedResolver(addr.to_string()))
}
