use crate::error::ConfigError;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// The root configuration structure for the entire application.
///
/// Every section has defaults, so an empty configuration is a valid one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub hub: HubConfig,
    pub exchange: ExchangeConfig,
    pub logging: LoggingConfig,
}

/// Where and how the HTTP server listens.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Largest accepted webhook body.
    pub body_limit_bytes: usize,
}

/// Contains parameters for the in-memory event history.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// The number of most recent events retained.
    pub capacity: usize,
}

/// Contains parameters for the live broadcast hub.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// How many frames a subscriber may fall behind before it is disconnected.
    pub subscriber_buffer: usize,
}

/// Credentials and endpoint for the signed exchange proxy.
/// Leaving the key or secret empty disables the proxy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    pub base_url: String,
    pub api_key: String,
    pub api_secret: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// An `EnvFilter` directive, overridden by `RUST_LOG` when set.
    pub level: String,
    /// When set, logs are also written to a daily rolling file in this directory.
    pub directory: Option<String>,
}

// --- Default Implementations ---

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3000,
            body_limit_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { capacity: 100 }
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self { subscriber_buffer: 64 }
    }
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://fapi.binance.com".to_string(),
            api_key: String::new(),
            api_secret: String::new(),
            timeout_secs: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl ExchangeConfig {
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.api_secret.is_empty()
    }
}

/// Command-line overrides for the server section.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "clap", derive(clap::Args))]
pub struct ServerOverrides {
    /// The address to bind (e.g., "127.0.0.1").
    #[cfg_attr(feature = "clap", arg(long))]
    pub host: Option<IpAddr>,

    /// The port to listen on.
    #[cfg_attr(feature = "clap", arg(long, short))]
    pub port: Option<u16>,
}

impl Settings {
    pub fn apply_overrides(&mut self, overrides: &ServerOverrides) {
        if let Some(host) = overrides.host {
            self.server.host = host;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.capacity == 0 {
            return Err(ConfigError::ValidationError(
                "store.capacity must be at least 1".to_string(),
            ));
        }
        if self.hub.subscriber_buffer == 0 {
            return Err(ConfigError::ValidationError(
                "hub.subscriber_buffer must be at least 1".to_string(),
            ));
        }
        if self.exchange.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "exchange.timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
