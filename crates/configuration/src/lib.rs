use crate::error::ConfigError;
use config::{Environment, File, FileFormat};
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_tracing;
pub use settings::{
    ExchangeConfig, HubConfig, LoggingConfig, ServerConfig, ServerOverrides, Settings, StoreConfig,
};

/// The configuration file read when no explicit path is given. It is optional.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Loads the application configuration.
///
/// Sources, lowest precedence first: built-in defaults, the TOML file,
/// `HOOKLINE__SECTION__KEY` environment variables, and finally the plain
/// `PORT`, `BINANCE_API_KEY` and `BINANCE_API_SECRET` variables.
/// An explicitly named file must exist; the default one may be absent.
pub fn load_config(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let file = match path {
        Some(path) => File::from(path).required(true),
        None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
    };

    let builder = config::Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix("HOOKLINE")
                .separator("__")
                .try_parsing(true),
        )
        .set_override_option("server.port", std::env::var("PORT").ok())?
        .set_override_option("exchange.api_key", std::env::var("BINANCE_API_KEY").ok())?
        .set_override_option(
            "exchange.api_secret",
            std::env::var("BINANCE_API_SECRET").ok(),
        )?;

    settings_from(builder)
}

/// Parses settings from TOML text, without consulting the environment.
pub fn load_config_from_str(toml: &str) -> Result<Settings, ConfigError> {
    settings_from(config::Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
}

fn settings_from(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> Result<Settings, ConfigError> {
    let settings = builder.build()?.try_deserialize::<Settings>()?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn empty_configuration_uses_defaults() {
        let settings = load_config_from_str("").unwrap();
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.store.capacity, 100);
        assert_eq!(settings.hub.subscriber_buffer, 64);
        assert_eq!(settings.logging.level, "info");
        assert!(!settings.exchange.is_configured());
    }

    #[test]
    fn file_values_override_defaults() {
        let settings = load_config_from_str(
            r#"
            [server]
            host = "127.0.0.1"
            port = 8080

            [store]
            capacity = 25

            [exchange]
            api_key = "key"
            api_secret = "secret"
            "#,
        )
        .unwrap();

        assert_eq!(settings.server.socket_addr().to_string(), "127.0.0.1:8080");
        assert_eq!(settings.store.capacity, 25);
        assert_eq!(settings.hub.subscriber_buffer, 64);
        assert!(settings.exchange.is_configured());
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let err = load_config_from_str("[store]\ncapacity = 0").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn cli_overrides_win() {
        let mut settings = Settings::default();
        settings.apply_overrides(&ServerOverrides {
            host: Some(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            port: Some(9000),
        });
        assert_eq!(settings.server.socket_addr().to_string(), "127.0.0.1:9000");
    }
}
