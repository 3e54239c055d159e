mod settings;

use crate::config::settings::PartialSettings;
use config::{Config, ConfigError, Environment, File};

pub use settings::{BrokerSettings, LoggingSettings, ReportSettings, ServerSettings, Settings};

/// Default configuration file, resolved relative to the working directory.
/// Any extension the `config` crate understands (toml, yaml, json) is accepted.
pub const DEFAULT_CONFIG_PATH: &str = "config/default";

/// Prefix of environment variables that override file settings,
/// e.g. `SUBSWARM__BROKER__URL`.
pub const ENV_PREFIX: &str = "SUBSWARM";

/// Loads the configuration from `path` and environment variables
/// Merges the configuration with default values
/// Returns a `Settings` struct containing every section
pub fn load_config_from(path: &str) -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    // Merge with defaults
    let default = Settings::default();

    let server = partial.server;
    let broker = partial.broker;
    let logging = partial.logging;
    let report = partial.report;

    Ok(Settings {
        server: ServerSettings {
            host: server
                .as_ref()
                .and_then(|s| s.host.clone())
                .unwrap_or(default.server.host),
            port: server
                .as_ref()
                .and_then(|s| s.port)
                .unwrap_or(default.server.port),
        },
        broker: BrokerSettings {
            url: broker
                .as_ref()
                .and_then(|b| b.url.clone())
                .unwrap_or(default.broker.url),
            connect_timeout_secs: broker
                .as_ref()
                .and_then(|b| b.connect_timeout_secs)
                .unwrap_or(default.broker.connect_timeout_secs),
            reconnect_min_delay_ms: broker
                .as_ref()
                .and_then(|b| b.reconnect_min_delay_ms)
                .unwrap_or(default.broker.reconnect_min_delay_ms),
            reconnect_max_delay_ms: broker
                .as_ref()
                .and_then(|b| b.reconnect_max_delay_ms)
                .unwrap_or(default.broker.reconnect_max_delay_ms),
        },
        logging: LoggingSettings {
            level: logging
                .as_ref()
                .and_then(|l| l.level.clone())
                .unwrap_or(default.logging.level),
            file: logging
                .as_ref()
                .and_then(|l| l.file.clone())
                .filter(|f| !f.is_empty())
                .or(default.logging.file),
        },
        report: ReportSettings {
            interval_secs: report
                .as_ref()
                .and_then(|r| r.interval_secs)
                .filter(|secs| *secs > 0)
                .unwrap_or(default.report.interval_secs),
        },
    })
}
