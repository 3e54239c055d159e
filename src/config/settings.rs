use serde::Deserialize;

/// Top-level configuration settings for the application.
///
/// Includes settings for the control server, the remote broker, logging and
/// the periodic counters report.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub broker: BrokerSettings,
    pub logging: LoggingSettings,
    pub report: ReportSettings,
}

/// Configuration settings for the control server.
///
/// Defines the host and port the HTTP API will bind to.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Configuration settings for the remote broker sessions connect to.
///
/// `url` is the default broker URL used when an add request does not carry
/// its own; an empty value means every request must supply one.
#[derive(Debug, Deserialize, Clone)]
pub struct BrokerSettings {
    pub url: String,
    pub connect_timeout_secs: u64,
    pub reconnect_min_delay_ms: u64,
    pub reconnect_max_delay_ms: u64,
}

/// Logging configuration. Without a `file`, logs go to the console.
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
    pub file: Option<String>,
}

/// Cadence of the counters report.
#[derive(Debug, Deserialize, Clone)]
pub struct ReportSettings {
    pub interval_secs: u64,
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub broker: Option<PartialBrokerSettings>,
    pub logging: Option<PartialLoggingSettings>,
    pub report: Option<PartialReportSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct PartialBrokerSettings {
    pub url: Option<String>,
    pub connect_timeout_secs: Option<u64>,
    pub reconnect_min_delay_ms: Option<u64>,
    pub reconnect_max_delay_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLoggingSettings {
    pub level: Option<String>,
    pub file: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PartialReportSettings {
    pub interval_secs: Option<u64>,
}

/// Provides default values for `Settings`.
///
/// Ensures the application has sensible defaults if no configuration is provided.
impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            broker: BrokerSettings {
                url: String::new(),
                connect_timeout_secs: 10,
                reconnect_min_delay_ms: 500,
                reconnect_max_delay_ms: 20_000,
            },
            logging: LoggingSettings {
                level: "info".to_string(),
                file: None,
            },
            report: ReportSettings { interval_secs: 60 },
        }
    }
}

impl Settings {
    /// Address the control server binds to.
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
