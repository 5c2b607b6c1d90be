use std::{fmt, str::FromStr};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Completely disables logging
    Off,
    /// Only errors from the microservice
    Error,
    /// Warnings and errors from the microservice
    Warn,
    /// Info, warning and error messages from the microservice
    #[default]
    Info,
    /// Debug, info, warning and error messages from all dependencies
    Debug,
    /// Trace, debug, info, warning and error messages from all dependencies
    Trace,
}

impl LogLevel {
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "graphql_microservice=error,off",
            LogLevel::Warn => "graphql_microservice=warn,off",
            LogLevel::Info => "graphql_microservice=info,off",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl AsRef<str> for LogLevel {
    fn as_ref(&self) -> &str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl FromStr for LogLevel {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" => Ok(LogLevel::Off),
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(crate::Error::Telemetry(format!("unknown log level `{other}`"))),
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStyle {
    /// Standard text
    #[default]
    Text,
    /// JSON objects
    Json,
}

/// Installs the global tracing subscriber, writing to stdout.
pub fn init(level: LogLevel, style: LogStyle) -> crate::Result<()> {
    let env_filter = EnvFilter::new(level.as_filter_str());

    let text = (style == LogStyle::Text).then(tracing_subscriber::fmt::layer);
    let json = (style == LogStyle::Json).then(|| tracing_subscriber::fmt::layer().json());

    tracing_subscriber::registry()
        .with(text)
        .with(json)
        .with(env_filter)
        .try_init()
        .map_err(|err| crate::Error::Telemetry(err.to_string()))
}
