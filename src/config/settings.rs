//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::ConfigError;

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Database connection parameters.
    #[serde(default)]
    pub connection: ConnectionParams,

    /// Tool-server process settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// DeepSeek completion API settings.
    #[serde(default)]
    pub deepseek: DeepSeekConfig,

    /// Deadline for each tool call's reply, in seconds.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.command.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "server.command must not be empty".to_string(),
            });
        }
        if self.connection.port == 0 {
            return Err(ConfigError::ValidationError {
                message: "connection.port must not be 0".to_string(),
            });
        }
        if self.call_timeout_secs == 0 {
            return Err(ConfigError::ValidationError {
                message: "call_timeout_secs must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            _schema: None,
            _comment: None,
            connection: ConnectionParams::default(),
            server: ServerConfig::default(),
            deepseek: DeepSeekConfig::default(),
            call_timeout_secs: default_call_timeout_secs(),
            logging: LoggingConfig::default(),
        }
    }
}

const fn default_call_timeout_secs() -> u64 {
    30
}

/// Database connection parameters, handed to the tool server both as
/// environment variables at spawn time and as `connect_db` arguments.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionParams {
    /// Database host.
    #[serde(default = "default_host")]
    pub host: String,

    /// Database user.
    #[serde(default = "default_user")]
    pub user: String,

    /// Database password.
    #[serde(default = "default_password")]
    pub password: String,

    /// Database name.
    #[serde(default = "default_database")]
    pub database: String,

    /// Database port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ConnectionParams {
    /// Returns the environment variables the tool server expects.
    #[must_use]
    pub fn env(&self) -> HashMap<String, String> {
        HashMap::from([
            ("MYSQL_HOST".to_string(), self.host.clone()),
            ("MYSQL_USER".to_string(), self.user.clone()),
            ("MYSQL_PASSWORD".to_string(), self.password.clone()),
            ("MYSQL_DATABASE".to_string(), self.database.clone()),
            ("MYSQL_PORT".to_string(), self.port.to_string()),
        ])
    }
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self {
            host: default_host(),
            user: default_user(),
            password: default_password(),
            database: default_database(),
            port: default_port(),
        }
    }
}

// The password must never reach logs or error output.
impl std::fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("port", &self.port)
            .finish()
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_user() -> String {
    "root".to_string()
}

fn default_password() -> String {
    "root".to_string()
}

fn default_database() -> String {
    "selldata".to_string()
}

const fn default_port() -> u16 {
    3306
}

/// Tool-server process settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Executable to spawn.
    #[serde(default = "default_server_command")]
    pub command: String,

    /// Arguments passed to the executable.
    #[serde(default = "default_server_args")]
    pub args: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            command: default_server_command(),
            args: default_server_args(),
        }
    }
}

fn default_server_command() -> String {
    "node".to_string()
}

fn default_server_args() -> Vec<String> {
    vec!["build/index.js".to_string()]
}

/// DeepSeek completion API settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeepSeekConfig {
    /// API key; falls back to the `DEEPSEEK_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Completion model name.
    #[serde(default = "default_model")]
    pub model: String,

    /// Completion endpoint URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

impl Default for DeepSeekConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            api_url: default_api_url(),
        }
    }
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

fn default_api_url() -> String {
    "https://api.deepseek.com/v1/chat/completions".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
