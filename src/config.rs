//! Application configuration
//!
//! Configuration is a single JSON document. Key names follow the operator's
//! existing file (`cwusername`, `qrygroup`, ...) so an old config keeps working.
//! A few secrets can be overridden from the environment after the file is read.

use crate::db::{DisplayOptions, QueryTemplates};
use crate::error::AppError;
use reqwest::Url;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "MOBILE_SEARCH_CONFIG";

/// Config file used when neither `--config` nor the env var is given
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// API login
    #[serde(flatten)]
    pub credentials: Credentials,
    /// API endpoints
    #[serde(flatten)]
    pub api: ApiConfig,
    /// Relational store connection
    #[serde(flatten)]
    pub database: DatabaseConfig,
    /// Lookup query templates
    #[serde(flatten)]
    pub queries: QueryTemplates,
    /// Table rendering limits for debug logs
    #[serde(flatten)]
    pub display: DisplayOptions,
    /// Log sinks
    #[serde(flatten)]
    pub logging: LoggingConfig,
    /// Template body for the update call
    pub payload: Map<String, Value>,
}

/// Credentials exchanged for a session token
#[derive(Clone, Deserialize)]
pub struct Credentials {
    /// API login name
    #[serde(rename = "cwusername")]
    pub username: String,
    /// API password
    #[serde(rename = "cwpassword")]
    pub password: String,
    /// Token lifetime hint, forwarded verbatim to the auth endpoint
    #[serde(rename = "cwexpires")]
    pub expires: Value,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("expires", &self.expires)
            .finish()
    }
}

/// Remote API endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Site URL, only shown to the operator
    #[serde(rename = "cwsite", default)]
    pub site: String,
    /// Authentication endpoint
    #[serde(rename = "cwauthurl")]
    pub auth_url: String,
    /// Mobile search update endpoint
    #[serde(rename = "cwapiurl")]
    pub api_url: String,
}

/// Relational store connection settings
///
/// Either `sqlurl` is given as a full sqlx URL, or the URL is assembled from
/// the individual parts.
#[derive(Clone, Default, Deserialize)]
pub struct DatabaseConfig {
    /// Full connection URL, wins over the parts below
    #[serde(rename = "sqlurl", default)]
    pub url: Option<String>,
    /// Driver / URL scheme: `sqlite`, `postgres` or `mysql`
    #[serde(rename = "sqldriver", default)]
    pub driver: Option<String>,
    /// Host (and optional port)
    #[serde(rename = "sqlserver", default)]
    pub server: Option<String>,
    /// Database name, or file path for SQLite
    #[serde(rename = "sqldatabase", default)]
    pub database: Option<String>,
    /// Login name
    #[serde(rename = "sqlusername", default)]
    pub username: Option<String>,
    /// Login password
    #[serde(rename = "sqlpassword", default)]
    pub password: Option<String>,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url.as_ref().map(|_| "[REDACTED]"))
            .field("driver", &self.driver)
            .field("server", &self.server)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl DatabaseConfig {
    /// Build the sqlx connection URL
    ///
    /// # Errors
    /// * `AppError::Config` if no URL can be built from the settings
    pub fn connection_url(&self) -> Result<String, AppError> {
        if let Some(url) = self.url.as_deref().filter(|u| !u.trim().is_empty()) {
            return Ok(url.to_string());
        }

        let driver = self
            .driver
            .as_deref()
            .map(|d| d.trim().to_ascii_lowercase())
            .unwrap_or_default();
        let database = self.database.as_deref().unwrap_or_default();

        match driver.as_str() {
            "" => Err(AppError::Config(
                "neither sqlurl nor sqldriver is set".to_string(),
            )),
            "sqlite" => {
                if database.is_empty() {
                    return Err(AppError::Config(
                        "sqldatabase must name the SQLite file".to_string(),
                    ));
                }
                Ok(format!("sqlite://{}", database))
            }
            "postgres" | "postgresql" | "mysql" | "mariadb" => {
                let scheme = if driver == "mariadb" { "mysql" } else { driver.as_str() };
                let server = self
                    .server
                    .as_deref()
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| AppError::Config("sqlserver is not set".to_string()))?;

                let mut url = Url::parse(&format!("{}://{}/{}", scheme, server, database))
                    .map_err(|e| AppError::Config(format!("Invalid database address: {}", e)))?;
                if let Some(user) = self.username.as_deref().filter(|u| !u.is_empty()) {
                    url.set_username(user).map_err(|_| {
                        AppError::Config("sqlusername cannot be set on this URL".to_string())
                    })?;
                }
                if let Some(password) = self.password.as_deref().filter(|p| !p.is_empty()) {
                    url.set_password(Some(password)).map_err(|_| {
                        AppError::Config("sqlpassword cannot be set on this URL".to_string())
                    })?;
                }
                Ok(url.to_string())
            }
            other => Err(AppError::Config(format!(
                "Unsupported sqldriver '{}'; set sqlurl to a sqlite://, postgres:// or mysql:// URL",
                other
            ))),
        }
    }
}

/// Log sink configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log file path (appended to)
    #[serde(rename = "logfile")]
    pub file: PathBuf,
    /// Level of the file sink
    #[serde(rename = "loglevel")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("mobile-search-sync.log"),
            level: "debug".to_string(),
        }
    }
}

impl Config {
    /// Pick the config file: explicit path, then `MOBILE_SEARCH_CONFIG`, then `config.json`
    pub fn resolve_path(explicit: Option<PathBuf>) -> PathBuf {
        explicit
            .or_else(|| env::var_os(CONFIG_PATH_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Load, override from the environment, and validate
    ///
    /// # Errors
    /// * `AppError::Config` if the file cannot be read, parsed or validated
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_json(&raw)?;
        config.apply_overrides(|key| env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a config document without touching the environment
    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        serde_json::from_str(raw)
            .map_err(|e| AppError::Config(format!("Invalid config document: {}", e)))
    }

    /// Replace secrets with values from `lookup` (`CW_PASSWORD`, `SQL_PASSWORD`, `DATABASE_URL`)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(password) = lookup("CW_PASSWORD") {
            self.credentials.password = password;
        }
        if let Some(password) = lookup("SQL_PASSWORD") {
            self.database.password = Some(password);
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = Some(url);
        }
    }

    /// Check required settings are present
    pub fn validate(&self) -> Result<(), AppError> {
        if self.credentials.username.trim().is_empty() {
            return Err(AppError::Config("cwusername cannot be empty".to_string()));
        }
        if self.api.auth_url.trim().is_empty() {
            return Err(AppError::Config("cwauthurl cannot be empty".to_string()));
        }
        if self.api.api_url.trim().is_empty() {
            return Err(AppError::Config("cwapiurl cannot be empty".to_string()));
        }
        self.queries.validate()?;
        self.database.connection_url()?;
        Ok(())
    }
}
