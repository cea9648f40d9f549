//! Configuration management
//!
//! Configuration is read from `config.yml` and can be overridden with
//! `PARANEWS_*` environment variables. Missing values fall back to defaults;
//! the merged result is checked by [`Config::validate`] before use.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origin of the public website allowed by CORS; `*` allows any
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// File path or `sqlite:` URL for SQLite, `mysql://` URL for MySQL
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Pool size; each driver has its own default
    #[serde(default)]
    pub max_connections: Option<u32>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
            max_connections: None,
        }
    }
}

impl DatabaseConfig {
    pub fn pool_size(&self) -> u32 {
        self.max_connections.unwrap_or(match self.driver {
            DatabaseDriver::Sqlite => 20,
            DatabaseDriver::Mysql => 30,
        })
    }
}

fn default_database_url() -> String {
    "data/paranews.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    #[default]
    Sqlite,
    Mysql,
}

impl FromStr for DatabaseDriver {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "mysql" => Ok(Self::Mysql),
            other => Err(ConfigError::Invalid(format!(
                "unknown database driver '{}'",
                other
            ))),
        }
    }
}

/// Image upload settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Directory uploaded images are written to
    #[serde(default = "default_upload_path")]
    pub path: PathBuf,
    /// Maximum file size in bytes
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Accepted image extensions, also matched against the MIME subtype
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
    /// URL prefix the upload directory is served under
    #[serde(default = "default_public_prefix")]
    pub public_prefix: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            path: default_upload_path(),
            max_file_size: default_max_file_size(),
            allowed_extensions: default_allowed_extensions(),
            public_prefix: default_public_prefix(),
        }
    }
}

fn default_upload_path() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_max_file_size() -> u64 {
    5 * 1024 * 1024
}

fn default_allowed_extensions() -> Vec<String> {
    ["jpeg", "jpg", "png", "gif", "webp"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_public_prefix() -> String {
    "/uploads".to_string()
}

impl UploadConfig {
    /// Extension without the dot, case-insensitive
    pub fn is_extension_allowed(&self, ext: &str) -> bool {
        self.allowed_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ext))
    }

    /// `image/<subtype>` where the subtype is an allowed extension
    pub fn is_mime_allowed(&self, mime_type: &str) -> bool {
        let mime = mime_type.to_ascii_lowercase();
        mime.strip_prefix("image/")
            .is_some_and(|subtype| self.is_extension_allowed(subtype))
    }
}

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl Config {
    /// Load configuration from file.
    ///
    /// A missing or empty file yields the defaults. Invalid YAML is an error
    /// carrying the line and column.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.display().to_string(),
            source,
        })?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                path: path.display().to_string(),
                message: describe_yaml_error(&e),
            }
            .into()
        })
    }

    /// Load from file, apply `PARANEWS_*` overrides, then validate.
    ///
    /// Overrides that fail to parse are ignored.
    pub fn load_with_env(path: &Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(host) = env_value("PARANEWS_SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_value("PARANEWS_SERVER_PORT") {
            self.server.port = port;
        }
        if let Some(origin) = env_value("PARANEWS_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = origin;
        }
        if let Some(driver) = env_value("PARANEWS_DATABASE_DRIVER") {
            self.database.driver = driver;
        }
        if let Some(url) = env_value("PARANEWS_DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(size) = env_value("PARANEWS_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = Some(size);
        }
        if let Some(path) = env_value::<String>("PARANEWS_UPLOAD_PATH") {
            self.upload.path = PathBuf::from(path);
        }
        if let Some(size) = env_value("PARANEWS_UPLOAD_MAX_FILE_SIZE") {
            self.upload.max_file_size = size;
        }
    }

    /// Reject settings the server can't run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Invalid("database.url is empty".into()));
        }
        if self.database.max_connections == Some(0) {
            return Err(ConfigError::Invalid(
                "database.max_connections must be at least 1".into(),
            ));
        }
        if self.upload.max_file_size == 0 {
            return Err(ConfigError::Invalid(
                "upload.max_file_size must be greater than 0".into(),
            ));
        }
        if self.upload.allowed_extensions.is_empty() {
            return Err(ConfigError::Invalid(
                "upload.allowed_extensions must list at least one extension".into(),
            ));
        }
        if !self.upload.public_prefix.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "upload.public_prefix must start with '/', got '{}'",
                self.upload.public_prefix
            )));
        }
        Ok(())
    }
}

/// Parsed value of an environment variable; unset or unparsable gives `None`
fn env_value<T: FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring invalid value for {}: {:?}", name, raw);
            None
        }
    }
}

fn describe_yaml_error(e: &serde_yaml::Error) -> String {
    match e.location() {
        Some(loc) => format!("at line {}, column {}: {}", loc.line(), loc.column(), e),
        None => e.to_string(),
    }
}
