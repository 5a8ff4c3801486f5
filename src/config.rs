//! Application-level configuration loading: signing secret, storage backend and upload paths.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "GAME_HUB_BACK_CONFIG_PATH";
const DEFAULT_MONGO_URI: &str = "mongodb://localhost:27017";
const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_PORT: u16 = 8080;
/// Lifetime of issued bearer tokens.
pub const TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Errors that prevent the server from starting.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No signing secret was provided through the environment or the config file.
    #[error("JWT_SECRET must be set to a non-empty value")]
    MissingJwtSecret,
    /// The configured storage backend name is not recognised.
    #[error("unknown storage backend `{0}` (expected `mongo` or `memory`)")]
    UnknownBackend(String),
    /// A numeric setting could not be parsed.
    #[error("invalid value `{value}` for {key}")]
    InvalidNumber { key: &'static str, value: String },
}

/// Which persistence implementation the storage supervisor should connect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// MongoDB via the official driver.
    Mongo,
    /// Process-local store; data is lost on restart.
    Memory,
}

impl StorageBackend {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(Self::Mongo),
            "memory" | "in-memory" => Ok(Self::Memory),
            other => Err(ConfigError::UnknownBackend(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Secret used to sign and verify bearer tokens.
    pub jwt_secret: String,
    /// Validity window of issued tokens.
    pub token_ttl: Duration,
    /// Work factor handed to bcrypt when hashing passwords.
    pub bcrypt_cost: u32,
    /// Selected persistence backend.
    pub storage: StorageBackend,
    /// MongoDB connection string.
    pub mongo_uri: String,
    /// Optional MongoDB database name override.
    pub mongo_db: Option<String>,
    /// Directory holding uploaded files; avatars live in its `avatars/` child.
    pub upload_dir: PathBuf,
    /// TCP port the HTTP server binds.
    pub port: u16,
}

impl AppConfig {
    /// Build a configuration with defaults around the given signing secret.
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            token_ttl: TOKEN_TTL,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            storage: StorageBackend::Mongo,
            mongo_uri: DEFAULT_MONGO_URI.to_owned(),
            mongo_db: None,
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            port: DEFAULT_PORT,
        }
    }

    /// Load the configuration file (if any) and apply environment overrides.
    ///
    /// Fails when no signing secret is available: the server refuses to start with an
    /// implicit default secret.
    pub fn load() -> Result<Self, ConfigError> {
        let raw = read_config_file();
        Self::from_sources(raw, |key| env::var(key).ok())
    }

    fn from_sources(
        raw: RawConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let pick = |key: &str, file_value: Option<String>| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .or(file_value)
        };

        let jwt_secret = pick("JWT_SECRET", raw.jwt_secret)
            .filter(|secret| !secret.trim().is_empty())
            .ok_or(ConfigError::MissingJwtSecret)?;

        let mut config = Self::new(jwt_secret);

        if let Some(backend) = pick("STORAGE_BACKEND", raw.storage) {
            config.storage = StorageBackend::parse(&backend)?;
        }
        if let Some(uri) = pick("MONGO_URI", raw.mongo_uri) {
            config.mongo_uri = uri;
        }
        config.mongo_db = pick("MONGO_DB", raw.mongo_db);
        if let Some(dir) = pick("UPLOAD_DIR", raw.upload_dir) {
            config.upload_dir = PathBuf::from(dir);
        }
        if let Some(port) = pick("PORT", None).or_else(|| pick("SERVER_PORT", None)) {
            config.port = parse_number("PORT", &port)?;
        } else if let Some(port) = raw.port {
            config.port = port;
        }
        if let Some(cost) = pick("BCRYPT_COST", None) {
            config.bcrypt_cost = parse_number("BCRYPT_COST", &cost)?;
        } else if let Some(cost) = raw.bcrypt_cost {
            config.bcrypt_cost = cost;
        }

        Ok(config)
    }

    /// Directory where avatar files are written.
    pub fn avatar_dir(&self) -> PathBuf {
        self.upload_dir.join("avatars")
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidNumber {
            key,
            value: value.to_owned(),
        })
}

#[derive(Debug, Default, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    jwt_secret: Option<String>,
    storage: Option<String>,
    mongo_uri: Option<String>,
    mongo_db: Option<String>,
    upload_dir: Option<String>,
    port: Option<u16>,
    bcrypt_cost: Option<u32>,
}

/// Read the optional JSON configuration file, falling back to an empty set of values.
fn read_config_file() -> RawConfig {
    let path = resolve_config_path();
    match fs::read_to_string(&path) {
        Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
            Ok(raw) => {
                info!(path = %path.display(), "loaded configuration file");
                raw
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to parse config; relying on environment only"
                );
                RawConfig::default()
            }
        },
        Err(err) if err.kind() == ErrorKind::NotFound => {
            info!(
                path = %path.display(),
                "config file not found; relying on environment only"
            );
            RawConfig::default()
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                error = %err,
                "failed to read config; relying on environment only"
            );
            RawConfig::default()
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load_with(vars: &[(&str, &str)], raw: RawConfig) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        AppConfig::from_sources(raw, |key| vars.get(key).cloned())
    }

    #[test]
    fn missing_secret_is_fatal() {
        let err = load_with(&[], RawConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingJwtSecret));
    }

    #[test]
    fn blank_secret_is_fatal() {
        let err = load_with(&[("JWT_SECRET", "   ")], RawConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingJwtSecret));
    }

    #[test]
    fn secret_from_file_is_accepted() {
        let raw = RawConfig {
            jwt_secret: Some("from-file".into()),
            ..RawConfig::default()
        };
        let config = load_with(&[], raw).unwrap();
        assert_eq!(config.jwt_secret, "from-file");
        assert_eq!(config.token_ttl, TOKEN_TTL);
        assert_eq!(config.storage, StorageBackend::Mongo);
    }

    #[test]
    fn environment_overrides_file() {
        let raw = RawConfig {
            jwt_secret: Some("from-file".into()),
            port: Some(9000),
            ..RawConfig::default()
        };
        let config = load_with(
            &[
                ("JWT_SECRET", "from-env"),
                ("PORT", "7070"),
                ("STORAGE_BACKEND", "memory"),
                ("UPLOAD_DIR", "/tmp/hub"),
            ],
            raw,
        )
        .unwrap();
        assert_eq!(config.jwt_secret, "from-env");
        assert_eq!(config.port, 7070);
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.avatar_dir(), PathBuf::from("/tmp/hub/avatars"));
    }

    #[test]
    fn rejects_unknown_backend_and_bad_port() {
        let err = load_with(
            &[("JWT_SECRET", "s"), ("STORAGE_BACKEND", "couch")],
            RawConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownBackend(name) if name == "couch"));

        let err = load_with(&[("JWT_SECRET", "s"), ("PORT", "http")], RawConfig::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { key: "PORT", .. }));
    }
}
