//! Service configuration.

use std::path::Path;

use toolcredits_core::{default_catalog, PricingSeed};
use toolcredits_engine::EngineConfig;

/// Errors raised while loading configuration files.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The pricing file could not be read.
    #[error("failed to read pricing file {path}: {source}")]
    Io {
        /// The configured path.
        path: String,
        /// The underlying error.
        source: std::io::Error,
    },

    /// The pricing file is not a valid catalog.
    #[error("invalid pricing file {path}: {source}")]
    Parse {
        /// The configured path.
        path: String,
        /// The underlying error.
        source: serde_json::Error,
    },

    /// A setting holds a value the engine cannot use.
    #[error("invalid value for {name}: {message}")]
    InvalidValue {
        /// The setting name.
        name: &'static str,
        /// What is wrong with it.
        message: String,
    },
}

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to `RocksDB` data directory (default: "/data/toolcredits").
    pub data_dir: String,

    /// API key for tool and payment collaborators.
    pub service_api_key: Option<String>,

    /// API key for the operator surface.
    pub admin_api_key: Option<String>,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// JSON pricing catalog seeded at start-up. The built-in catalog is
    /// used when unset.
    pub pricing_file: Option<String>,

    /// Hours a debit idempotency key stays valid. Unset keeps keys forever.
    pub idempotency_retention_hours: Option<i64>,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            data_dir: std::env::var("DATA_DIR").unwrap_or(defaults.data_dir),
            service_api_key: std::env::var("SERVICE_API_KEY").ok(),
            admin_api_key: std::env::var("ADMIN_API_KEY").ok(),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|origins| parse_origins(&origins))
                .unwrap_or(defaults.cors_origins),
            max_body_bytes: parsed_var("MAX_BODY_BYTES").unwrap_or(defaults.max_body_bytes),
            request_timeout_seconds: parsed_var("REQUEST_TIMEOUT_SECONDS")
                .unwrap_or(defaults.request_timeout_seconds),
            pricing_file: std::env::var("PRICING_FILE").ok(),
            idempotency_retention_hours: parsed_var("IDEMPOTENCY_RETENTION_HOURS")
                .filter(|hours: &i64| *hours > 0),
        }
    }

    /// Engine settings derived from this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the idempotency retention is
    /// out of range.
    pub fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        EngineConfig::default()
            .with_retention_hours(self.idempotency_retention_hours)
            .map_err(|e| ConfigError::InvalidValue {
                name: "IDEMPOTENCY_RETENTION_HOURS",
                message: e.to_string(),
            })
    }

    /// Load the catalog to seed at start-up.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured pricing file cannot be read or
    /// parsed.
    pub fn pricing_catalog(&self) -> Result<Vec<PricingSeed>, ConfigError> {
        match &self.pricing_file {
            Some(path) => load_pricing_file(path),
            None => Ok(default_catalog()),
        }
    }
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

fn parse_origins(origins: &str) -> Vec<String> {
    origins
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Load a pricing catalog from a JSON file.
fn load_pricing_file(path: &str) -> Result<Vec<PricingSeed>, ConfigError> {
    let contents = std::fs::read_to_string(Path::new(path)).map_err(|source| ConfigError::Io {
        path: path.to_string(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_string(),
        source,
    })
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/toolcredits".into(),
            service_api_key: None,
            admin_api_key: None,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
            pricing_file: None,
            idempotency_retention_hours: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn origins_are_trimmed() {
        assert_eq!(
            parse_origins(" https://a.example , https://b.example,,"),
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn default_catalog_without_file() {
        let catalog = ServiceConfig::default().pricing_catalog().unwrap();
        assert_eq!(catalog.len(), 4);
    }

    #[test]
    fn catalog_loaded_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"tool_key": "summarizer", "label": "Summarizer", "credits_per_use": 7}}]"#
        )
        .unwrap();

        let config = ServiceConfig {
            pricing_file: Some(file.path().to_string_lossy().into_owned()),
            ..ServiceConfig::default()
        };
        let catalog = config.pricing_catalog().unwrap();

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].tool_key.as_str(), "summarizer");
        assert_eq!(catalog[0].pricing.credits_per_use, 7);
        assert!(catalog[0].pricing.active);
    }

    #[test]
    fn malformed_catalog_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let config = ServiceConfig {
            pricing_file: Some(file.path().to_string_lossy().into_owned()),
            ..ServiceConfig::default()
        };
        assert!(matches!(
            config.pricing_catalog(),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn retention_flows_into_engine_config() {
        let config = ServiceConfig {
            idempotency_retention_hours: Some(48),
            ..ServiceConfig::default()
        };
        assert_eq!(
            config.engine_config().unwrap().idempotency_retention,
            Some(chrono::Duration::hours(48))
        );
        assert!(ServiceConfig::default()
            .engine_config()
            .unwrap()
            .idempotency_retention
            .is_none());
    }

    #[test]
    fn huge_retention_is_a_config_error() {
        let config = ServiceConfig {
            idempotency_retention_hours: Some(i64::MAX),
            ..ServiceConfig::default()
        };
        assert!(matches!(
            config.engine_config(),
            Err(ConfigError::InvalidValue {
                name: "IDEMPOTENCY_RETENTION_HOURS",
                ..
            })
        ));
    }
}
