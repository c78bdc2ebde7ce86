//! Persistent enrichment configuration model and defaults.

use std::path::{Path, PathBuf};

use log::info;
use thiserror::Error;

const CONFIG_FILE_NAME: &str = "trackmend.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Configuration parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("No configuration directory available on this platform")]
    NoConfigDir,
}

/// Root configuration persisted to `trackmend.toml`.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Config {
    #[serde(default)]
    /// Catalog endpoint and HTTP client preferences.
    pub catalog: CatalogConfig,
    #[serde(default)]
    /// Batch behavior.
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Catalog search and artwork download preferences.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Minimum spacing between two catalog searches.
    #[serde(default = "default_min_request_interval_ms")]
    pub min_request_interval_ms: u64,
    #[serde(default = "default_max_artwork_bytes")]
    pub max_artwork_bytes: u64,
}

/// Batch-level switches.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct EnrichmentConfig {
    #[serde(default = "default_true")]
    pub fetch_album_art: bool,
    #[serde(default = "default_true")]
    pub persist_tags: bool,
    /// Treat every record as needing a lookup, regardless of its tags.
    #[serde(default)]
    pub force_lookup: bool,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct LoggingConfig {
    /// One of `error`, `warn`, `info`, `debug`, `trace`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_catalog_base_url(),
            user_agent: default_user_agent(),
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            min_request_interval_ms: default_min_request_interval_ms(),
            max_artwork_bytes: default_max_artwork_bytes(),
        }
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            fetch_album_art: true,
            persist_tags: true,
            force_lookup: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_catalog_base_url() -> String {
    "https://catalog.trackmend.org/v1".to_string()
}

fn default_user_agent() -> String {
    format!("trackmend/{}", env!("CARGO_PKG_VERSION"))
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_read_timeout_ms() -> u64 {
    7_000
}

fn default_min_request_interval_ms() -> u64 {
    1_000
}

fn default_max_artwork_bytes() -> u64 {
    8 * 1024 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

impl LoggingConfig {
    pub fn level_filter(&self) -> log::LevelFilter {
        self.level
            .trim()
            .parse::<log::LevelFilter>()
            .unwrap_or(log::LevelFilter::Info)
    }
}

/// Clamps numeric settings into workable ranges.
pub fn sanitize_config(config: Config) -> Config {
    let base_url = config.catalog.base_url.trim().trim_end_matches('/').to_string();
    Config {
        catalog: CatalogConfig {
            base_url: if base_url.is_empty() {
                default_catalog_base_url()
            } else {
                base_url
            },
            user_agent: if config.catalog.user_agent.trim().is_empty() {
                default_user_agent()
            } else {
                config.catalog.user_agent
            },
            connect_timeout_ms: config.catalog.connect_timeout_ms.clamp(500, 60_000),
            read_timeout_ms: config.catalog.read_timeout_ms.clamp(500, 120_000),
            min_request_interval_ms: config.catalog.min_request_interval_ms.clamp(50, 60_000),
            max_artwork_bytes: config
                .catalog
                .max_artwork_bytes
                .clamp(64 * 1024, 64 * 1024 * 1024),
        },
        enrichment: config.enrichment,
        logging: config.logging,
    }
}

/// `<platform config dir>/trackmend.toml`.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .ok_or(ConfigError::NoConfigDir)
}

/// Loads the config at `path`, writing defaults first when the file is missing.
pub fn load_or_create_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        info!(
            "Config file not found. Creating default config. path={}",
            path.display()
        );
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string(&Config::default())?)?;
    }

    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str::<Config>(&content)?;
    Ok(sanitize_config(config))
}

#[cfg(test)]
mod tests {
    use super::{sanitize_config, CatalogConfig, Config};

    #[test]
    fn test_default_config_has_expected_values() {
        let config = Config::default();

        assert_eq!(config.catalog.connect_timeout_ms, 5_000);
        assert_eq!(config.catalog.read_timeout_ms, 7_000);
        assert_eq!(config.catalog.min_request_interval_ms, 1_000);
        assert_eq!(config.catalog.max_artwork_bytes, 8 * 1024 * 1024);
        assert!(config.catalog.user_agent.starts_with("trackmend/"));
        assert!(config.enrichment.fetch_album_art);
        assert!(config.enrichment.persist_tags);
        assert!(!config.enrichment.force_lookup);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_config_deserialization_fills_defaults() {
        let partial_toml = r#"
[catalog]
base_url = "http://localhost:8080/api"

[enrichment]
force_lookup = true
"#;

        let parsed: Config = toml::from_str(partial_toml).expect("config should parse");
        assert_eq!(parsed.catalog.base_url, "http://localhost:8080/api");
        assert_eq!(parsed.catalog.read_timeout_ms, 7_000);
        assert!(parsed.enrichment.force_lookup);
        assert!(parsed.enrichment.fetch_album_art);
        assert_eq!(parsed.logging.level, "info");
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let mut config = Config::default();
        config.enrichment.persist_tags = false;
        config.logging.level = "debug".to_string();

        let serialized = toml::to_string(&config).expect("config should serialize");
        let parsed: Config = toml::from_str(&serialized).expect("config should parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_sanitize_config_clamps_values_and_trims_base_url() {
        let config = Config {
            catalog: CatalogConfig {
                base_url: " http://localhost:8080/api/ ".to_string(),
                user_agent: " ".to_string(),
                connect_timeout_ms: 0,
                read_timeout_ms: 10_000_000,
                min_request_interval_ms: 1,
                max_artwork_bytes: 1,
            },
            ..Config::default()
        };

        let sanitized = sanitize_config(config);
        assert_eq!(sanitized.catalog.base_url, "http://localhost:8080/api");
        assert!(sanitized.catalog.user_agent.starts_with("trackmend/"));
        assert_eq!(sanitized.catalog.connect_timeout_ms, 500);
        assert_eq!(sanitized.catalog.read_timeout_ms, 120_000);
        assert_eq!(sanitized.catalog.min_request_interval_ms, 50);
        assert_eq!(sanitized.catalog.max_artwork_bytes, 64 * 1024);
    }

    #[test]
    fn test_log_level_filter_falls_back_to_info() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert_eq!(config.logging.level_filter(), log::LevelFilter::Info);
        config.logging.level = "debug".to_string();
        assert_eq!(config.logging.level_filter(), log::LevelFilter::Debug);
    }
}
