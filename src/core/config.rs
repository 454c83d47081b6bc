use crate::core::calculator::RateMode;
use crate::core::history::ExportFormat;
use crate::core::ratios::{DEFAULT_QUALITY_THRESHOLD, FallbackPass};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_SOURCE_URL: &str =
    "https://drive.google.com/uc?id=134hLt7AEujGcoPHhlywLS6ifUGxH-Jw7&export=download";

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SourceConfig {
    pub default_url: String,
    pub timeout_secs: u64,
    pub cache_ttl_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            default_url: DEFAULT_SOURCE_URL.to_string(),
            timeout_secs: 25,
            cache_ttl_secs: 3600,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct YahooProviderConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for YahooProviderConfig {
    fn default() -> Self {
        YahooProviderConfig {
            base_url: "https://query1.finance.yahoo.com".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DolarApiProviderConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub cache_ttl_secs: u64,
}

impl Default for DolarApiProviderConfig {
    fn default() -> Self {
        DolarApiProviderConfig {
            base_url: "https://dolarapi.com".to_string(),
            timeout_secs: 10,
            cache_ttl_secs: 300,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct ProvidersConfig {
    pub yahoo: YahooProviderConfig,
    pub dolarapi: DolarApiProviderConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct PricingConfig {
    pub rate_mode: RateMode,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FallbackMode {
    Always,
    #[default]
    BelowThreshold,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ParserConfig {
    pub fallback: FallbackMode,
    pub fallback_threshold: usize,
    pub quality_threshold: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            fallback: FallbackMode::BelowThreshold,
            fallback_threshold: DEFAULT_QUALITY_THRESHOLD,
            quality_threshold: DEFAULT_QUALITY_THRESHOLD,
        }
    }
}

impl ParserConfig {
    pub fn fallback_pass(&self) -> FallbackPass {
        match self.fallback {
            FallbackMode::Always => FallbackPass::Always,
            FallbackMode::BelowThreshold => FallbackPass::BelowThreshold(self.fallback_threshold),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub providers: ProvidersConfig,
    pub pricing: PricingConfig,
    pub parser: ParserConfig,
    pub export_dir: Option<String>,
    pub export_format: ExportFormat,
}

impl AppConfig {
    /// Loads the default config file, or the built-in defaults when there is none.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("ar", "antifragil", "cedear")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn export_dir(&self) -> PathBuf {
        self.export_dir
            .as_ref()
            .map_or_else(|| PathBuf::from("."), PathBuf::from)
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source.timeout_secs)
    }

    pub fn source_ttl(&self) -> Duration {
        Duration::from_secs(self.source.cache_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str("{}").expect("Failed to deserialize");

        assert_eq!(config.source.default_url, DEFAULT_SOURCE_URL);
        assert_eq!(config.source_timeout(), Duration::from_secs(25));
        assert_eq!(config.source_ttl(), Duration::from_secs(3600));
        assert_eq!(config.providers.dolarapi.cache_ttl_secs, 300);
        assert_eq!(config.providers.yahoo.timeout_secs, 10);
        assert_eq!(config.pricing.rate_mode, RateMode::Single);
        assert_eq!(config.parser.fallback_pass(), FallbackPass::BelowThreshold(100));
        assert_eq!(config.parser.quality_threshold, 100);
        assert_eq!(config.export_dir(), PathBuf::from("."));
        assert_eq!(config.export_format, ExportFormat::Xlsx);
    }

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
source:
  default_url: "http://example.com/ratios.pdf"
  timeout_secs: 5
providers:
  yahoo:
    base_url: "http://example.com/yahoo"
  dolarapi:
    base_url: "http://example.com/dolar"
    cache_ttl_secs: 60
pricing:
  rate_mode: dual
parser:
  fallback: always
  quality_threshold: 50
export_dir: "/tmp/cedears"
export_format: csv
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.source.default_url, "http://example.com/ratios.pdf");
        assert_eq!(config.source.timeout_secs, 5);
        // Unset keys keep their defaults
        assert_eq!(config.source.cache_ttl_secs, 3600);
        assert_eq!(config.providers.yahoo.base_url, "http://example.com/yahoo");
        assert_eq!(config.providers.yahoo.timeout_secs, 10);
        assert_eq!(config.providers.dolarapi.base_url, "http://example.com/dolar");
        assert_eq!(config.providers.dolarapi.cache_ttl_secs, 60);
        assert_eq!(config.pricing.rate_mode, RateMode::Dual);
        assert_eq!(config.parser.fallback_pass(), FallbackPass::Always);
        assert_eq!(config.parser.quality_threshold, 50);
        assert_eq!(config.export_dir(), PathBuf::from("/tmp/cedears"));
        assert_eq!(config.export_format, ExportFormat::Csv);
    }

    #[test]
    fn test_invalid_rate_mode_is_rejected() {
        let result: Result<AppConfig, _> = serde_yaml::from_str("pricing:\n  rate_mode: triple\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_explicit_path_fails() {
        let result = AppConfig::load_from_path("/definitely/not/here/config.yaml");
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }
}
