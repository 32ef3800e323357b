use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure for the procurement workflow library
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProcurementConfig {
    /// Backend API settings
    pub api: ApiConfig,
    /// Batch execution settings
    pub batch: BatchConfig,
    /// Supplier price list cache used for RFQ pre-fill
    pub pricing: PricingConfig,
    /// Observability settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Base URL of the procurement REST API
    pub base_url: String,
    /// Per-request timeout
    pub timeout_seconds: u64,
    /// Bearer token, normally provided by the session layer
    pub bearer_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BatchConfig {
    /// Pause between consecutive batch tasks; 0 disables the throttle
    pub inter_task_delay_ms: u64,
}

impl BatchConfig {
    pub fn inter_task_delay(&self) -> Option<Duration> {
        (self.inter_task_delay_ms > 0).then(|| Duration::from_millis(self.inter_task_delay_ms))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PricingConfig {
    pub cache_ttl_seconds: u64,
    pub cache_capacity: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Default log directive when RUST_LOG is not set
    pub log_level: String,
    /// Emit JSON lines instead of human readable output
    pub json_logs: bool,
}

impl Default for ProcurementConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://localhost:8080/api".to_string(),
                timeout_seconds: 30,
                bearer_token: None,
            },
            batch: BatchConfig {
                inter_task_delay_ms: 250,
            },
            pricing: PricingConfig {
                cache_ttl_seconds: 300, // 5 minutes
                cache_capacity: 500,
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                json_logs: true,
            },
        }
    }
}

impl ProcurementConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (procurement.toml)
    /// 3. Environment variables (PROCUREMENT__BATCH__INTER_TASK_DELAY_MS etc.)
    pub fn load() -> Result<Self> {
        let path = Path::new("procurement.toml");
        Self::load_with_file(path.exists().then_some(path))
    }

    pub fn load_with_file(file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Some(path) = file {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("PROCUREMENT")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<ProcurementConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        let _ = ProcurementConfig::load_env_file();
        ProcurementConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static ProcurementConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

/// Initialize configuration (called at startup)
pub fn init_config() -> Result<()> {
    let config = config()?;
    tracing::info!(
        base_url = %config.api.base_url,
        inter_task_delay_ms = config.batch.inter_task_delay_ms,
        "Configuration loaded successfully"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_round_trip_through_config_builder() {
        let loaded = ProcurementConfig::load_with_file(None).unwrap();
        assert_eq!(loaded.api.timeout_seconds, 30);
        assert_eq!(loaded.pricing.cache_capacity, 500);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let path = std::env::temp_dir().join(format!("procurement-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            "[api]\nbase_url = \"https://erp.example.com/api\"\n\n[batch]\ninter_task_delay_ms = 0\n",
        )
        .unwrap();

        let loaded = ProcurementConfig::load_with_file(Some(&path)).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded.api.base_url, "https://erp.example.com/api");
        assert_eq!(loaded.api.timeout_seconds, 30);
        assert_eq!(loaded.batch.inter_task_delay(), None);
    }

    #[test]
    fn test_inter_task_delay() {
        let batch = BatchConfig {
            inter_task_delay_ms: 150,
        };
        assert_eq!(batch.inter_task_delay(), Some(Duration::from_millis(150)));
    }
}
