use anyhow::{Result, anyhow};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Engine configuration. Constructed explicitly and handed to the engine; there
/// is no process-wide default instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(default)]
    pub debug_mode: bool,
    #[serde(default = "default_ml_enabled")]
    pub ml_enabled: bool,
    #[serde(default)]
    pub real_time_enabled: bool,
    #[serde(flatten)]
    pub risk: RiskConfig,
    #[serde(default = "default_cache_ttl_minutes")]
    pub cache_ttl_minutes: i64,
}

/// Position sizing limits consumed by the risk manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Fraction of capital a single position may use (0.10 = 10%)
    #[serde(default = "default_max_position_size")]
    pub max_position_size: f64,
    #[serde(default = "default_stop_loss_percentage")]
    pub stop_loss_percentage: f64,
    #[serde(default = "default_take_profit_percentage")]
    pub take_profit_percentage: f64,
    /// Capital the position size is computed against
    #[serde(default = "default_portfolio_value")]
    pub portfolio_value: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_position_size: default_max_position_size(),
            stop_loss_percentage: default_stop_loss_percentage(),
            take_profit_percentage: default_take_profit_percentage(),
            portfolio_value: default_portfolio_value(),
        }
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            debug_mode: false,
            ml_enabled: default_ml_enabled(),
            real_time_enabled: false,
            risk: RiskConfig::default(),
            cache_ttl_minutes: default_cache_ttl_minutes(),
        }
    }
}

fn default_ml_enabled() -> bool {
    true
}

fn default_max_position_size() -> f64 {
    0.10 // 10% of capital per position
}

fn default_stop_loss_percentage() -> f64 {
    0.05
}

fn default_take_profit_percentage() -> f64 {
    0.15
}

fn default_portfolio_value() -> f64 {
    100_000.0
}

fn default_cache_ttl_minutes() -> i64 {
    15
}

impl SystemConfig {
    /// Load configuration from a JSON file, falling back to defaults when the
    /// file does not exist.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = match fs::read_to_string(path) {
            Ok(config_str) => {
                info!("Loading configuration from: {}", path.display());
                serde_json::from_str::<SystemConfig>(&config_str)?
            }
            Err(e) => {
                warn!(
                    "Could not read {} ({}), using default configuration",
                    path.display(),
                    e
                );
                Self::default()
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject limits the risk manager cannot work with
    pub fn validate(&self) -> Result<()> {
        let risk = &self.risk;
        for (name, value) in [
            ("max_position_size", risk.max_position_size),
            ("stop_loss_percentage", risk.stop_loss_percentage),
            ("take_profit_percentage", risk.take_profit_percentage),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(anyhow!("{} must be in (0.0, 1.0], got: {}", name, value));
            }
        }

        if !(risk.portfolio_value > 0.0) {
            return Err(anyhow!(
                "portfolio_value must be positive, got: {}",
                risk.portfolio_value
            ));
        }

        if self.cache_ttl_minutes <= 0 {
            return Err(anyhow!(
                "cache_ttl_minutes must be positive, got: {}",
                self.cache_ttl_minutes
            ));
        }

        Ok(())
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.cache_ttl_minutes)
    }
}
