//! CLI configuration
//!
//! Layered from serde defaults, an optional TOML file and `GVT__*`
//! environment variables (`GVT__TOKEN__AIRDROP_CAP=1000` overrides
//! `token.airdrop_cap`).

use gvt_staking::StakingConfig;
use gvt_token::TokenConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete CLI configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GvtConfig {
    #[serde(default)]
    pub token: TokenConfig,

    #[serde(default)]
    pub staking: StakingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl GvtConfig {
    /// Load the configuration; a missing file falls back to defaults
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(
                config::File::new(&path.to_string_lossy(), config::FileFormat::Toml).required(false),
            )
            .add_source(
                config::Environment::with_prefix("GVT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
