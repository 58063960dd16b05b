//! Staking engine configuration

use gvt_core::math::SCALE;
use gvt_core::types::{Amount, EpochId, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StakingConfig {
    /// Global reward cap (whole rGGP)
    #[serde(default = "default_reward_cap")]
    pub reward_cap: u64,

    #[serde(default = "default_true")]
    pub lock_bonus_enabled: bool,

    /// Reject stakes relayed through contracts
    #[serde(default)]
    pub eoa_only: bool,

    /// Epochs installed at construction
    #[serde(default)]
    pub epochs: Vec<EpochSettings>,

    /// Epoch pointer at construction
    #[serde(default)]
    pub current_epoch: EpochId,
}

fn default_reward_cap() -> u64 {
    50_000_000
}

fn default_true() -> bool {
    true
}

impl Default for StakingConfig {
    fn default() -> Self {
        Self {
            reward_cap: default_reward_cap(),
            lock_bonus_enabled: true,
            eoa_only: false,
            epochs: Vec::new(),
            current_epoch: 0,
        }
    }
}

impl StakingConfig {
    pub fn reward_cap_units(&self) -> Amount {
        self.reward_cap as Amount * SCALE
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochSettings {
    pub id: EpochId,
    /// Raw rate, scaled by 1e18
    pub emission_rate: u64,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: StakingConfig = serde_json::from_str("{}").unwrap();
        assert!(config.lock_bonus_enabled);
        assert!(!config.eoa_only);
        assert!(config.epochs.is_empty());
        assert_eq!(config.reward_cap_units(), 50_000_000 * SCALE);
    }
}
