//! PreGVT deployment configuration
//!
//! Caps and purchase limits are given in whole tokens and scaled by 1e18 when
//! the token is built. Prices are raw 18-decimal payment units per token.

use crate::gate::TransferPolicy;
use gvt_core::math::SCALE;
use gvt_core::types::{Amount, BadgeId};
use serde::{Deserialize, Serialize};

/// Complete token configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenConfig {
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default = "default_symbol")]
    pub symbol: String,

    /// Transferability variant
    #[serde(default)]
    pub policy: TransferPolicy,

    /// Airdrop reserve cap (whole tokens)
    #[serde(default = "default_airdrop_cap")]
    pub airdrop_cap: u64,

    /// Presale supply cap (whole tokens)
    #[serde(default = "default_presale_cap")]
    pub presale_cap: u64,

    /// Inbound migration cap (whole tokens)
    #[serde(default = "default_migration_cap")]
    pub migration_cap: u64,

    #[serde(default)]
    pub badges: BadgeRules,

    #[serde(default)]
    pub presale: PresaleSettings,
}

fn default_name() -> String {
    "PreGVT".to_string()
}

fn default_symbol() -> String {
    "preGVT".to_string()
}

fn default_airdrop_cap() -> u64 {
    3_000_000
}

fn default_presale_cap() -> u64 {
    2_000_000
}

fn default_migration_cap() -> u64 {
    5_000_000
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            symbol: default_symbol(),
            policy: TransferPolicy::default(),
            airdrop_cap: default_airdrop_cap(),
            presale_cap: default_presale_cap(),
            migration_cap: default_migration_cap(),
            badges: BadgeRules::default(),
            presale: PresaleSettings::default(),
        }
    }
}

impl TokenConfig {
    pub fn airdrop_cap_units(&self) -> Amount {
        whole_tokens(self.airdrop_cap)
    }

    pub fn presale_cap_units(&self) -> Amount {
        whole_tokens(self.presale_cap)
    }

    pub fn migration_cap_units(&self) -> Amount {
        whole_tokens(self.migration_cap)
    }
}

/// Badge gating for the airdrop paths
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BadgeRules {
    /// Badge id that unlocks the airdrop claims
    #[serde(default = "default_badge_id")]
    pub airdrop_badge_id: BadgeId,

    /// Whole tokens minted per `claim_with_badge`
    #[serde(default = "default_claim_amount")]
    pub claim_amount: u64,

    /// Allocation claims also need (and consume) the airdrop badge
    #[serde(default = "default_true")]
    pub allocation_requires_badge: bool,
}

fn default_badge_id() -> BadgeId {
    1
}

fn default_claim_amount() -> u64 {
    100
}

fn default_true() -> bool {
    true
}

impl Default for BadgeRules {
    fn default() -> Self {
        Self {
            airdrop_badge_id: default_badge_id(),
            claim_amount: default_claim_amount(),
            allocation_requires_badge: true,
        }
    }
}

impl BadgeRules {
    pub fn claim_amount_units(&self) -> Amount {
        whole_tokens(self.claim_amount)
    }
}

/// Presale terms
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresaleSettings {
    /// Payment units (18 decimals) per whole token
    #[serde(default = "default_price")]
    pub price_per_token: u64,

    /// Cumulative purchase limit per buyer in whole tokens, 0 = unlimited
    #[serde(default)]
    pub per_user_limit: u64,

    #[serde(default)]
    pub badge_required: bool,

    /// Badge checked (not consumed) when `badge_required` is set
    #[serde(default = "default_badge_id")]
    pub badge_id: BadgeId,
}

fn default_price() -> u64 {
    10_000_000_000_000_000 // 0.01 payment token
}

impl Default for PresaleSettings {
    fn default() -> Self {
        Self {
            price_per_token: default_price(),
            per_user_limit: 0,
            badge_required: false,
            badge_id: default_badge_id(),
        }
    }
}

impl PresaleSettings {
    pub fn per_user_limit_units(&self) -> Amount {
        whole_tokens(self.per_user_limit)
    }
}

pub fn whole_tokens(n: u64) -> Amount {
    n as Amount * SCALE
}
