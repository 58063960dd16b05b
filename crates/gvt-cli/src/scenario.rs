//! Scenario replay
//!
//! A scenario is a JSON list of actions run against in-memory engines on a
//! manual clock. Each action may first move the clock forward. Failures are
//! recorded and the replay continues with the next action.
//!
//! Accounts are named; each new name gets a fresh address holding a counter
//! in its low eight bytes, which never matches a deployment address. Token
//! amounts are whole tokens.
//!
//! ```json
//! {
//!   "start_time": 1700000000,
//!   "actions": [
//!     { "op": "distribute", "to": "alice", "amount": 1000 },
//!     { "op": "stake", "user": "alice", "amount": 1000, "lock_days": 30 },
//!     { "advance": 86400, "op": "claim_all", "user": "alice" }
//!   ]
//! }
//! ```

use crate::config::GvtConfig;
use gvt_core::access::{Capability, RoleTable};
use gvt_core::clock::{Clock, ManualClock};
use gvt_core::error::{GvtError, Result};
use gvt_core::events::RecordedEvent;
use gvt_core::interfaces::FungibleAsset;
use gvt_core::memory::{FixedBoostOracle, MemoryAsset, MemoryBadges, RecordingMigrationSink};
use gvt_core::time::days;
use gvt_core::types::{Address, Caller, EpochId, PositionId, Timestamp};
use gvt_staking::StakingEngine;
use gvt_token::config::whole_tokens;
use gvt_token::{PreGvtToken, TransferPolicy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

const ADMIN: Address = Address::new([0xad; 20]);
const TREASURY: Address = Address::new([0xee; 20]);
const TOKEN: Address = Address::new([0xa0; 20]);
const STAKING: Address = Address::new([0xa1; 20]);
const PAYMENT: Address = Address::new([0xa2; 20]);
const REWARD: Address = Address::new([0xa3; 20]);
const MIGRATOR: Address = Address::new([0xa4; 20]);
const ORACLE: Address = Address::new([0xa5; 20]);

const RESERVED: [Address; 8] = [ADMIN, TREASURY, TOKEN, STAKING, PAYMENT, REWARD, MIGRATOR, ORACLE];

#[derive(Clone, Debug, Deserialize)]
pub struct Scenario {
    #[serde(default = "default_start_time")]
    pub start_time: Timestamp,
    pub actions: Vec<TimedAction>,
}

fn default_start_time() -> Timestamp {
    1_700_000_000
}

#[derive(Clone, Debug, Deserialize)]
pub struct TimedAction {
    /// Seconds to move the clock before the action
    #[serde(default)]
    pub advance: u64,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Action {
    // Issuance
    Distribute { to: String, amount: u64 },
    SetAllocation { user: String, amount: u64 },
    GiveBadge { user: String },
    ClaimWithBadge { user: String },
    ClaimAllocation { user: String },
    OpenPresale,
    FundPayment { user: String, amount: u64 },
    Buy { user: String, amount: u64 },
    Whitelist { user: String },
    EnableMigration,
    Migrate { user: String },

    // Staking
    Stake { user: String, amount: u64, lock_days: u64 },
    ConfigureEpoch { id: EpochId, emission_rate: u64, start_time: Timestamp, end_time: Timestamp },
    SetCurrentEpoch { id: EpochId },
    SetBoost { user: String, boost: u32 },
    ActivateRewards,
    Claim { user: String, position: PositionId },
    ClaimAll { user: String },
    Unstake { user: String, position: PositionId },
    EarlyExit { user: String, position: PositionId },
    Pause,
    Unpause,
}

/// Outcome of one replayed action
#[derive(Clone, Debug, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub at: Timestamp,
    pub action: String,
    pub ok: bool,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<u32>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SimulationReport {
    pub steps: Vec<StepReport>,
    pub token_events: Vec<RecordedEvent>,
    pub staking_events: Vec<RecordedEvent>,
}

impl SimulationReport {
    pub fn failures(&self) -> usize {
        self.steps.iter().filter(|s| !s.ok).count()
    }
}

fn account_address(id: u64) -> Address {
    let mut bytes = [0u8; 20];
    bytes[12..].copy_from_slice(&id.to_be_bytes());
    Address::new(bytes)
}

/// In-memory deployment the scenario runs against
pub struct Simulation {
    clock: Arc<ManualClock>,
    token: Arc<PreGvtToken>,
    staking: StakingEngine,
    badges: Arc<MemoryBadges>,
    payment: Arc<MemoryAsset>,
    reward: Arc<MemoryAsset>,
    oracle: Arc<FixedBoostOracle>,
    badge_id: u64,
    accounts: HashMap<String, Address>,
    next_account: u64,
}

impl Simulation {
    pub fn new(config: &GvtConfig, start_time: Timestamp) -> Result<Self> {
        let clock = Arc::new(ManualClock::new(start_time));
        let roles = Arc::new(RoleTable::with_grants(
            ADMIN,
            &[
                Capability::Admin,
                Capability::Distributor,
                Capability::MigratorSetter,
                Capability::PriceManager,
                Capability::Treasury,
                Capability::WhitelistManager,
                Capability::BlacklistManager,
                Capability::Migration,
            ],
        ));
        let badges = Arc::new(MemoryBadges::new());
        let payment = Arc::new(MemoryAsset::new(PAYMENT, "USDC"));

        let token = Arc::new(
            PreGvtToken::new(TOKEN, &config.token, TREASURY, roles.clone(), clock.clone())?
                .with_badges(badges.clone())
                .with_payment_asset(payment.clone()),
        );
        if config.token.policy == TransferPolicy::Whitelisted {
            token.set_whitelisted(&ADMIN, &STAKING, true)?;
        }

        let staking = StakingEngine::new(
            STAKING,
            &config.staking,
            TREASURY,
            token.clone(),
            roles,
            clock.clone(),
        )?;
        let reward = Arc::new(MemoryAsset::new(REWARD, "rGGP"));
        reward.add_minter(STAKING);
        let oracle = Arc::new(FixedBoostOracle::new(ORACLE, 100));
        staking.set_boost_oracle(&ADMIN, Some(oracle.clone()))?;

        let accounts = HashMap::from([
            ("admin".to_string(), ADMIN),
            ("treasury".to_string(), TREASURY),
        ]);

        Ok(Self {
            clock,
            token,
            staking,
            badges,
            payment,
            reward,
            oracle,
            badge_id: config.token.badges.airdrop_badge_id,
            accounts,
            next_account: 1,
        })
    }

    /// Address for `name`, allocating one on first use
    pub fn account(&mut self, name: &str) -> Result<Address> {
        if let Some(address) = self.accounts.get(name) {
            return Ok(*address);
        }
        let address = loop {
            let id = self.next_account;
            self.next_account = id.checked_add(1).ok_or(GvtError::MathOverflow)?;
            let address = account_address(id);
            if !RESERVED.contains(&address) {
                break address;
            }
        };
        self.accounts.insert(name.to_string(), address);
        Ok(address)
    }

    pub fn run(mut self, scenario: &Scenario) -> SimulationReport {
        let mut steps = Vec::with_capacity(scenario.actions.len());
        for (index, timed) in scenario.actions.iter().enumerate() {
            let at = if timed.advance > 0 {
                self.clock.advance(timed.advance)
            } else {
                self.clock.now()
            };
            let outcome = self.apply(&timed.action);
            let report = match outcome {
                Ok(detail) => {
                    tracing::info!("[{}] {:?}: {}", index, timed.action, detail);
                    StepReport {
                        index,
                        at,
                        action: format!("{:?}", timed.action),
                        ok: true,
                        detail,
                        error_code: None,
                    }
                }
                Err(e) => {
                    tracing::warn!("[{}] {:?} failed: {}", index, timed.action, e);
                    StepReport {
                        index,
                        at,
                        action: format!("{:?}", timed.action),
                        ok: false,
                        detail: e.to_string(),
                        error_code: Some(e.code()),
                    }
                }
            };
            steps.push(report);
        }

        SimulationReport {
            steps,
            token_events: self.token.events(),
            staking_events: self.staking.events(),
        }
    }

    fn apply(&mut self, action: &Action) -> Result<String> {
        match action {
            Action::Distribute { to, amount } => {
                let to = self.account(to)?;
                self.token.distribute(&ADMIN, &to, whole_tokens(*amount))?;
                Ok(format!("balance {}", self.token.balance_of(&to)))
            }
            Action::SetAllocation { user, amount } => {
                let user = self.account(user)?;
                self.token.set_allocation(&ADMIN, &user, whole_tokens(*amount))?;
                Ok(format!("allocation {}", self.token.allocation_of(&user)))
            }
            Action::GiveBadge { user } => {
                let user = self.account(user)?;
                self.badges.give(&user, self.badge_id, 1);
                self.badges.approve_operator(&user, &TOKEN);
                Ok("badge granted".into())
            }
            Action::ClaimWithBadge { user } => {
                let user = self.account(user)?;
                let amount = self.token.claim_with_badge(&user)?;
                Ok(format!("claimed {}", amount))
            }
            Action::ClaimAllocation { user } => {
                let user = self.account(user)?;
                let amount = self.token.claim_allocation(&user)?;
                Ok(format!("claimed {}", amount))
            }
            Action::OpenPresale => {
                self.token.set_presale_active(&ADMIN, true)?;
                Ok(format!("price {}", self.token.current_price()))
            }
            Action::FundPayment { user, amount } => {
                let user = self.account(user)?;
                self.payment.fund(&user, whole_tokens(*amount));
                self.payment.approve(&user, &TOKEN, u128::MAX);
                Ok(format!("payment balance {}", self.payment.balance_of(&user)))
            }
            Action::Buy { user, amount } => {
                let user = self.account(user)?;
                let cost = self.token.buy(&user, whole_tokens(*amount))?;
                Ok(format!("paid {}", cost))
            }
            Action::Whitelist { user } => {
                let user = self.account(user)?;
                self.token.set_whitelisted(&ADMIN, &user, true)?;
                Ok("whitelisted".into())
            }
            Action::EnableMigration => {
                self.token
                    .set_migrator(&ADMIN, Arc::new(RecordingMigrationSink::new(MIGRATOR)))?;
                Ok("migration enabled".into())
            }
            Action::Migrate { user } => {
                let user = self.account(user)?;
                let amount = self.token.migrate_to_gvt(&user)?;
                Ok(format!("migrated {}", amount))
            }
            Action::Stake {
                user,
                amount,
                lock_days,
            } => {
                let user = self.account(user)?;
                let amount = whole_tokens(*amount);
                self.token.approve(&user, &STAKING, amount)?;
                let id = self
                    .staking
                    .stake(&Caller::account(user), amount, days(*lock_days))?;
                Ok(format!("position {}", id))
            }
            Action::ConfigureEpoch {
                id,
                emission_rate,
                start_time,
                end_time,
            } => {
                self.staking.configure_epoch(
                    &ADMIN,
                    *id,
                    *emission_rate as u128,
                    *start_time,
                    *end_time,
                )?;
                Ok(format!("epoch {} configured", id))
            }
            Action::SetCurrentEpoch { id } => {
                self.staking.set_current_epoch(&ADMIN, *id)?;
                Ok(format!("epoch {} current", id))
            }
            Action::SetBoost { user, boost } => {
                let user = self.account(user)?;
                self.oracle.set_boost(user, *boost);
                Ok(format!("boost {}", boost))
            }
            Action::ActivateRewards => {
                self.staking.set_reward_token(&ADMIN, self.reward.clone())?;
                Ok("reward token set".into())
            }
            Action::Claim { user, position } => {
                let user = self.account(user)?;
                let amount = self.staking.claim(&user, *position)?;
                Ok(format!("claimed {}", amount))
            }
            Action::ClaimAll { user } => {
                let user = self.account(user)?;
                let amount = self.staking.claim_all(&user)?;
                Ok(format!("claimed {}", amount))
            }
            Action::Unstake { user, position } => {
                let user = self.account(user)?;
                let amount = self.staking.unstake(&user, *position)?;
                Ok(format!("returned {}", amount))
            }
            Action::EarlyExit { user, position } => {
                let user = self.account(user)?;
                let receipt = self.staking.early_exit(&user, *position)?;
                Ok(format!(
                    "returned {}, penalty {}",
                    receipt.returned, receipt.penalty
                ))
            }
            Action::Pause => {
                self.staking.pause(&ADMIN)?;
                Ok("paused".into())
            }
            Action::Unpause => {
                self.staking.unpause(&ADMIN)?;
                Ok("unpaused".into())
            }
        }
    }
}

pub fn parse(json: &str) -> std::result::Result<Scenario, serde_json::Error> {
    serde_json::from_str(json)
}
