//! # rGGP Staking
//!
//! Fixed-lock staking of PreGVT with rewards paid in rGGP.
//!
//! - [`epoch`] - administratively advanced emission schedule
//! - [`position`] - append-only position store with an owner index
//! - [`accrual`] - reward formula, lock tiers and the early-exit penalty
//! - [`engine`] - entry points, checkpoints and administration

pub mod accrual;
pub mod config;
pub mod engine;
pub mod epoch;
pub mod position;

pub use accrual::{
    lock_multiplier, AccrualInputs, EARLY_EXIT_PENALTY_BPS, MAX_LOCK_PERIOD, MIN_LOCK_PERIOD,
};
pub use config::{EpochSettings, StakingConfig};
pub use engine::{EarlyExitReceipt, StakingEngine};
pub use epoch::{EpochConfig, EpochSchedule};
pub use position::{PositionStatus, PositionStore, StakePosition};
