//! # Staking Engine
//!
//! Locks the stake asset in fixed-duration positions and accrues rGGP.
//!
//! ```text
//!            stake                 unstake (now >= lock_end)
//!   ─────────────────► Active ─────────────────────────────► Unstaked
//!                        │
//!                        └─────────────────────────────────► EarlyExited
//!                             early_exit (10% to treasury)
//! ```
//!
//! Rewards are checkpointed into a per-owner pending accumulator before any
//! position transition. The global reward cap is reserved at checkpoint
//! time, so an exhausted cap blocks exits as well as claims.
//!
//! Each entry point holds the re-entrancy guard and the state write lock for
//! its whole run, collaborator calls included. Writes go through undo
//! journals and are rolled back when the call fails. A collaborator that
//! calls a mutating entry point back on the same thread gets
//! `ReentrantCall`. A collaborator that calls a view back on the same thread
//! deadlocks, because the view takes a read lock on the state that the same
//! thread already holds for writing. Collaborators must not call back into
//! the engine at all.

use crate::accrual::{self, AccrualInputs};
use crate::config::StakingConfig;
use crate::epoch::{EpochConfig, EpochSchedule};
use crate::position::{PositionStatus, PositionStore, StakePosition};
use gvt_core::access::{require, Authorizer, Capability};
use gvt_core::clock::Clock;
use gvt_core::error::{GvtError, Result};
use gvt_core::events::{Event, EventLog, RecordedEvent};
use gvt_core::guard::ReentrancyGuard;
use gvt_core::interfaces::{boost_or_neutral, BoostOracle, FungibleAsset, MintableAsset};
use gvt_core::journal::{Journaled, JournaledMap, Staged};
use gvt_core::math;
use gvt_core::types::{Address, Amount, Caller, EpochId, PositionId, Timestamp};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Payouts of an early exit
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarlyExitReceipt {
    pub returned: Amount,
    pub penalty: Amount,
}

struct StakingState {
    positions: PositionStore,
    pending: JournaledMap<Address, Amount>,
    schedule: Staged<EpochSchedule>,
    total_staked: Amount,
    total_rewards_minted: Amount,
    reward_cap: Amount,
    reward_token: Option<Arc<dyn MintableAsset>>,
    boost_oracle: Option<Arc<dyn BoostOracle>>,
    treasury: Address,
    lock_bonus_enabled: bool,
    eoa_only: bool,
    paused: bool,
    events: EventLog,
}

/// Scalar fields restored wholesale when a call fails
struct Savepoint {
    total_staked: Amount,
    total_rewards_minted: Amount,
    reward_cap: Amount,
    reward_token: Option<Arc<dyn MintableAsset>>,
    boost_oracle: Option<Arc<dyn BoostOracle>>,
    treasury: Address,
    lock_bonus_enabled: bool,
    eoa_only: bool,
    paused: bool,
    events: usize,
}

impl StakingState {
    fn savepoint(&self) -> Savepoint {
        Savepoint {
            total_staked: self.total_staked,
            total_rewards_minted: self.total_rewards_minted,
            reward_cap: self.reward_cap,
            reward_token: self.reward_token.clone(),
            boost_oracle: self.boost_oracle.clone(),
            treasury: self.treasury,
            lock_bonus_enabled: self.lock_bonus_enabled,
            eoa_only: self.eoa_only,
            paused: self.paused,
            events: self.events.len(),
        }
    }

    fn commit(&mut self) {
        self.positions.commit();
        self.pending.commit();
        self.schedule.commit();
    }

    fn rollback(&mut self, savepoint: Savepoint) {
        self.positions.rollback();
        self.pending.rollback();
        self.schedule.rollback();
        self.total_staked = savepoint.total_staked;
        self.total_rewards_minted = savepoint.total_rewards_minted;
        self.reward_cap = savepoint.reward_cap;
        self.reward_token = savepoint.reward_token;
        self.boost_oracle = savepoint.boost_oracle;
        self.treasury = savepoint.treasury;
        self.lock_bonus_enabled = savepoint.lock_bonus_enabled;
        self.eoa_only = savepoint.eoa_only;
        self.paused = savepoint.paused;
        self.events.truncate(savepoint.events);
    }

    fn emit(&mut self, now: Timestamp, event: Event) {
        self.events.emit(now, event);
    }

    fn ensure_not_paused(&self) -> Result<()> {
        if self.paused {
            return Err(GvtError::Paused);
        }
        Ok(())
    }

    fn pending_of(&self, owner: &Address) -> Amount {
        self.pending.get(owner).copied().unwrap_or(0)
    }

    /// Rewards earned by `position` since its last checkpoint
    fn calculate_rewards(&self, position: &StakePosition, now: Timestamp) -> Result<Amount> {
        if !position.is_active() || now <= position.last_reward_time {
            return Ok(0);
        }
        let emission_rate = self.schedule.current_rate();
        if emission_rate == 0 {
            return Ok(0);
        }
        accrual::reward_for(&AccrualInputs {
            amount: position.amount,
            emission_rate,
            elapsed: now - position.last_reward_time,
            lock_duration: position.lock_duration,
            lock_bonus: self.lock_bonus_enabled,
            boost: boost_or_neutral(self.boost_oracle.as_deref(), &position.owner),
        })
    }

    /// Checkpoint one position into its owner's pending accumulator
    fn update_rewards(&mut self, id: PositionId, now: Timestamp) -> Result<Amount> {
        let position = self.positions.get(id)?;
        if !position.is_active() {
            return Ok(0);
        }
        let owner = position.owner;
        let reward = self.calculate_rewards(position, now)?;

        if reward > 0 {
            let minted = math::checked_add(self.total_rewards_minted, reward)?;
            if minted > self.reward_cap {
                return Err(GvtError::RewardCapExceeded {
                    requested: reward,
                    remaining: self.reward_cap.saturating_sub(self.total_rewards_minted),
                });
            }
            self.total_rewards_minted = minted;
            let pending = self.pending.get_or_default(owner);
            *pending = math::checked_add(*pending, reward)?;
        }

        let position = self.positions.get_mut(id)?;
        position.accrued_rewards = math::checked_add(position.accrued_rewards, reward)?;
        position.last_reward_time = now;

        if reward > 0 {
            tracing::debug!("Position {} accrued {}", id, reward);
            self.emit(
                now,
                Event::RewardsAccrued {
                    position_id: id,
                    owner,
                    amount: reward,
                },
            );
        }
        Ok(reward)
    }

    fn update_all_rewards(&mut self, owner: &Address, now: Timestamp) -> Result<()> {
        let ids = self.positions.ids_of(owner).to_vec();
        for id in ids {
            self.update_rewards(id, now)?;
        }
        Ok(())
    }

    /// Zero `owner`'s accumulator; returns the amount and whether it must be minted
    fn take_pending(&mut self, owner: &Address, now: Timestamp) -> Result<(Amount, bool)> {
        let amount = self.pending_of(owner);
        if amount == 0 {
            return Err(GvtError::NoRewards);
        }
        self.pending.remove(owner);
        let minted = self.reward_token.is_some();
        self.emit(
            now,
            Event::RewardsClaimed {
                owner: *owner,
                amount,
                minted,
            },
        );
        Ok((amount, minted))
    }

    fn release_stake(&mut self, amount: Amount) -> Result<()> {
        self.total_staked = math::checked_sub(self.total_staked, amount)?;
        Ok(())
    }
}

/// rGGP staking engine
pub struct StakingEngine {
    address: Address,
    authorizer: Arc<dyn Authorizer>,
    clock: Arc<dyn Clock>,
    stake_asset: Arc<dyn FungibleAsset>,
    state: RwLock<StakingState>,
    guard: ReentrancyGuard,
}

impl StakingEngine {
    pub fn new(
        address: Address,
        config: &StakingConfig,
        treasury: Address,
        stake_asset: Arc<dyn FungibleAsset>,
        authorizer: Arc<dyn Authorizer>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        if address.is_zero() || treasury.is_zero() {
            return Err(GvtError::ZeroAddress);
        }

        let now = clock.now();
        let mut events = EventLog::new();
        let mut schedule = EpochSchedule::new();
        for epoch in &config.epochs {
            let emission_rate = epoch.emission_rate as Amount;
            schedule.configure(
                epoch.id,
                EpochConfig::new(emission_rate, epoch.start_time, epoch.end_time)?,
            );
            events.emit(
                now,
                Event::EpochConfigured {
                    epoch_id: epoch.id,
                    emission_rate,
                    start_time: epoch.start_time,
                    end_time: epoch.end_time,
                },
            );
        }
        schedule.set_current(config.current_epoch);

        let state = StakingState {
            positions: PositionStore::new(),
            pending: JournaledMap::new(),
            schedule: Staged::new(schedule),
            total_staked: 0,
            total_rewards_minted: 0,
            reward_cap: config.reward_cap_units(),
            reward_token: None,
            boost_oracle: None,
            treasury,
            lock_bonus_enabled: config.lock_bonus_enabled,
            eoa_only: config.eoa_only,
            paused: false,
            events,
        };

        tracing::info!(
            "Staking engine {} created for asset {} (epoch {})",
            address,
            stake_asset.address(),
            config.current_epoch
        );

        Ok(Self {
            address,
            authorizer,
            clock,
            stake_asset,
            state: RwLock::new(state),
            guard: ReentrancyGuard::new(),
        })
    }

    fn transact<T>(&self, op: impl FnOnce(&mut StakingState, Timestamp) -> Result<T>) -> Result<T> {
        let _entered = self.guard.enter()?;
        let now = self.clock.now();
        let mut state = self.state.write();
        let savepoint = state.savepoint();
        match op(&mut state, now) {
            Ok(out) => {
                state.commit();
                Ok(out)
            }
            Err(e) => {
                state.rollback(savepoint);
                Err(e)
            }
        }
    }

    fn admin<T>(
        &self,
        caller: &Address,
        op: impl FnOnce(&mut StakingState, Timestamp) -> Result<T>,
    ) -> Result<T> {
        require(self.authorizer.as_ref(), caller, Capability::Admin)?;
        self.transact(op)
    }

    fn pay_out(&self, to: &Address, amount: Amount) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        self.stake_asset
            .transfer(&self.address, to, amount)
            .map_err(|e| GvtError::StakeTransferFailed(e.to_string()))
    }

    fn mint_reward(state: &StakingState, engine: &Address, to: &Address, amount: Amount) -> Result<()> {
        match &state.reward_token {
            Some(token) => token
                .mint(engine, to, amount)
                .map_err(|e| GvtError::RewardMintFailed(e.to_string())),
            None => Ok(()),
        }
    }

    // === User entry points ===

    /// Lock `amount` for `lock_duration` seconds; returns the new position id
    pub fn stake(&self, caller: &Caller, amount: Amount, lock_duration: u64) -> Result<PositionId> {
        let owner = caller.address;
        let id = self.transact(|s, now| {
            s.ensure_not_paused()?;
            if s.eoa_only && !caller.is_direct() {
                return Err(GvtError::OnlyEoa);
            }
            if amount == 0 {
                return Err(GvtError::InvalidAmount);
            }
            accrual::validate_lock_duration(lock_duration)?;

            let id = s.positions.open(owner, amount, now, lock_duration)?;
            s.total_staked = math::checked_add(s.total_staked, amount)?;
            let lock_end_time = s.positions.get(id)?.lock_end_time;
            s.emit(
                now,
                Event::Staked {
                    position_id: id,
                    owner,
                    amount,
                    lock_duration,
                    lock_end_time,
                },
            );

            self.stake_asset
                .transfer_from(&self.address, &owner, &self.address, amount)
                .map_err(|e| GvtError::StakeTransferFailed(e.to_string()))?;
            Ok(id)
        })?;
        tracing::info!("{} staked {} in position {} for {}s", owner, amount, id, lock_duration);
        Ok(id)
    }

    /// Checkpoint a position; returns the reward credited
    pub fn update_rewards(&self, id: PositionId) -> Result<Amount> {
        self.transact(|s, now| {
            s.ensure_not_paused()?;
            s.update_rewards(id, now)
        })
    }

    /// Checkpoint position `id` and pay out the caller's pending rewards
    pub fn claim(&self, caller: &Address, id: PositionId) -> Result<Amount> {
        let amount = self.transact(|s, now| {
            s.ensure_not_paused()?;
            if s.positions.get(id)?.owner != *caller {
                return Err(GvtError::NotPositionOwner(id));
            }
            s.update_rewards(id, now)?;
            let (amount, _) = s.take_pending(caller, now)?;
            Self::mint_reward(s, &self.address, caller, amount)?;
            Ok(amount)
        })?;
        tracing::info!("{} claimed {} rewards", caller, amount);
        Ok(amount)
    }

    /// Checkpoint every position of the caller and pay out
    pub fn claim_all(&self, caller: &Address) -> Result<Amount> {
        let amount = self.transact(|s, now| {
            s.ensure_not_paused()?;
            s.update_all_rewards(caller, now)?;
            let (amount, _) = s.take_pending(caller, now)?;
            Self::mint_reward(s, &self.address, caller, amount)?;
            Ok(amount)
        })?;
        tracing::info!("{} claimed {} rewards across positions", caller, amount);
        Ok(amount)
    }

    /// Withdraw an unlocked position in full
    pub fn unstake(&self, caller: &Address, id: PositionId) -> Result<Amount> {
        let amount = self.transact(|s, now| {
            s.ensure_not_paused()?;
            let position = s.positions.active_owned_by(id, caller)?;
            if !position.is_unlocked(now) {
                return Err(GvtError::StillLocked {
                    unlock_at: position.lock_end_time,
                });
            }

            s.update_rewards(id, now)?;
            let amount = s.positions.close(id, PositionStatus::Unstaked)?.amount;
            s.release_stake(amount)?;
            s.emit(
                now,
                Event::Unstaked {
                    position_id: id,
                    owner: *caller,
                    amount,
                },
            );

            self.pay_out(caller, amount)?;
            Ok(amount)
        })?;
        tracing::info!("{} unstaked position {} ({})", caller, id, amount);
        Ok(amount)
    }

    /// Leave a position before its lock ends, forfeiting the penalty to the treasury
    pub fn early_exit(&self, caller: &Address, id: PositionId) -> Result<EarlyExitReceipt> {
        let receipt = self.transact(|s, now| {
            s.ensure_not_paused()?;
            s.positions.active_owned_by(id, caller)?;

            s.update_rewards(id, now)?;
            let amount = s.positions.close(id, PositionStatus::EarlyExited)?.amount;
            let penalty = accrual::early_exit_penalty(amount)?;
            let returned = math::checked_sub(amount, penalty)?;
            s.release_stake(amount)?;
            s.emit(
                now,
                Event::EarlyExit {
                    position_id: id,
                    owner: *caller,
                    returned,
                    penalty,
                },
            );

            // Both payouts land together or the exit is undone
            let payouts: Vec<(Address, Amount)> = [(s.treasury, penalty), (*caller, returned)]
                .into_iter()
                .filter(|(_, amount)| *amount > 0)
                .collect();
            self.stake_asset
                .transfer_batch(&self.address, &payouts)
                .map_err(|e| GvtError::StakeTransferFailed(e.to_string()))?;
            Ok(EarlyExitReceipt { returned, penalty })
        })?;
        tracing::info!(
            "{} exited position {} early: {} returned, {} penalty",
            caller,
            id,
            receipt.returned,
            receipt.penalty
        );
        Ok(receipt)
    }

    // === Administration ===

    pub fn configure_epoch(
        &self,
        caller: &Address,
        epoch_id: EpochId,
        emission_rate: Amount,
        start_time: Timestamp,
        end_time: Timestamp,
    ) -> Result<()> {
        let epoch = EpochConfig::new(emission_rate, start_time, end_time)?;
        self.admin(caller, |s, now| {
            s.schedule.make_mut().configure(epoch_id, epoch);
            s.emit(
                now,
                Event::EpochConfigured {
                    epoch_id,
                    emission_rate,
                    start_time,
                    end_time,
                },
            );
            Ok(())
        })?;
        tracing::info!("Configured epoch {} at rate {}", epoch_id, emission_rate);
        Ok(())
    }

    pub fn set_current_epoch(&self, caller: &Address, epoch_id: EpochId) -> Result<()> {
        self.admin(caller, |s, now| {
            s.schedule.make_mut().set_current(epoch_id);
            s.emit(now, Event::CurrentEpochSet { epoch_id });
            Ok(())
        })
    }

    pub fn set_treasury(&self, caller: &Address, treasury: &Address) -> Result<()> {
        if treasury.is_zero() {
            return Err(GvtError::ZeroAddress);
        }
        self.admin(caller, |s, now| {
            let old = std::mem::replace(&mut s.treasury, *treasury);
            s.emit(
                now,
                Event::TreasuryUpdated {
                    old,
                    new: *treasury,
                },
            );
            Ok(())
        })
    }

    /// Replace or clear the boost oracle
    pub fn set_boost_oracle(
        &self,
        caller: &Address,
        oracle: Option<Arc<dyn BoostOracle>>,
    ) -> Result<()> {
        let oracle_address = oracle.as_ref().map(|o| o.address());
        self.admin(caller, |s, now| {
            s.boost_oracle = oracle;
            s.emit(
                now,
                Event::BoostOracleUpdated {
                    oracle: oracle_address,
                },
            );
            Ok(())
        })
    }

    /// Raise or lower the global reward cap, never below what is already minted
    pub fn set_reward_cap(&self, caller: &Address, new_cap: Amount) -> Result<()> {
        self.admin(caller, |s, now| {
            if new_cap < s.total_rewards_minted {
                return Err(GvtError::InvalidRewardCap {
                    cap: new_cap,
                    minted: s.total_rewards_minted,
                });
            }
            let old_cap = std::mem::replace(&mut s.reward_cap, new_cap);
            s.emit(now, Event::RewardCapUpdated { old_cap, new_cap });
            Ok(())
        })
    }

    /// Activate reward minting. Can only happen once.
    pub fn set_reward_token(&self, caller: &Address, token: Arc<dyn MintableAsset>) -> Result<()> {
        let token_address = token.address();
        if token_address.is_zero() {
            return Err(GvtError::ZeroAddress);
        }
        self.admin(caller, |s, now| {
            if s.reward_token.is_some() {
                return Err(GvtError::RewardTokenAlreadySet);
            }
            s.reward_token = Some(token);
            s.emit(
                now,
                Event::RewardTokenSet {
                    token: token_address,
                },
            );
            Ok(())
        })?;
        tracing::info!("Reward token set to {}", token_address);
        Ok(())
    }

    pub fn set_lock_bonus(&self, caller: &Address, enabled: bool) -> Result<()> {
        self.admin(caller, |s, now| {
            s.lock_bonus_enabled = enabled;
            s.emit(now, Event::LockBonusToggled { enabled });
            Ok(())
        })
    }

    pub fn set_eoa_only(&self, caller: &Address, enabled: bool) -> Result<()> {
        self.admin(caller, |s, now| {
            s.eoa_only = enabled;
            s.emit(now, Event::EoaOnlyToggled { enabled });
            Ok(())
        })
    }

    pub fn pause(&self, caller: &Address) -> Result<()> {
        self.admin(caller, |s, now| {
            s.ensure_not_paused()?;
            s.paused = true;
            s.emit(now, Event::PauseChanged { paused: true });
            Ok(())
        })?;
        tracing::warn!("Staking paused by {}", caller);
        Ok(())
    }

    pub fn unpause(&self, caller: &Address) -> Result<()> {
        self.admin(caller, |s, now| {
            if !s.paused {
                return Err(GvtError::NotPaused);
            }
            s.paused = false;
            s.emit(now, Event::PauseChanged { paused: false });
            Ok(())
        })?;
        tracing::info!("Staking unpaused by {}", caller);
        Ok(())
    }

    /// Move any asset held by the engine out while paused
    pub fn emergency_withdraw(
        &self,
        caller: &Address,
        asset: &dyn FungibleAsset,
        to: &Address,
        amount: Amount,
    ) -> Result<()> {
        if to.is_zero() {
            return Err(GvtError::ZeroAddress);
        }
        self.admin(caller, |s, now| {
            if !s.paused {
                return Err(GvtError::NotPaused);
            }
            s.emit(
                now,
                Event::EmergencyWithdrawal {
                    asset: asset.address(),
                    to: *to,
                    amount,
                },
            );
            asset
                .transfer(&self.address, to, amount)
                .map_err(|e| GvtError::StakeTransferFailed(e.to_string()))
        })?;
        tracing::warn!("Emergency withdrawal of {} {} to {}", amount, asset.address(), to);
        Ok(())
    }

    // === Views ===

    pub fn address(&self) -> Address {
        self.address
    }

    /// Rewards position `id` would be credited if checkpointed now
    pub fn calculate_rewards(&self, id: PositionId) -> Result<Amount> {
        let now = self.clock.now();
        let state = self.state.read();
        let position = state.positions.get(id)?;
        state.calculate_rewards(position, now)
    }

    pub fn position(&self, id: PositionId) -> Result<StakePosition> {
        self.state.read().positions.get(id).cloned()
    }

    pub fn positions_of(&self, owner: &Address) -> Vec<PositionId> {
        self.state.read().positions.ids_of(owner).to_vec()
    }

    pub fn position_status(&self, id: PositionId) -> Result<PositionStatus> {
        self.state.read().positions.get(id).map(|p| p.status)
    }

    pub fn position_count(&self) -> usize {
        self.state.read().positions.len()
    }

    /// Checkpointed but unclaimed rewards of `owner`
    pub fn pending_rewards(&self, owner: &Address) -> Amount {
        self.state.read().pending_of(owner)
    }

    pub fn total_staked(&self) -> Amount {
        self.state.read().total_staked
    }

    pub fn total_rewards_minted(&self) -> Amount {
        self.state.read().total_rewards_minted
    }

    pub fn reward_cap(&self) -> Amount {
        self.state.read().reward_cap
    }

    pub fn remaining_reward_capacity(&self) -> Amount {
        let state = self.state.read();
        state.reward_cap.saturating_sub(state.total_rewards_minted)
    }

    pub fn current_epoch(&self) -> EpochId {
        self.state.read().schedule.current_id()
    }

    pub fn epoch(&self, id: EpochId) -> Option<EpochConfig> {
        self.state.read().schedule.get(id).copied()
    }

    pub fn reward_token(&self) -> Option<Address> {
        self.state.read().reward_token.as_ref().map(|t| t.address())
    }

    pub fn boost_oracle(&self) -> Option<Address> {
        self.state.read().boost_oracle.as_ref().map(|o| o.address())
    }

    pub fn treasury(&self) -> Address {
        self.state.read().treasury
    }

    pub fn is_paused(&self) -> bool {
        self.state.read().paused
    }

    pub fn lock_bonus_enabled(&self) -> bool {
        self.state.read().lock_bonus_enabled
    }

    pub fn eoa_only(&self) -> bool {
        self.state.read().eoa_only
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.state.read().events.entries().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accrual::{MIN_LOCK_PERIOD, MAX_LOCK_PERIOD};
    use gvt_core::access::RoleTable;
    use gvt_core::clock::ManualClock;
    use gvt_core::interfaces::AssetError;
    use gvt_core::memory::{FailingBoostOracle, FixedBoostOracle, MemoryAsset};
    use gvt_core::time::{days, SECONDS_PER_DAY};
    use parking_lot::Mutex;
    use std::sync::Weak;

    const ENGINE: Address = Address::new([0x5e; 20]);
    const ADMIN: Address = Address::new([0xad; 20]);
    const TREASURY: Address = Address::new([0xee; 20]);
    const ALICE: Address = Address::new([0x01; 20]);
    const BOB: Address = Address::new([0x02; 20]);
    const START: Timestamp = 1_700_000_000;
    const RATE: Amount = 1_000_000_000_000_000;

    struct Fixture {
        engine: Arc<StakingEngine>,
        clock: Arc<ManualClock>,
        stake: Arc<MemoryAsset>,
        rggp: Arc<MemoryAsset>,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(START));
        let stake = Arc::new(MemoryAsset::new(Address::repeat(0x70), "preGVT"));
        let rggp = Arc::new(MemoryAsset::new(Address::repeat(0x71), "rGGP"));
        rggp.add_minter(ENGINE);
        let engine = StakingEngine::new(
            ENGINE,
            &StakingConfig::default(),
            TREASURY,
            stake.clone(),
            Arc::new(RoleTable::with_grants(ADMIN, &[Capability::Admin])),
            clock.clone(),
        )
        .unwrap();
        engine
            .configure_epoch(&ADMIN, 1, RATE, START, START + days(365))
            .unwrap();
        engine.set_current_epoch(&ADMIN, 1).unwrap();
        for user in [ALICE, BOB] {
            stake.fund(&user, 10_000);
            stake.approve(&user, &ENGINE, 10_000);
        }
        Fixture {
            engine: Arc::new(engine),
            clock,
            stake,
            rggp,
        }
    }

    #[test]
    fn test_stake_validation() {
        let f = fixture();
        let alice = Caller::account(ALICE);
        assert_eq!(f.engine.stake(&alice, 0, MIN_LOCK_PERIOD), Err(GvtError::InvalidAmount));
        assert!(matches!(
            f.engine.stake(&alice, 1_000, MIN_LOCK_PERIOD - 1),
            Err(GvtError::InvalidLockDuration { .. })
        ));
        assert!(matches!(
            f.engine.stake(&alice, 1_000, MAX_LOCK_PERIOD + 1),
            Err(GvtError::InvalidLockDuration { .. })
        ));
        assert_eq!(f.engine.stake(&alice, 1_000, MIN_LOCK_PERIOD).unwrap(), 1);
        assert_eq!(f.engine.total_staked(), 1_000);
        assert_eq!(f.stake.balance_of(&ENGINE), 1_000);
    }

    #[test]
    fn test_failed_pull_leaves_no_position() {
        let f = fixture();
        let carol = Caller::account(Address::repeat(3));
        let err = f.engine.stake(&carol, 1_000, MIN_LOCK_PERIOD).unwrap_err();
        assert!(matches!(err, GvtError::StakeTransferFailed(_)));
        assert_eq!(f.engine.position_count(), 0);
        assert_eq!(f.engine.total_staked(), 0);
    }

    #[test]
    fn test_eoa_only() {
        let f = fixture();
        f.engine.set_eoa_only(&ADMIN, true).unwrap();
        let relayed = Caller::via(Address::repeat(0xc0), ALICE);
        assert_eq!(f.engine.stake(&relayed, 1_000, MIN_LOCK_PERIOD), Err(GvtError::OnlyEoa));
        f.engine.stake(&Caller::account(ALICE), 1_000, MIN_LOCK_PERIOD).unwrap();
    }

    #[test]
    fn test_one_day_reward() {
        let f = fixture();
        let id = f.engine.stake(&Caller::account(ALICE), 1_000, days(30)).unwrap();
        assert_eq!(f.engine.calculate_rewards(id).unwrap(), 0);
        f.clock.advance(SECONDS_PER_DAY);
        assert_eq!(f.engine.calculate_rewards(id).unwrap(), 86_400);
    }

    #[test]
    fn test_zero_rate_accrues_nothing() {
        let f = fixture();
        let id = f.engine.stake(&Caller::account(ALICE), 1_000, days(30)).unwrap();
        f.engine.set_current_epoch(&ADMIN, 42).unwrap();
        f.clock.advance(SECONDS_PER_DAY);
        assert_eq!(f.engine.calculate_rewards(id).unwrap(), 0);
    }

    #[test]
    fn test_update_rewards_is_idempotent() {
        let f = fixture();
        let id = f.engine.stake(&Caller::account(ALICE), 1_000, days(30)).unwrap();
        f.clock.advance(100);
        assert_eq!(f.engine.update_rewards(id).unwrap(), 100);
        assert_eq!(f.engine.update_rewards(id).unwrap(), 0);
        assert_eq!(f.engine.pending_rewards(&ALICE), 100);
        assert_eq!(f.engine.position(id).unwrap().last_reward_time, START + 100);
    }

    #[test]
    fn test_boost_oracle_and_fallback() {
        let f = fixture();
        let id = f.engine.stake(&Caller::account(ALICE), 1_000, days(30)).unwrap();
        f.clock.advance(1_000);

        let oracle = Arc::new(FixedBoostOracle::new(Address::repeat(0xb0), 100));
        oracle.set_boost(ALICE, 120);
        f.engine.set_boost_oracle(&ADMIN, Some(oracle)).unwrap();
        assert_eq!(f.engine.calculate_rewards(id).unwrap(), 1_200);

        let failing = Arc::new(FailingBoostOracle::new(Address::repeat(0xb1)));
        f.engine.set_boost_oracle(&ADMIN, Some(failing)).unwrap();
        assert_eq!(f.engine.calculate_rewards(id).unwrap(), 1_000);
        assert_eq!(f.engine.boost_oracle(), Some(Address::repeat(0xb1)));
    }

    #[test]
    fn test_claim_flows() {
        let f = fixture();
        let id = f.engine.stake(&Caller::account(ALICE), 1_000, days(30)).unwrap();
        f.clock.advance(500);

        assert_eq!(f.engine.claim(&BOB, id), Err(GvtError::NotPositionOwner(id)));
        assert_eq!(f.engine.claim_all(&BOB), Err(GvtError::NoRewards));

        f.engine.set_reward_token(&ADMIN, f.rggp.clone()).unwrap();
        assert_eq!(f.engine.claim(&ALICE, id).unwrap(), 500);
        assert_eq!(f.rggp.balance_of(&ALICE), 500);
        assert_eq!(f.engine.claim(&ALICE, id), Err(GvtError::NoRewards));

        f.clock.advance(10);
        assert_eq!(f.engine.claim_all(&ALICE).unwrap(), 10);
        assert_eq!(f.engine.claim_all(&ALICE), Err(GvtError::NoRewards));
        assert_eq!(f.engine.position(id).unwrap().accrued_rewards, 510);
    }

    #[test]
    fn test_claim_before_activation_discards_payout() {
        let f = fixture();
        f.engine.stake(&Caller::account(ALICE), 1_000, days(30)).unwrap();
        f.clock.advance(50);

        assert_eq!(f.engine.claim_all(&ALICE).unwrap(), 50);
        assert_eq!(f.engine.pending_rewards(&ALICE), 0);
        assert_eq!(f.engine.total_rewards_minted(), 50);
        assert!(matches!(
            f.engine.events().last().map(|e| &e.event),
            Some(Event::RewardsClaimed { minted: false, .. })
        ));
    }

    #[test]
    fn test_failed_mint_rolls_back_claim() {
        let f = fixture();
        let stranger = Arc::new(MemoryAsset::new(Address::repeat(0x72), "rGGP"));
        f.engine.set_reward_token(&ADMIN, stranger).unwrap();
        f.engine.stake(&Caller::account(ALICE), 1_000, days(30)).unwrap();
        f.clock.advance(50);

        let events = f.engine.events().len();
        assert!(matches!(
            f.engine.claim_all(&ALICE),
            Err(GvtError::RewardMintFailed(_))
        ));
        assert_eq!(f.engine.events().len(), events);
        assert_eq!(f.engine.position(1).unwrap().last_reward_time, START);
        assert_eq!(f.engine.total_rewards_minted(), 0);
        assert_eq!(f.engine.pending_rewards(&ALICE), 0);
        assert_eq!(f.engine.calculate_rewards(1).unwrap(), 50);
    }

    /// Reward token that calls back into the engine from inside `mint`
    struct CallbackMinter {
        engine: Mutex<Weak<StakingEngine>>,
        seen: Mutex<Vec<GvtError>>,
    }

    impl MintableAsset for CallbackMinter {
        fn address(&self) -> Address {
            Address::repeat(0x73)
        }

        fn mint(
            &self,
            _minter: &Address,
            to: &Address,
            _amount: Amount,
        ) -> std::result::Result<(), AssetError> {
            let engine = self
                .engine
                .lock()
                .upgrade()
                .ok_or_else(|| AssetError::Rejected("engine gone".into()))?;
            let mut seen = self.seen.lock();
            for result in [
                engine.stake(&Caller::account(*to), 500, days(30)).map(|_| ()),
                engine.claim_all(to).map(|_| ()),
                engine.early_exit(to, 1).map(|_| ()),
            ] {
                if let Err(e) = result {
                    seen.push(e);
                }
            }
            Ok(())
        }
    }

    #[test]
    fn test_reentrant_collaborator_is_rejected() {
        let f = fixture();
        let minter = Arc::new(CallbackMinter {
            engine: Mutex::new(Arc::downgrade(&f.engine)),
            seen: Mutex::new(Vec::new()),
        });
        f.engine.set_reward_token(&ADMIN, minter.clone()).unwrap();
        f.engine.stake(&Caller::account(ALICE), 1_000, days(30)).unwrap();
        f.clock.advance(50);
        let events = f.engine.events().len();

        assert_eq!(f.engine.claim_all(&ALICE).unwrap(), 50);
        assert_eq!(*minter.seen.lock(), vec![GvtError::ReentrantCall; 3]);

        // Only the outer claim took effect
        assert_eq!(f.engine.position_count(), 1);
        assert_eq!(f.engine.position_status(1).unwrap(), PositionStatus::Active);
        assert_eq!(f.engine.total_staked(), 1_000);
        assert_eq!(f.stake.balance_of(&ENGINE), 1_000);
        assert_eq!(f.stake.balance_of(&ALICE), 9_000);
        assert_eq!(f.engine.events().len(), events + 2);
    }

    #[test]
    fn test_unstake_boundary() {
        let f = fixture();
        let id = f.engine.stake(&Caller::account(ALICE), 1_000, days(30)).unwrap();

        f.clock.set(START + days(30) - 1);
        assert_eq!(
            f.engine.unstake(&ALICE, id),
            Err(GvtError::StillLocked {
                unlock_at: START + days(30)
            })
        );

        f.clock.set(START + days(30));
        assert_eq!(f.engine.unstake(&BOB, id), Err(GvtError::NotPositionOwner(id)));
        assert_eq!(f.engine.unstake(&ALICE, id).unwrap(), 1_000);
        assert_eq!(f.engine.total_staked(), 0);
        assert_eq!(f.stake.balance_of(&ALICE), 10_000);
        assert_eq!(f.engine.position_status(id).unwrap(), PositionStatus::Unstaked);
        assert_eq!(f.engine.unstake(&ALICE, id), Err(GvtError::PositionNotActive(id)));
        // Rewards settled on the way out stay claimable
        assert_eq!(f.engine.pending_rewards(&ALICE), days(30) as u128);
    }

    #[test]
    fn test_early_exit_splits_penalty() {
        let f = fixture();
        let id = f.engine.stake(&Caller::account(ALICE), 1_000, days(365)).unwrap();
        f.clock.advance(10);

        let receipt = f.engine.early_exit(&ALICE, id).unwrap();
        assert_eq!(receipt, EarlyExitReceipt { returned: 900, penalty: 100 });
        assert_eq!(f.stake.balance_of(&TREASURY), 100);
        assert_eq!(f.stake.balance_of(&ALICE), 9_900);
        assert_eq!(f.engine.total_staked(), 0);
        assert_eq!(f.engine.position(id).unwrap().amount, 1_000);
        assert_eq!(f.engine.position_status(id).unwrap(), PositionStatus::EarlyExited);
    }

    #[test]
    fn test_reward_cap_blocks_exit() {
        let f = fixture();
        let id = f.engine.stake(&Caller::account(ALICE), 1_000, days(30)).unwrap();
        f.engine.set_reward_cap(&ADMIN, 5).unwrap();
        f.clock.advance(10);

        assert_eq!(
            f.engine.early_exit(&ALICE, id),
            Err(GvtError::RewardCapExceeded {
                requested: 10,
                remaining: 5
            })
        );
        assert_eq!(f.engine.total_staked(), 1_000);

        f.engine.set_reward_cap(&ADMIN, 10).unwrap();
        f.engine.early_exit(&ALICE, id).unwrap();
        assert_eq!(f.engine.remaining_reward_capacity(), 0);
        assert_eq!(
            f.engine.set_reward_cap(&ADMIN, 9),
            Err(GvtError::InvalidRewardCap { cap: 9, minted: 10 })
        );
    }

    #[test]
    fn test_reward_token_set_once() {
        let f = fixture();
        f.engine.set_reward_token(&ADMIN, f.rggp.clone()).unwrap();
        assert_eq!(
            f.engine.set_reward_token(&ADMIN, f.rggp.clone()),
            Err(GvtError::RewardTokenAlreadySet)
        );
        assert_eq!(f.engine.reward_token(), Some(Address::repeat(0x71)));
    }

    #[test]
    fn test_pause_and_emergency_withdraw() {
        let f = fixture();
        f.engine.stake(&Caller::account(ALICE), 1_000, days(30)).unwrap();

        let asset: &dyn FungibleAsset = &*f.stake;
        assert_eq!(
            f.engine.emergency_withdraw(&ADMIN, asset, &TREASURY, 1_000),
            Err(GvtError::NotPaused)
        );
        assert_eq!(f.engine.unpause(&ADMIN), Err(GvtError::NotPaused));

        f.engine.pause(&ADMIN).unwrap();
        assert_eq!(
            f.engine.stake(&Caller::account(BOB), 1_000, days(30)),
            Err(GvtError::Paused)
        );
        assert_eq!(f.engine.claim_all(&ALICE), Err(GvtError::Paused));

        f.engine.emergency_withdraw(&ADMIN, asset, &TREASURY, 1_000).unwrap();
        assert_eq!(f.stake.balance_of(&TREASURY), 1_000);

        f.engine.unpause(&ADMIN).unwrap();
        assert!(!f.engine.is_paused());
    }

    #[test]
    fn test_admin_requires_capability() {
        let f = fixture();
        assert!(matches!(
            f.engine.set_lock_bonus(&ALICE, false),
            Err(GvtError::Unauthorized {
                capability: Capability::Admin,
                ..
            })
        ));
        assert!(matches!(
            f.engine.configure_epoch(&ADMIN, 2, RATE, 10, 10),
            Err(GvtError::InvalidEpochConfig { .. })
        ));
        f.engine.set_lock_bonus(&ADMIN, false).unwrap();
        assert!(!f.engine.lock_bonus_enabled());
    }
}
