//! Stake positions
//!
//! Positions are append-only: ids start at 1, grow by one per stake, and a
//! closed position stays in the store with its terminal status. The store is
//! journaled: `rollback` drops everything opened or changed since the last
//! `commit`, id counter included.

use gvt_core::error::{GvtError, Result};
use gvt_core::types::{Address, Amount, PositionId, Timestamp};
use gvt_core::journal::{Journaled, JournaledMap};
use serde::{Deserialize, Serialize};

/// Lifecycle of a position. Both exits are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionStatus {
    Active,
    Unstaked,
    EarlyExited,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakePosition {
    pub id: PositionId,
    pub owner: Address,
    /// Never changes after creation, kept after exit for the record
    pub amount: Amount,
    pub start_time: Timestamp,
    pub lock_duration: u64,
    pub lock_end_time: Timestamp,
    pub last_reward_time: Timestamp,
    /// Lifetime rewards credited to this position
    pub accrued_rewards: Amount,
    pub status: PositionStatus,
}

impl StakePosition {
    pub fn is_active(&self) -> bool {
        self.status == PositionStatus::Active
    }

    pub fn is_unlocked(&self, now: Timestamp) -> bool {
        now >= self.lock_end_time
    }
}

/// Positions by id plus the per-owner index
#[derive(Debug)]
pub struct PositionStore {
    positions: JournaledMap<PositionId, StakePosition>,
    by_owner: JournaledMap<Address, Vec<PositionId>>,
    next_id: PositionId,
    committed_next_id: PositionId,
}

impl Default for PositionStore {
    fn default() -> Self {
        Self {
            positions: JournaledMap::new(),
            by_owner: JournaledMap::new(),
            next_id: 1,
            committed_next_id: 1,
        }
    }
}

impl PositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an active position and return its id
    pub fn open(
        &mut self,
        owner: Address,
        amount: Amount,
        start_time: Timestamp,
        lock_duration: u64,
    ) -> Result<PositionId> {
        let lock_end_time = start_time
            .checked_add(lock_duration)
            .ok_or(GvtError::MathOverflow)?;
        let id = self.next_id;
        self.next_id += 1;

        self.positions.insert(
            id,
            StakePosition {
                id,
                owner,
                amount,
                start_time,
                lock_duration,
                lock_end_time,
                last_reward_time: start_time,
                accrued_rewards: 0,
                status: PositionStatus::Active,
            },
        );
        self.by_owner.get_or_default(owner).push(id);
        Ok(id)
    }

    pub fn get(&self, id: PositionId) -> Result<&StakePosition> {
        self.positions.get(&id).ok_or(GvtError::PositionNotFound(id))
    }

    pub fn get_mut(&mut self, id: PositionId) -> Result<&mut StakePosition> {
        self.positions
            .get_mut(&id)
            .ok_or(GvtError::PositionNotFound(id))
    }

    /// Look up an active position owned by `owner`
    pub fn active_owned_by(&self, id: PositionId, owner: &Address) -> Result<&StakePosition> {
        let position = self.get(id)?;
        if !position.is_active() {
            return Err(GvtError::PositionNotActive(id));
        }
        if position.owner != *owner {
            return Err(GvtError::NotPositionOwner(id));
        }
        Ok(position)
    }

    /// Move an active position to its terminal status
    pub fn close(&mut self, id: PositionId, status: PositionStatus) -> Result<&StakePosition> {
        let position = self.get_mut(id)?;
        if !position.is_active() {
            return Err(GvtError::PositionNotActive(id));
        }
        position.status = status;
        Ok(position)
    }

    /// Ids owned by `owner`, in creation order
    pub fn ids_of(&self, owner: &Address) -> &[PositionId] {
        self.by_owner.get(owner).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = &StakePosition> {
        self.positions.values()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl Journaled for PositionStore {
    fn commit(&mut self) {
        self.positions.commit();
        self.by_owner.commit();
        self.committed_next_id = self.next_id;
    }

    fn rollback(&mut self) {
        self.positions.rollback();
        self.by_owner.rollback();
        self.next_id = self.committed_next_id;
    }
}
