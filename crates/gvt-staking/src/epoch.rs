//! Epoch emission schedule
//!
//! Epochs are a sparse map of emission records. The schedule does not follow
//! the clock: the current epoch changes only when an administrator moves the
//! pointer, and accrual uses the current epoch's rate for the whole elapsed
//! interval without clipping to its window.

use gvt_core::error::{GvtError, Result};
use gvt_core::types::{Amount, EpochId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochConfig {
    /// Reward units per staked unit per second, scaled by 1e18
    pub emission_rate: Amount,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
}

impl EpochConfig {
    pub fn new(emission_rate: Amount, start_time: Timestamp, end_time: Timestamp) -> Result<Self> {
        if end_time <= start_time {
            return Err(GvtError::InvalidEpochConfig {
                start: start_time,
                end: end_time,
            });
        }
        Ok(Self {
            emission_rate,
            start_time,
            end_time,
        })
    }

    pub fn duration(&self) -> u64 {
        self.end_time - self.start_time
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochSchedule {
    epochs: BTreeMap<EpochId, EpochConfig>,
    current: EpochId,
}

impl EpochSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the record for `id`
    pub fn configure(&mut self, id: EpochId, config: EpochConfig) {
        self.epochs.insert(id, config);
    }

    pub fn set_current(&mut self, id: EpochId) {
        self.current = id;
    }

    pub fn current_id(&self) -> EpochId {
        self.current
    }

    pub fn get(&self, id: EpochId) -> Option<&EpochConfig> {
        self.epochs.get(&id)
    }

    pub fn current(&self) -> Option<&EpochConfig> {
        self.get(self.current)
    }

    /// Emission rate of the current epoch, 0 when it has no record
    pub fn current_rate(&self) -> Amount {
        self.current().map(|epoch| epoch.emission_rate).unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EpochId, &EpochConfig)> {
        self.epochs.iter()
    }
}
