//! Observability events
//!
//! Each engine keeps an append-only log of what it did. Events are part of
//! the engine's transactional state: a failed call leaves no events behind.

use crate::types::{Address, Amount, BadgeId, EpochId, PositionId, Timestamp};
use serde::{Deserialize, Serialize};

/// Issuance pool that a reserve counter tracks
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservePool {
    Airdrop,
    Presale,
    Migration,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    // === Token ledger ===
    Transfer {
        from: Address,
        to: Address,
        amount: Amount,
    },
    Approval {
        owner: Address,
        spender: Address,
        amount: Amount,
    },

    // === Issuance ===
    ReserveDefined {
        pool: ReservePool,
        cap: Amount,
    },
    Distributed {
        to: Address,
        amount: Amount,
    },
    BatchDistributed {
        recipients: usize,
        total: Amount,
    },
    BadgeConsumed {
        owner: Address,
        badge_id: BadgeId,
    },
    /// Operator redemption failed on a tolerant path; the badge must be
    /// burned out of band.
    BadgeRedeemDeferred {
        owner: Address,
        badge_id: BadgeId,
        reason: String,
    },
    AllocationSet {
        user: Address,
        added: Amount,
        total: Amount,
    },
    AllocationCancelled {
        user: Address,
        amount: Amount,
    },
    AllocationClaimed {
        user: Address,
        amount: Amount,
    },

    // === Presale ===
    PresaleConfigured {
        price_per_token: Amount,
        per_user_limit: Amount,
        badge_required: bool,
    },
    PresaleStatusChanged {
        active: bool,
    },
    PriceUpdated {
        old_price: Amount,
        new_price: Amount,
    },
    PriceStagesUpdated {
        stages: usize,
    },
    Purchase {
        buyer: Address,
        amount: Amount,
        cost: Amount,
    },
    FundsWithdrawn {
        to: Address,
        amount: Amount,
    },

    // === Transfer policy ===
    WhitelistChanged {
        account: Address,
        allowed: bool,
    },
    BlacklistChanged {
        account: Address,
        blocked: bool,
    },
    SellBlockChanged {
        enabled: bool,
        liquidity_pair: Option<Address>,
    },

    // === Migration ===
    MigrationEnabled {
        migrator: Address,
    },
    Migrated {
        account: Address,
        amount: Amount,
    },
    MigrationMinted {
        to: Address,
        amount: Amount,
    },

    // === Staking ===
    Staked {
        position_id: PositionId,
        owner: Address,
        amount: Amount,
        lock_duration: u64,
        lock_end_time: Timestamp,
    },
    Unstaked {
        position_id: PositionId,
        owner: Address,
        amount: Amount,
    },
    EarlyExit {
        position_id: PositionId,
        owner: Address,
        returned: Amount,
        penalty: Amount,
    },
    RewardsAccrued {
        position_id: PositionId,
        owner: Address,
        amount: Amount,
    },
    RewardsClaimed {
        owner: Address,
        amount: Amount,
        minted: bool,
    },
    RewardTokenSet {
        token: Address,
    },
    EpochConfigured {
        epoch_id: EpochId,
        emission_rate: Amount,
        start_time: Timestamp,
        end_time: Timestamp,
    },
    CurrentEpochSet {
        epoch_id: EpochId,
    },
    RewardCapUpdated {
        old_cap: Amount,
        new_cap: Amount,
    },
    BoostOracleUpdated {
        oracle: Option<Address>,
    },
    LockBonusToggled {
        enabled: bool,
    },
    EoaOnlyToggled {
        enabled: bool,
    },
    PauseChanged {
        paused: bool,
    },
    EmergencyWithdrawal {
        asset: Address,
        to: Address,
        amount: Amount,
    },

    // === Shared ===
    TreasuryUpdated {
        old: Address,
        new: Address,
    },
}

/// Event with the call timestamp it was emitted at
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedEvent {
    pub at: Timestamp,
    #[serde(flatten)]
    pub event: Event,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EventLog {
    entries: Vec<RecordedEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, at: Timestamp, event: Event) {
        tracing::debug!(at, ?event, "event");
        self.entries.push(RecordedEvent { at, event });
    }

    pub fn entries(&self) -> &[RecordedEvent] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&Event> {
        self.entries.last().map(|e| &e.event)
    }

    /// Drop everything emitted after the first `len` entries
    pub fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_and_read_back() {
        let mut log = EventLog::new();
        assert!(log.is_empty());
        log.emit(
            10,
            Event::Distributed {
                to: Address::repeat(1),
                amount: 5,
            },
        );
        assert_eq!(log.len(), 1);
        assert_eq!(log.entries()[0].at, 10);
        assert!(matches!(log.last(), Some(Event::Distributed { amount: 5, .. })));

        log.emit(11, Event::PauseChanged { paused: true });
        log.truncate(1);
        assert_eq!(log.len(), 1);
        assert!(matches!(log.last(), Some(Event::Distributed { .. })));
    }

    #[test]
    fn test_json_shape() {
        let recorded = RecordedEvent {
            at: 7,
            event: Event::PauseChanged { paused: true },
        };
        let json = serde_json::to_value(&recorded).unwrap();
        assert_eq!(json["type"], "pause_changed");
        assert_eq!(json["at"], 7);
        assert_eq!(json["paused"], true);
    }
}
