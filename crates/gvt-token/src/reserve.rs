//! # Reserve Ledger
//!
//! Minted-versus-cap counters for the three PreGVT issuance pools.
//!
//! | Pool | Fed by | Cap |
//! |------|--------|-----|
//! | Airdrop | distributions, badge claims, allocation claims | fixed at construction |
//! | Presale | `buy` | fixed at construction |
//! | Migration | inbound migration mints | fixed at construction |
//!
//! Counters only ever grow. A request that would push a counter past its cap
//! fails without touching the counter.

use gvt_core::error::{GvtError, Result};
use gvt_core::events::ReservePool;
use gvt_core::math;
use gvt_core::types::Amount;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveCounter {
    pub cap: Amount,
    pub minted: Amount,
}

impl ReserveCounter {
    pub fn new(cap: Amount) -> Self {
        Self { cap, minted: 0 }
    }

    pub fn remaining(&self) -> Amount {
        self.cap.saturating_sub(self.minted)
    }

    pub fn can_take(&self, amount: Amount) -> bool {
        self.minted
            .checked_add(amount)
            .is_some_and(|total| total <= self.cap)
    }
}

/// Counters for every issuance pool
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveLedger {
    airdrop: ReserveCounter,
    presale: ReserveCounter,
    migration: ReserveCounter,
}

impl ReserveLedger {
    pub fn new(airdrop_cap: Amount, presale_cap: Amount, migration_cap: Amount) -> Self {
        Self {
            airdrop: ReserveCounter::new(airdrop_cap),
            presale: ReserveCounter::new(presale_cap),
            migration: ReserveCounter::new(migration_cap),
        }
    }

    pub fn counter(&self, pool: ReservePool) -> &ReserveCounter {
        match pool {
            ReservePool::Airdrop => &self.airdrop,
            ReservePool::Presale => &self.presale,
            ReservePool::Migration => &self.migration,
        }
    }

    fn counter_mut(&mut self, pool: ReservePool) -> &mut ReserveCounter {
        match pool {
            ReservePool::Airdrop => &mut self.airdrop,
            ReservePool::Presale => &mut self.presale,
            ReservePool::Migration => &mut self.migration,
        }
    }

    pub fn remaining(&self, pool: ReservePool) -> Amount {
        self.counter(pool).remaining()
    }

    pub fn minted(&self, pool: ReservePool) -> Amount {
        self.counter(pool).minted
    }

    /// Fail with the pool's cap error unless `amount` fits
    pub fn ensure_capacity(&self, pool: ReservePool, amount: Amount) -> Result<()> {
        let counter = self.counter(pool);
        if counter.can_take(amount) {
            return Ok(());
        }
        let requested = amount;
        let remaining = counter.remaining();
        Err(match pool {
            ReservePool::Airdrop => GvtError::ReserveCapExceeded { requested, remaining },
            ReservePool::Presale => GvtError::PresaleCapExceeded { requested, remaining },
            ReservePool::Migration => GvtError::MigrationCapExceeded { requested, remaining },
        })
    }

    /// Take `amount` out of `pool`
    pub fn take(&mut self, pool: ReservePool, amount: Amount) -> Result<()> {
        self.ensure_capacity(pool, amount)?;
        let counter = self.counter_mut(pool);
        counter.minted = math::checked_add(counter.minted, amount)?;
        Ok(())
    }
}
