//! # GVT Core
//!
//! Shared building blocks for the PreGVT issuance engine and the rGGP
//! staking engine:
//!
//! - [`math`] - 18-decimal fixed-point arithmetic with 256-bit intermediates
//! - [`access`] - capability predicate and an in-memory role table
//! - [`interfaces`] - collaborator traits (assets, badges, boost oracle, migrator)
//! - [`guard`] - contract-wide re-entrancy guard
//! - [`events`] - observability event log
//! - [`journal`] - undo records that make engine calls all-or-nothing
//! - [`error`] - the error taxonomy every engine reports through
//!
//! ```text
//!   user call ──► engine ──► Authorizer? ──► Clock::now() once
//!                   │
//!                   ├──► mutate (journaled) ──► collaborators
//!                   │                              │
//!                   └──◄──── commit on Ok ◄────────┘  (rollback on Err)
//! ```

pub mod access;
pub mod clock;
pub mod error;
pub mod events;
pub mod guard;
pub mod interfaces;
pub mod journal;
pub mod math;
pub mod memory;
pub mod types;

pub use access::*;
pub use clock::*;
pub use error::*;
pub use events::*;
pub use guard::*;
pub use interfaces::*;
pub use types::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::access::{require, Authorizer, Capability, RoleTable};
    pub use crate::clock::{Clock, ManualClock, SystemClock};
    pub use crate::error::{GvtError, Result};
    pub use crate::events::{Event, EventLog, ReservePool};
    pub use crate::guard::ReentrancyGuard;
    pub use crate::interfaces::{
        AssetError, BadgeSource, BoostOracle, FungibleAsset, MigrationSink, MintableAsset,
    };
    pub use crate::journal::{Journaled, JournaledMap, Staged};
    pub use crate::math::{BASIS_POINTS, PERCENT, SCALE};
    pub use crate::types::*;
}

/// Time constants
pub mod time {
    pub const SECONDS_PER_DAY: u64 = 86_400;

    pub const fn days(n: u64) -> u64 {
        n * SECONDS_PER_DAY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_days() {
        assert_eq!(time::days(90), 7_776_000);
    }
}
