//! # PreGVT Issuance
//!
//! The pre-launch token: capped issuance pools, badge-gated airdrop claims,
//! a tiered presale, transfer gating and the burn-then-handoff migration to
//! the final GVT token.
//!
//! ## Issuance pools
//!
//! | Pool | Entry points | Capability |
//! |------|--------------|------------|
//! | Airdrop | `distribute`, `batch_distribute`, `claim_with_badge`, `claim_allocation` | distributor / badge holder |
//! | Presale | `buy` | anyone, optionally badge-gated |
//! | Migration | `mint_migrated` | migration |

pub mod config;
pub mod gate;
pub mod pricing;
pub mod reserve;
pub mod token;

pub use config::{BadgeRules, PresaleSettings, TokenConfig};
pub use gate::{SellBlock, TransferGate, TransferKind, TransferPolicy};
pub use pricing::{PresalePricing, PriceStage};
pub use reserve::{ReserveCounter, ReserveLedger};
pub use token::{PreGvtToken, PresaleState};
