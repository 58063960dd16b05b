//! Collaborator interfaces
//!
//! The engines consume these capabilities but do not implement them:
//! payment and stake assets, the reward token's mint, badge eligibility,
//! the NFT boost oracle and the final-token migrator. Every method takes the
//! acting principal explicitly since there is no ambient "msg.sender".

use crate::math::PERCENT;
use crate::types::{Address, Amount, BadgeId};
use thiserror::Error;

/// Failure reported by an asset collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    #[error("insufficient balance: have {available}, need {required}")]
    InsufficientBalance { available: Amount, required: Amount },

    #[error("insufficient allowance: have {available}, need {required}")]
    InsufficientAllowance { available: Amount, required: Amount },

    #[error("{0} is not an authorised minter")]
    NotMinter(Address),

    #[error("rejected: {0}")]
    Rejected(String),
}

/// Failure reported by the boost oracle
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("oracle unavailable: {0}")]
    Unavailable(String),

    #[error("no boost data for {0}")]
    NoData(Address),
}

/// Standard fungible asset
pub trait FungibleAsset: Send + Sync {
    /// Identifier of the asset contract
    fn address(&self) -> Address;

    fn balance_of(&self, account: &Address) -> Amount;

    /// Move `amount` from `from` (the acting principal) to `to`
    fn transfer(&self, from: &Address, to: &Address, amount: Amount) -> Result<(), AssetError>;

    /// Move `amount` from `from` to `to` on the strength of an allowance
    /// granted to `spender`
    fn transfer_from(
        &self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), AssetError>;

    /// Pay every `(recipient, amount)` out of `from` in one step. Either all
    /// payouts land or none do.
    fn transfer_batch(&self, from: &Address, payouts: &[(Address, Amount)]) -> Result<(), AssetError>;
}

/// Asset whose supply can be extended by authorised minters
pub trait MintableAsset: Send + Sync {
    fn address(&self) -> Address;

    fn mint(&self, minter: &Address, to: &Address, amount: Amount) -> Result<(), AssetError>;
}

/// Badge (semi-fungible eligibility token) source
pub trait BadgeSource: Send + Sync {
    fn balance_of(&self, account: &Address, badge_id: BadgeId) -> u64;

    /// Burn `amount` of `owner`'s badges on behalf of the approved `operator`
    fn redeem_by_operator(
        &self,
        operator: &Address,
        owner: &Address,
        badge_id: BadgeId,
        amount: u64,
    ) -> Result<(), AssetError>;
}

/// External per-account reward multiplier, in percent (100 = 1.0x)
pub trait BoostOracle: Send + Sync {
    fn address(&self) -> Address;

    fn boost_multiplier(&self, account: &Address) -> Result<u32, OracleError>;
}

/// Query the oracle, substituting the neutral multiplier on any failure
pub fn boost_or_neutral(oracle: Option<&dyn BoostOracle>, account: &Address) -> u128 {
    let Some(oracle) = oracle else {
        return PERCENT;
    };
    match oracle.boost_multiplier(account) {
        Ok(boost) => boost as u128,
        Err(e) => {
            tracing::warn!("Boost oracle failed for {}, using neutral multiplier: {}", account, e);
            PERCENT
        }
    }
}

/// Receiver of burned pre-launch tokens that mints the final token
pub trait MigrationSink: Send + Sync {
    fn address(&self) -> Address;

    fn receive_migration(&self, account: &Address, amount: Amount) -> Result<(), AssetError>;
}
