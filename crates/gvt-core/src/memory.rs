//! In-memory collaborators
//!
//! Reference implementations of the collaborator traits, used by the
//! scenario runner and by tests across the workspace.

use crate::interfaces::{
    AssetError, BadgeSource, BoostOracle, FungibleAsset, MigrationSink, MintableAsset,
    OracleError,
};
use crate::types::{Address, Amount, BadgeId};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
struct AssetBook {
    balances: HashMap<Address, Amount>,
    allowances: HashMap<(Address, Address), Amount>,
    total_supply: Amount,
}

/// Plain fungible asset with optional minting
#[derive(Debug)]
pub struct MemoryAsset {
    address: Address,
    symbol: String,
    book: RwLock<AssetBook>,
    minters: RwLock<HashSet<Address>>,
}

impl MemoryAsset {
    pub fn new(address: Address, symbol: impl Into<String>) -> Self {
        Self {
            address,
            symbol: symbol.into(),
            book: RwLock::new(AssetBook::default()),
            minters: RwLock::new(HashSet::new()),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn add_minter(&self, minter: Address) {
        self.minters.write().insert(minter);
    }

    /// Credit `to` out of thin air (fixtures and faucets)
    pub fn fund(&self, to: &Address, amount: Amount) {
        let mut book = self.book.write();
        *book.balances.entry(*to).or_insert(0) += amount;
        book.total_supply += amount;
    }

    pub fn approve(&self, owner: &Address, spender: &Address, amount: Amount) {
        self.book.write().allowances.insert((*owner, *spender), amount);
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.book
            .read()
            .allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_supply(&self) -> Amount {
        self.book.read().total_supply
    }

    fn move_balance(
        book: &mut AssetBook,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), AssetError> {
        let available = book.balances.get(from).copied().unwrap_or(0);
        if available < amount {
            return Err(AssetError::InsufficientBalance {
                available,
                required: amount,
            });
        }
        book.balances.insert(*from, available - amount);
        *book.balances.entry(*to).or_insert(0) += amount;
        Ok(())
    }
}

impl FungibleAsset for MemoryAsset {
    fn address(&self) -> Address {
        self.address
    }

    fn balance_of(&self, account: &Address) -> Amount {
        self.book.read().balances.get(account).copied().unwrap_or(0)
    }

    fn transfer(&self, from: &Address, to: &Address, amount: Amount) -> Result<(), AssetError> {
        let mut book = self.book.write();
        Self::move_balance(&mut book, from, to, amount)
    }

    fn transfer_from(
        &self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), AssetError> {
        let mut book = self.book.write();
        let key = (*from, *spender);
        let allowed = book.allowances.get(&key).copied().unwrap_or(0);
        if allowed < amount {
            return Err(AssetError::InsufficientAllowance {
                available: allowed,
                required: amount,
            });
        }
        Self::move_balance(&mut book, from, to, amount)?;
        book.allowances.insert(key, allowed - amount);
        Ok(())
    }

    fn transfer_batch(&self, from: &Address, payouts: &[(Address, Amount)]) -> Result<(), AssetError> {
        let mut book = self.book.write();
        let required = payouts
            .iter()
            .try_fold(0 as Amount, |sum, (_, amount)| sum.checked_add(*amount))
            .ok_or_else(|| AssetError::Rejected("payout total overflows".into()))?;
        let available = book.balances.get(from).copied().unwrap_or(0);
        if available < required {
            return Err(AssetError::InsufficientBalance {
                available,
                required,
            });
        }
        for (to, amount) in payouts {
            Self::move_balance(&mut book, from, to, *amount)?;
        }
        Ok(())
    }
}

impl MintableAsset for MemoryAsset {
    fn address(&self) -> Address {
        self.address
    }

    fn mint(&self, minter: &Address, to: &Address, amount: Amount) -> Result<(), AssetError> {
        if !self.minters.read().contains(minter) {
            return Err(AssetError::NotMinter(*minter));
        }
        self.fund(to, amount);
        Ok(())
    }
}

/// Badge balances with operator approvals
#[derive(Debug, Default)]
pub struct MemoryBadges {
    balances: RwLock<HashMap<(Address, BadgeId), u64>>,
    operators: RwLock<HashSet<(Address, Address)>>,
}

impl MemoryBadges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn give(&self, owner: &Address, badge_id: BadgeId, amount: u64) {
        *self.balances.write().entry((*owner, badge_id)).or_insert(0) += amount;
    }

    /// Let `operator` redeem `owner`'s badges
    pub fn approve_operator(&self, owner: &Address, operator: &Address) {
        self.operators.write().insert((*owner, *operator));
    }
}

impl BadgeSource for MemoryBadges {
    fn balance_of(&self, account: &Address, badge_id: BadgeId) -> u64 {
        self.balances
            .read()
            .get(&(*account, badge_id))
            .copied()
            .unwrap_or(0)
    }

    fn redeem_by_operator(
        &self,
        operator: &Address,
        owner: &Address,
        badge_id: BadgeId,
        amount: u64,
    ) -> Result<(), AssetError> {
        if !self.operators.read().contains(&(*owner, *operator)) {
            return Err(AssetError::Rejected(format!(
                "{} is not an approved operator for {}",
                operator, owner
            )));
        }
        let mut balances = self.balances.write();
        let held = balances.get(&(*owner, badge_id)).copied().unwrap_or(0);
        if held < amount {
            return Err(AssetError::InsufficientBalance {
                available: held as Amount,
                required: amount as Amount,
            });
        }
        balances.insert((*owner, badge_id), held - amount);
        Ok(())
    }
}

/// Oracle answering from a fixed table
#[derive(Debug)]
pub struct FixedBoostOracle {
    address: Address,
    default_boost: u32,
    boosts: RwLock<HashMap<Address, u32>>,
}

impl FixedBoostOracle {
    pub fn new(address: Address, default_boost: u32) -> Self {
        Self {
            address,
            default_boost,
            boosts: RwLock::new(HashMap::new()),
        }
    }

    pub fn set_boost(&self, account: Address, boost: u32) {
        self.boosts.write().insert(account, boost);
    }
}

impl BoostOracle for FixedBoostOracle {
    fn address(&self) -> Address {
        self.address
    }

    fn boost_multiplier(&self, account: &Address) -> Result<u32, OracleError> {
        Ok(self
            .boosts
            .read()
            .get(account)
            .copied()
            .unwrap_or(self.default_boost))
    }
}

/// Oracle that always fails
#[derive(Debug)]
pub struct FailingBoostOracle {
    address: Address,
}

impl FailingBoostOracle {
    pub fn new(address: Address) -> Self {
        Self { address }
    }
}

impl BoostOracle for FailingBoostOracle {
    fn address(&self) -> Address {
        self.address
    }

    fn boost_multiplier(&self, _account: &Address) -> Result<u32, OracleError> {
        Err(OracleError::Unavailable("oracle reverted".into()))
    }
}

/// Migrator that records every handoff
#[derive(Debug)]
pub struct RecordingMigrationSink {
    address: Address,
    received: RwLock<Vec<(Address, Amount)>>,
}

impl RecordingMigrationSink {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            received: RwLock::new(Vec::new()),
        }
    }

    pub fn received(&self) -> Vec<(Address, Amount)> {
        self.received.read().clone()
    }
}

impl MigrationSink for RecordingMigrationSink {
    fn address(&self) -> Address {
        self.address
    }

    fn receive_migration(&self, account: &Address, amount: Amount) -> Result<(), AssetError> {
        self.received.write().push((*account, amount));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::boost_or_neutral;

    #[test]
    fn test_asset_transfer_from_consumes_allowance() {
        let usdc = MemoryAsset::new(Address::repeat(0xaa), "USDC");
        let alice = Address::repeat(1);
        let shop = Address::repeat(2);
        usdc.fund(&alice, 100);
        usdc.approve(&alice, &shop, 60);

        usdc.transfer_from(&shop, &alice, &shop, 50).unwrap();
        assert_eq!(usdc.balance_of(&alice), 50);
        assert_eq!(usdc.balance_of(&shop), 50);
        assert_eq!(usdc.allowance(&alice, &shop), 10);

        let err = usdc.transfer_from(&shop, &alice, &shop, 20).unwrap_err();
        assert!(matches!(err, AssetError::InsufficientAllowance { .. }));
    }

    #[test]
    fn test_asset_batch_is_all_or_nothing() {
        let usdc = MemoryAsset::new(Address::repeat(0xaa), "USDC");
        let vault = Address::repeat(1);
        let a = Address::repeat(2);
        let b = Address::repeat(3);
        usdc.fund(&vault, 100);

        let err = usdc.transfer_batch(&vault, &[(a, 60), (b, 60)]).unwrap_err();
        assert!(matches!(err, AssetError::InsufficientBalance { available: 100, required: 120 }));
        assert_eq!(usdc.balance_of(&vault), 100);
        assert_eq!(usdc.balance_of(&a), 0);

        usdc.transfer_batch(&vault, &[(a, 60), (b, 40)]).unwrap();
        assert_eq!(usdc.balance_of(&a), 60);
        assert_eq!(usdc.balance_of(&b), 40);
        assert_eq!(usdc.balance_of(&vault), 0);
    }

    #[test]
    fn test_asset_mint_requires_minter() {
        let rggp = MemoryAsset::new(Address::repeat(0xbb), "rGGP");
        let staking = Address::repeat(3);
        let user = Address::repeat(4);

        assert_eq!(
            rggp.mint(&staking, &user, 5),
            Err(AssetError::NotMinter(staking))
        );
        rggp.add_minter(staking);
        rggp.mint(&staking, &user, 5).unwrap();
        assert_eq!(rggp.balance_of(&user), 5);
        assert_eq!(rggp.total_supply(), 5);
    }

    #[test]
    fn test_badge_redeem_needs_operator_approval() {
        let badges = MemoryBadges::new();
        let owner = Address::repeat(1);
        let operator = Address::repeat(9);
        badges.give(&owner, 7, 1);

        assert!(badges.redeem_by_operator(&operator, &owner, 7, 1).is_err());
        badges.approve_operator(&owner, &operator);
        badges.redeem_by_operator(&operator, &owner, 7, 1).unwrap();
        assert_eq!(badges.balance_of(&owner, 7), 0);
    }

    #[test]
    fn test_boost_fallback() {
        let user = Address::repeat(5);
        let fixed = FixedBoostOracle::new(Address::repeat(0xcc), 100);
        fixed.set_boost(user, 130);
        let failing = FailingBoostOracle::new(Address::repeat(0xcd));

        assert_eq!(boost_or_neutral(Some(&fixed as &dyn BoostOracle), &user), 130);
        assert_eq!(boost_or_neutral(Some(&failing as &dyn BoostOracle), &user), 100);
        assert_eq!(boost_or_neutral(None, &user), 100);
    }
}
