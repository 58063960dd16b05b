//! Capability checks
//!
//! Engines never embed an access-control scheme. They receive an
//! [`Authorizer`] and ask it whether a principal holds a capability at the
//! start of every administrative entry point.

use crate::error::{GvtError, Result};
use crate::types::Address;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Named administrative permissions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Owner/admin: configuration, pause, emergency operations
    Admin,
    /// Airdrops and allocation bookkeeping
    Distributor,
    /// One-time configuration of the final-token migrator
    MigratorSetter,
    /// Presale pricing and activation
    PriceManager,
    /// Withdrawal of collected presale funds
    Treasury,
    WhitelistManager,
    BlacklistManager,
    /// Reward-token minting
    Minter,
    /// Inbound migration minting from a prior token version
    Migration,
}

impl Capability {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Distributor => "distributor",
            Self::MigratorSetter => "migrator_setter",
            Self::PriceManager => "price_manager",
            Self::Treasury => "treasury",
            Self::WhitelistManager => "whitelist_manager",
            Self::BlacklistManager => "blacklist_manager",
            Self::Minter => "minter",
            Self::Migration => "migration",
        }
    }
}

/// Authorization predicate: does `principal` hold `capability`?
pub trait Authorizer: Send + Sync {
    fn has_capability(&self, principal: &Address, capability: Capability) -> bool;
}

impl<F> Authorizer for F
where
    F: Fn(&Address, Capability) -> bool + Send + Sync,
{
    fn has_capability(&self, principal: &Address, capability: Capability) -> bool {
        self(principal, capability)
    }
}

/// Fail with [`GvtError::Unauthorized`] unless `principal` holds `capability`
pub fn require(
    authorizer: &dyn Authorizer,
    principal: &Address,
    capability: Capability,
) -> Result<()> {
    if authorizer.has_capability(principal, capability) {
        Ok(())
    } else {
        Err(GvtError::Unauthorized {
            principal: *principal,
            capability,
        })
    }
}

/// In-memory role table
///
/// Capabilities are independent: [`Capability::Admin`] does not imply the others.
#[derive(Debug, Default)]
pub struct RoleTable {
    grants: RwLock<HashMap<Capability, HashSet<Address>>>,
}

impl RoleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with a single principal holding every listed capability
    pub fn with_grants(principal: Address, capabilities: &[Capability]) -> Self {
        let table = Self::new();
        for capability in capabilities {
            table.grant(*capability, principal);
        }
        table
    }

    pub fn grant(&self, capability: Capability, principal: Address) {
        self.grants
            .write()
            .entry(capability)
            .or_default()
            .insert(principal);
        tracing::debug!("Granted {} to {}", capability.name(), principal);
    }

    pub fn revoke(&self, capability: Capability, principal: &Address) -> bool {
        let removed = self
            .grants
            .write()
            .get_mut(&capability)
            .map(|holders| holders.remove(principal))
            .unwrap_or(false);
        if removed {
            tracing::debug!("Revoked {} from {}", capability.name(), principal);
        }
        removed
    }

    pub fn holders(&self, capability: Capability) -> Vec<Address> {
        let mut holders: Vec<Address> = self
            .grants
            .read()
            .get(&capability)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        holders.sort();
        holders
    }
}

impl Authorizer for RoleTable {
    fn has_capability(&self, principal: &Address, capability: Capability) -> bool {
        self.grants
            .read()
            .get(&capability)
            .is_some_and(|holders| holders.contains(principal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_table_grant_revoke() {
        let admin = Address::repeat(1);
        let table = RoleTable::new();

        assert!(!table.has_capability(&admin, Capability::Admin));
        table.grant(Capability::Admin, admin);
        assert!(table.has_capability(&admin, Capability::Admin));
        assert!(!table.has_capability(&admin, Capability::Minter));

        assert!(table.revoke(Capability::Admin, &admin));
        assert!(!table.revoke(Capability::Admin, &admin));
        assert!(!table.has_capability(&admin, Capability::Admin));
    }

    #[test]
    fn test_closure_authorizer() {
        let admin = Address::repeat(9);
        let only_admin = move |p: &Address, c: Capability| *p == admin && c == Capability::Admin;

        assert!(require(&only_admin, &admin, Capability::Admin).is_ok());
        assert_eq!(
            require(&only_admin, &Address::repeat(8), Capability::Admin),
            Err(GvtError::Unauthorized {
                principal: Address::repeat(8),
                capability: Capability::Admin,
            })
        );
    }

    #[test]
    fn test_with_grants() {
        let ops = Address::repeat(3);
        let table = RoleTable::with_grants(ops, &[Capability::Distributor, Capability::Treasury]);
        assert!(table.has_capability(&ops, Capability::Treasury));
        assert_eq!(table.holders(Capability::Distributor), vec![ops]);
    }
}
