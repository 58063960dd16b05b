//! # PreGVT Token
//!
//! Pre-launch token ledger with reserve-capped issuance:
//!
//! ```text
//! distribute / batch_distribute ─┐
//! claim_with_badge ──────────────┼─► airdrop reserve ──┐
//! claim_allocation ──────────────┘                     │
//! buy ───────────────────────────► presale supply ─────┼─► TransferGate ─► balances
//! mint_migrated ─────────────────► migration supply ───┘
//!
//! migrate_to_gvt ─► burn whole balance ─► MigrationSink
//! ```
//!
//! Every entry point writes the live state through undo journals. Local
//! effects are applied first, external collaborators (badges, payment asset,
//! migrator) are invoked last, and a failure anywhere rolls the journals
//! back so the call leaves no trace.

use crate::config::{BadgeRules, TokenConfig};
use crate::gate::{TransferGate, TransferPolicy};
use crate::pricing::{PresalePricing, PriceStage};
use crate::reserve::ReserveLedger;
use gvt_core::access::{require, Authorizer, Capability};
use gvt_core::clock::Clock;
use gvt_core::error::{GvtError, Result};
use gvt_core::events::{Event, EventLog, RecordedEvent, ReservePool};
use gvt_core::guard::ReentrancyGuard;
use gvt_core::interfaces::{AssetError, BadgeSource, FungibleAsset, MigrationSink};
use gvt_core::journal::{Journaled, JournaledMap, Staged};
use gvt_core::math;
use gvt_core::types::{Address, Amount, BadgeId, Timestamp};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Live presale terms
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresaleState {
    pub active: bool,
    pub pricing: PresalePricing,
    /// 0 = unlimited
    pub per_user_limit: Amount,
    pub badge_required: bool,
    pub badge_id: BadgeId,
}

struct TokenState {
    balances: JournaledMap<Address, Amount>,
    allowances: JournaledMap<(Address, Address), Amount>,
    total_supply: Amount,
    total_burned: Amount,
    reserves: ReserveLedger,
    gate: Staged<TransferGate>,
    allocations: JournaledMap<Address, Amount>,
    purchased: JournaledMap<Address, Amount>,
    presale: PresaleState,
    treasury: Address,
    migrator: Option<Arc<dyn MigrationSink>>,
    events: EventLog,
}

/// Scalar fields restored wholesale when a call fails
struct Savepoint {
    total_supply: Amount,
    total_burned: Amount,
    reserves: ReserveLedger,
    presale: PresaleState,
    treasury: Address,
    migrator: Option<Arc<dyn MigrationSink>>,
    events: usize,
}

impl TokenState {
    fn savepoint(&self) -> Savepoint {
        Savepoint {
            total_supply: self.total_supply,
            total_burned: self.total_burned,
            reserves: self.reserves.clone(),
            presale: self.presale.clone(),
            treasury: self.treasury,
            migrator: self.migrator.clone(),
            events: self.events.len(),
        }
    }

    fn commit(&mut self) {
        self.balances.commit();
        self.allowances.commit();
        self.allocations.commit();
        self.purchased.commit();
        self.gate.commit();
    }

    fn rollback(&mut self, savepoint: Savepoint) {
        self.balances.rollback();
        self.allowances.rollback();
        self.allocations.rollback();
        self.purchased.rollback();
        self.gate.rollback();
        self.total_supply = savepoint.total_supply;
        self.total_burned = savepoint.total_burned;
        self.reserves = savepoint.reserves;
        self.presale = savepoint.presale;
        self.treasury = savepoint.treasury;
        self.migrator = savepoint.migrator;
        self.events.truncate(savepoint.events);
    }

    fn balance(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn emit(&mut self, now: Timestamp, event: Event) {
        self.events.emit(now, event);
    }

    fn credit(&mut self, account: &Address, amount: Amount) -> Result<()> {
        let balance = self.balances.get_or_default(*account);
        *balance = math::checked_add(*balance, amount)?;
        Ok(())
    }

    fn debit(&mut self, account: &Address, amount: Amount) -> Result<()> {
        let available = self.balance(account);
        if available < amount {
            return Err(GvtError::InsufficientBalance {
                available,
                required: amount,
            });
        }
        self.balances.insert(*account, available - amount);
        Ok(())
    }

    fn mint(&mut self, now: Timestamp, to: &Address, amount: Amount) -> Result<()> {
        if to.is_zero() {
            return Err(GvtError::ZeroAddress);
        }
        self.gate.check(&Address::ZERO, to)?;
        self.total_supply = math::checked_add(self.total_supply, amount)?;
        self.credit(to, amount)?;
        self.emit(
            now,
            Event::Transfer {
                from: Address::ZERO,
                to: *to,
                amount,
            },
        );
        Ok(())
    }

    fn burn(&mut self, now: Timestamp, from: &Address, amount: Amount) -> Result<()> {
        self.gate.check(from, &Address::ZERO)?;
        self.debit(from, amount)?;
        self.total_supply = math::checked_sub(self.total_supply, amount)?;
        self.total_burned = math::checked_add(self.total_burned, amount)?;
        self.emit(
            now,
            Event::Transfer {
                from: *from,
                to: Address::ZERO,
                amount,
            },
        );
        Ok(())
    }

    fn move_tokens(
        &mut self,
        now: Timestamp,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<()> {
        if to.is_zero() {
            return Err(GvtError::ZeroAddress);
        }
        self.gate.check(from, to)?;
        self.debit(from, amount)?;
        self.credit(to, amount)?;
        self.emit(
            now,
            Event::Transfer {
                from: *from,
                to: *to,
                amount,
            },
        );
        Ok(())
    }

    fn mint_from_reserve(
        &mut self,
        now: Timestamp,
        pool: ReservePool,
        to: &Address,
        amount: Amount,
    ) -> Result<()> {
        if to.is_zero() {
            return Err(GvtError::ZeroAddress);
        }
        if amount == 0 {
            return Err(GvtError::ZeroAmount);
        }
        self.reserves.take(pool, amount)?;
        self.mint(now, to, amount)
    }

    fn add_allocation(&mut self, now: Timestamp, user: &Address, amount: Amount) -> Result<()> {
        if user.is_zero() {
            return Err(GvtError::ZeroAddress);
        }
        if amount == 0 {
            return Err(GvtError::ZeroAmount);
        }
        let entry = self.allocations.get_or_default(*user);
        *entry = math::checked_add(*entry, amount)?;
        let total = *entry;
        self.emit(
            now,
            Event::AllocationSet {
                user: *user,
                added: amount,
                total,
            },
        );
        Ok(())
    }
}

/// PreGVT token engine
pub struct PreGvtToken {
    address: Address,
    name: String,
    symbol: String,
    badge_rules: BadgeRules,
    authorizer: Arc<dyn Authorizer>,
    clock: Arc<dyn Clock>,
    badges: Option<Arc<dyn BadgeSource>>,
    payment: Option<Arc<dyn FungibleAsset>>,
    state: RwLock<TokenState>,
    guard: ReentrancyGuard,
}

impl PreGvtToken {
    /// Create a token at `address` with the caps and presale terms of `config`
    pub fn new(
        address: Address,
        config: &TokenConfig,
        treasury: Address,
        authorizer: Arc<dyn Authorizer>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        if address.is_zero() || treasury.is_zero() {
            return Err(GvtError::ZeroAddress);
        }
        let price = config.presale.price_per_token as Amount;
        if price == 0 {
            return Err(GvtError::InvalidPrice);
        }

        let reserves = ReserveLedger::new(
            config.airdrop_cap_units(),
            config.presale_cap_units(),
            config.migration_cap_units(),
        );
        let now = clock.now();
        let mut events = EventLog::new();
        for pool in [ReservePool::Airdrop, ReservePool::Presale, ReservePool::Migration] {
            events.emit(
                now,
                Event::ReserveDefined {
                    pool,
                    cap: reserves.counter(pool).cap,
                },
            );
        }

        let state = TokenState {
            balances: JournaledMap::new(),
            allowances: JournaledMap::new(),
            total_supply: 0,
            total_burned: 0,
            reserves,
            gate: Staged::new(TransferGate::new(config.policy, treasury)),
            allocations: JournaledMap::new(),
            purchased: JournaledMap::new(),
            presale: PresaleState {
                active: false,
                pricing: PresalePricing::flat(price),
                per_user_limit: config.presale.per_user_limit_units(),
                badge_required: config.presale.badge_required,
                badge_id: config.presale.badge_id,
            },
            treasury,
            migrator: None,
            events,
        };

        tracing::info!(
            "Created {} ({}) at {} with {:?} transfer policy",
            config.name,
            config.symbol,
            address,
            config.policy
        );

        Ok(Self {
            address,
            name: config.name.clone(),
            symbol: config.symbol.clone(),
            badge_rules: config.badges.clone(),
            authorizer,
            clock,
            badges: None,
            payment: None,
            state: RwLock::new(state),
            guard: ReentrancyGuard::new(),
        })
    }

    pub fn with_badges(mut self, badges: Arc<dyn BadgeSource>) -> Self {
        self.badges = Some(badges);
        self
    }

    pub fn with_payment_asset(mut self, payment: Arc<dyn FungibleAsset>) -> Self {
        self.payment = Some(payment);
        self
    }

    /// Run `op` on the live state; keep its writes on `Ok`, undo them on `Err`
    fn transact<T>(&self, op: impl FnOnce(&mut TokenState, Timestamp) -> Result<T>) -> Result<T> {
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

    fn authorize(&self, principal: &Address, capability: Capability) -> Result<()> {
        require(self.authorizer.as_ref(), principal, capability)
    }

    fn payment_asset(&self) -> Result<&Arc<dyn FungibleAsset>> {
        self.payment
            .as_ref()
            .ok_or_else(|| GvtError::PaymentTransferFailed("no payment asset configured".into()))
    }

    fn holds_badge(&self, account: &Address, badge_id: BadgeId) -> bool {
        self.badges
            .as_ref()
            .is_some_and(|badges| badges.balance_of(account, badge_id) > 0)
    }

    fn redeem_badge(&self, owner: &Address, badge_id: BadgeId) -> std::result::Result<(), AssetError> {
        match &self.badges {
            Some(badges) => badges.redeem_by_operator(&self.address, owner, badge_id, 1),
            None => Err(AssetError::Rejected("no badge source configured".into())),
        }
    }

    // === Distribution ===

    /// Mint `amount` from the airdrop reserve straight to `to`
    pub fn distribute(&self, caller: &Address, to: &Address, amount: Amount) -> Result<()> {
        self.authorize(caller, Capability::Distributor)?;
        self.transact(|s, now| {
            s.mint_from_reserve(now, ReservePool::Airdrop, to, amount)?;
            s.emit(now, Event::Distributed { to: *to, amount });
            Ok(())
        })?;
        tracing::info!("Distributed {} to {}", amount, to);
        Ok(())
    }

    /// Distribute to many recipients at once; returns the total minted
    pub fn batch_distribute(
        &self,
        caller: &Address,
        recipients: &[Address],
        amounts: &[Amount],
    ) -> Result<Amount> {
        self.authorize(caller, Capability::Distributor)?;
        if recipients.len() != amounts.len() {
            return Err(GvtError::ArrayLengthMismatch {
                left: recipients.len(),
                right: amounts.len(),
            });
        }
        let total = self.transact(|s, now| {
            let mut total: Amount = 0;
            for (to, &amount) in recipients.iter().zip(amounts) {
                s.mint_from_reserve(now, ReservePool::Airdrop, to, amount)?;
                s.emit(now, Event::Distributed { to: *to, amount });
                total = math::checked_add(total, amount)?;
            }
            s.emit(
                now,
                Event::BatchDistributed {
                    recipients: recipients.len(),
                    total,
                },
            );
            Ok(total)
        })?;
        tracing::info!("Batch distributed {} to {} recipients", total, recipients.len());
        Ok(total)
    }

    /// Add `amount` to `user`'s claimable allocation
    pub fn set_allocation(&self, caller: &Address, user: &Address, amount: Amount) -> Result<()> {
        self.authorize(caller, Capability::Distributor)?;
        self.transact(|s, now| s.add_allocation(now, user, amount))
    }

    pub fn set_allocations(
        &self,
        caller: &Address,
        users: &[Address],
        amounts: &[Amount],
    ) -> Result<()> {
        self.authorize(caller, Capability::Distributor)?;
        if users.len() != amounts.len() {
            return Err(GvtError::ArrayLengthMismatch {
                left: users.len(),
                right: amounts.len(),
            });
        }
        self.transact(|s, now| {
            for (user, &amount) in users.iter().zip(amounts) {
                s.add_allocation(now, user, amount)?;
            }
            Ok(())
        })
    }

    /// Remove `user`'s whole allocation; returns what was cancelled
    pub fn cancel_allocation(&self, caller: &Address, user: &Address) -> Result<Amount> {
        self.authorize(caller, Capability::Distributor)?;
        self.transact(|s, now| {
            let amount = s
                .allocations
                .remove(user)
                .filter(|amount| *amount > 0)
                .ok_or(GvtError::NoAllocation(*user))?;
            s.emit(now, Event::AllocationCancelled { user: *user, amount });
            Ok(amount)
        })
    }

    // === Claims ===

    /// Redeem one airdrop badge for the configured per-badge amount.
    ///
    /// A failed badge redemption aborts the claim.
    pub fn claim_with_badge(&self, caller: &Address) -> Result<Amount> {
        let badge_id = self.badge_rules.airdrop_badge_id;
        let amount = self.badge_rules.claim_amount_units();
        self.transact(|s, now| {
            if !self.holds_badge(caller, badge_id) {
                return Err(GvtError::NoBadge);
            }
            s.mint_from_reserve(now, ReservePool::Airdrop, caller, amount)?;
            self.redeem_badge(caller, badge_id)
                .map_err(|e| GvtError::BadgeRedeemFailed(e.to_string()))?;
            s.emit(
                now,
                Event::BadgeConsumed {
                    owner: *caller,
                    badge_id,
                },
            );
            Ok(amount)
        })?;
        tracing::info!("{} claimed {} with badge {}", caller, amount, badge_id);
        Ok(amount)
    }

    /// Claim the caller's pre-assigned allocation.
    ///
    /// The allocation is cleared before minting. When the badge gate is on, a
    /// failed badge redemption does not abort the claim; it is recorded as a
    /// `BadgeRedeemDeferred` event for a manual burn.
    pub fn claim_allocation(&self, caller: &Address) -> Result<Amount> {
        let badge_id = self.badge_rules.airdrop_badge_id;
        let gated = self.badge_rules.allocation_requires_badge;
        let amount = self.transact(|s, now| {
            let amount = s
                .allocations
                .get(caller)
                .copied()
                .filter(|amount| *amount > 0)
                .ok_or(GvtError::NoAllocation(*caller))?;
            if gated && !self.holds_badge(caller, badge_id) {
                return Err(GvtError::NoBadge);
            }

            s.allocations.remove(caller);
            s.mint_from_reserve(now, ReservePool::Airdrop, caller, amount)?;
            s.emit(
                now,
                Event::AllocationClaimed {
                    user: *caller,
                    amount,
                },
            );

            if gated {
                match self.redeem_badge(caller, badge_id) {
                    Ok(()) => s.emit(
                        now,
                        Event::BadgeConsumed {
                            owner: *caller,
                            badge_id,
                        },
                    ),
                    Err(e) => {
                        tracing::warn!(
                            "Badge {} redemption for {} failed, deferring manual burn: {}",
                            badge_id,
                            caller,
                            e
                        );
                        s.emit(
                            now,
                            Event::BadgeRedeemDeferred {
                                owner: *caller,
                                badge_id,
                                reason: e.to_string(),
                            },
                        );
                    }
                }
            }
            Ok(amount)
        })?;
        tracing::info!("{} claimed allocation of {}", caller, amount);
        Ok(amount)
    }

    // === Presale ===

    /// Buy `amount` PreGVT from the presale supply; returns the payment taken
    pub fn buy(&self, caller: &Address, amount: Amount) -> Result<Amount> {
        let cost = self.transact(|s, now| {
            if !s.presale.active {
                return Err(GvtError::PresaleNotActive);
            }
            if amount == 0 {
                return Err(GvtError::ZeroAmount);
            }
            if s.presale.badge_required && !self.holds_badge(caller, s.presale.badge_id) {
                return Err(GvtError::BadgeRequiredForPurchase);
            }

            let sold = s.reserves.minted(ReservePool::Presale);
            s.reserves.take(ReservePool::Presale, amount)?;

            let purchased = math::checked_add(s.purchased.get(caller).copied().unwrap_or(0), amount)?;
            let limit = s.presale.per_user_limit;
            if limit > 0 && purchased > limit {
                return Err(GvtError::PurchaseLimitExceeded {
                    limit,
                    attempted: purchased,
                });
            }

            let cost = s.presale.pricing.cost(sold, amount)?;
            s.purchased.insert(*caller, purchased);
            s.mint(now, caller, amount)?;
            s.emit(
                now,
                Event::Purchase {
                    buyer: *caller,
                    amount,
                    cost,
                },
            );

            self.payment_asset()?
                .transfer_from(&self.address, caller, &self.address, cost)
                .map_err(|e| GvtError::PaymentTransferFailed(e.to_string()))?;
            Ok(cost)
        })?;
        tracing::info!("{} bought {} for {}", caller, amount, cost);
        Ok(cost)
    }

    /// Replace the presale terms in one call
    pub fn configure_presale(
        &self,
        caller: &Address,
        price_per_token: Amount,
        per_user_limit: Amount,
        badge_required: bool,
    ) -> Result<()> {
        self.authorize(caller, Capability::PriceManager)?;
        self.transact(|s, now| {
            s.presale.pricing.set_flat_price(price_per_token)?;
            s.presale.per_user_limit = per_user_limit;
            s.presale.badge_required = badge_required;
            s.emit(
                now,
                Event::PresaleConfigured {
                    price_per_token,
                    per_user_limit,
                    badge_required,
                },
            );
            Ok(())
        })
    }

    pub fn set_price(&self, caller: &Address, new_price: Amount) -> Result<()> {
        self.authorize(caller, Capability::PriceManager)?;
        self.transact(|s, now| {
            let old_price = s.presale.pricing.set_flat_price(new_price)?;
            s.emit(now, Event::PriceUpdated { old_price, new_price });
            Ok(())
        })
    }

    /// Install a tiered stage table; an empty table reverts to the flat price
    pub fn set_price_stages(&self, caller: &Address, stages: Vec<PriceStage>) -> Result<()> {
        self.authorize(caller, Capability::PriceManager)?;
        self.transact(|s, now| {
            let count = stages.len();
            s.presale.pricing.set_stages(stages)?;
            s.emit(now, Event::PriceStagesUpdated { stages: count });
            Ok(())
        })
    }

    pub fn set_presale_active(&self, caller: &Address, active: bool) -> Result<()> {
        self.authorize(caller, Capability::PriceManager)?;
        self.transact(|s, now| {
            s.presale.active = active;
            s.emit(now, Event::PresaleStatusChanged { active });
            Ok(())
        })?;
        tracing::info!("Presale {}", if active { "opened" } else { "closed" });
        Ok(())
    }

    /// Send collected payment funds out of the token's custody
    pub fn withdraw_funds(&self, caller: &Address, to: &Address, amount: Amount) -> Result<()> {
        self.authorize(caller, Capability::Treasury)?;
        if to.is_zero() {
            return Err(GvtError::ZeroAddress);
        }
        if amount == 0 {
            return Err(GvtError::ZeroAmount);
        }
        self.transact(|s, now| {
            s.emit(now, Event::FundsWithdrawn { to: *to, amount });
            self.payment_asset()?
                .transfer(&self.address, to, amount)
                .map_err(|e| GvtError::PaymentTransferFailed(e.to_string()))
        })
    }

    // === Transfer policy ===

    pub fn set_whitelisted(&self, caller: &Address, account: &Address, allowed: bool) -> Result<()> {
        self.authorize(caller, Capability::WhitelistManager)?;
        if account.is_zero() {
            return Err(GvtError::ZeroAddress);
        }
        self.transact(|s, now| {
            s.gate.make_mut().set_whitelisted(*account, allowed);
            s.emit(
                now,
                Event::WhitelistChanged {
                    account: *account,
                    allowed,
                },
            );
            Ok(())
        })
    }

    pub fn set_blacklisted(&self, caller: &Address, account: &Address, blocked: bool) -> Result<()> {
        self.authorize(caller, Capability::BlacklistManager)?;
        if account.is_zero() {
            return Err(GvtError::ZeroAddress);
        }
        self.transact(|s, now| {
            s.gate.make_mut().set_blacklisted(*account, blocked);
            s.emit(
                now,
                Event::BlacklistChanged {
                    account: *account,
                    blocked,
                },
            );
            Ok(())
        })?;
        if blocked {
            tracing::warn!("Blacklisted {}", account);
        }
        Ok(())
    }

    /// Toggle the sell block; enabling it requires a liquidity pair
    pub fn configure_sell_block(
        &self,
        caller: &Address,
        enabled: bool,
        liquidity_pair: Option<Address>,
    ) -> Result<()> {
        self.authorize(caller, Capability::Admin)?;
        if liquidity_pair.is_some_and(|pair| pair.is_zero()) || (enabled && liquidity_pair.is_none())
        {
            return Err(GvtError::ZeroAddress);
        }
        self.transact(|s, now| {
            s.gate.make_mut().set_sell_block(enabled, liquidity_pair);
            s.emit(
                now,
                Event::SellBlockChanged {
                    enabled,
                    liquidity_pair,
                },
            );
            Ok(())
        })
    }

    pub fn set_treasury(&self, caller: &Address, treasury: &Address) -> Result<()> {
        self.authorize(caller, Capability::Admin)?;
        if treasury.is_zero() {
            return Err(GvtError::ZeroAddress);
        }
        self.transact(|s, now| {
            let old = std::mem::replace(&mut s.treasury, *treasury);
            s.gate.make_mut().set_treasury(*treasury);
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

    // === Migration ===

    /// Enable migration by wiring the final-token migrator. Can only happen once.
    pub fn set_migrator(&self, caller: &Address, migrator: Arc<dyn MigrationSink>) -> Result<()> {
        self.authorize(caller, Capability::MigratorSetter)?;
        let migrator_address = migrator.address();
        if migrator_address.is_zero() {
            return Err(GvtError::InvalidMigrator);
        }
        self.transact(|s, now| {
            if s.migrator.is_some() {
                return Err(GvtError::MigratorAlreadySet);
            }
            s.migrator = Some(migrator);
            s.emit(
                now,
                Event::MigrationEnabled {
                    migrator: migrator_address,
                },
            );
            Ok(())
        })?;
        tracing::info!("Migration enabled via {}", migrator_address);
        Ok(())
    }

    /// Burn the caller's whole balance and hand it to the migrator
    pub fn migrate_to_gvt(&self, caller: &Address) -> Result<Amount> {
        let amount = self.transact(|s, now| {
            let migrator = s.migrator.clone().ok_or(GvtError::MigrationNotEnabled)?;
            let amount = s.balance(caller);
            if amount == 0 {
                return Err(GvtError::ZeroAmount);
            }
            s.burn(now, caller, amount)?;
            s.emit(
                now,
                Event::Migrated {
                    account: *caller,
                    amount,
                },
            );
            migrator
                .receive_migration(caller, amount)
                .map_err(|e| GvtError::MigrationHandoffFailed(e.to_string()))?;
            Ok(amount)
        })?;
        tracing::info!("{} migrated {} to GVT", caller, amount);
        Ok(amount)
    }

    /// Inbound migration mint from a prior token version
    pub fn mint_migrated(&self, caller: &Address, to: &Address, amount: Amount) -> Result<()> {
        self.authorize(caller, Capability::Migration)?;
        self.transact(|s, now| {
            s.mint_from_reserve(now, ReservePool::Migration, to, amount)?;
            s.emit(now, Event::MigrationMinted { to: *to, amount });
            Ok(())
        })
    }

    // === Ledger ===

    pub fn transfer(&self, caller: &Address, to: &Address, amount: Amount) -> Result<()> {
        self.transact(|s, now| s.move_tokens(now, caller, to, amount))
    }

    pub fn approve(&self, owner: &Address, spender: &Address, amount: Amount) -> Result<()> {
        if spender.is_zero() {
            return Err(GvtError::ZeroAddress);
        }
        self.transact(|s, now| {
            s.gate.check_approval()?;
            s.allowances.insert((*owner, *spender), amount);
            s.emit(
                now,
                Event::Approval {
                    owner: *owner,
                    spender: *spender,
                    amount,
                },
            );
            Ok(())
        })
    }

    pub fn transfer_from(
        &self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<()> {
        self.transact(|s, now| {
            let key = (*from, *spender);
            let allowed = s.allowances.get(&key).copied().unwrap_or(0);
            if allowed < amount {
                return Err(GvtError::InsufficientAllowance {
                    available: allowed,
                    required: amount,
                });
            }
            s.move_tokens(now, from, to, amount)?;
            s.allowances.insert(key, allowed - amount);
            Ok(())
        })
    }

    // === Views ===

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.state.read().balance(account)
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.state
            .read()
            .allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_supply(&self) -> Amount {
        self.state.read().total_supply
    }

    pub fn total_burned(&self) -> Amount {
        self.state.read().total_burned
    }

    pub fn reserve_remaining(&self, pool: ReservePool) -> Amount {
        self.state.read().reserves.remaining(pool)
    }

    pub fn reserve_minted(&self, pool: ReservePool) -> Amount {
        self.state.read().reserves.minted(pool)
    }

    pub fn allocation_of(&self, user: &Address) -> Amount {
        self.state.read().allocations.get(user).copied().unwrap_or(0)
    }

    pub fn purchased_of(&self, user: &Address) -> Amount {
        self.state.read().purchased.get(user).copied().unwrap_or(0)
    }

    pub fn presale(&self) -> PresaleState {
        self.state.read().presale.clone()
    }

    /// Price the next purchase would pay
    pub fn current_price(&self) -> Amount {
        let state = self.state.read();
        state
            .presale
            .pricing
            .price_at(state.reserves.minted(ReservePool::Presale))
    }

    pub fn policy(&self) -> TransferPolicy {
        self.state.read().gate.policy()
    }

    pub fn is_whitelisted(&self, account: &Address) -> bool {
        self.state.read().gate.is_whitelisted(account)
    }

    pub fn is_blacklisted(&self, account: &Address) -> bool {
        self.state.read().gate.is_blacklisted(account)
    }

    pub fn treasury(&self) -> Address {
        self.state.read().treasury
    }

    pub fn migrator(&self) -> Option<Address> {
        self.state.read().migrator.as_ref().map(|m| m.address())
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.state.read().events.entries().to_vec()
    }
}

fn to_asset_error(err: GvtError) -> AssetError {
    match err {
        GvtError::InsufficientBalance {
            available,
            required,
        } => AssetError::InsufficientBalance {
            available,
            required,
        },
        GvtError::InsufficientAllowance {
            available,
            required,
        } => AssetError::InsufficientAllowance {
            available,
            required,
        },
        other => AssetError::Rejected(other.to_string()),
    }
}

/// Lets PreGVT serve as the stake asset, with custody moves passing the gate
impl FungibleAsset for PreGvtToken {
    fn address(&self) -> Address {
        self.address
    }

    fn balance_of(&self, account: &Address) -> Amount {
        PreGvtToken::balance_of(self, account)
    }

    fn transfer(&self, from: &Address, to: &Address, amount: Amount) -> std::result::Result<(), AssetError> {
        PreGvtToken::transfer(self, from, to, amount).map_err(to_asset_error)
    }

    fn transfer_from(
        &self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> std::result::Result<(), AssetError> {
        PreGvtToken::transfer_from(self, spender, from, to, amount).map_err(to_asset_error)
    }

    fn transfer_batch(
        &self,
        from: &Address,
        payouts: &[(Address, Amount)],
    ) -> std::result::Result<(), AssetError> {
        self.transact(|s, now| {
            for (to, amount) in payouts.iter().filter(|(_, amount)| *amount > 0) {
                s.move_tokens(now, from, to, *amount)?;
            }
            Ok(())
        })
        .map_err(to_asset_error)
    }
}
