//! Error types for the GVT engines
//!
//! Every failure aborts the whole call with no state change, so each variant
//! names one precise cause that callers and tests can match on.

use crate::access::Capability;
use crate::types::{Address, Amount, PositionId, Timestamp};
use thiserror::Error;

/// Result type alias for GVT operations
pub type Result<T> = std::result::Result<T, GvtError>;

/// Broad error classes, used for reporting and error-code ranges
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    InputValidation,
    Capacity,
    State,
    TransferPolicy,
    ExternalDependency,
    Authorization,
    Arithmetic,
}

/// Errors that can occur in token issuance and staking operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GvtError {
    // === Input Validation ===
    #[error("Zero address not allowed")]
    ZeroAddress,

    #[error("Amount must be greater than zero")]
    ZeroAmount,

    #[error("Invalid stake amount")]
    InvalidAmount,

    #[error("Array length mismatch: {left} vs {right}")]
    ArrayLengthMismatch { left: usize, right: usize },

    #[error("Invalid price")]
    InvalidPrice,

    #[error("Lock duration {duration}s outside [{min}s, {max}s]")]
    InvalidLockDuration { duration: u64, min: u64, max: u64 },

    #[error("Invalid epoch config: end {end} must be after start {start}")]
    InvalidEpochConfig { start: Timestamp, end: Timestamp },

    #[error("Reward cap {cap} below rewards already minted {minted}")]
    InvalidRewardCap { cap: Amount, minted: Amount },

    // === Capacity ===
    #[error("Reserve cap exceeded: requested {requested}, remaining {remaining}")]
    ReserveCapExceeded { requested: Amount, remaining: Amount },

    #[error("Presale cap exceeded: requested {requested}, remaining {remaining}")]
    PresaleCapExceeded { requested: Amount, remaining: Amount },

    #[error("Migration cap exceeded: requested {requested}, remaining {remaining}")]
    MigrationCapExceeded { requested: Amount, remaining: Amount },

    #[error("Reward cap exceeded: requested {requested}, remaining {remaining}")]
    RewardCapExceeded { requested: Amount, remaining: Amount },

    #[error("Purchase limit exceeded: limit {limit}, would reach {attempted}")]
    PurchaseLimitExceeded { limit: Amount, attempted: Amount },

    // === State / Eligibility ===
    #[error("Caller holds no eligible badge")]
    NoBadge,

    #[error("No allocation for {0}")]
    NoAllocation(Address),

    #[error("Badge required for purchase")]
    BadgeRequiredForPurchase,

    #[error("Presale is not active")]
    PresaleNotActive,

    #[error("Position still locked until {unlock_at}")]
    StillLocked { unlock_at: Timestamp },

    #[error("Position not found: {0}")]
    PositionNotFound(PositionId),

    #[error("Position not active: {0}")]
    PositionNotActive(PositionId),

    #[error("Caller does not own position {0}")]
    NotPositionOwner(PositionId),

    #[error("Migration not enabled")]
    MigrationNotEnabled,

    #[error("Invalid migrator address")]
    InvalidMigrator,

    #[error("Migrator already set")]
    MigratorAlreadySet,

    #[error("Reward token already set")]
    RewardTokenAlreadySet,

    #[error("No rewards to claim")]
    NoRewards,

    #[error("Only externally owned accounts may call")]
    OnlyEoa,

    #[error("Contract is paused")]
    Paused,

    #[error("Contract is not paused")]
    NotPaused,

    #[error("Insufficient balance: have {available}, need {required}")]
    InsufficientBalance { available: Amount, required: Amount },

    #[error("Insufficient allowance: have {available}, need {required}")]
    InsufficientAllowance { available: Amount, required: Amount },

    #[error("Re-entrant call rejected")]
    ReentrantCall,

    // === Transfer Policy ===
    #[error("Transfer not allowed")]
    TransferNotAllowed,

    #[error("Approval not allowed")]
    ApprovalNotAllowed,

    #[error("Selling is disabled")]
    SellDisabled,

    #[error("Address is blacklisted: {0}")]
    Blacklisted(Address),

    // === External Dependencies ===
    #[error("Payment transfer failed: {0}")]
    PaymentTransferFailed(String),

    #[error("Badge redemption failed: {0}")]
    BadgeRedeemFailed(String),

    #[error("Stake token transfer failed: {0}")]
    StakeTransferFailed(String),

    #[error("Reward mint failed: {0}")]
    RewardMintFailed(String),

    #[error("Migration handoff failed: {0}")]
    MigrationHandoffFailed(String),

    // === Authorization ===
    #[error("{principal} lacks capability {capability:?}")]
    Unauthorized {
        principal: Address,
        capability: Capability,
    },

    // === Arithmetic ===
    #[error("Arithmetic overflow")]
    MathOverflow,

    #[error("Division by zero")]
    DivisionByZero,
}

impl GvtError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ZeroAddress
            | Self::ZeroAmount
            | Self::InvalidAmount
            | Self::ArrayLengthMismatch { .. }
            | Self::InvalidPrice
            | Self::InvalidLockDuration { .. }
            | Self::InvalidEpochConfig { .. }
            | Self::InvalidRewardCap { .. } => ErrorCategory::InputValidation,

            Self::ReserveCapExceeded { .. }
            | Self::PresaleCapExceeded { .. }
            | Self::MigrationCapExceeded { .. }
            | Self::RewardCapExceeded { .. }
            | Self::PurchaseLimitExceeded { .. } => ErrorCategory::Capacity,

            Self::TransferNotAllowed
            | Self::ApprovalNotAllowed
            | Self::SellDisabled
            | Self::Blacklisted(_) => ErrorCategory::TransferPolicy,

            Self::PaymentTransferFailed(_)
            | Self::BadgeRedeemFailed(_)
            | Self::StakeTransferFailed(_)
            | Self::RewardMintFailed(_)
            | Self::MigrationHandoffFailed(_) => ErrorCategory::ExternalDependency,

            Self::Unauthorized { .. } => ErrorCategory::Authorization,

            Self::MathOverflow | Self::DivisionByZero => ErrorCategory::Arithmetic,

            _ => ErrorCategory::State,
        }
    }

    /// Numeric error code, grouped by category
    pub fn code(&self) -> u32 {
        match self {
            Self::ZeroAddress => 1001,
            Self::ZeroAmount => 1002,
            Self::InvalidAmount => 1003,
            Self::ArrayLengthMismatch { .. } => 1004,
            Self::InvalidPrice => 1005,
            Self::InvalidLockDuration { .. } => 1006,
            Self::InvalidEpochConfig { .. } => 1007,
            Self::InvalidRewardCap { .. } => 1008,

            Self::ReserveCapExceeded { .. } => 2001,
            Self::PresaleCapExceeded { .. } => 2002,
            Self::MigrationCapExceeded { .. } => 2003,
            Self::RewardCapExceeded { .. } => 2004,
            Self::PurchaseLimitExceeded { .. } => 2005,

            Self::NoBadge => 3001,
            Self::NoAllocation(_) => 3002,
            Self::BadgeRequiredForPurchase => 3003,
            Self::PresaleNotActive => 3004,
            Self::StillLocked { .. } => 3005,
            Self::PositionNotFound(_) => 3006,
            Self::PositionNotActive(_) => 3007,
            Self::NotPositionOwner(_) => 3008,
            Self::MigrationNotEnabled => 3009,
            Self::InvalidMigrator => 3010,
            Self::MigratorAlreadySet => 3011,
            Self::RewardTokenAlreadySet => 3012,
            Self::NoRewards => 3014,
            Self::OnlyEoa => 3015,
            Self::Paused => 3016,
            Self::NotPaused => 3017,
            Self::InsufficientBalance { .. } => 3018,
            Self::InsufficientAllowance { .. } => 3019,
            Self::ReentrantCall => 3020,

            Self::TransferNotAllowed => 4001,
            Self::ApprovalNotAllowed => 4002,
            Self::SellDisabled => 4003,
            Self::Blacklisted(_) => 4004,

            Self::PaymentTransferFailed(_) => 5001,
            Self::BadgeRedeemFailed(_) => 5002,
            Self::StakeTransferFailed(_) => 5003,
            Self::RewardMintFailed(_) => 5004,
            Self::MigrationHandoffFailed(_) => 5005,

            Self::Unauthorized { .. } => 6001,

            Self::MathOverflow => 7001,
            Self::DivisionByZero => 7002,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(GvtError::ZeroAddress.code(), 1001);
        assert_eq!(GvtError::TransferNotAllowed.code(), 4001);
        // Retired codes are not reassigned
        assert_eq!(GvtError::RewardTokenAlreadySet.code(), 3012);
        assert_eq!(GvtError::NoRewards.code(), 3014);
        assert_eq!(
            GvtError::RewardCapExceeded {
                requested: 1,
                remaining: 0
            }
            .code(),
            2004
        );
    }

    #[test]
    fn test_categories() {
        assert_eq!(GvtError::SellDisabled.category(), ErrorCategory::TransferPolicy);
        assert_eq!(GvtError::NoRewards.category(), ErrorCategory::State);
        assert_eq!(
            GvtError::PaymentTransferFailed("x".into()).category(),
            ErrorCategory::ExternalDependency
        );
        assert_eq!(
            GvtError::Unauthorized {
                principal: Address::ZERO,
                capability: Capability::Admin
            }
            .category(),
            ErrorCategory::Authorization
        );
    }

    #[test]
    fn test_error_display() {
        let msg = GvtError::StillLocked { unlock_at: 42 }.to_string();
        assert!(msg.contains("still locked"));
        assert!(msg.contains("42"));
    }
}
