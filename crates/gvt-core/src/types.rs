//! Core type definitions shared by the token and staking engines

use serde::{Deserialize, Serialize};
use std::fmt;

/// Token amount in the smallest unit (18 decimals for PreGVT and rGGP)
pub type Amount = u128;

/// Wall-clock time in Unix seconds
pub type Timestamp = u64;

/// Stake position identifier, assigned sequentially from 1
pub type PositionId = u64;

/// Reward epoch identifier
pub type EpochId = u64;

/// Badge (eligibility token) identifier
pub type BadgeId = u64;

/// Address - 20-byte account identifier
///
/// The all-zero address is the null address: a transfer *from* it is a mint
/// and a transfer *to* it is a burn.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address {
    bytes: [u8; 20],
}

impl Address {
    /// The null address
    pub const ZERO: Self = Self { bytes: [0u8; 20] };

    /// Create an address from raw bytes
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self { bytes }
    }

    /// Address whose every byte is `b`. Handy for fixtures and scenarios.
    pub const fn repeat(b: u8) -> Self {
        Self { bytes: [b; 20] }
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.bytes
    }

    pub fn is_zero(&self) -> bool {
        self.bytes == [0u8; 20]
    }

    /// Convert to `0x`-prefixed hex
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.bytes))
    }

    /// Parse from hex, with or without the `0x` prefix
    pub fn from_hex(s: &str) -> Result<Self, AddressParseError> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let decoded = hex::decode(raw).map_err(|e| AddressParseError::Hex(e.to_string()))?;
        let bytes: [u8; 20] = decoded
            .try_into()
            .map_err(|v: Vec<u8>| AddressParseError::Length(v.len()))?;
        Ok(Self { bytes })
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", &self.to_hex()[..12])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for Address {
    type Error = AddressParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.to_hex()
    }
}

/// Address parsing errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressParseError {
    #[error("invalid hex: {0}")]
    Hex(String),

    #[error("expected 20 bytes, got {0}")]
    Length(usize),
}

/// Identity of the party invoking an entry point
///
/// `origin` is the account that signed the outer request; `address` is the
/// immediate caller. They differ when the call is relayed through a contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub address: Address,
    pub origin: Address,
}

impl Caller {
    /// A direct call from an externally owned account
    pub fn account(address: Address) -> Self {
        Self {
            address,
            origin: address,
        }
    }

    /// A call relayed through `contract` on behalf of `origin`
    pub fn via(contract: Address, origin: Address) -> Self {
        Self {
            address: contract,
            origin,
        }
    }

    pub fn is_direct(&self) -> bool {
        self.address == self.origin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_roundtrip() {
        let addr = Address::repeat(0xab);
        let parsed = Address::from_hex(&addr.to_hex()).unwrap();
        assert_eq!(addr, parsed);

        let bare = Address::from_hex(&"ab".repeat(20)).unwrap();
        assert_eq!(addr, bare);
    }

    #[test]
    fn test_bad_length_rejected() {
        assert_eq!(
            Address::from_hex("0x1234"),
            Err(AddressParseError::Length(2))
        );
    }

    #[test]
    fn test_zero_address() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address::repeat(1).is_zero());
    }

    #[test]
    fn test_serde_as_hex_string() {
        let addr = Address::repeat(0x01);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"0x{}\"", "01".repeat(20)));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn test_caller_kinds() {
        let user = Address::repeat(1);
        let relay = Address::repeat(2);
        assert!(Caller::account(user).is_direct());
        assert!(!Caller::via(relay, user).is_direct());
    }
}
