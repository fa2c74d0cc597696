//! account and contract addresses
//!
//! accounts are identified by their ed25519 verifying key bytes, asset
//! contracts and pools by a blake3 derivation. both are plain 32 byte
//! values on the ledger.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result};

/// 32 byte account or contract address
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; 32]);

impl Address {
    /// all-zero address
    pub const ZERO: Address = Address([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// derive a deterministic contract address from a label
    pub fn derive(label: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"cswap:address:v1");
        hasher.update(label);
        Self(*hasher.finalize().as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// `0x`-prefixed lowercase hex
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// parse hex with or without `0x` prefix
    pub fn from_hex(s: &str) -> Result<Self> {
        let trimmed = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(trimmed).map_err(|e| Error::InvalidAddress(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| Error::InvalidAddress(format!("expected 32 bytes: {}", s)))?;
        Ok(Self(arr))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address(0x{}…)", hex::encode(&self.0[..6]))
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl From<[u8; 32]> for Address {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// the two asset contracts a pool trades between
///
/// order matters: `asset_a` is the first reserve, `asset_b` the second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetPair {
    pub asset_a: Address,
    pub asset_b: Address,
}

impl AssetPair {
    pub fn new(asset_a: Address, asset_b: Address) -> Self {
        Self { asset_a, asset_b }
    }

    /// deterministic ledger account for the pool trading this pair
    pub fn pool_address(&self) -> Address {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"cswap:pool:v1");
        hasher.update(&self.asset_a.0);
        hasher.update(&self.asset_b.0);
        Address(*hasher.finalize().as_bytes())
    }

    pub fn contains(&self, asset: &Address) -> bool {
        self.asset_a == *asset || self.asset_b == *asset
    }

    /// the counterpart of `asset` in this pair
    pub fn other(&self, asset: &Address) -> Option<Address> {
        if *asset == self.asset_a {
            Some(self.asset_b)
        } else if *asset == self.asset_b {
            Some(self.asset_a)
        } else {
            None
        }
    }

    pub fn assets(&self) -> [Address; 2] {
        [self.asset_a, self.asset_b]
    }
}
