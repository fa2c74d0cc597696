//! opaque balance handles
//!
//! a handle names one ciphertext version of one balance. the ledger bumps
//! the contract's epoch on every write, so a handle obtained before a
//! transfer never equals one obtained after it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Address;

/// reference to an encrypted balance, `{contract, epoch}`
///
/// equality is the only meaningful local operation. epoch 0 is reserved for
/// the empty sentinel: the account never held this asset.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BalanceHandle {
    pub contract: Address,
    pub epoch: u64,
}

impl BalanceHandle {
    /// the all-zero sentinel
    pub const EMPTY: BalanceHandle = BalanceHandle {
        contract: Address::ZERO,
        epoch: 0,
    };

    pub fn new(contract: Address, epoch: u64) -> Self {
        debug_assert!(epoch > 0, "epoch 0 is the empty sentinel");
        Self { contract, epoch }
    }

    /// true for the sentinel of an account that never held the asset
    pub fn is_empty(&self) -> bool {
        self.epoch == 0
    }

    /// 40 byte wire form: contract ‖ epoch (big endian)
    pub fn to_bytes(&self) -> [u8; 40] {
        let mut out = [0u8; 40];
        out[..32].copy_from_slice(&self.contract.0);
        out[32..].copy_from_slice(&self.epoch.to_be_bytes());
        out
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }
}

impl fmt::Display for BalanceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for BalanceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "BalanceHandle(empty)")
        } else {
            write!(f, "BalanceHandle({:?}@{})", self.contract, self.epoch)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty_sentinel() {
        assert_eq!(BalanceHandle::default(), BalanceHandle::EMPTY);
        assert!(BalanceHandle::EMPTY.is_empty());
        assert_eq!(BalanceHandle::EMPTY.to_bytes(), [0u8; 40]);
    }

    #[test]
    fn test_epoch_distinguishes_versions() {
        let contract = Address::derive(b"usdc");
        let h1 = BalanceHandle::new(contract, 1);
        let h2 = BalanceHandle::new(contract, 2);
        assert_ne!(h1, h2);
        assert!(!h1.is_empty());
    }
}
