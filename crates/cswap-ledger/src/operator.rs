//! operator delegation
//!
//! a grant is a capability, not an allowance: while it is active the
//! operator may move any amount of `asset` out of `owner`'s balance.

use serde::{Deserialize, Serialize};

use crate::{Address, Error, Result};

/// time-bounded delegation record held by the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorGrant {
    pub owner: Address,
    pub asset: Address,
    pub operator: Address,
    /// unix seconds, exclusive
    pub expiry: u64,
}

impl OperatorGrant {
    pub fn new(owner: Address, asset: Address, operator: Address, expiry: u64) -> Self {
        Self {
            owner,
            asset,
            operator,
            expiry,
        }
    }

    /// active strictly before expiry
    pub fn is_active(&self, now: u64) -> bool {
        now < self.expiry
    }

    /// error the ledger reports when this grant is used at `now`
    pub fn check(&self, now: u64) -> Result<()> {
        if self.is_active(now) {
            Ok(())
        } else {
            Err(Error::OperatorExpired {
                owner: self.owner,
                asset: self.asset,
                operator: self.operator,
                expiry: self.expiry,
                now,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_is_exclusive() {
        let grant = OperatorGrant::new(
            Address::derive(b"alice"),
            Address::derive(b"usdc"),
            Address::derive(b"pool"),
            1_000,
        );
        assert!(grant.is_active(999));
        assert!(!grant.is_active(1_000));
        assert!(matches!(grant.check(1_000), Err(Error::OperatorExpired { .. })));
    }
}
