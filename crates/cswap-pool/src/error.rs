//! pool errors

use cswap_ledger::Error as LedgerError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PoolError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    // === validation ===
    #[error("amount must be non-zero")]
    ZeroAmount,

    #[error("arithmetic overflow")]
    ArithmeticOverflow,

    // === invariant guards ===
    #[error("slippage exceeded: output {amount_out} below minimum {min_amount_out}")]
    SlippageExceeded { amount_out: u64, min_amount_out: u64 },

    #[error("deposit too small to mint liquidity")]
    InsufficientLiquidityMinted,

    #[error("burn too small to return both assets")]
    InsufficientLiquidityBurned,

    #[error("insufficient shares: requested {requested}, held {available}")]
    InsufficientShares { requested: u128, available: u128 },

    #[error("pool has no liquidity")]
    InsufficientLiquidity,

    #[error("swap input too small to produce output")]
    InsufficientOutputAmount,

    // === ledger boundary ===
    #[error("operator delegation rejected: {0}")]
    Delegation(LedgerError),

    #[error("ledger error: {0}")]
    Ledger(LedgerError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// malformed request, nothing was attempted
    Validation,
    /// request would break a pool invariant or the caller's bound
    Invariant,
    /// caller must (re-)authorize the pool as operator
    Delegation,
    /// ledger refused the batch for another reason
    Ledger,
}

impl PoolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PoolError::ZeroAmount | PoolError::ArithmeticOverflow => ErrorKind::Validation,
            PoolError::SlippageExceeded { .. }
            | PoolError::InsufficientLiquidityMinted
            | PoolError::InsufficientLiquidityBurned
            | PoolError::InsufficientShares { .. }
            | PoolError::InsufficientLiquidity
            | PoolError::InsufficientOutputAmount => ErrorKind::Invariant,
            PoolError::Delegation(_) => ErrorKind::Delegation,
            PoolError::Ledger(_) => ErrorKind::Ledger,
        }
    }
}

impl From<LedgerError> for PoolError {
    fn from(e: LedgerError) -> Self {
        if e.is_delegation() {
            PoolError::Delegation(e)
        } else {
            PoolError::Ledger(e)
        }
    }
}
