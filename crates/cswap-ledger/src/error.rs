//! error types for the ledger boundary

use thiserror::Error;

use crate::{Address, BalanceHandle};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("asset {0} is not held by this ledger")]
    UnknownAsset(Address),

    #[error("zero amount")]
    ZeroAmount,

    #[error("insufficient confidential balance for {account} on {asset}")]
    InsufficientBalance { account: Address, asset: Address },

    #[error("balance overflow for {account} on {asset}")]
    BalanceOverflow { account: Address, asset: Address },

    // === delegation errors ===
    #[error("{operator} is not an operator of {owner} on {asset}")]
    OperatorNotAuthorized {
        owner: Address,
        asset: Address,
        operator: Address,
    },

    #[error("operator {operator} for {owner} on {asset} expired at {expiry} (now {now})")]
    OperatorExpired {
        owner: Address,
        asset: Address,
        operator: Address,
        expiry: u64,
        now: u64,
    },

    #[error("operator expiry {expiry} is not in the future (now {now})")]
    InvalidExpiry { expiry: u64, now: u64 },

    // === handle errors ===
    #[error("unknown balance handle {0}")]
    UnknownHandle(BalanceHandle),

    #[error("{requester} may not read handle {handle}")]
    AccessDenied {
        handle: BalanceHandle,
        requester: Address,
    },

    #[error("seal operation failed: {0}")]
    SealFailed(String),

    #[error("unseal operation failed: {0}")]
    UnsealFailed(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

/// coarse classification, lets callers decide between re-authorizing,
/// adjusting parameters, or giving up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// bad input, rejected before anything moved
    Validation,
    /// operator delegation absent or expired, caller must re-authorize
    Delegation,
    /// handle cannot be read by this requester
    Access,
    /// ledger internals failed
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::OperatorNotAuthorized { .. } | Error::OperatorExpired { .. } => {
                ErrorKind::Delegation
            }
            Error::UnknownHandle(_) | Error::AccessDenied { .. } => ErrorKind::Access,
            Error::SealFailed(_) | Error::UnsealFailed(_) | Error::Storage(_) => {
                ErrorKind::Internal
            }
            Error::UnknownAsset(_)
            | Error::ZeroAmount
            | Error::InsufficientBalance { .. }
            | Error::BalanceOverflow { .. }
            | Error::InvalidExpiry { .. }
            | Error::InvalidAddress(_) => ErrorKind::Validation,
        }
    }

    pub fn is_delegation(&self) -> bool {
        self.kind() == ErrorKind::Delegation
    }
}
