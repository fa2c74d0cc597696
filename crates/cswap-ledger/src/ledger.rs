//! ledger traits
//!
//! [`EncryptedLedger`] is what the pool engine and clients drive.
//! [`HandleAccess`] is the narrower capability a decryption service gets:
//! turn a handle into plaintext, but only for a requester on its access list.

use serde::{Deserialize, Serialize};

use crate::{Address, BalanceHandle, Error, OperatorGrant, Result};

/// one confidential movement of `amount` of `asset`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub from: Address,
    pub to: Address,
    pub asset: Address,
    pub amount: u64,
}

impl Transfer {
    pub fn new(from: Address, to: Address, asset: Address, amount: u64) -> Self {
        Self {
            from,
            to,
            asset,
            amount,
        }
    }
}

/// fresh handles after a transfer landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReceipt {
    pub from_handle: BalanceHandle,
    pub to_handle: BalanceHandle,
}

/// encrypted two-asset ledger
///
/// every state-changing call is atomic: it either lands completely or
/// leaves balances, handles and grants untouched.
///
/// the trait does not authenticate its caller. `owner` and `initiator` are
/// taken as given, so whoever holds the ledger can act as any account. a
/// deployed ledger binds them to the transaction sender. the in-process
/// [`SoftwareLedger`](crate::SoftwareLedger) is a devnet reference that
/// binds nothing and is NOT SECURE against in-process callers.
pub trait EncryptedLedger: Send + Sync {
    /// asset contracts this ledger holds
    fn assets(&self) -> Vec<Address>;

    /// create `amount` of `asset` in `to`'s balance (test/bootstrap only)
    fn mint(&self, to: &Address, asset: &Address, amount: u64) -> Result<BalanceHandle>;

    /// current handle of `account`'s balance, [`BalanceHandle::EMPTY`] if
    /// the account never held `asset`
    fn balance_handle(&self, account: &Address, asset: &Address) -> Result<BalanceHandle>;

    /// let `operator` move `owner`'s `asset` until `expiry` (unix seconds)
    ///
    /// replaces any previous grant for the same triple. `owner` is trusted,
    /// see the trait docs.
    fn authorize_operator(
        &self,
        owner: &Address,
        asset: &Address,
        operator: &Address,
        expiry: u64,
    ) -> Result<OperatorGrant>;

    /// drop a grant, no-op if none exists
    fn revoke_operator(&self, owner: &Address, asset: &Address, operator: &Address) -> Result<()>;

    /// true while an unexpired grant exists
    fn is_operator(&self, owner: &Address, asset: &Address, operator: &Address) -> Result<bool>;

    /// run `transfers` in order as one atomic unit, initiated by `initiator`
    ///
    /// transfers whose `from` is not the initiator need an active operator
    /// grant naming the initiator. `initiator` itself is trusted.
    fn execute_batch(
        &self,
        initiator: &Address,
        transfers: &[Transfer],
    ) -> Result<Vec<TransferReceipt>>;

    /// single confidential transfer
    fn transfer_confidential(
        &self,
        initiator: &Address,
        transfer: &Transfer,
    ) -> Result<TransferReceipt> {
        self.execute_batch(initiator, std::slice::from_ref(transfer))?
            .pop()
            .ok_or_else(|| Error::Storage("batch returned no receipt".into()))
    }
}

/// decrypt capability handed to a decryption service
pub trait HandleAccess: Send + Sync {
    /// plaintext behind `handle`, if `requester` may read it
    fn reveal(&self, handle: &BalanceHandle, requester: &Address) -> Result<u64>;
}

impl<T: EncryptedLedger + ?Sized> EncryptedLedger for std::sync::Arc<T> {
    fn assets(&self) -> Vec<Address> {
        (**self).assets()
    }

    fn mint(&self, to: &Address, asset: &Address, amount: u64) -> Result<BalanceHandle> {
        (**self).mint(to, asset, amount)
    }

    fn balance_handle(&self, account: &Address, asset: &Address) -> Result<BalanceHandle> {
        (**self).balance_handle(account, asset)
    }

    fn authorize_operator(
        &self,
        owner: &Address,
        asset: &Address,
        operator: &Address,
        expiry: u64,
    ) -> Result<OperatorGrant> {
        (**self).authorize_operator(owner, asset, operator, expiry)
    }

    fn revoke_operator(&self, owner: &Address, asset: &Address, operator: &Address) -> Result<()> {
        (**self).revoke_operator(owner, asset, operator)
    }

    fn is_operator(&self, owner: &Address, asset: &Address, operator: &Address) -> Result<bool> {
        (**self).is_operator(owner, asset, operator)
    }

    fn execute_batch(
        &self,
        initiator: &Address,
        transfers: &[Transfer],
    ) -> Result<Vec<TransferReceipt>> {
        (**self).execute_batch(initiator, transfers)
    }
}

impl<T: HandleAccess + ?Sized> HandleAccess for std::sync::Arc<T> {
    fn reveal(&self, handle: &BalanceHandle, requester: &Address) -> Result<u64> {
        (**self).reveal(handle, requester)
    }
}
