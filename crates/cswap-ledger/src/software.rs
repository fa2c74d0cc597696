//! software ledger - in-memory implementation for testing and devnet
//!
//! balances are sealed with chacha20poly1305 under a ledger key and bound to
//! their handle as associated data. the ledger decrypts internally to do
//! arithmetic, standing in for an encrypted coprocessor.
//! NOT SECURE - whoever holds the ledger key reads every balance.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::ledger::{EncryptedLedger, HandleAccess, Transfer, TransferReceipt};
use crate::{Address, BalanceHandle, Error, OperatorGrant, Result};

/// sealed balance behind one handle
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SealedBalance {
    /// the only account allowed to have this handle revealed
    owner: Address,
    #[serde(with = "crate::hex_serde::bytes")]
    nonce: Vec<u8>,
    #[serde(with = "crate::hex_serde::bytes")]
    ciphertext: Vec<u8>,
}

#[derive(Debug, Default)]
struct LedgerState {
    /// (account, asset) → current handle
    current: HashMap<(Address, Address), BalanceHandle>,
    /// ciphertext behind each live handle; a write drops the one it supersedes
    sealed: HashMap<BalanceHandle, SealedBalance>,
    /// last epoch issued per asset contract
    epochs: HashMap<Address, u64>,
    /// (owner, asset, operator) → grant
    operators: HashMap<(Address, Address, Address), OperatorGrant>,
}

/// software ledger for testing and devnet
/// NOT SECURE - balances are only sealed under an in-process key, and
/// callers are not authenticated: any holder may act as any account
pub struct SoftwareLedger {
    seal_key: [u8; 32],
    assets: Vec<Address>,
    clock: Arc<dyn Clock>,
    state: RwLock<LedgerState>,
}

impl SoftwareLedger {
    /// create a ledger holding `assets`, using the wall clock
    pub fn new(assets: Vec<Address>) -> Self {
        Self::with_clock(assets, Arc::new(SystemClock))
    }

    /// create a ledger with an explicit time source
    pub fn with_clock(assets: Vec<Address>, clock: Arc<dyn Clock>) -> Self {
        let mut seal_key = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut seal_key);
        Self {
            seal_key,
            assets,
            clock,
            state: RwLock::new(LedgerState::default()),
        }
    }

    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    fn check_asset(&self, asset: &Address) -> Result<()> {
        if self.assets.contains(asset) {
            Ok(())
        } else {
            Err(Error::UnknownAsset(*asset))
        }
    }

    fn seal(&self, handle: &BalanceHandle, owner: Address, value: u64) -> Result<SealedBalance> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.seal_key)
            .map_err(|e| Error::SealFailed(e.to_string()))?;
        let mut nonce = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut nonce);
        let aad = handle.to_bytes();
        let ciphertext = cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: &value.to_le_bytes(),
                    aad: &aad,
                },
            )
            .map_err(|e| Error::SealFailed(e.to_string()))?;
        Ok(SealedBalance {
            owner,
            nonce: nonce.to_vec(),
            ciphertext,
        })
    }

    fn unseal(&self, handle: &BalanceHandle, sealed: &SealedBalance) -> Result<u64> {
        if sealed.nonce.len() != 12 {
            return Err(Error::UnsealFailed("bad nonce length".into()));
        }
        let cipher = ChaCha20Poly1305::new_from_slice(&self.seal_key)
            .map_err(|e| Error::UnsealFailed(e.to_string()))?;
        let aad = handle.to_bytes();
        let plaintext = cipher
            .decrypt(
                Nonce::from_slice(&sealed.nonce),
                Payload {
                    msg: &sealed.ciphertext,
                    aad: &aad,
                },
            )
            .map_err(|e| Error::UnsealFailed(e.to_string()))?;
        let bytes: [u8; 8] = plaintext
            .try_into()
            .map_err(|_| Error::UnsealFailed("bad plaintext length".into()))?;
        Ok(u64::from_le_bytes(bytes))
    }

    fn balance_in(&self, state: &LedgerState, account: &Address, asset: &Address) -> Result<u64> {
        match state.current.get(&(*account, *asset)) {
            None => Ok(0),
            Some(handle) => {
                let sealed = state
                    .sealed
                    .get(handle)
                    .ok_or(Error::UnknownHandle(*handle))?;
                self.unseal(handle, sealed)
            }
        }
    }

    /// seal new values for every touched balance and commit them
    ///
    /// sealing happens before any write so a failure leaves state untouched
    fn commit(
        &self,
        state: &mut LedgerState,
        touched: BTreeMap<(Address, Address), u64>,
    ) -> Result<()> {
        let mut epochs: HashMap<Address, u64> = HashMap::new();
        let mut pending = Vec::with_capacity(touched.len());

        for ((account, asset), value) in touched {
            let epoch = epochs
                .entry(asset)
                .or_insert_with(|| state.epochs.get(&asset).copied().unwrap_or(0));
            *epoch += 1;
            let handle = BalanceHandle::new(asset, *epoch);
            let sealed = self.seal(&handle, account, value)?;
            pending.push(((account, asset), handle, sealed));
        }

        for (key, handle, sealed) in pending {
            state.sealed.insert(handle, sealed);
            if let Some(superseded) = state.current.insert(key, handle) {
                state.sealed.remove(&superseded);
            }
        }
        state.epochs.extend(epochs);
        Ok(())
    }

    /// dump the full ledger, including its seal key (devnet persistence)
    pub fn snapshot(&self) -> Result<LedgerSnapshot> {
        let state = self.state.read().map_err(|e| Error::Storage(e.to_string()))?;

        let mut balances: Vec<BalanceEntry> = state
            .current
            .iter()
            .map(|((account, asset), handle)| BalanceEntry {
                account: *account,
                asset: *asset,
                handle: *handle,
            })
            .collect();
        balances.sort_by_key(|e| (e.asset, e.account));

        let mut sealed: Vec<SealedEntry> = state
            .sealed
            .iter()
            .map(|(handle, s)| SealedEntry {
                handle: *handle,
                balance: s.clone(),
            })
            .collect();
        sealed.sort_by_key(|e| e.handle);

        let mut epochs: Vec<(Address, u64)> = state.epochs.iter().map(|(a, e)| (*a, *e)).collect();
        epochs.sort();

        let mut operators: Vec<OperatorGrant> = state.operators.values().copied().collect();
        operators.sort_by_key(|g| (g.owner, g.asset, g.operator));

        Ok(LedgerSnapshot {
            seal_key: self.seal_key.to_vec(),
            assets: self.assets.clone(),
            balances,
            sealed,
            epochs,
            operators,
        })
    }

    /// rebuild a ledger from [`SoftwareLedger::snapshot`] output
    pub fn restore(snapshot: LedgerSnapshot, clock: Arc<dyn Clock>) -> Result<Self> {
        let seal_key: [u8; 32] = snapshot
            .seal_key
            .try_into()
            .map_err(|_| Error::Storage("seal key must be 32 bytes".into()))?;

        let state = LedgerState {
            current: snapshot
                .balances
                .into_iter()
                .map(|e| ((e.account, e.asset), e.handle))
                .collect(),
            sealed: snapshot
                .sealed
                .into_iter()
                .map(|e| (e.handle, e.balance))
                .collect(),
            epochs: snapshot.epochs.into_iter().collect(),
            operators: snapshot
                .operators
                .into_iter()
                .map(|g| ((g.owner, g.asset, g.operator), g))
                .collect(),
        };

        Ok(Self {
            seal_key,
            assets: snapshot.assets,
            clock,
            state: RwLock::new(state),
        })
    }
}

impl EncryptedLedger for SoftwareLedger {
    fn assets(&self) -> Vec<Address> {
        self.assets.clone()
    }

    fn mint(&self, to: &Address, asset: &Address, amount: u64) -> Result<BalanceHandle> {
        self.check_asset(asset)?;
        if amount == 0 {
            return Err(Error::ZeroAmount);
        }

        let mut state = self.state.write().map_err(|e| Error::Storage(e.to_string()))?;
        let balance = self.balance_in(&state, to, asset)?;
        let updated = balance.checked_add(amount).ok_or(Error::BalanceOverflow {
            account: *to,
            asset: *asset,
        })?;

        let mut touched = BTreeMap::new();
        touched.insert((*to, *asset), updated);
        self.commit(&mut state, touched)?;

        let handle = state
            .current
            .get(&(*to, *asset))
            .copied()
            .unwrap_or(BalanceHandle::EMPTY);
        info!("minted {} of {} to {}", amount, asset, to);
        Ok(handle)
    }

    fn balance_handle(&self, account: &Address, asset: &Address) -> Result<BalanceHandle> {
        self.check_asset(asset)?;
        let state = self.state.read().map_err(|e| Error::Storage(e.to_string()))?;
        Ok(state
            .current
            .get(&(*account, *asset))
            .copied()
            .unwrap_or(BalanceHandle::EMPTY))
    }

    fn authorize_operator(
        &self,
        owner: &Address,
        asset: &Address,
        operator: &Address,
        expiry: u64,
    ) -> Result<OperatorGrant> {
        self.check_asset(asset)?;
        let now = self.clock.now();
        if expiry <= now {
            return Err(Error::InvalidExpiry { expiry, now });
        }

        let grant = OperatorGrant::new(*owner, *asset, *operator, expiry);
        let mut state = self.state.write().map_err(|e| Error::Storage(e.to_string()))?;
        state.operators.insert((*owner, *asset, *operator), grant);
        info!("{} authorized operator {} on {} until {}", owner, operator, asset, expiry);
        Ok(grant)
    }

    fn revoke_operator(&self, owner: &Address, asset: &Address, operator: &Address) -> Result<()> {
        self.check_asset(asset)?;
        let mut state = self.state.write().map_err(|e| Error::Storage(e.to_string()))?;
        if state.operators.remove(&(*owner, *asset, *operator)).is_some() {
            info!("{} revoked operator {} on {}", owner, operator, asset);
        }
        Ok(())
    }

    fn is_operator(&self, owner: &Address, asset: &Address, operator: &Address) -> Result<bool> {
        self.check_asset(asset)?;
        let now = self.clock.now();
        let state = self.state.read().map_err(|e| Error::Storage(e.to_string()))?;
        Ok(state
            .operators
            .get(&(*owner, *asset, *operator))
            .map(|g| g.is_active(now))
            .unwrap_or(false))
    }

    fn execute_batch(
        &self,
        initiator: &Address,
        transfers: &[Transfer],
    ) -> Result<Vec<TransferReceipt>> {
        let now = self.clock.now();
        let mut state = self.state.write().map_err(|e| Error::Storage(e.to_string()))?;

        // phase 1: authorization
        for t in transfers {
            self.check_asset(&t.asset)?;
            if t.amount == 0 {
                return Err(Error::ZeroAmount);
            }
            if t.from != *initiator {
                let grant = state
                    .operators
                    .get(&(t.from, t.asset, *initiator))
                    .ok_or(Error::OperatorNotAuthorized {
                        owner: t.from,
                        asset: t.asset,
                        operator: *initiator,
                    })?;
                grant.check(now)?;
            }
        }

        // phase 2: apply in order against a scratch view
        let mut touched: BTreeMap<(Address, Address), u64> = BTreeMap::new();
        for t in transfers {
            let from_balance = match touched.get(&(t.from, t.asset)) {
                Some(v) => *v,
                None => self.balance_in(&state, &t.from, &t.asset)?,
            };
            if from_balance < t.amount {
                return Err(Error::InsufficientBalance {
                    account: t.from,
                    asset: t.asset,
                });
            }
            touched.insert((t.from, t.asset), from_balance - t.amount);

            let to_balance = match touched.get(&(t.to, t.asset)) {
                Some(v) => *v,
                None => self.balance_in(&state, &t.to, &t.asset)?,
            };
            let updated = to_balance.checked_add(t.amount).ok_or(Error::BalanceOverflow {
                account: t.to,
                asset: t.asset,
            })?;
            touched.insert((t.to, t.asset), updated);
        }

        // phase 3: seal and commit
        self.commit(&mut state, touched)?;

        let receipts = transfers
            .iter()
            .map(|t| TransferReceipt {
                from_handle: state
                    .current
                    .get(&(t.from, t.asset))
                    .copied()
                    .unwrap_or(BalanceHandle::EMPTY),
                to_handle: state
                    .current
                    .get(&(t.to, t.asset))
                    .copied()
                    .unwrap_or(BalanceHandle::EMPTY),
            })
            .collect();

        debug!("executed batch of {} transfers for {}", transfers.len(), initiator);
        Ok(receipts)
    }
}

impl HandleAccess for SoftwareLedger {
    fn reveal(&self, handle: &BalanceHandle, requester: &Address) -> Result<u64> {
        let state = self.state.read().map_err(|e| Error::Storage(e.to_string()))?;
        let sealed = state
            .sealed
            .get(handle)
            .ok_or(Error::UnknownHandle(*handle))?;
        if sealed.owner != *requester {
            return Err(Error::AccessDenied {
                handle: *handle,
                requester: *requester,
            });
        }
        self.unseal(handle, sealed)
    }
}

/// serializable form of a [`SoftwareLedger`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    #[serde(with = "crate::hex_serde::bytes")]
    seal_key: Vec<u8>,
    assets: Vec<Address>,
    balances: Vec<BalanceEntry>,
    sealed: Vec<SealedEntry>,
    epochs: Vec<(Address, u64)>,
    operators: Vec<OperatorGrant>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BalanceEntry {
    account: Address,
    asset: Address,
    handle: BalanceHandle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SealedEntry {
    handle: BalanceHandle,
    #[serde(flatten)]
    balance: SealedBalance,
}
