//! opt-in reuse of signed grants
//!
//! a signed grant and its ephemeral keypair stay usable for every query
//! inside the grant's window that only touches contracts it covers, so a
//! client can skip keygen and signing for follow-up reads.

use std::collections::HashMap;
use std::sync::Arc;

use cswap_ledger::Address;
use parking_lot::Mutex;
use tracing::debug;

use crate::grant::SignedGrant;
use crate::keypair::DecryptionKeypair;

/// grants expiring within this many seconds are not handed out
pub const DEFAULT_EXPIRY_MARGIN: u64 = 60;

#[derive(Debug, Clone)]
pub struct CachedGrant {
    pub keypair: Arc<DecryptionKeypair>,
    pub signed: SignedGrant,
}

#[derive(Debug)]
pub struct GrantCache {
    entries: Mutex<HashMap<Address, Vec<CachedGrant>>>,
    margin: u64,
}

impl Default for GrantCache {
    fn default() -> Self {
        Self::new()
    }
}

impl GrantCache {
    pub fn new() -> Self {
        Self::with_margin(DEFAULT_EXPIRY_MARGIN)
    }

    pub fn with_margin(margin: u64) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            margin,
        }
    }

    /// a grant of `signer` valid at `now` that covers every contract
    ///
    /// expired grants of `signer` are evicted on the way.
    pub fn get(&self, signer: &Address, contracts: &[Address], now: u64) -> Option<CachedGrant> {
        let mut entries = self.entries.lock();
        let grants = entries.get_mut(signer)?;

        let horizon = now.saturating_add(self.margin);
        let before = grants.len();
        grants.retain(|g| horizon < g.signed.grant.end_timestamp());
        if grants.len() < before {
            debug!("evicted {} expired grants for {}", before - grants.len(), signer);
        }

        let hit = grants
            .iter()
            .find(|g| g.signed.grant.is_valid_at(now) && g.signed.grant.covers_all(contracts))
            .cloned();
        if grants.is_empty() {
            entries.remove(signer);
        }
        hit
    }

    pub fn insert(&self, signer: Address, grant: CachedGrant) {
        self.entries.lock().entry(signer).or_default().push(grant);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grant::{DisclosureGrant, SECONDS_PER_DAY};

    fn cached(contracts: Vec<Address>, start: u64, days: u32) -> CachedGrant {
        let keypair = Arc::new(DecryptionKeypair::generate().unwrap());
        let grant = DisclosureGrant::new(keypair.public_key(), contracts, start, days).unwrap();
        CachedGrant {
            keypair,
            signed: SignedGrant {
                grant,
                signer: Address::derive(b"alice"),
                signature: vec![0u8; 64],
            },
        }
    }

    #[test]
    fn test_hit_requires_coverage() {
        let cache = GrantCache::new();
        let alice = Address::derive(b"alice");
        let usdc = Address::derive(b"usdc");
        let zama = Address::derive(b"zama");
        cache.insert(alice, cached(vec![usdc], 1_000, 1));

        assert!(cache.get(&alice, &[usdc], 1_000).is_some());
        assert!(cache.get(&alice, &[usdc, zama], 1_000).is_none());
        assert!(cache.get(&Address::derive(b"bob"), &[usdc], 1_000).is_none());
    }

    #[test]
    fn test_expired_evicted() {
        let cache = GrantCache::with_margin(0);
        let alice = Address::derive(b"alice");
        let usdc = Address::derive(b"usdc");
        cache.insert(alice, cached(vec![usdc], 1_000, 1));

        let end = 1_000 + SECONDS_PER_DAY;
        assert!(cache.get(&alice, &[usdc], end - 1).is_some());
        assert!(cache.get(&alice, &[usdc], end).is_none());
        assert!(cache.is_empty());
    }
}
