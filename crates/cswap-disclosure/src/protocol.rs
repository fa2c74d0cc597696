//! disclosure state machine
//!
//! ```text
//! Pending ──generate_key──► Keyed ──grant──► Granted ──sign──► Signed ──query──► Resolved
//!    └────────────────────── resume(cached grant) ───────────────┘
//! ```
//!
//! every step consumes the previous state, so a session cannot skip
//! signing or query twice. empty handles never enter a session: they are
//! known to be zero.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use cswap_ledger::{Address, BalanceHandle, Clock, SystemClock};
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::cache::{CachedGrant, GrantCache};
use crate::grant::{DisclosureGrant, Eip712Domain, SignedGrant, DEFAULT_DURATION_DAYS};
use crate::keypair::DecryptionKeypair;
use crate::service::{entry_context, DecryptionRequest, DecryptionService, HandlePair};
use crate::signer::StructuredSigner;
use crate::{DisclosureError, Result};

pub struct Pending;

pub struct Keyed {
    keypair: Arc<DecryptionKeypair>,
}

pub struct Granted {
    keypair: Arc<DecryptionKeypair>,
    grant: DisclosureGrant,
}

pub struct Signed {
    keypair: Arc<DecryptionKeypair>,
    signed: SignedGrant,
}

pub struct Resolved {
    values: HashMap<BalanceHandle, u64>,
}

/// one disclosure session over a set of non-empty handles
pub struct Disclosure<S> {
    handles: Vec<HandlePair>,
    state: S,
}

impl<S> Disclosure<S> {
    pub fn handles(&self) -> &[HandlePair] {
        &self.handles
    }

    /// distinct contracts the handles live on
    pub fn contracts(&self) -> Vec<Address> {
        self.handles
            .iter()
            .map(|p| p.contract_address)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn advance<T>(self, state: T) -> Disclosure<T> {
        Disclosure {
            handles: self.handles,
            state,
        }
    }
}

impl Disclosure<Pending> {
    /// start a session; empty and duplicate handles are dropped
    pub fn new(handles: impl IntoIterator<Item = BalanceHandle>) -> Self {
        let handles = handles
            .into_iter()
            .filter(|h| !h.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(HandlePair::new)
            .collect();
        Self {
            handles,
            state: Pending,
        }
    }

    /// nothing left to ask the service about
    pub fn is_trivial(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn generate_key(self) -> Result<Disclosure<Keyed>> {
        let keypair = DecryptionKeypair::generate()?;
        debug!("generated ephemeral key {}", keypair.public_key_hex());
        Ok(self.with_keypair(Arc::new(keypair)))
    }

    pub fn with_keypair(self, keypair: Arc<DecryptionKeypair>) -> Disclosure<Keyed> {
        self.advance(Keyed { keypair })
    }

    /// skip keygen and signing with a grant signed earlier
    pub fn resume(self, cached: CachedGrant) -> Result<Disclosure<Signed>> {
        if cached.keypair.public_key() != cached.signed.grant.public_key {
            return Err(DisclosureError::InvalidGrant("cached grant is for another key".into()));
        }
        check_coverage(&cached.signed.grant, &self.handles)?;
        debug!("reusing grant signed by {}", cached.signed.signer);
        Ok(self.advance(Signed {
            keypair: cached.keypair,
            signed: cached.signed,
        }))
    }
}

impl Disclosure<Keyed> {
    /// grant over exactly the handles' contracts
    pub fn grant(self, start_timestamp: u64, duration_days: u32) -> Result<Disclosure<Granted>> {
        let contracts = self.contracts();
        self.grant_for(contracts, start_timestamp, duration_days)
    }

    /// grant over an explicit contract set, which must cover every handle
    pub fn grant_for(
        self,
        contracts: Vec<Address>,
        start_timestamp: u64,
        duration_days: u32,
    ) -> Result<Disclosure<Granted>> {
        let grant = DisclosureGrant::new(
            self.state.keypair.public_key(),
            contracts,
            start_timestamp,
            duration_days,
        )?;
        check_coverage(&grant, &self.handles)?;
        let keypair = self.state.keypair.clone();
        Ok(self.advance(Granted { keypair, grant }))
    }
}

impl Disclosure<Granted> {
    pub fn grant(&self) -> &DisclosureGrant {
        &self.state.grant
    }

    pub async fn sign(
        self,
        signer: &dyn StructuredSigner,
        domain: &Eip712Domain,
    ) -> Result<Disclosure<Signed>> {
        let signature = signer
            .sign_structured(domain, &DisclosureGrant::SCHEMA, &self.state.grant)
            .await?;
        let signed = SignedGrant {
            grant: self.state.grant.clone(),
            signer: signer.address(),
            signature,
        };
        debug!("grant signed by {}", signed.signer);
        let keypair = self.state.keypair.clone();
        Ok(self.advance(Signed { keypair, signed }))
    }
}

impl Disclosure<Signed> {
    pub fn signed_grant(&self) -> &SignedGrant {
        &self.state.signed
    }

    /// keypair and grant, for a [`GrantCache`]
    pub fn cached(&self) -> CachedGrant {
        CachedGrant {
            keypair: self.state.keypair.clone(),
            signed: self.state.signed.clone(),
        }
    }

    pub fn request(&self) -> DecryptionRequest {
        let grant = &self.state.signed.grant;
        DecryptionRequest {
            handle_pairs: self.handles.clone(),
            public_key: format!("0x{}", hex::encode(grant.public_key)),
            signature: self.state.signed.signature_hex(),
            contract_addresses: grant.contract_addresses.clone(),
            user_address: self.state.signed.signer,
            start_timestamp: grant.start_timestamp,
            duration_days: grant.duration_days,
        }
    }

    /// submit to the service and open every returned entry
    pub async fn query(self, service: &dyn DecryptionService) -> Result<Disclosure<Resolved>> {
        let request = self.request();
        let response = service.resolve(&request).await?;

        let mut values = HashMap::with_capacity(response.entries.len());
        for entry in &response.entries {
            if !self.handles.iter().any(|p| p.handle == entry.handle) {
                warn!("service returned unrequested handle {}", entry.handle);
                continue;
            }
            let plaintext = self
                .state
                .keypair
                .open(&entry.value, &entry_context(&entry.handle))?;
            let bytes: [u8; 8] = plaintext.try_into().map_err(|_| {
                DisclosureError::MalformedResponse(format!("bad plaintext length for {}", entry.handle))
            })?;
            values.insert(entry.handle, u64::from_le_bytes(bytes));
        }

        debug!(
            "resolved {} of {} handles",
            values.len(),
            self.handles.len()
        );
        Ok(self.advance(Resolved { values }))
    }
}

impl Disclosure<Resolved> {
    /// plaintext of `handle`; anything the service left out is zero
    pub fn value(&self, handle: &BalanceHandle) -> u64 {
        self.state.values.get(handle).copied().unwrap_or(0)
    }

    pub fn values(&self) -> &HashMap<BalanceHandle, u64> {
        &self.state.values
    }
}

fn check_coverage(grant: &DisclosureGrant, handles: &[HandlePair]) -> Result<()> {
    match handles.iter().find(|p| !grant.covers(&p.contract_address)) {
        Some(p) => Err(DisclosureError::InvalidGrant(format!(
            "contract {} of handle {} not covered",
            p.contract_address, p.handle
        ))),
        None => Ok(()),
    }
}

/// drives sessions for one account against one service
pub struct DisclosureClient {
    signer: Arc<dyn StructuredSigner>,
    service: Arc<dyn DecryptionService>,
    domain: Eip712Domain,
    clock: Arc<dyn Clock>,
    duration_days: u32,
    cache: Option<Arc<GrantCache>>,
}

impl DisclosureClient {
    pub fn new(
        signer: Arc<dyn StructuredSigner>,
        service: Arc<dyn DecryptionService>,
        domain: Eip712Domain,
    ) -> Self {
        Self {
            signer,
            service,
            domain,
            clock: Arc::new(SystemClock),
            duration_days: DEFAULT_DURATION_DAYS,
            cache: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_duration_days(mut self, days: u32) -> Self {
        self.duration_days = days;
        self
    }

    /// reuse signed grants while they stay valid
    pub fn with_cache(mut self, cache: Arc<GrantCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// plaintext behind one handle
    pub async fn disclose(&self, handle: BalanceHandle) -> Result<u64> {
        let values = self.disclose_batch(&[handle]).await?;
        Ok(values.get(&handle).copied().unwrap_or(0))
    }

    /// plaintexts behind several handles under one grant and one query
    pub async fn disclose_batch(&self, handles: &[BalanceHandle]) -> Result<HashMap<BalanceHandle, u64>> {
        let mut out: HashMap<BalanceHandle, u64> = handles.iter().map(|h| (*h, 0)).collect();

        let pending = Disclosure::new(handles.iter().copied());
        if pending.is_trivial() {
            debug!("only empty handles, skipping decryption service");
            return Ok(out);
        }

        let now = self.clock.now();
        let contracts = pending.contracts();
        let address = self.signer.address();

        let cached = self
            .cache
            .as_ref()
            .and_then(|c| c.get(&address, &contracts, now));

        let signed = match cached {
            Some(cached) => pending.resume(cached)?,
            None => {
                let signed = pending
                    .generate_key()?
                    .grant(now, self.duration_days)?
                    .sign(self.signer.as_ref(), &self.domain)
                    .await?;
                if let Some(cache) = &self.cache {
                    cache.insert(address, signed.cached());
                }
                signed
            }
        };

        let resolved = signed.query(self.service.as_ref()).await?;
        for (handle, value) in out.iter_mut() {
            *value = resolved.value(handle);
        }

        info!("{} disclosed {} handles", address, resolved.values().len());
        Ok(out)
    }

    /// independent sessions per handle, run concurrently
    pub async fn disclose_many(&self, handles: &[BalanceHandle]) -> Vec<Result<u64>> {
        join_all(handles.iter().map(|h| self.disclose(*h))).await
    }
}
