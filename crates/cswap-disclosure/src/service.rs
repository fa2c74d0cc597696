//! decryption service boundary
//!
//! a service takes `{handle, contract}` pairs plus a signed grant and
//! returns each plaintext sealed to the grant's ephemeral key. entries it
//! will not decrypt are left out of the response.

use std::sync::Arc;

use async_trait::async_trait;
use cswap_ledger::{Address, BalanceHandle, Clock, HandleAccess, SystemClock};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::crypto::SealedValue;
use crate::grant::{DisclosureGrant, Eip712Domain};
use crate::signer::verify_structured;
use crate::{DisclosureError, Result};

/// tolerated clock drift for grant start times, seconds
pub const DEFAULT_MAX_SKEW: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlePair {
    pub handle: BalanceHandle,
    pub contract_address: Address,
}

impl HandlePair {
    pub fn new(handle: BalanceHandle) -> Self {
        Self {
            handle,
            contract_address: handle.contract,
        }
    }
}

/// wire form of a user-decrypt query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecryptionRequest {
    pub handle_pairs: Vec<HandlePair>,
    /// ephemeral public key, `0x` hex
    pub public_key: String,
    /// grant signature, `0x` hex
    pub signature: String,
    pub contract_addresses: Vec<Address>,
    pub user_address: Address,
    pub start_timestamp: u64,
    pub duration_days: u32,
}

impl DecryptionRequest {
    /// rebuild the grant the signature is supposed to cover
    pub fn grant(&self) -> Result<DisclosureGrant> {
        let pk = hex::decode(self.public_key.strip_prefix("0x").unwrap_or(&self.public_key))
            .map_err(|e| DisclosureError::ServiceError(format!("bad public key: {}", e)))?;
        let pk: [u8; 32] = pk
            .try_into()
            .map_err(|_| DisclosureError::ServiceError("public key must be 32 bytes".into()))?;
        DisclosureGrant::new(
            pk,
            self.contract_addresses.iter().copied(),
            self.start_timestamp,
            self.duration_days,
        )
        .map_err(|e| DisclosureError::ServiceError(e.to_string()))
    }

    pub fn signature_bytes(&self) -> Result<Vec<u8>> {
        hex::decode(self.signature.strip_prefix("0x").unwrap_or(&self.signature))
            .map_err(|e| DisclosureError::ServiceError(format!("bad signature encoding: {}", e)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptedEntry {
    pub handle: BalanceHandle,
    pub value: SealedValue,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionResponse {
    pub entries: Vec<DecryptedEntry>,
}

#[async_trait]
pub trait DecryptionService: Send + Sync {
    async fn resolve(&self, request: &DecryptionRequest) -> Result<DecryptionResponse>;
}

#[async_trait]
impl<T: DecryptionService + ?Sized> DecryptionService for Arc<T> {
    async fn resolve(&self, request: &DecryptionRequest) -> Result<DecryptionResponse> {
        (**self).resolve(request).await
    }
}

/// associated data binding a sealed value to its handle
pub fn entry_context(handle: &BalanceHandle) -> [u8; 40] {
    handle.to_bytes()
}

/// in-process service in front of a ledger's reveal capability
/// NOT SECURE - stands in for the threshold decryption network
pub struct SoftwareDecryptionService<A: HandleAccess + ?Sized> {
    access: Arc<A>,
    domain: Eip712Domain,
    clock: Arc<dyn Clock>,
    max_skew: u64,
}

impl<A: HandleAccess + ?Sized> SoftwareDecryptionService<A> {
    pub fn new(access: Arc<A>, domain: Eip712Domain) -> Self {
        Self::with_clock(access, domain, Arc::new(SystemClock))
    }

    pub fn with_clock(access: Arc<A>, domain: Eip712Domain, clock: Arc<dyn Clock>) -> Self {
        Self {
            access,
            domain,
            clock,
            max_skew: DEFAULT_MAX_SKEW,
        }
    }

    pub fn max_skew(mut self, secs: u64) -> Self {
        self.max_skew = secs;
        self
    }

    pub fn domain(&self) -> &Eip712Domain {
        &self.domain
    }

    fn authorize(&self, request: &DecryptionRequest) -> Result<DisclosureGrant> {
        let grant = request.grant()?;
        let signature = request.signature_bytes()?;

        if !verify_structured(
            &request.user_address,
            &self.domain,
            &DisclosureGrant::SCHEMA,
            &grant,
            &signature,
        ) {
            return Err(DisclosureError::ServiceError("invalid grant signature".into()));
        }

        let now = self.clock.now();
        if grant.start_timestamp > now.saturating_add(self.max_skew) {
            return Err(DisclosureError::ServiceError(format!(
                "grant starts at {}, now {}",
                grant.start_timestamp, now
            )));
        }
        if now >= grant.end_timestamp() {
            return Err(DisclosureError::ServiceError(format!(
                "grant expired at {}, now {}",
                grant.end_timestamp(),
                now
            )));
        }

        for pair in &request.handle_pairs {
            if pair.contract_address != pair.handle.contract || !grant.covers(&pair.contract_address) {
                return Err(DisclosureError::ServiceError(format!(
                    "contract {} not covered by grant",
                    pair.contract_address
                )));
            }
        }
        Ok(grant)
    }
}

#[async_trait]
impl<A: HandleAccess + ?Sized + 'static> DecryptionService for SoftwareDecryptionService<A> {
    async fn resolve(&self, request: &DecryptionRequest) -> Result<DecryptionResponse> {
        let grant = self.authorize(request)?;

        let mut entries = Vec::with_capacity(request.handle_pairs.len());
        for pair in &request.handle_pairs {
            if pair.handle.is_empty() {
                continue;
            }
            let value = match self.access.reveal(&pair.handle, &request.user_address) {
                Ok(v) => v,
                Err(e) => {
                    debug!("omitting {}: {}", pair.handle, e);
                    continue;
                }
            };
            let sealed = SealedValue::seal(
                &grant.public_key,
                &value.to_le_bytes(),
                &entry_context(&pair.handle),
            )
            .map_err(|e| {
                warn!("re-encryption failed: {}", e);
                DisclosureError::ServiceError(e.to_string())
            })?;
            entries.push(DecryptedEntry {
                handle: pair.handle,
                value: sealed,
            });
        }

        debug!(
            "resolved {}/{} handles for {}",
            entries.len(),
            request.handle_pairs.len(),
            request.user_address
        );
        Ok(DecryptionResponse { entries })
    }
}
