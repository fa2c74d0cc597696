//! long-term signing capability
//!
//! the protocol only needs "sign this structured message". [`LocalSigner`]
//! holds an ed25519 key in process; wallets or remote signers implement
//! [`StructuredSigner`] themselves.

use async_trait::async_trait;
use cswap_ledger::Address;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use hkdf::Hkdf;
use sha2::Sha256;

use crate::grant::{typed_digest, Eip712Domain, TypeSchema, TypedData};
use crate::{DisclosureError, Result};

#[async_trait]
pub trait StructuredSigner: Send + Sync {
    /// account address the signatures verify against
    fn address(&self) -> Address;

    /// sign `message` under `domain`, returning the raw signature bytes
    async fn sign_structured(
        &self,
        domain: &Eip712Domain,
        schema: &TypeSchema,
        message: &(dyn TypedData + Sync),
    ) -> Result<Vec<u8>>;
}

/// in-process ed25519 signer, address = verifying key bytes
pub struct LocalSigner {
    signing_key: SigningKey,
    address: Address,
}

impl LocalSigner {
    /// derive the signing key from a 32 byte seed
    pub fn from_seed(seed: &[u8; 32]) -> Result<Self> {
        let hk = Hkdf::<Sha256>::new(None, seed);
        let mut signing_bytes = [0u8; 32];
        hk.expand(b"cswap:ed25519:v1", &mut signing_bytes)
            .map_err(|_| DisclosureError::SignerUnavailable("key derivation failed".into()))?;
        Ok(Self::from_signing_key(SigningKey::from_bytes(&signing_bytes)))
    }

    /// deterministic dev identity, e.g. `"alice"`
    pub fn dev(name: &str) -> Result<Self> {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"cswap:dev-seed:v1");
        hasher.update(name.as_bytes());
        Self::from_seed(hasher.finalize().as_bytes())
    }

    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        let address = Address::new(signing_key.verifying_key().to_bytes());
        Self {
            signing_key,
            address,
        }
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }
}

#[async_trait]
impl StructuredSigner for LocalSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_structured(
        &self,
        domain: &Eip712Domain,
        schema: &TypeSchema,
        message: &(dyn TypedData + Sync),
    ) -> Result<Vec<u8>> {
        if message.schema() != *schema {
            return Err(DisclosureError::Signing(format!(
                "message is {}, schema says {}",
                message.schema().primary_type,
                schema.primary_type
            )));
        }
        let digest = typed_digest(domain, message);
        Ok(self.signing_key.sign(&digest).to_bytes().to_vec())
    }
}

/// check `signature` over `message` against the ed25519 key behind `signer`
pub fn verify_structured(
    signer: &Address,
    domain: &Eip712Domain,
    schema: &TypeSchema,
    message: &dyn TypedData,
    signature: &[u8],
) -> bool {
    if message.schema() != *schema {
        return false;
    }
    let Ok(key) = VerifyingKey::from_bytes(signer.as_bytes()) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(signature) else {
        return false;
    };
    let digest = typed_digest(domain, message);
    key.verify(&digest, &signature).is_ok()
}
