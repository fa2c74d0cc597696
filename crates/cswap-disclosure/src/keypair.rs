//! ephemeral decryption keypair
//!
//! generated per disclosure session, held in memory only, unrelated to the
//! account's long-term signing key.

use std::fmt;

use rand::{rngs::OsRng, RngCore};
use x25519_dalek::{PublicKey, StaticSecret};

use crate::crypto::SealedValue;
use crate::{DisclosureError, Result};

pub struct DecryptionKeypair {
    secret: StaticSecret,
    public: PublicKey,
}

impl DecryptionKeypair {
    /// fresh keypair from the os rng
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; 32];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| DisclosureError::KeyGeneration(e.to_string()))?;
        let secret = StaticSecret::from(bytes);
        let public = PublicKey::from(&secret);
        Ok(Self { secret, public })
    }

    pub fn public_key(&self) -> [u8; 32] {
        *self.public.as_bytes()
    }

    pub fn public_key_hex(&self) -> String {
        format!("0x{}", hex::encode(self.public.as_bytes()))
    }

    /// open a value the service sealed to this key
    pub fn open(&self, sealed: &SealedValue, context: &[u8]) -> Result<Vec<u8>> {
        sealed
            .open(&self.secret, context)
            .map_err(|e| DisclosureError::MalformedResponse(e.to_string()))
    }
}

impl fmt::Debug for DecryptionKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DecryptionKeypair({})", self.public_key_hex())
    }
}
