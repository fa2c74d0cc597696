//! re-encryption to an ephemeral x25519 key
//!
//! the decryption service seals each plaintext to the requester's
//! ephemeral public key: fresh x25519 sender key, blake3 kdf over the
//! shared secret, chacha20poly1305. only the ephemeral secret opens it.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};

/// value sealed to one recipient key
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedValue {
    /// sender's one-shot x25519 public key
    #[serde(with = "cswap_ledger::hex_serde::array")]
    pub sender_pubkey: [u8; 32],
    #[serde(with = "cswap_ledger::hex_serde::array")]
    pub nonce: [u8; 12],
    /// ciphertext + 16 byte tag
    #[serde(with = "cswap_ledger::hex_serde::bytes")]
    pub ciphertext: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid encryption key")]
    InvalidKey,
    #[error("encryption failed")]
    EncryptionFailed,
    #[error("decryption failed - invalid ciphertext or wrong key")]
    DecryptionFailed,
}

impl SealedValue {
    /// seal `plaintext` to `recipient`, binding `context` as associated data
    pub fn seal(recipient: &[u8; 32], plaintext: &[u8], context: &[u8]) -> Result<Self, CryptoError> {
        let mut rng = rand::thread_rng();

        let sender_secret = EphemeralSecret::random_from_rng(&mut rng);
        let sender_public = PublicKey::from(&sender_secret);
        let shared = sender_secret.diffie_hellman(&PublicKey::from(*recipient));
        if !shared.was_contributory() {
            return Err(CryptoError::InvalidKey);
        }
        let key = derive_key(shared.as_bytes(), sender_public.as_bytes(), recipient);

        let mut nonce = [0u8; 12];
        rng.fill_bytes(&mut nonce);

        let cipher = ChaCha20Poly1305::new_from_slice(&key).map_err(|_| CryptoError::InvalidKey)?;
        let ciphertext = cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: plaintext,
                    aad: context,
                },
            )
            .map_err(|_| CryptoError::EncryptionFailed)?;

        Ok(Self {
            sender_pubkey: *sender_public.as_bytes(),
            nonce,
            ciphertext,
        })
    }

    /// open with the recipient's secret
    pub fn open(&self, recipient: &StaticSecret, context: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let recipient_public = PublicKey::from(recipient);
        let shared = recipient.diffie_hellman(&PublicKey::from(self.sender_pubkey));
        let key = derive_key(shared.as_bytes(), &self.sender_pubkey, recipient_public.as_bytes());

        let cipher = ChaCha20Poly1305::new_from_slice(&key).map_err(|_| CryptoError::InvalidKey)?;
        cipher
            .decrypt(
                Nonce::from_slice(&self.nonce),
                Payload {
                    msg: &self.ciphertext,
                    aad: context,
                },
            )
            .map_err(|_| CryptoError::DecryptionFailed)
    }
}

fn derive_key(shared: &[u8], sender: &[u8], recipient: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"cswap.disclosure.reencrypt.v1");
    hasher.update(shared);
    hasher.update(sender);
    hasher.update(recipient);
    *hasher.finalize().as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open() {
        let secret = StaticSecret::random_from_rng(&mut rand::thread_rng());
        let public = PublicKey::from(&secret);

        let sealed = SealedValue::seal(public.as_bytes(), &42u64.to_le_bytes(), b"ctx").unwrap();
        let opened = sealed.open(&secret, b"ctx").unwrap();
        assert_eq!(opened, 42u64.to_le_bytes());

        // context is bound
        assert_eq!(sealed.open(&secret, b"other"), Err(CryptoError::DecryptionFailed));
    }

    #[test]
    fn test_wrong_key_fails() {
        let secret = StaticSecret::random_from_rng(&mut rand::thread_rng());
        let public = PublicKey::from(&secret);
        let intruder = StaticSecret::random_from_rng(&mut rand::thread_rng());

        let sealed = SealedValue::seal(public.as_bytes(), b"balance", b"").unwrap();
        assert_eq!(sealed.open(&intruder, b""), Err(CryptoError::DecryptionFailed));
    }

    #[test]
    fn test_low_order_key_rejected() {
        assert_eq!(
            SealedValue::seal(&[0u8; 32], b"x", b""),
            Err(CryptoError::InvalidKey)
        );
    }
}
