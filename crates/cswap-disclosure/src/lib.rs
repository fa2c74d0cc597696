//! # cswap-disclosure
//!
//! turns an opaque balance handle into a plaintext value only its owner
//! sees.
//!
//! ## flow
//!
//! ```text
//! ┌────────┐ keygen  ┌──────────────┐ sign  ┌─────────────┐ query  ┌─────────┐
//! │ client │ ──────► │ ephemeral kp │ ────► │ signed grant│ ─────► │ service │
//! └────────┘         └──────────────┘       └─────────────┘        └────┬────┘
//!      ▲                                                                │
//!      └──────── values sealed to the ephemeral key (x25519) ◄──────────┘
//! ```
//!
//! - the grant binds the ephemeral public key, the contracts and a validity
//!   window, and is signed as domain-separated structured data
//! - the service checks signature, window and the handle's access list
//! - handles the service leaves out resolve to zero; the empty handle is
//!   zero without a round trip
//!
//! the software service is NOT SECURE, it reads plaintext straight from a
//! ledger. with the `network` feature, [`network::RelayerClient`] talks to
//! a remote relayer instead.

pub mod cache;
pub mod crypto;
pub mod error;
pub mod grant;
pub mod keypair;
#[cfg(feature = "network")]
pub mod network;
pub mod protocol;
pub mod service;
pub mod signer;

pub use cache::{CachedGrant, GrantCache};
pub use crypto::{CryptoError, SealedValue};
pub use error::{DisclosureError, Result, Step};
pub use grant::{
    DisclosureGrant, Eip712Domain, SignedGrant, TypeSchema, TypedData, DEFAULT_DURATION_DAYS,
    MAX_DURATION_DAYS,
};
pub use keypair::DecryptionKeypair;
#[cfg(feature = "network")]
pub use network::RelayerClient;
pub use protocol::{Disclosure, DisclosureClient};
pub use service::{
    DecryptedEntry, DecryptionRequest, DecryptionResponse, DecryptionService, HandlePair,
    SoftwareDecryptionService,
};
pub use signer::{verify_structured, LocalSigner, StructuredSigner};
