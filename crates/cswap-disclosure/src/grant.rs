//! disclosure grants and their structured, domain-separated encoding
//!
//! encoding follows the eip-712 layout with sha-256 in place of keccak:
//!
//! ```text
//! domainSeparator = H(H(EIP712Domain type) ‖ H(name) ‖ H(version) ‖ chainId ‖ verifyingContract)
//! structHash      = H(H(type) ‖ H(publicKey) ‖ H(contracts…) ‖ start ‖ durationDays)
//! digest          = H(0x19 0x01 ‖ domainSeparator ‖ structHash)
//! ```
//!
//! integers are 32 byte big-endian words, addresses are their 32 raw bytes.

use std::collections::BTreeSet;

use cswap_ledger::Address;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{DisclosureError, Result};

/// validity window used when none is configured
pub const DEFAULT_DURATION_DAYS: u32 = 10;

/// longest window a service accepts
pub const MAX_DURATION_DAYS: u32 = 365;

pub const SECONDS_PER_DAY: u64 = 86_400;

const DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

/// signing domain, pins a grant to one deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eip712Domain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl Eip712Domain {
    pub fn new(name: impl Into<String>, version: impl Into<String>, chain_id: u64, verifying_contract: Address) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            chain_id,
            verifying_contract,
        }
    }

    pub fn separator(&self) -> [u8; 32] {
        let mut h = Sha256::new();
        h.update(sha256(DOMAIN_TYPE.as_bytes()));
        h.update(sha256(self.name.as_bytes()));
        h.update(sha256(self.version.as_bytes()));
        h.update(word(self.chain_id));
        h.update(self.verifying_contract.as_bytes());
        h.finalize().into()
    }
}

/// named struct type with its canonical type string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeSchema {
    pub primary_type: &'static str,
    pub encoded_type: &'static str,
}

impl TypeSchema {
    pub fn type_hash(&self) -> [u8; 32] {
        sha256(self.encoded_type.as_bytes())
    }
}

/// a message that can be signed as structured data
pub trait TypedData {
    fn schema(&self) -> TypeSchema;

    /// concatenated 32 byte field encodings, in schema order
    fn encode_data(&self) -> Vec<u8>;

    fn struct_hash(&self) -> [u8; 32] {
        let mut h = Sha256::new();
        h.update(self.schema().type_hash());
        h.update(self.encode_data());
        h.finalize().into()
    }
}

/// final digest a signer signs: `H(0x1901 ‖ domain separator ‖ struct hash)`
pub fn typed_digest(domain: &Eip712Domain, message: &dyn TypedData) -> [u8; 32] {
    let mut h = Sha256::new();
    h.update([0x19, 0x01]);
    h.update(domain.separator());
    h.update(message.struct_hash());
    h.finalize().into()
}

/// binds an ephemeral public key to a set of contracts and a time window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisclosureGrant {
    #[serde(with = "cswap_ledger::hex_serde::array")]
    pub public_key: [u8; 32],
    /// sorted, deduplicated
    pub contract_addresses: Vec<Address>,
    pub start_timestamp: u64,
    pub duration_days: u32,
}

impl DisclosureGrant {
    pub const SCHEMA: TypeSchema = TypeSchema {
        primary_type: "UserDecryptRequestVerification",
        encoded_type: "UserDecryptRequestVerification(bytes publicKey,address[] contractAddresses,uint256 startTimestamp,uint256 durationDays)",
    };

    pub fn new(
        public_key: [u8; 32],
        contracts: impl IntoIterator<Item = Address>,
        start_timestamp: u64,
        duration_days: u32,
    ) -> Result<Self> {
        let contract_addresses: Vec<Address> = contracts
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if contract_addresses.is_empty() {
            return Err(DisclosureError::InvalidGrant("no contract addresses".into()));
        }
        if duration_days == 0 {
            return Err(DisclosureError::InvalidGrant("zero duration".into()));
        }
        if duration_days > MAX_DURATION_DAYS {
            return Err(DisclosureError::InvalidGrant(format!(
                "duration {} days exceeds {}",
                duration_days, MAX_DURATION_DAYS
            )));
        }

        Ok(Self {
            public_key,
            contract_addresses,
            start_timestamp,
            duration_days,
        })
    }

    /// first second the grant is no longer valid
    pub fn end_timestamp(&self) -> u64 {
        self.start_timestamp
            .saturating_add(self.duration_days as u64 * SECONDS_PER_DAY)
    }

    /// `start <= now < end`
    pub fn is_valid_at(&self, now: u64) -> bool {
        self.start_timestamp <= now && now < self.end_timestamp()
    }

    pub fn covers(&self, contract: &Address) -> bool {
        self.contract_addresses.binary_search(contract).is_ok()
    }

    pub fn covers_all<'a>(&self, contracts: impl IntoIterator<Item = &'a Address>) -> bool {
        contracts.into_iter().all(|c| self.covers(c))
    }

    pub fn digest(&self, domain: &Eip712Domain) -> [u8; 32] {
        typed_digest(domain, self)
    }
}

impl TypedData for DisclosureGrant {
    fn schema(&self) -> TypeSchema {
        Self::SCHEMA
    }

    fn encode_data(&self) -> Vec<u8> {
        let mut contracts = Sha256::new();
        for c in &self.contract_addresses {
            contracts.update(c.as_bytes());
        }

        let mut out = Vec::with_capacity(4 * 32);
        out.extend_from_slice(&sha256(&self.public_key));
        out.extend_from_slice(&contracts.finalize());
        out.extend_from_slice(&word(self.start_timestamp));
        out.extend_from_slice(&word(self.duration_days as u64));
        out
    }
}

/// grant plus the requester's signature over its digest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedGrant {
    pub grant: DisclosureGrant,
    pub signer: Address,
    #[serde(with = "cswap_ledger::hex_serde::bytes")]
    pub signature: Vec<u8>,
}

impl SignedGrant {
    pub fn signature_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.signature))
    }
}

fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// u64 as a 32 byte big-endian word
fn word(v: u64) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[24..].copy_from_slice(&v.to_be_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domain() -> Eip712Domain {
        Eip712Domain::new("Decryption", "1", 9000, Address::derive(b"kms"))
    }

    fn usdc() -> Address {
        Address::derive(b"usdc")
    }

    #[test]
    fn test_grant_validation() {
        let pk = [7u8; 32];
        assert!(matches!(
            DisclosureGrant::new(pk, vec![], 0, 10),
            Err(DisclosureError::InvalidGrant(_))
        ));
        assert!(matches!(
            DisclosureGrant::new(pk, vec![usdc()], 0, 0),
            Err(DisclosureError::InvalidGrant(_))
        ));
        assert!(matches!(
            DisclosureGrant::new(pk, vec![usdc()], 0, 366),
            Err(DisclosureError::InvalidGrant(_))
        ));
        assert!(DisclosureGrant::new(pk, vec![usdc()], 0, 365).is_ok());
    }

    #[test]
    fn test_contracts_sorted_and_deduped() {
        let zama = Address::derive(b"zama");
        let g = DisclosureGrant::new([1u8; 32], vec![zama, usdc(), zama], 0, 1).unwrap();
        assert_eq!(g.contract_addresses.len(), 2);
        assert!(g.covers(&zama) && g.covers(&usdc()));
        assert!(!g.covers(&Address::derive(b"dai")));

        // order of input does not change the digest
        let g2 = DisclosureGrant::new([1u8; 32], vec![usdc(), zama], 0, 1).unwrap();
        assert_eq!(g.digest(&domain()), g2.digest(&domain()));
    }

    #[test]
    fn test_window() {
        let g = DisclosureGrant::new([1u8; 32], vec![usdc()], 1_000, 10).unwrap();
        assert_eq!(g.end_timestamp(), 1_000 + 10 * SECONDS_PER_DAY);
        assert!(!g.is_valid_at(999));
        assert!(g.is_valid_at(1_000));
        assert!(!g.is_valid_at(g.end_timestamp()));
    }

    #[test]
    fn test_digest_binds_every_field() {
        let base = DisclosureGrant::new([1u8; 32], vec![usdc()], 1_000, 10).unwrap();
        let d = base.digest(&domain());

        let mut other = base.clone();
        other.public_key = [2u8; 32];
        assert_ne!(other.digest(&domain()), d);

        let mut other = base.clone();
        other.start_timestamp += 1;
        assert_ne!(other.digest(&domain()), d);

        let mut other = base.clone();
        other.duration_days += 1;
        assert_ne!(other.digest(&domain()), d);

        let mut other_domain = domain();
        other_domain.chain_id += 1;
        assert_ne!(base.digest(&other_domain), d);

        // struct hash is type hash ‖ field encodings, and feeds the digest
        let struct_hash: [u8; 32] = {
            let mut h = Sha256::new();
            h.update(DisclosureGrant::SCHEMA.type_hash());
            h.update(base.encode_data());
            h.finalize().into()
        };
        assert_eq!(base.struct_hash(), struct_hash);
        let expected: [u8; 32] = {
            let mut h = Sha256::new();
            h.update([0x19, 0x01]);
            h.update(domain().separator());
            h.update(struct_hash);
            h.finalize().into()
        };
        assert_eq!(d, expected);
    }
}
