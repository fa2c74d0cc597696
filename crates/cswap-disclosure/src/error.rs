//! disclosure errors, one family per protocol step

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DisclosureError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisclosureError {
    #[error("ephemeral key generation failed: {0}")]
    KeyGeneration(String),

    #[error("invalid grant: {0}")]
    InvalidGrant(String),

    #[error("signer unavailable: {0}")]
    SignerUnavailable(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("decryption service error: {0}")]
    ServiceError(String),

    #[error("malformed service response: {0}")]
    MalformedResponse(String),
}

/// protocol step a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    KeyGen,
    GrantConstruction,
    SignGrant,
    Query,
    Resolve,
}

impl DisclosureError {
    pub fn step(&self) -> Step {
        match self {
            DisclosureError::KeyGeneration(_) => Step::KeyGen,
            DisclosureError::InvalidGrant(_) => Step::GrantConstruction,
            DisclosureError::SignerUnavailable(_) | DisclosureError::Signing(_) => Step::SignGrant,
            DisclosureError::ServiceError(_) => Step::Query,
            DisclosureError::MalformedResponse(_) => Step::Resolve,
        }
    }

    /// worth retrying the whole disclosure as-is
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DisclosureError::KeyGeneration(_)
                | DisclosureError::SignerUnavailable(_)
                | DisclosureError::ServiceError(_)
        )
    }
}
