//! http client for a remote decryption relayer

use async_trait::async_trait;
use tracing::debug;

use crate::service::{DecryptionRequest, DecryptionResponse, DecryptionService};
use crate::{DisclosureError, Result};

/// path the relayer serves user-decrypt queries on
pub const USER_DECRYPT_PATH: &str = "/v1/user-decrypt";

pub struct RelayerClient {
    url: String,
    http: reqwest::Client,
}

impl RelayerClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}{}", self.url, USER_DECRYPT_PATH)
    }
}

#[async_trait]
impl DecryptionService for RelayerClient {
    async fn resolve(&self, request: &DecryptionRequest) -> Result<DecryptionResponse> {
        let endpoint = self.endpoint();
        debug!("posting {} handle pairs to {}", request.handle_pairs.len(), endpoint);

        let resp = self
            .http
            .post(&endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| DisclosureError::ServiceError(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DisclosureError::ServiceError(format!("relayer returned {}: {}", status, body)));
        }

        resp.json::<DecryptionResponse>()
            .await
            .map_err(|e| DisclosureError::MalformedResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_cleanly() {
        let client = RelayerClient::new("https://relayer.example/");
        assert_eq!(client.endpoint(), "https://relayer.example/v1/user-decrypt");
    }
}
