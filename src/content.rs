//! Content-address gateway client
//!
//! Resolves a content address to its raw document via the gateway's
//! `/api/v0/cat` endpoint. Pure request/response: no retry, no local
//! cache. Failures propagate to the record decoder, which isolates them
//! per record rather than failing the whole pass.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::types::{Result, WharfError};

/// Resolves a content address to its raw document.
#[async_trait]
pub trait ContentFetch: Send + Sync {
    /// Fetch the raw document for a content address. No validation of the
    /// hash format is performed here.
    async fn fetch(&self, hash: &str) -> Result<String>;
}

/// reqwest-backed client for a content-addressable storage gateway.
pub struct IpfsGateway {
    base_url: String,
    client: Client,
}

impl IpfsGateway {
    /// Create a new gateway client. The timeout covers every fetch; a hung
    /// gateway fails the record instead of stalling the pass forever.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base: String = base_url.into();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            base_url: base.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ContentFetch for IpfsGateway {
    async fn fetch(&self, hash: &str) -> Result<String> {
        let url = format!(
            "{}/api/v0/cat?arg={}",
            self.base_url,
            urlencoding::encode(hash)
        );

        let response = self.client.post(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(WharfError::Gateway { status, message });
        }

        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_trims_trailing_slash() {
        let gateway = IpfsGateway::new("http://localhost:5001/", Duration::from_secs(5));
        assert_eq!(gateway.base_url(), "http://localhost:5001");
    }
}
