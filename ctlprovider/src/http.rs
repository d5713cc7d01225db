//! Provider that relays generation requests to a remote `/generate` endpoint.
//!
//! The request body is the [`GenerationRequest`] wire form; a 2xx body is a
//! [`GenerationResult`]. Any other status becomes a [`ProviderError`] carrying
//! that status.

use reqwest::Client;

use crate::{
    GenerationRequest, GenerationResult, ModelProvider, ProviderError, ProviderFuture, ProviderId,
    SecretString,
};

#[derive(Debug, Clone)]
pub struct HttpModelProvider {
    client: Client,
    endpoint: String,
    token: SecretString,
}

impl HttpModelProvider {
    pub fn new(client: Client, base_url: impl AsRef<str>, token: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: format!("{}/generate", base_url.as_ref().trim_end_matches('/')),
            token: SecretString::new(token),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl ModelProvider for HttpModelProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Gateway
    }

    fn generate<'a>(
        &'a self,
        request: GenerationRequest,
    ) -> ProviderFuture<'a, Result<GenerationResult, ProviderError>> {
        Box::pin(async move {
            let response = self
                .client
                .post(&self.endpoint)
                .bearer_auth(self.token.expose())
                .json(&request)
                .send()
                .await
                .map_err(|err| {
                    if err.is_timeout() {
                        ProviderError::timeout(err.to_string())
                    } else {
                        ProviderError::transport(err.to_string())
                    }
                })?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = if body.trim().is_empty() {
                    format!("generation request failed with status {status}")
                } else {
                    body
                };
                return Err(ProviderError::from_status(status.as_u16(), message));
            }

            response
                .json::<GenerationResult>()
                .await
                .map_err(|err| ProviderError::transport(err.to_string()))
        })
    }
}
