//! API key storage helpers and auth resolution for chat-completions upstreams.

use crate::{ProviderError, ProviderId, SecureCredentialManager};

use super::types::{OpenAiAuth, OpenAiFlavor};

impl SecureCredentialManager {
    /// Stores an OpenAI API key; OpenAI keys are expected to start with `sk-`.
    pub fn set_openai_api_key(&self, api_key: impl Into<String>) -> Result<(), ProviderError> {
        let api_key = api_key.into();
        if !api_key.starts_with("sk-") {
            return Err(ProviderError::authentication(
                "OpenAI API key must start with 'sk-'",
            ));
        }

        self.set_api_key(ProviderId::OpenAi, api_key)
    }

    pub fn set_mistral_api_key(&self, api_key: impl Into<String>) -> Result<(), ProviderError> {
        self.set_api_key(ProviderId::Mistral, api_key)
    }
}

pub(crate) fn resolve_auth(
    credentials: &SecureCredentialManager,
    flavor: OpenAiFlavor,
) -> Result<OpenAiAuth, ProviderError> {
    if let Some(api_key) = credentials.api_key(flavor.provider_id())? {
        return Ok(OpenAiAuth::ApiKey(api_key));
    }

    Err(ProviderError::authentication(format!(
        "no {} API key configured",
        flavor.provider_id()
    )))
}
