//! Chat-completions provider over a transport and the shared prompt model.

use std::sync::Arc;

use crate::{
    GenerationRequest, GenerationResult, ModelProvider, ProviderError, ProviderFuture, ProviderId,
    SecureCredentialManager,
};

use super::auth::resolve_auth;
use super::transport::{OpenAiHttpTransport, OpenAiTransport};
use super::types::{OpenAiFlavor, OpenAiRequest};

#[derive(Clone)]
pub struct OpenAiCompatibleProvider {
    flavor: OpenAiFlavor,
    credentials: Arc<SecureCredentialManager>,
    transport: Arc<dyn OpenAiTransport>,
    model: String,
}

impl OpenAiCompatibleProvider {
    pub fn new(
        flavor: OpenAiFlavor,
        credentials: Arc<SecureCredentialManager>,
        transport: Arc<dyn OpenAiTransport>,
    ) -> Self {
        Self {
            flavor,
            credentials,
            transport,
            model: flavor.default_model().to_string(),
        }
    }

    /// Provider talking to the flavor's public endpoint.
    pub fn over_http(
        flavor: OpenAiFlavor,
        credentials: Arc<SecureCredentialManager>,
        client: reqwest::Client,
    ) -> Self {
        let transport = OpenAiHttpTransport::new(client, flavor.base_url());
        Self::new(flavor, credentials, Arc::new(transport))
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !model.trim().is_empty() {
            self.model = model;
        }
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub(crate) fn build_request(&self, request: GenerationRequest) -> OpenAiRequest {
        OpenAiRequest::from_generation(self.model.clone(), request)
    }
}

impl std::fmt::Debug for OpenAiCompatibleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleProvider")
            .field("flavor", &self.flavor)
            .field("model", &self.model)
            .finish()
    }
}

impl ModelProvider for OpenAiCompatibleProvider {
    fn id(&self) -> ProviderId {
        self.flavor.provider_id()
    }

    fn generate<'a>(
        &'a self,
        request: GenerationRequest,
    ) -> ProviderFuture<'a, Result<GenerationResult, ProviderError>> {
        Box::pin(async move {
            request.validate()?;
            let auth = resolve_auth(&self.credentials, self.flavor)?;
            let openai_request = self.build_request(request);
            let response = self.transport.complete(openai_request, auth).await?;
            Ok(response.into_generation_result())
        })
    }
}
