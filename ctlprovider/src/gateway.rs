//! Single-attempt generation gateway in front of an optional provider.
//!
//! ```rust
//! use ctlprovider::{GenerationGateway, Message, ProviderErrorKind};
//! use ctlcommon::GenerationOptions;
//!
//! # tokio_test_block(async {
//! let gateway = GenerationGateway::unconfigured();
//! let error = gateway
//!     .generate(&[Message::user("hi")], &[], GenerationOptions::default())
//!     .await
//!     .expect_err("no provider is configured");
//! assert_eq!(error.kind, ProviderErrorKind::Configuration);
//! assert_eq!(error.message, "No model configured");
//! # });
//! # fn tokio_test_block<F: std::future::Future>(future: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().expect("runtime").block_on(future)
//! # }
//! ```

use std::sync::Arc;
use std::time::Instant;

use ctlcommon::GenerationOptions;

use crate::{
    GenerationRequest, GenerationResult, Message, ModelProvider, NoopOperationHooks,
    ProviderError, ProviderFuture, ProviderId, ProviderOperationHooks, ToolDefinition,
};

pub const GENERATE_OPERATION: &str = "generate";

#[derive(Clone)]
pub struct GenerationGateway {
    provider: Option<Arc<dyn ModelProvider>>,
    hooks: Arc<dyn ProviderOperationHooks>,
}

impl GenerationGateway {
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self {
            provider: Some(provider),
            hooks: Arc::new(NoopOperationHooks),
        }
    }

    /// A gateway that fails every request with a configuration error.
    pub fn unconfigured() -> Self {
        Self {
            provider: None,
            hooks: Arc::new(NoopOperationHooks),
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ProviderOperationHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    /// Builds a request from borrowed prompt and tools; neither is mutated.
    pub async fn generate(
        &self,
        prompt: &[Message],
        tools: &[ToolDefinition],
        options: GenerationOptions,
    ) -> Result<GenerationResult, ProviderError> {
        let request = GenerationRequest::new(prompt.to_vec(), tools).with_options(options);
        self.forward(request).await
    }

    /// Exactly one upstream call. Failures carry the upstream status when known.
    pub async fn forward(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResult, ProviderError> {
        let Some(provider) = self.provider.as_ref() else {
            return Err(ProviderError::configuration("No model configured"));
        };

        let provider_id = provider.id();
        self.hooks.on_request_start(provider_id, GENERATE_OPERATION);
        let started = Instant::now();

        let outcome = match request.validate() {
            Ok(()) => provider.generate(request).await,
            Err(error) => Err(error),
        };

        match &outcome {
            Ok(_) => self
                .hooks
                .on_success(provider_id, GENERATE_OPERATION, started.elapsed()),
            Err(error) => {
                self.hooks
                    .on_failure(provider_id, GENERATE_OPERATION, error, started.elapsed())
            }
        }

        outcome
    }
}

impl std::fmt::Debug for GenerationGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationGateway")
            .field("provider", &self.provider.as_ref().map(|provider| provider.id()))
            .finish()
    }
}

impl ModelProvider for GenerationGateway {
    fn id(&self) -> ProviderId {
        self.provider
            .as_ref()
            .map_or(ProviderId::Gateway, |provider| provider.id())
    }

    fn generate<'a>(
        &'a self,
        request: GenerationRequest,
    ) -> ProviderFuture<'a, Result<GenerationResult, ProviderError>> {
        Box::pin(self.forward(request))
    }
}
