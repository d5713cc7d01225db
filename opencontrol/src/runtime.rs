//! Wiring helpers that turn a [`ControlConfig`] into running components.

use std::sync::Arc;

use ctlchat::{ConversationBuilder, ConversationHooks, NoopConversationHooks};
use ctlobserve::{
    MetricsObservabilityHooks, SafeConversationHooks, SafeProviderHooks, SafeToolHooks,
    TracingObservabilityHooks,
};
use ctlprovider::{
    GenerationGateway, HttpModelProvider, ModelProvider, NoopOperationHooks,
    ProviderOperationHooks,
};
use ctlrpc::{DispatcherConfig, HttpRpcTransport, RpcClient, RpcDispatcher};
use ctltooling::{NoopToolRuntimeHooks, ToolRegistry, ToolRuntimeHooks};
use reqwest::Client;

use crate::auth::BearerGate;
use crate::config::{ConfigError, ControlConfig, HookMode, ModelProviderKind, ModelSettings};
use crate::service::ControlService;
use crate::shop::{HttpShopBackend, ShopBackend, shop_registry};

pub fn provider_hooks(mode: HookMode) -> Arc<dyn ProviderOperationHooks> {
    match mode {
        HookMode::None => Arc::new(NoopOperationHooks),
        HookMode::Tracing => Arc::new(SafeProviderHooks::new(TracingObservabilityHooks)),
        HookMode::Metrics => Arc::new(SafeProviderHooks::new(MetricsObservabilityHooks)),
    }
}

pub fn tool_hooks(mode: HookMode) -> Arc<dyn ToolRuntimeHooks> {
    match mode {
        HookMode::None => Arc::new(NoopToolRuntimeHooks),
        HookMode::Tracing => Arc::new(SafeToolHooks::new(TracingObservabilityHooks)),
        HookMode::Metrics => Arc::new(SafeToolHooks::new(MetricsObservabilityHooks)),
    }
}

pub fn conversation_hooks(mode: HookMode) -> Arc<dyn ConversationHooks> {
    match mode {
        HookMode::None => Arc::new(NoopConversationHooks),
        HookMode::Tracing => Arc::new(SafeConversationHooks::new(TracingObservabilityHooks)),
        HookMode::Metrics => Arc::new(SafeConversationHooks::new(MetricsObservabilityHooks)),
    }
}

pub fn build_provider_with<F>(
    settings: &ModelSettings,
    lookup: F,
) -> Result<Arc<dyn ModelProvider>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let api_key = settings.resolve_api_key_with(lookup)?;
    let client = Client::builder()
        .timeout(settings.timeout())
        .build()
        .map_err(|err| ConfigError::invalid(format!("failed to build http client: {err}")))?;

    match settings.provider {
        ModelProviderKind::Remote => {
            let base_url = settings
                .base_url
                .as_deref()
                .ok_or_else(|| ConfigError::invalid("remote provider requires base_url"))?;
            Ok(Arc::new(HttpModelProvider::new(
                client,
                base_url,
                api_key.expose(),
            )))
        }
        ModelProviderKind::OpenAi | ModelProviderKind::Mistral => {
            build_chat_completions_provider(settings, api_key.expose(), client)
        }
    }
}

#[cfg(feature = "provider-openai")]
fn build_chat_completions_provider(
    settings: &ModelSettings,
    api_key: &str,
    client: Client,
) -> Result<Arc<dyn ModelProvider>, ConfigError> {
    use ctlprovider::SecureCredentialManager;
    use ctlprovider::adapters::openai::{
        OpenAiCompatibleProvider, OpenAiFlavor, OpenAiHttpTransport,
    };

    let credentials = Arc::new(SecureCredentialManager::new());
    let flavor = match settings.provider {
        ModelProviderKind::Mistral => {
            credentials.set_mistral_api_key(api_key)?;
            OpenAiFlavor::Mistral
        }
        _ => {
            credentials.set_openai_api_key(api_key)?;
            OpenAiFlavor::OpenAi
        }
    };

    let base_url = settings.base_url.as_deref().unwrap_or(flavor.base_url());
    let transport = Arc::new(OpenAiHttpTransport::new(client, base_url));
    let mut provider = OpenAiCompatibleProvider::new(flavor, credentials, transport);
    if let Some(model) = &settings.model {
        provider = provider.with_model(model.as_str());
    }

    Ok(Arc::new(provider))
}

#[cfg(not(feature = "provider-openai"))]
fn build_chat_completions_provider(
    _settings: &ModelSettings,
    _api_key: &str,
    _client: Client,
) -> Result<Arc<dyn ModelProvider>, ConfigError> {
    Err(ConfigError::invalid(
        "provider-openai feature is not enabled on opencontrol",
    ))
}

/// Without a `[model]` section the gateway answers every request with
/// "No model configured".
pub fn build_gateway_with<F>(config: &ControlConfig, lookup: F) -> Result<GenerationGateway, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let gateway = match &config.model {
        Some(settings) => GenerationGateway::new(build_provider_with(settings, lookup)?),
        None => GenerationGateway::unconfigured(),
    };

    Ok(gateway.with_hooks(provider_hooks(config.hooks)))
}

pub fn build_dispatcher(config: &ControlConfig, registry: ToolRegistry) -> RpcDispatcher {
    let mut dispatcher_config = DispatcherConfig::default();
    if let Some(timeout) = config.tool_timeout() {
        dispatcher_config = dispatcher_config.with_tool_timeout(timeout);
    }

    RpcDispatcher::new(Arc::new(registry))
        .with_hooks(tool_hooks(config.hooks))
        .with_config(dispatcher_config)
}

pub fn build_service(config: &ControlConfig, registry: ToolRegistry) -> Result<ControlService, ConfigError> {
    build_service_with(config, registry, |name| std::env::var(name).ok())
}

pub fn build_service_with<F>(
    config: &ControlConfig,
    registry: ToolRegistry,
    lookup: F,
) -> Result<ControlService, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let gate = BearerGate::from_secret(config.resolve_password_with(&lookup)?);
    let gateway = build_gateway_with(config, &lookup)?;
    let dispatcher = Arc::new(build_dispatcher(config, registry));

    Ok(ControlService::new(gate, gateway, dispatcher))
}

/// Service exposing the shop catalog configured under `[shop]`, with the
/// `/cart` and `/order` views backed by the same shop.
pub fn build_shop_service(config: &ControlConfig) -> Result<ControlService, ConfigError> {
    let backend: Arc<dyn ShopBackend> = Arc::new(HttpShopBackend::from_settings(
        Client::new(),
        &config.shop,
    ));
    let registry = shop_registry(Arc::clone(&backend), config.shop.direct_orders)?;
    Ok(build_service(config, registry)?.with_shop(backend))
}

/// A conversation driving a remote opencontrol server through its
/// `/generate` and `/mcp` endpoints.
pub fn remote_conversation(
    client: Client,
    base_url: &str,
    token: &str,
    config: &ControlConfig,
) -> ConversationBuilder {
    let provider = HttpModelProvider::new(client.clone(), base_url, token);
    let transport = HttpRpcTransport::new(client, base_url, token);

    ctlchat::Conversation::builder(
        GenerationGateway::new(Arc::new(provider)).with_hooks(provider_hooks(config.hooks)),
        RpcClient::new(Arc::new(transport)),
    )
    .policy(config.chat_policy())
    .hooks(conversation_hooks(config.hooks))
}
