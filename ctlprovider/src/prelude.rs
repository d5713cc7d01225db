//! Common `ctlprovider` imports for downstream crates.

pub use crate::{
    ContentPart, FailureClass, FinishReason, GenerationGateway, GenerationMode, GenerationRequest,
    GenerationResult, Message, ModelProvider, NoopOperationHooks, ProviderError,
    ProviderErrorKind, ProviderFuture, ProviderId, ProviderOperationHooks, RetryPolicy, Role,
    TokenUsage, ToolCall, ToolDefinition,
};
pub use ctlcommon::{BoxFuture, GenerationOptions};
