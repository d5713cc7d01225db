//! Common imports for most opencontrol deployments.

pub use crate::{
    ArgumentSchema, BearerGate, CancellationToken, ChatError, ChatErrorKind, ChatPolicy,
    ConfigError, ControlConfig, ControlService, Conversation, FunctionTool, GenerationGateway,
    JsonSchema, Message, ModelProvider, ModelSettings, ProviderError, RpcClient, RpcDispatcher,
    ServiceResponse, Tool, ToolCallStatus, ToolError, ToolExecutionContext, ToolRegistry,
    TurnOutcome, TurnStatus,
};
pub use crate::{
    build_dispatcher, build_gateway_with, build_service, build_service_with, build_shop_service,
    remote_conversation,
};
pub use crate::shop::{HttpShopBackend, ShopBackend, shop_registry};
