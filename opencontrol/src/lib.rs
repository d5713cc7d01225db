//! Unified facade over the opencontrol workspace crates.
//!
//! This crate is the single dependency for most deployments. It re-exports
//! the workspace crates and adds configuration, the bearer gate, the
//! framework-free [`ControlService`] handlers, and the example shop catalog.
//!
//! ```rust
//! use opencontrol::prelude::*;
//!
//! let config = ControlConfig::default().with_password("hunter2");
//! let service = build_service_with(&config, ToolRegistry::empty(), |_| None)
//!     .expect("service should build");
//!
//! assert_eq!(service.handle_auth(Some("Bearer hunter2")).status, 200);
//! assert_eq!(service.handle_auth(Some("Bearer wrong")).status, 401);
//! assert!(!service.gateway().is_configured());
//! ```

mod auth;
mod config;
mod service;

pub mod prelude;
pub mod runtime;
pub mod shop;

pub use ctlchat;
pub use ctlcommon;
pub use ctlobserve;
pub use ctlprovider;
pub use ctlrpc;
pub use ctltooling;

pub use auth::{AuthError, AuthErrorKind, BearerGate};
pub use config::{
    ChatSettings, ConfigError, ConfigErrorKind, ControlConfig, DEFAULT_PASSWORD, DEFAULT_SHOP_URL,
    HookMode, LEGACY_PASSWORD_ENV, ModelProviderKind, ModelSettings, PASSWORD_ENV, SHOP_TOKEN_ENV,
    ShopSettings,
};
pub use service::{ControlService, NO_MODEL_CONFIGURED, NO_SHOP_CONFIGURED, ServiceResponse};

pub use ctlchat::{
    CancellationToken, ChatError, ChatErrorKind, ChatPolicy, Conversation, ConversationBuilder,
    ConversationHooks, ConversationState, SeedMessages, ToolCallRecord, ToolCallStatus,
    TurnOutcome, TurnPhase, TurnStatus,
};
pub use ctlcommon::{BoxFuture, GenerationOptions, SessionId, TraceId};
pub use ctlprovider::{
    FailureClass, FinishReason, GenerationGateway, GenerationRequest, GenerationResult, Message,
    ModelProvider, ProviderError, ProviderErrorKind, Role, ToolCall, ToolDefinition,
};
pub use ctlrpc::{JsonRpcError, JsonRpcResponse, RpcClient, RpcDispatcher, RpcError};
pub use ctltooling::{
    ArgumentSchema, FunctionTool, JsonSchema, Tool, ToolError, ToolErrorKind,
    ToolExecutionContext, ToolRegistry,
};
pub use runtime::{
    build_dispatcher, build_gateway_with, build_provider_with, build_service, build_service_with,
    build_shop_service, remote_conversation,
};
