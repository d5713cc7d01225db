//! Generation gateway, prompt wire model, and model provider adapters.
//!
//! ```rust
//! use ctlprovider::prelude::*;
//!
//! let gateway = GenerationGateway::unconfigured();
//! assert!(!gateway.is_configured());
//!
//! let prompt = vec![Message::system("You are helpful."), Message::user("hi")];
//! let request = GenerationRequest::new(prompt, &[]).with_options(
//!     GenerationOptions::default().with_temperature(1.0),
//! );
//! assert_eq!(request.temperature, Some(1.0));
//! ```

pub mod adapters;
pub mod credentials;
pub mod error;
pub mod gateway;
#[cfg(feature = "http")]
pub mod http;
pub mod model;
pub mod prelude;
pub mod provider;
pub mod resilience;

pub use credentials::{SecretString, SecureCredentialManager};
pub use error::{FailureClass, ProviderError, ProviderErrorKind};
pub use gateway::{GENERATE_OPERATION, GenerationGateway};
#[cfg(feature = "http")]
pub use http::HttpModelProvider;
pub use model::{
    ContentPart, DeclarationKind, FinishReason, FunctionDeclaration, GenerationMode,
    GenerationRequest, GenerationResult, InputFormat, Message, ProviderId, Role, TokenUsage,
    ToolCall, ToolDefinition,
};
pub use provider::{ModelProvider, ProviderFuture};
pub use resilience::{NoopOperationHooks, ProviderOperationHooks, RetryPolicy};
