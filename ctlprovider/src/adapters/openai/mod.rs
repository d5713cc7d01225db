mod auth;
mod provider;
mod serde_api;
mod transport;
mod types;

pub use provider::OpenAiCompatibleProvider;
pub use transport::{OpenAiHttpTransport, OpenAiTransport};
pub use types::{
    OpenAiAssistantMessage, OpenAiAuth, OpenAiFinishReason, OpenAiFlavor, OpenAiMessage,
    OpenAiRequest, OpenAiResponse, OpenAiRole, OpenAiTool, OpenAiToolCall, OpenAiUsage,
};
