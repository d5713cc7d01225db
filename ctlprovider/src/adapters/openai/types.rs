//! Chat-completions adapter types and prompt conversion logic.

use std::fmt::Formatter;

use serde_json::Value;

use crate::{
    ContentPart, FinishReason, GenerationRequest, GenerationResult, Message, ProviderId, Role,
    SecretString, TokenUsage, ToolCall,
};

/// Which chat-completions compatible upstream is targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAiFlavor {
    OpenAi,
    Mistral,
}

impl OpenAiFlavor {
    pub fn provider_id(self) -> ProviderId {
        match self {
            Self::OpenAi => ProviderId::OpenAi,
            Self::Mistral => ProviderId::Mistral,
        }
    }

    pub fn base_url(self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Mistral => "https://api.mistral.ai/v1",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o-mini",
            Self::Mistral => "mistral-small-latest",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenAiRequest {
    pub model: String,
    pub messages: Vec<OpenAiMessage>,
    pub tools: Vec<OpenAiTool>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl OpenAiRequest {
    pub(crate) fn from_generation(model: String, request: GenerationRequest) -> Self {
        let tools = request
            .mode
            .tools()
            .iter()
            .map(|declaration| OpenAiTool {
                name: declaration.name.clone(),
                description: declaration.description.clone(),
                parameters: declaration.parameters.clone(),
            })
            .collect();

        Self {
            model,
            messages: messages_from_prompt(request.prompt),
            tools,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAiMessage {
    pub role: OpenAiRole,
    pub content: Option<String>,
    pub tool_calls: Vec<OpenAiToolCall>,
    pub tool_call_id: Option<String>,
}

impl OpenAiMessage {
    fn text(role: OpenAiRole, content: String) -> Self {
        Self {
            role,
            content: Some(content),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    fn tool_result(tool_call_id: String, content: String) -> Self {
        Self {
            role: OpenAiRole::Tool,
            content: Some(content),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id),
        }
    }
}

/// Flattens the prompt into chat-completions messages.
///
/// Adjacent assistant tool-call messages collapse into one assistant message
/// so every following tool message answers a call of the same turn.
pub(crate) fn messages_from_prompt(prompt: Vec<Message>) -> Vec<OpenAiMessage> {
    let mut messages: Vec<OpenAiMessage> = Vec::with_capacity(prompt.len());

    for message in prompt {
        match message.role {
            Role::System => messages.push(OpenAiMessage::text(
                OpenAiRole::System,
                message.text_content(),
            )),
            Role::User => {
                messages.push(OpenAiMessage::text(OpenAiRole::User, message.text_content()))
            }
            Role::Assistant => {
                let text = message.text_content();
                let tool_calls = message
                    .content
                    .into_iter()
                    .filter_map(|part| match part {
                        ContentPart::ToolCall {
                            tool_call_id,
                            tool_name,
                            args,
                        } => Some(OpenAiToolCall {
                            id: tool_call_id,
                            name: tool_name,
                            arguments: arguments_text(args),
                        }),
                        _ => None,
                    })
                    .collect::<Vec<_>>();

                if let Some(previous) = messages.last_mut()
                    && previous.role == OpenAiRole::Assistant
                    && !previous.tool_calls.is_empty()
                    && !tool_calls.is_empty()
                    && text.is_empty()
                {
                    previous.tool_calls.extend(tool_calls);
                    continue;
                }

                messages.push(OpenAiMessage {
                    role: OpenAiRole::Assistant,
                    content: (!text.is_empty()).then_some(text),
                    tool_calls,
                    tool_call_id: None,
                });
            }
            Role::Tool => {
                for part in message.content {
                    if let ContentPart::ToolResult {
                        tool_call_id,
                        result,
                        ..
                    } = part
                    {
                        messages.push(OpenAiMessage::tool_result(
                            tool_call_id,
                            result.to_string(),
                        ));
                    }
                }
            }
        }
    }

    messages
}

fn arguments_text(args: Value) -> String {
    match args {
        Value::String(raw) => raw,
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAiRole {
    System,
    User,
    Assistant,
    Tool,
}

impl OpenAiRole {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenAiTool {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAiResponse {
    pub model: String,
    pub message: OpenAiAssistantMessage,
    pub finish_reason: OpenAiFinishReason,
    pub usage: OpenAiUsage,
}

impl OpenAiResponse {
    pub(crate) fn into_generation_result(self) -> GenerationResult {
        GenerationResult {
            text: (!self.message.content.is_empty()).then_some(self.message.content),
            finish_reason: self.finish_reason.into(),
            tool_calls: self
                .message
                .tool_calls
                .into_iter()
                .map(ToolCall::from)
                .collect(),
            usage: Some(self.usage.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAiAssistantMessage {
    pub content: String,
    pub tool_calls: Vec<OpenAiToolCall>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAiToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

impl From<OpenAiToolCall> for ToolCall {
    fn from(value: OpenAiToolCall) -> Self {
        Self {
            id: value.id,
            name: value.name,
            arguments: value.arguments,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAiFinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    Other,
}

impl From<OpenAiFinishReason> for FinishReason {
    fn from(value: OpenAiFinishReason) -> Self {
        match value {
            OpenAiFinishReason::Stop => Self::Stop,
            OpenAiFinishReason::Length => Self::Length,
            OpenAiFinishReason::ToolCalls => Self::ToolCalls,
            OpenAiFinishReason::ContentFilter => Self::ContentFilter,
            OpenAiFinishReason::Other => Self::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenAiUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl From<OpenAiUsage> for TokenUsage {
    fn from(value: OpenAiUsage) -> Self {
        Self {
            prompt_tokens: value.prompt_tokens,
            completion_tokens: value.completion_tokens,
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub enum OpenAiAuth {
    ApiKey(SecretString),
}

impl std::fmt::Debug for OpenAiAuth {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApiKey(_) => f.write_str("OpenAiAuth::ApiKey([REDACTED])"),
        }
    }
}
