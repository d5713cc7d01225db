//! Prompt, tool descriptor, and generation request/result model types.
//!
//! The serde representation of these types is the wire format spoken by the
//! generation endpoint.
//!
//! ```rust
//! use ctlprovider::{FinishReason, GenerationRequest, GenerationResult, Message};
//!
//! let request = GenerationRequest::new(vec![Message::user("list your tools")], &[]);
//! let body = serde_json::to_value(&request).expect("request should serialize");
//! assert_eq!(body["inputFormat"], "messages");
//! assert_eq!(body["mode"]["type"], "regular");
//! assert_eq!(body["prompt"][0]["content"][0]["type"], "text");
//!
//! let result: GenerationResult =
//!     serde_json::from_str(r#"{"text":"hi","finishReason":"stop"}"#).expect("result should parse");
//! assert_eq!(result.finish_reason, FinishReason::Stop);
//! ```

use std::fmt::{Display, Formatter};

use ctlcommon::GenerationOptions;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    Gateway,
    OpenAi,
    Mistral,
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let id = match self {
            Self::Gateway => "gateway",
            Self::OpenAi => "openai",
            Self::Mistral => "mistral",
        };

        f.write_str(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ContentPart {
    Text {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    ToolCall {
        tool_call_id: String,
        tool_name: String,
        args: Value,
    },
    #[serde(rename_all = "camelCase")]
    ToolResult {
        tool_call_id: String,
        tool_name: String,
        result: Value,
        #[serde(default, skip_serializing_if = "is_false")]
        is_error: bool,
    },
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// One prompt entry.
///
/// System messages carry plain text on the wire; every other role carries a
/// list of content parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireMessage", from = "WireMessage")]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentPart>,
}

impl Message {
    pub fn new(role: Role, content: Vec<ContentPart>) -> Self {
        Self { role, content }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::text(Role::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::text(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::text(Role::Assistant, text)
    }

    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self::new(role, vec![ContentPart::Text { text: text.into() }])
    }

    pub fn tool_call(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        args: Value,
    ) -> Self {
        Self::new(
            Role::Assistant,
            vec![ContentPart::ToolCall {
                tool_call_id: tool_call_id.into(),
                tool_name: tool_name.into(),
                args,
            }],
        )
    }

    pub fn tool_result(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        result: Value,
    ) -> Self {
        Self::new(
            Role::Tool,
            vec![ContentPart::ToolResult {
                tool_call_id: tool_call_id.into(),
                tool_name: tool_name.into(),
                result,
                is_error: false,
            }],
        )
    }

    pub fn tool_error(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        error: Value,
    ) -> Self {
        Self::new(
            Role::Tool,
            vec![ContentPart::ToolResult {
                tool_call_id: tool_call_id.into(),
                tool_name: tool_name.into(),
                result: error,
                is_error: true,
            }],
        )
    }

    /// Concatenation of every text part.
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn is_tool_call(&self) -> bool {
        self.content
            .iter()
            .any(|part| matches!(part, ContentPart::ToolCall { .. }))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
enum WireMessage {
    System { content: String },
    User { content: WireContent },
    Assistant { content: WireContent },
    Tool { content: Vec<ContentPart> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum WireContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl WireContent {
    fn into_parts(self) -> Vec<ContentPart> {
        match self {
            Self::Text(text) => vec![ContentPart::Text { text }],
            Self::Parts(parts) => parts,
        }
    }
}

impl From<Message> for WireMessage {
    fn from(value: Message) -> Self {
        match value.role {
            Role::System => Self::System {
                content: value.text_content(),
            },
            Role::User => Self::User {
                content: WireContent::Parts(value.content),
            },
            Role::Assistant => Self::Assistant {
                content: WireContent::Parts(value.content),
            },
            Role::Tool => Self::Tool {
                content: value.content,
            },
        }
    }
}

impl From<WireMessage> for Message {
    fn from(value: WireMessage) -> Self {
        match value {
            WireMessage::System { content } => Message::system(content),
            WireMessage::User { content } => Message::new(Role::User, content.into_parts()),
            WireMessage::Assistant { content } => {
                Message::new(Role::Assistant, content.into_parts())
            }
            WireMessage::Tool { content } => Message::new(Role::Tool, content),
        }
    }
}

/// Protocol-visible descriptor of a tool, as answered by `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// A model-issued request to run one tool.
///
/// `arguments` is the raw JSON text produced by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(rename = "toolCallId")]
    pub id: String,
    #[serde(rename = "toolName")]
    pub name: String,
    #[serde(rename = "args", default)]
    pub arguments: String,
}

impl ToolCall {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Parses the raw argument text; blank text is an empty object.
    pub fn parse_arguments(&self) -> Result<Value, serde_json::Error> {
        if self.arguments.trim().is_empty() {
            return Ok(Value::Object(Map::new()));
        }

        serde_json::from_str(&self.arguments)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    ToolCalls,
    Error,
    Other,
}

impl FinishReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Length => "length",
            Self::ContentFilter => "content-filter",
            Self::ToolCalls => "tool-calls",
            Self::Error => "error",
            Self::Other => "other",
        }
    }
}

impl From<String> for FinishReason {
    fn from(value: String) -> Self {
        match value.as_str() {
            "stop" => Self::Stop,
            "length" => Self::Length,
            "content-filter" => Self::ContentFilter,
            "tool-calls" => Self::ToolCalls,
            "error" => Self::Error,
            _ => Self::Other,
        }
    }
}

impl From<FinishReason> for String {
    fn from(value: FinishReason) -> Self {
        value.as_str().to_string()
    }
}

impl Display for FinishReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub finish_reason: FinishReason,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

impl GenerationResult {
    pub fn stop(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            finish_reason: FinishReason::Stop,
            tool_calls: Vec::new(),
            usage: None,
        }
    }

    pub fn tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            text: None,
            finish_reason: FinishReason::ToolCalls,
            tool_calls,
            usage: None,
        }
    }

    /// Text if present and non-empty.
    pub fn answer(&self) -> Option<&str> {
        self.text.as_deref().filter(|text| !text.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    #[default]
    Messages,
    Prompt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclarationKind {
    #[default]
    Function,
}

/// Tool descriptor as embedded in a generation request's mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    #[serde(rename = "type", default)]
    pub kind: DeclarationKind,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub parameters: Value,
}

impl From<&ToolDefinition> for FunctionDeclaration {
    fn from(value: &ToolDefinition) -> Self {
        Self {
            kind: DeclarationKind::Function,
            name: value.name.clone(),
            description: value.description.clone(),
            parameters: value.input_schema.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GenerationMode {
    Regular {
        #[serde(default)]
        tools: Vec<FunctionDeclaration>,
    },
}

impl GenerationMode {
    pub fn tools(&self) -> &[FunctionDeclaration] {
        match self {
            Self::Regular { tools } => tools,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub prompt: Vec<Message>,
    pub mode: GenerationMode,
    #[serde(default)]
    pub input_format: InputFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    pub fn new(prompt: Vec<Message>, tools: &[ToolDefinition]) -> Self {
        Self {
            prompt,
            mode: GenerationMode::Regular {
                tools: tools.iter().map(FunctionDeclaration::from).collect(),
            },
            input_format: InputFormat::Messages,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.temperature = options.temperature;
        self.max_tokens = options.max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.prompt.is_empty() {
            return Err(ProviderError::invalid_request(
                "prompt must contain at least one message",
            ));
        }

        if let Some(max_tokens) = self.max_tokens
            && max_tokens == 0
        {
            return Err(ProviderError::invalid_request(
                "max_tokens must be greater than zero",
            ));
        }

        if let Some(temperature) = self.temperature
            && !(0.0..=2.0).contains(&temperature)
        {
            return Err(ProviderError::invalid_request(
                "temperature must be in the inclusive range 0.0..=2.0",
            ));
        }

        Ok(())
    }
}
