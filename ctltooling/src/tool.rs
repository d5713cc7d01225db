//! Tool trait contract and the closure-backed [`FunctionTool`].
//!
//! ```rust
//! use ctltooling::{FunctionTool, Tool};
//! use schemars::JsonSchema;
//! use serde::Deserialize;
//! use serde_json::json;
//!
//! #[derive(Deserialize, JsonSchema)]
//! struct Echo {
//!     text: String,
//! }
//!
//! let tool = FunctionTool::typed("echo", "Echoes input", |args: Echo, _ctx| async move {
//!     Ok(json!(args.text))
//! });
//!
//! let definition = tool.definition();
//! assert_eq!(definition.name, "echo");
//! assert_eq!(definition.input_schema["required"][0], "text");
//! ```

use std::future::Future;
use std::sync::Arc;

use ctlcommon::BoxFuture;
use ctlprovider::ToolDefinition;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{ArgumentSchema, ToolError, ToolExecutionContext, input_schema, parse_arguments};

pub type ToolFuture<'a, T> = BoxFuture<'a, T>;

pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// `None` declares a zero-argument tool.
    fn schema(&self) -> Option<&ArgumentSchema> {
        None
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: input_schema(self.schema()),
        }
    }

    /// Runs the tool with arguments that already passed [`Tool::schema`].
    fn invoke<'a>(
        &'a self,
        arguments: Value,
        context: &'a ToolExecutionContext,
    ) -> ToolFuture<'a, Result<Value, ToolError>>;
}

type ToolHandler = dyn Fn(Value, ToolExecutionContext) -> ToolFuture<'static, Result<Value, ToolError>>
    + Send
    + Sync;

#[derive(Clone)]
pub struct FunctionTool {
    name: String,
    description: String,
    schema: Option<ArgumentSchema>,
    handler: Arc<ToolHandler>,
}

impl FunctionTool {
    pub fn new<F, Fut>(name: impl Into<String>, description: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Value, ToolExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
    {
        let handler: Arc<ToolHandler> =
            Arc::new(move |arguments, context| Box::pin(handler(arguments, context)));

        Self {
            name: name.into(),
            description: description.into(),
            schema: None,
            handler,
        }
    }

    /// Advertises the schema derived from `A`; the handler receives
    /// arguments deserialized into `A`.
    pub fn typed<A, F, Fut>(name: impl Into<String>, description: impl Into<String>, handler: F) -> Self
    where
        A: DeserializeOwned + JsonSchema + Send + 'static,
        F: Fn(A, ToolExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        Self::new(name, description, move |arguments, context| {
            let handler = Arc::clone(&handler);
            async move {
                let arguments = parse_arguments::<A>(arguments)?;
                handler(arguments, context).await
            }
        })
        .with_schema(ArgumentSchema::of::<A>())
    }

    pub fn with_schema(mut self, schema: ArgumentSchema) -> Self {
        self.schema = Some(schema);
        self
    }
}

impl std::fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .finish()
    }
}

impl Tool for FunctionTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn schema(&self) -> Option<&ArgumentSchema> {
        self.schema.as_ref()
    }

    fn invoke<'a>(
        &'a self,
        arguments: Value,
        context: &'a ToolExecutionContext,
    ) -> ToolFuture<'a, Result<Value, ToolError>> {
        (self.handler)(arguments, context.clone())
    }
}
