//! Stateless JSON-RPC dispatcher serving `tools/list` and `tools/call`.
//!
//! Every request yields exactly one response envelope. The dispatcher makes a
//! single attempt per call and has no side effects of its own.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use ctlrpc::RpcDispatcher;
//! use ctltooling::{FunctionTool, ToolRegistry};
//! use serde_json::json;
//!
//! # tokio_block(async {
//! let registry = ToolRegistry::builder()
//!     .tool(FunctionTool::new("ping", "Replies pong", |_args, _ctx| async move {
//!         Ok(json!("pong"))
//!     }))
//!     .build()
//!     .expect("registry should build");
//! let dispatcher = RpcDispatcher::new(Arc::new(registry));
//!
//! let response = dispatcher
//!     .process(json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call", "params": {"name": "ping"}}))
//!     .await;
//! assert_eq!(response.result, Some(json!({"content": "pong"})));
//! # });
//! # fn tokio_block<F: std::future::Future>(future: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().expect("runtime").block_on(future)
//! # }
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use ctlcommon::SessionId;
use ctltooling::{
    NoopToolRuntimeHooks, SchemaViolation, Tool, ToolError, ToolErrorKind, ToolExecutionContext,
    ToolRegistry, ToolRuntimeHooks, validate_arguments,
};
use futures_timer::Delay;
use futures_util::future::{Either, select};
use serde_json::{Map, Value, json};

use crate::{
    JSONRPC_VERSION, JsonRpcError, JsonRpcRequest, JsonRpcResponse, METHOD_TOOLS_CALL,
    METHOD_TOOLS_LIST, ToolCallParams, ToolsListResult,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Upper bound on a single tool body; `None` waits indefinitely.
    pub tool_timeout: Option<Duration>,
    /// Session recorded in the execution context of server-side calls.
    pub session_id: SessionId,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            tool_timeout: None,
            session_id: SessionId::new("mcp"),
        }
    }
}

impl DispatcherConfig {
    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = Some(timeout);
        self
    }
}

#[derive(Clone)]
pub struct RpcDispatcher {
    registry: Arc<ToolRegistry>,
    hooks: Arc<dyn ToolRuntimeHooks>,
    config: DispatcherConfig,
}

impl RpcDispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            hooks: Arc::new(NoopToolRuntimeHooks),
            config: DispatcherConfig::default(),
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ToolRuntimeHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(&self) -> Arc<ToolRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Handles raw body text; unparsable JSON answers with a parse error.
    pub async fn process_str(&self, body: &str) -> JsonRpcResponse {
        match serde_json::from_str::<Value>(body) {
            Ok(message) => self.process(message).await,
            Err(err) => JsonRpcResponse::failure(Value::Null, JsonRpcError::parse_error(err)),
        }
    }

    pub async fn process(&self, message: Value) -> JsonRpcResponse {
        let context = ToolExecutionContext::new(self.config.session_id.clone());
        self.process_with_context(message, &context).await
    }

    pub async fn process_with_context(
        &self,
        message: Value,
        context: &ToolExecutionContext,
    ) -> JsonRpcResponse {
        match validate_envelope(message) {
            Ok(request) => self.process_request(request, context).await,
            Err((id, error)) => JsonRpcResponse::failure(id, error),
        }
    }

    pub async fn process_request(
        &self,
        request: JsonRpcRequest,
        context: &ToolExecutionContext,
    ) -> JsonRpcResponse {
        let JsonRpcRequest {
            id, method, params, ..
        } = request;

        let outcome = match method.as_str() {
            METHOD_TOOLS_LIST => self.list_tools(),
            METHOD_TOOLS_CALL => self.call_tool(params, context).await,
            other => Err(JsonRpcError::method_not_found(other)),
        };

        match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::failure(id, error),
        }
    }

    fn list_tools(&self) -> Result<Value, JsonRpcError> {
        let result = ToolsListResult {
            tools: self.registry.list(),
        };

        serde_json::to_value(result).map_err(|err| {
            JsonRpcError::new(crate::INTERNAL_ERROR, format!("internal error: {err}"))
        })
    }

    async fn call_tool(
        &self,
        params: Option<Value>,
        context: &ToolExecutionContext,
    ) -> Result<Value, JsonRpcError> {
        let params = params
            .ok_or_else(|| JsonRpcError::invalid_params("tools/call requires params"))?;
        let ToolCallParams { name, arguments } =
            serde_json::from_value(params).map_err(JsonRpcError::invalid_params)?;

        let tool = self
            .registry
            .get(&name)
            .ok_or_else(|| JsonRpcError::tool_not_found(&name))?;

        let arguments = match arguments {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };

        if let Err(violations) = validate_arguments(tool.schema(), &arguments) {
            self.hooks.on_arguments_rejected(&name, context, &violations);
            return Err(JsonRpcError::invalid_arguments(&name, &violations));
        }

        self.hooks.on_execution_start(&name, context);
        let started = Instant::now();

        match self.invoke(tool.as_ref(), arguments, context).await {
            Ok(content) => {
                self.hooks
                    .on_execution_success(&name, context, started.elapsed());
                Ok(json!({ "content": content }))
            }
            Err(error) => {
                let error = error.with_tool_name(name.as_str());
                self.hooks
                    .on_execution_failure(&name, context, &error, started.elapsed());
                Err(failure_response(&name, &error))
            }
        }
    }

    async fn invoke(
        &self,
        tool: &dyn Tool,
        arguments: Value,
        context: &ToolExecutionContext,
    ) -> Result<Value, ToolError> {
        let execution = tool.invoke(arguments, context);

        let Some(limit) = self.config.tool_timeout else {
            return execution.await;
        };

        match select(execution, Delay::new(limit)).await {
            Either::Left((outcome, _)) => outcome,
            Either::Right(_) => Err(ToolError::timeout(format!(
                "tool did not finish within {} ms",
                limit.as_millis()
            ))),
        }
    }
}

impl std::fmt::Debug for RpcDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcDispatcher")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish()
    }
}

/// Arguments the tool itself could not accept are the caller's fault; every
/// other failure is reported without its cause.
fn failure_response(name: &str, error: &ToolError) -> JsonRpcError {
    match error.kind {
        ToolErrorKind::InvalidArguments => JsonRpcError::invalid_arguments(
            name,
            &[SchemaViolation::new("", error.message.as_str())],
        ),
        _ => JsonRpcError::tool_execution_failed(name),
    }
}

/// Checks the envelope shape, echoing whatever id can be recovered.
fn validate_envelope(message: Value) -> Result<JsonRpcRequest, (Value, JsonRpcError)> {
    let Value::Object(mut fields) = message else {
        return Err((
            Value::Null,
            JsonRpcError::invalid_request("expected a JSON object"),
        ));
    };

    let id = fields.remove("id").unwrap_or(Value::Null);

    match fields.get("jsonrpc").and_then(Value::as_str) {
        Some(JSONRPC_VERSION) => {}
        _ => {
            return Err((
                id,
                JsonRpcError::invalid_request("jsonrpc must be \"2.0\""),
            ));
        }
    }

    let method = match fields.remove("method") {
        Some(Value::String(method)) => method,
        _ => {
            return Err((
                id,
                JsonRpcError::invalid_request("method must be a string"),
            ));
        }
    };

    let params = match fields.remove("params") {
        None | Some(Value::Null) => None,
        Some(params @ (Value::Object(_) | Value::Array(_))) => Some(params),
        Some(_) => {
            return Err((
                id,
                JsonRpcError::invalid_request("params must be an object or array"),
            ));
        }
    };

    Ok(JsonRpcRequest::new(id, method, params))
}
