//! Transport seam between a tool-calling client and a dispatcher.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use ctlrpc::{RpcClient, RpcDispatcher};
//! use ctltooling::{FunctionTool, ToolRegistry};
//! use serde_json::json;
//!
//! # tokio_block(async {
//! let registry = ToolRegistry::builder()
//!     .tool(FunctionTool::new("get_cart", "Current cart", |_args, _ctx| async move {
//!         Ok(json!({"items": []}))
//!     }))
//!     .build()
//!     .expect("registry should build");
//! let client = RpcClient::new(Arc::new(RpcDispatcher::new(Arc::new(registry))));
//!
//! let tools = client.list_tools().await.expect("list should succeed");
//! assert_eq!(tools[0].name, "get_cart");
//! let cart = client.call_tool("get_cart", json!({})).await.expect("call should succeed");
//! assert_eq!(cart, json!({"items": []}));
//! # });
//! # fn tokio_block<F: std::future::Future>(future: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().expect("runtime").block_on(future)
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use ctlcommon::BoxFuture;
use ctlprovider::ToolDefinition;
use serde_json::{Value, json};

use crate::{
    JsonRpcRequest, JsonRpcResponse, METHOD_TOOLS_CALL, METHOD_TOOLS_LIST, RpcDispatcher,
    RpcError, ToolCallResult, ToolsListResult,
};

pub type RpcFuture<'a, T> = BoxFuture<'a, T>;

pub trait RpcTransport: Send + Sync {
    fn send<'a>(
        &'a self,
        request: JsonRpcRequest,
    ) -> RpcFuture<'a, Result<JsonRpcResponse, RpcError>>;
}

impl RpcTransport for RpcDispatcher {
    fn send<'a>(
        &'a self,
        request: JsonRpcRequest,
    ) -> RpcFuture<'a, Result<JsonRpcResponse, RpcError>> {
        Box::pin(async move {
            let message = serde_json::to_value(request)
                .map_err(|err| RpcError::transport(err.to_string()))?;
            Ok(self.process(message).await)
        })
    }
}

/// Typed `tools/list` and `tools/call` over any transport.
#[derive(Clone)]
pub struct RpcClient {
    transport: Arc<dyn RpcTransport>,
    next_id: Arc<AtomicU64>,
}

impl RpcClient {
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self {
            transport,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    fn next_request(&self, method: &str, params: Option<Value>) -> JsonRpcRequest {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        JsonRpcRequest::new(json!(id), method, params)
    }

    pub async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, RpcError> {
        let request = self.next_request(method, params);
        let response = self.transport.send(request).await?;
        response.into_result().map_err(RpcError::remote)
    }

    pub async fn list_tools(&self) -> Result<Vec<ToolDefinition>, RpcError> {
        let result = self.request(METHOD_TOOLS_LIST, None).await?;
        let listed: ToolsListResult = serde_json::from_value(result)
            .map_err(|err| RpcError::invalid_response(format!("tools/list result: {err}")))?;
        Ok(listed.tools)
    }

    /// Returns the `content` of a successful call.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, RpcError> {
        let params = json!({ "name": name, "arguments": arguments });
        let result = self.request(METHOD_TOOLS_CALL, Some(params)).await?;
        let called: ToolCallResult = serde_json::from_value(result)
            .map_err(|err| RpcError::invalid_response(format!("tools/call result: {err}")))?;
        Ok(called.content)
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .finish()
    }
}
