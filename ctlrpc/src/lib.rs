//! JSON-RPC 2.0 surface for a tool registry: envelopes, dispatcher, and
//! client transports.
//!
//! ```rust
//! use ctlrpc::prelude::*;
//! use serde_json::json;
//!
//! let error = JsonRpcError::tool_not_found("missing");
//! assert_eq!(error.code, METHOD_NOT_FOUND);
//! assert_eq!(error.data, Some(json!({"name": "missing"})));
//! ```

mod dispatcher;
mod error;
#[cfg(feature = "http")]
mod http;
mod message;
mod transport;

pub mod prelude {
    pub use crate::{
        DispatcherConfig, JsonRpcError, JsonRpcRequest, JsonRpcResponse, METHOD_NOT_FOUND,
        RpcClient, RpcDispatcher, RpcError, RpcErrorKind, RpcTransport,
    };
}

pub use dispatcher::{DispatcherConfig, RpcDispatcher};
pub use error::{RpcError, RpcErrorKind};
#[cfg(feature = "http")]
pub use http::HttpRpcTransport;
pub use message::{
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, JSONRPC_VERSION, JsonRpcError,
    JsonRpcRequest, JsonRpcResponse, METHOD_NOT_FOUND, METHOD_TOOLS_CALL, METHOD_TOOLS_LIST,
    PARSE_ERROR, TOOL_EXECUTION_FAILED, ToolCallParams, ToolCallResult, ToolsListResult,
};
pub use transport::{RpcClient, RpcFuture, RpcTransport};
