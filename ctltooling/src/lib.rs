//! Tool definitions, argument schemas, and the immutable tool registry.
//!
//! ```rust
//! use ctltooling::prelude::*;
//! use serde_json::json;
//!
//! let registry = ToolRegistry::builder()
//!     .tool(FunctionTool::new("think", "Think out loud", |_args, _ctx| async move {
//!         Ok(json!(null))
//!     }))
//!     .build()
//!     .expect("registry should build");
//!
//! assert_eq!(registry.list()[0].input_schema["type"], "object");
//! ```

mod args;
mod error;
mod hooks;
mod registry;
mod schema;
mod tool;
mod types;

pub mod prelude {
    pub use crate::{
        ArgumentSchema, FunctionTool, JsonSchema, RegistryError, Tool, ToolError, ToolErrorKind,
        ToolExecutionContext, ToolFuture, ToolRegistry,
    };
}

pub use args::{optional_string, parse_arguments, required_string};
pub use error::{RegistryError, ToolError, ToolErrorKind};
pub use hooks::{NoopToolRuntimeHooks, ToolRuntimeHooks};
pub use registry::{ToolRegistry, ToolRegistryBuilder};
pub use schema::{ArgumentSchema, SchemaViolation, input_schema, validate_arguments};
pub use schemars::JsonSchema;
pub use tool::{FunctionTool, Tool, ToolFuture};
pub use types::ToolExecutionContext;
