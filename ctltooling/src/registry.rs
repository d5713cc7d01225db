//! Immutable, insertion-ordered tool registry.
//!
//! ```rust
//! use ctltooling::{FunctionTool, RegistryError, ToolRegistry};
//! use serde_json::json;
//!
//! let think = FunctionTool::new("think", "Reason privately", |_args, _ctx| async move {
//!     Ok(json!(null))
//! });
//! let registry = ToolRegistry::builder().tool(think.clone()).build().expect("unique names");
//! assert_eq!(registry.names(), vec!["think"]);
//!
//! let duplicate = ToolRegistry::builder().tool(think.clone()).tool(think).build();
//! assert!(matches!(duplicate, Err(RegistryError::DuplicateToolName { .. })));
//! ```

use std::sync::Arc;

use ctlcommon::Registry;
use ctlprovider::ToolDefinition;

use crate::{RegistryError, Tool, ToolError};

#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Registry<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Fails on the first name collision; nothing can be added afterwards.
    pub fn new(tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Result<Self, RegistryError> {
        let mut registry = Registry::new();

        for (second_index, tool) in tools.into_iter().enumerate() {
            let name = tool.name().to_string();
            if let Err(first_index) = registry.try_insert(name.clone(), tool) {
                return Err(RegistryError::DuplicateToolName {
                    name,
                    first_index,
                    second_index,
                });
            }
        }

        Ok(Self { tools: registry })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder::default()
    }

    /// Descriptors in registration order, as served by `tools/list`.
    pub fn list(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|tool| tool.definition()).collect()
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Tool>, ToolError> {
        self.get(name).ok_or_else(|| {
            ToolError::not_found(format!("tool not found: {name}")).with_tool_name(name)
        })
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

#[derive(Default)]
pub struct ToolRegistryBuilder {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistryBuilder {
    pub fn tool<T>(mut self, tool: T) -> Self
    where
        T: Tool + 'static,
    {
        self.tools.push(Arc::new(tool));
        self
    }

    pub fn shared(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn extend(mut self, tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn build(self) -> Result<ToolRegistry, RegistryError> {
        ToolRegistry::new(self.tools)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{FunctionTool, ToolErrorKind};

    fn named(name: &str) -> FunctionTool {
        FunctionTool::new(name, format!("{name} tool"), |_args, _ctx| async move {
            Ok(json!(null))
        })
    }

    #[test]
    fn list_follows_registration_order() {
        let registry = ToolRegistry::builder()
            .tool(named("zeta"))
            .tool(named("alpha"))
            .tool(named("mid"))
            .build()
            .expect("names are unique");

        let listed = registry
            .list()
            .into_iter()
            .map(|definition| definition.name)
            .collect::<Vec<_>>();
        assert_eq!(listed, vec!["zeta", "alpha", "mid"]);
        assert_eq!(registry.len(), 3);
        assert!(registry.contains("alpha"));
    }

    #[test]
    fn duplicate_names_fail_construction_with_both_positions() {
        let error = ToolRegistry::builder()
            .tool(named("think"))
            .tool(named("get_cart"))
            .tool(named("think"))
            .build()
            .expect_err("duplicate should fail");

        assert_eq!(
            error,
            RegistryError::DuplicateToolName {
                name: "think".to_string(),
                first_index: 0,
                second_index: 2,
            }
        );
    }

    #[test]
    fn resolve_reports_not_found_with_tool_name() {
        let registry = ToolRegistry::empty();
        assert!(registry.is_empty());

        let error = match registry.resolve("missing") {
            Ok(_) => panic!("resolve should fail"),
            Err(error) => error,
        };
        assert_eq!(error.kind, ToolErrorKind::NotFound);
        assert_eq!(error.tool_name.as_deref(), Some("missing"));
        assert_eq!(error.message, "tool not found: missing");
    }
}
