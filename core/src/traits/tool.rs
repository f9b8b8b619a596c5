use crate::error::{Result, ToolError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters_schema: Value,
}

/// A pluggable backend reachable by name through the registry.
///
/// `args` is a JSON object of named parameters; the result shape is
/// specific to each tool. Implementors that leave `call` at its default
/// fail every invocation with [`ToolError::Unimplemented`].
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameters_schema(&self) -> Value;

    async fn call(&self, _args: Value) -> Result<Value> {
        Err(ToolError::Unimplemented {
            tool: self.name().to_string(),
        })
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters_schema: self.parameters_schema(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct BareTool;

    impl Tool for BareTool {
        fn name(&self) -> &str {
            "BARE"
        }

        fn description(&self) -> &str {
            "Declares itself but never implements call"
        }

        fn parameters_schema(&self) -> Value {
            json!({ "type": "object" })
        }
    }

    #[tokio::test]
    async fn default_call_is_unimplemented() {
        let err = BareTool.call(json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::Unimplemented { ref tool } if tool == "BARE"));
    }

    #[test]
    fn spec_mirrors_tool() {
        let spec = BareTool.spec();
        assert_eq!(spec.name, "BARE");
        assert_eq!(spec.parameters_schema, json!({ "type": "object" }));
    }
}
