use crate::config::Config;
use crate::error::{Result, ToolError};
use crate::tools::create_default_tools;
use crate::traits::{Tool, ToolSpec};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct Entries {
    by_name: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

/// Name-keyed dispatch table for tools.
///
/// Registering a name that already exists replaces the previous tool and
/// keeps its position in [`ToolRegistry::list_names`].
pub struct ToolRegistry {
    entries: Mutex<Entries>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Entries::default()),
        }
    }

    /// Registry populated with the five standard tools at default settings.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register_defaults();
        registry
    }

    fn entries(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self, tool: Arc<dyn Tool>) -> Option<Arc<dyn Tool>> {
        let name = tool.name().to_string();
        let mut entries = self.entries();

        let previous = entries.by_name.insert(name.clone(), tool);
        if previous.is_some() {
            tracing::debug!(tool = %name, "Replaced registered tool");
        } else {
            entries.order.push(name);
        }
        previous
    }

    pub fn register_defaults(&self) {
        self.register_from_config(&Config::default());
    }

    pub fn register_from_config(&self, config: &Config) {
        for tool in create_default_tools(config) {
            self.register(tool);
        }
        tracing::debug!(count = self.len(), "Registered standard tools");
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Tool>> {
        self.entries()
            .by_name
            .get(name)
            .cloned()
            .ok_or_else(|| ToolError::NotFound {
                name: name.to_string(),
            })
    }

    pub async fn call(&self, name: &str, args: Value) -> Result<Value> {
        let tool = self.resolve(name)?;
        tracing::debug!(tool = name, "Dispatching tool call");
        tool.call(args).await
    }

    pub fn list_names(&self) -> Vec<String> {
        self.entries().order.clone()
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        let entries = self.entries();
        entries
            .order
            .iter()
            .filter_map(|name| entries.by_name.get(name))
            .map(|tool| tool.spec())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries().by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolConfig;
    use crate::tools::{MEMORY_TOOL, SCAN_TOOL};
    use async_trait::async_trait;
    use serde_json::json;
    use tempfile::TempDir;

    struct UppercaseTool;

    #[async_trait]
    impl Tool for UppercaseTool {
        fn name(&self) -> &str {
            "uppercase"
        }

        fn description(&self) -> &str {
            "Uppercase the input"
        }

        fn parameters_schema(&self) -> Value {
            json!({"type": "object"})
        }

        async fn call(&self, args: Value) -> Result<Value> {
            Ok(json!(args["text"].as_str().unwrap_or_default().to_uppercase()))
        }
    }

    struct NamedTool(&'static str);

    impl Tool for NamedTool {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "Registered only to be resolved"
        }

        fn parameters_schema(&self) -> Value {
            json!({"type": "object"})
        }
    }

    #[test]
    fn resolve_returns_registered_instance() {
        let registry = ToolRegistry::new();
        let a: Arc<dyn Tool> = Arc::new(NamedTool("a"));
        let b: Arc<dyn Tool> = Arc::new(NamedTool("b"));
        registry.register(a.clone());
        registry.register(b.clone());

        assert!(Arc::ptr_eq(&registry.resolve("a").unwrap(), &a));
        assert!(Arc::ptr_eq(&registry.resolve("b").unwrap(), &b));
    }

    #[test]
    fn unknown_name_is_not_found() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(NamedTool("a")));

        let err = registry.resolve("missing").err().unwrap();
        assert!(matches!(err, ToolError::NotFound { ref name } if name == "missing"));
        assert!(!registry.contains("missing"));
    }

    #[test]
    fn reregistration_replaces_in_place() {
        let registry = ToolRegistry::new();
        let first: Arc<dyn Tool> = Arc::new(NamedTool("dup"));
        let second: Arc<dyn Tool> = Arc::new(NamedTool("dup"));
        registry.register(first.clone());
        registry.register(Arc::new(NamedTool("other")));

        let replaced = registry.register(second.clone()).unwrap();

        assert!(Arc::ptr_eq(&replaced, &first));
        assert!(Arc::ptr_eq(&registry.resolve("dup").unwrap(), &second));
        assert_eq!(registry.list_names(), vec!["dup", "other"]);
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn call_forwards_arguments() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(UppercaseTool));

        let result = registry
            .call("uppercase", json!({"text": "registry"}))
            .await
            .unwrap();
        assert_eq!(result, json!("REGISTRY"));

        let err = registry.call("reverse", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound { .. }));
    }

    #[tokio::test]
    async fn call_on_bare_contract_is_unimplemented() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(NamedTool("bare")));

        let err = registry.call("bare", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::Unimplemented { .. }));
    }

    #[test]
    fn defaults_register_five_tools_in_order() {
        let registry = ToolRegistry::with_defaults();
        assert_eq!(
            registry.list_names(),
            vec!["REF", "SEMGREP", "PIECES", "EXASEARCH", "PLAYWRIGHT"]
        );

        let specs = registry.specs();
        assert_eq!(specs.len(), 5);
        assert!(specs.iter().all(|s| s.parameters_schema["type"] == "object"));
    }

    #[tokio::test]
    async fn scan_without_engine_degrades() {
        let config = Config::default().with_tool(
            SCAN_TOOL,
            ToolConfig::new().with("command", "mcphub-no-such-semgrep"),
        );
        let registry = ToolRegistry::new();
        registry.register_from_config(&config);

        let result = registry
            .call(SCAN_TOOL, json!({"code": "password = 1"}))
            .await
            .unwrap();

        let findings = result.as_array().unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0]["severity"], "INFO");
        assert!(findings[0]["message"].as_str().unwrap().contains("not installed"));
    }

    #[tokio::test]
    async fn memory_round_trip_through_registry() {
        let tmp = TempDir::new().unwrap();
        let store_path = tmp.path().join("pieces.json");
        let config = Config::default().with_tool(
            MEMORY_TOOL,
            ToolConfig::new().with("store_path", store_path.to_string_lossy().to_string()),
        );

        let registry = ToolRegistry::new();
        registry.register_from_config(&config);
        registry
            .call(
                MEMORY_TOOL,
                json!({"action": "add_event", "title": "First run", "payload": {"result": "success"}}),
            )
            .await
            .unwrap();

        // A second registry over the same file sees the persisted event.
        let fresh = ToolRegistry::new();
        fresh.register_from_config(&config);
        let found = fresh
            .call(MEMORY_TOOL, json!({"action": "query", "keywords": "success"}))
            .await
            .unwrap();
        assert_eq!(found.as_array().unwrap().len(), 1);
        assert_eq!(found[0]["title"], "First run");
    }
}
