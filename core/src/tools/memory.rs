use crate::config::ToolConfig;
use crate::error::{Result, ToolError};
use crate::memory::{DEFAULT_STORE_PATH, EventStore};
use crate::tools::{
    MEMORY_TOOL, extract_string_arg, extract_string_arg_opt, normalize_args, run_blocking,
};
use crate::traits::Tool;
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::path::Path;

pub struct MemoryTool {
    store: EventStore,
}

impl MemoryTool {
    pub fn new(store_path: impl AsRef<Path>) -> Self {
        Self {
            store: EventStore::open(store_path.as_ref()),
        }
    }

    pub fn from_config(config: &ToolConfig) -> Self {
        Self::new(config.path_or("store_path", DEFAULT_STORE_PATH))
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }
}

#[async_trait]
impl Tool for MemoryTool {
    fn name(&self) -> &str {
        MEMORY_TOOL
    }

    fn description(&self) -> &str {
        "Store developer memory events and search them by keywords"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["add_event", "query"],
                    "description": "'add_event' to store an event, 'query' to search"
                },
                "title": {
                    "type": "string",
                    "description": "Event title (add_event)"
                },
                "payload": {
                    "type": "object",
                    "description": "Structured event data (add_event, default: {})"
                },
                "keywords": {
                    "type": "string",
                    "description": "Whitespace-separated terms that must all appear (query)"
                }
            },
            "required": ["action"]
        })
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let args = normalize_args(MEMORY_TOOL, args, "action")?;
        let action = extract_string_arg(MEMORY_TOOL, &args, "action")?;

        match action.as_str() {
            "add_event" => {
                let title = extract_string_arg(MEMORY_TOOL, &args, "title")?;
                let payload = match args.get("payload") {
                    None | Some(Value::Null) => Map::new(),
                    Some(Value::Object(payload)) => payload.clone(),
                    Some(other) => {
                        return Err(ToolError::invalid_input(
                            MEMORY_TOOL,
                            format!("'payload' must be an object, got {}", other),
                        ));
                    }
                };

                let store = self.store.clone();
                let id = run_blocking(move || store.add_event(&title, payload)).await?;
                Ok(json!({ "id": id }))
            }
            "query" => {
                let keywords = extract_string_arg_opt(&args, "keywords", "");
                let store = self.store.clone();
                let events = run_blocking(move || store.query(&keywords)).await?;
                serde_json::to_value(events).map_err(|e| ToolError::Other(e.into()))
            }
            other => Err(ToolError::invalid_input(
                MEMORY_TOOL,
                format!("Unknown action '{}'", other),
            )),
        }
    }
}
