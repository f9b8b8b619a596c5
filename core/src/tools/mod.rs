use crate::config::Config;
use crate::error::{Result, ToolError};
use crate::traits::Tool;
use serde_json::{Map, Value};
use std::ffi::OsStr;
use std::process::Output;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

pub mod docs;
pub mod memory;
pub mod scan;
pub mod search;
pub mod ui_grade;

pub use docs::DocsTool;
pub use memory::MemoryTool;
pub use scan::{Finding, ScanTool};
pub use search::{SearchHit, SearchTool};
pub use ui_grade::{UiGrade, UiGradeTool};

pub const DOCS_TOOL: &str = "REF";
pub const SCAN_TOOL: &str = "SEMGREP";
pub const MEMORY_TOOL: &str = "PIECES";
pub const SEARCH_TOOL: &str = "EXASEARCH";
pub const UI_GRADE_TOOL: &str = "PLAYWRIGHT";

/// One instance of each standard tool, built from its `[tools.<NAME>]` table.
pub fn create_default_tools(config: &Config) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(DocsTool::from_config(&config.tool(DOCS_TOOL))),
        Arc::new(ScanTool::from_config(&config.tool(SCAN_TOOL))),
        Arc::new(MemoryTool::from_config(&config.tool(MEMORY_TOOL))),
        Arc::new(SearchTool::from_config(&config.tool(SEARCH_TOOL))),
        Arc::new(UiGradeTool::from_config(&config.tool(UI_GRADE_TOOL))),
    ]
}

/// Turns a bare string into `{first_param: string}` so tools can be called
/// positionally. Anything other than an object or a string is rejected.
pub fn normalize_args(tool: &str, args: Value, first_param: &str) -> Result<Map<String, Value>> {
    match args {
        Value::Object(map) => Ok(map),
        Value::String(s) => {
            let mut map = Map::new();
            map.insert(first_param.to_string(), Value::String(s));
            Ok(map)
        }
        Value::Null => Ok(Map::new()),
        other => Err(ToolError::invalid_input(
            tool,
            format!("expected an argument object, got {other}"),
        )),
    }
}

pub fn extract_string_arg(tool: &str, args: &Map<String, Value>, key: &str) -> Result<String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| ToolError::invalid_input(tool, format!("Missing '{}' parameter", key)))
}

pub fn extract_string_arg_opt(args: &Map<String, Value>, key: &str, default: &str) -> String {
    args.get(key)
        .and_then(|v| v.as_str())
        .unwrap_or(default)
        .to_string()
}

pub fn extract_u64_arg_opt(args: &Map<String, Value>, key: &str, default: u64) -> u64 {
    args.get(key).and_then(|v| v.as_u64()).unwrap_or(default)
}

/// Runs filesystem work (store locks, docs walks) off the async workers.
pub(crate) async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ToolError::Other(e.into()))?
}

/// Runs an external engine to completion, killing it if `timeout` elapses.
///
/// A binary that cannot be started maps to `BackendUnavailable`; callers
/// decide whether that degrades or propagates.
pub(crate) async fn run_engine<I, S>(
    tool: &str,
    program: &str,
    args: I,
    timeout: Duration,
) -> Result<Output>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let child = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output();

    match tokio::time::timeout(timeout, child).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ToolError::BackendUnavailable {
                tool: tool.to_string(),
                message: format!("{} CLI not installed", program),
            })
        }
        Ok(Err(e)) => Err(ToolError::BackendUnavailable {
            tool: tool.to_string(),
            message: format!("{} could not be started: {}", program, e),
        }),
        Err(_) => {
            tracing::warn!(tool, program, seconds = timeout.as_secs(), "Engine timed out");
            Err(ToolError::Timeout {
                tool: tool.to_string(),
                seconds: timeout.as_secs(),
            })
        }
    }
}
