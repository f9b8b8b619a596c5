use crate::config::ToolConfig;
use crate::error::{Result, ToolError};
use crate::tools::{DOCS_TOOL, extract_string_arg, normalize_args, run_blocking};
use crate::traits::Tool;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const DEFAULT_DOCS_ROOT: &str = "./docs";
const DEFAULT_MAX_CHARS: u64 = 800;

/// Looks up markdown documentation for a symbol under a local docs tree.
pub struct DocsTool {
    docs_root: PathBuf,
    max_chars: usize,
}

impl DocsTool {
    pub fn new(docs_root: impl AsRef<Path>) -> Self {
        Self {
            docs_root: docs_root.as_ref().to_path_buf(),
            max_chars: DEFAULT_MAX_CHARS as usize,
        }
    }

    pub fn from_config(config: &ToolConfig) -> Self {
        Self::new(config.path_or("docs_root", DEFAULT_DOCS_ROOT))
            .with_max_chars(config.u64_or("max_chars", DEFAULT_MAX_CHARS) as usize)
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }
}

/// First `<symbol>*.md` file under `root`, in sorted path order.
fn find_doc(root: &Path, symbol: &str) -> Option<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .find(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(symbol) && name.ends_with(".md"))
        })
        .map(|entry| entry.into_path())
}

/// Reads the first matching doc, truncated to `max_chars` characters.
fn read_snippet(
    root: &Path,
    symbol: &str,
    max_chars: usize,
) -> Result<Option<(PathBuf, String)>> {
    let Some(path) = find_doc(root, symbol) else {
        return Ok(None);
    };
    let content = std::fs::read_to_string(&path).map_err(|e| ToolError::io(&path, e))?;
    let snippet = content.chars().take(max_chars).collect();
    Ok(Some((path, snippet)))
}

pub fn not_found_message(symbol: &str) -> String {
    format!("No docs found for `{}`", symbol)
}

#[async_trait]
impl Tool for DocsTool {
    fn name(&self) -> &str {
        DOCS_TOOL
    }

    fn description(&self) -> &str {
        "Return a documentation snippet for a symbol from the local docs tree"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "symbol": {
                    "type": "string",
                    "description": "Symbol to look up, e.g. 'openai.ChatCompletion.create'"
                },
                "lang": {
                    "type": "string",
                    "description": "Language of the symbol (default: 'python')"
                }
            },
            "required": ["symbol"]
        })
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let args = normalize_args(DOCS_TOOL, args, "symbol")?;
        let symbol = extract_string_arg(DOCS_TOOL, &args, "symbol")?;

        let root = self.docs_root.clone();
        let max_chars = self.max_chars;
        let lookup = symbol.clone();
        let found = run_blocking(move || read_snippet(&root, &lookup, max_chars)).await?;

        let Some((path, snippet)) = found else {
            tracing::debug!(symbol = %symbol, root = %self.docs_root.display(), "No docs found");
            return Ok(Value::String(not_found_message(&symbol)));
        };

        tracing::debug!(symbol = %symbol, path = %path.display(), "Docs found");
        Ok(Value::String(snippet))
    }
}
