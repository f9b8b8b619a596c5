use crate::config::ToolConfig;
use crate::error::{Result, ToolError};
use crate::tools::{UI_GRADE_TOOL, extract_string_arg, normalize_args, run_engine};
use crate::traits::Tool;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::time::Duration;

const DEFAULT_PASS_THRESHOLD: u64 = 90;
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const PLACEHOLDER_SCORE: u8 = 92;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiGrade {
    pub url: String,
    pub score: u8,
    pub issues: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GraderReport {
    score: f64,
    #[serde(default)]
    issues: Vec<String>,
}

/// Grades a rendered page against a style guide.
///
/// The actual browser work is done by an external grader command that
/// prints `{"score": .., "issues": [..]}`. Without one, every page gets the
/// placeholder grade.
pub struct UiGradeTool {
    grader: Option<String>,
    pass_threshold: u8,
    timeout: Duration,
}

impl UiGradeTool {
    pub fn new() -> Self {
        Self {
            grader: None,
            pass_threshold: DEFAULT_PASS_THRESHOLD as u8,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn from_config(config: &ToolConfig) -> Self {
        let threshold = config
            .u64_or("pass_threshold", DEFAULT_PASS_THRESHOLD)
            .min(100) as u8;
        let timeout = Duration::from_secs(config.u64_or("timeout_secs", DEFAULT_TIMEOUT_SECS));

        let mut tool = Self::new()
            .with_pass_threshold(threshold)
            .with_timeout(timeout);
        if let Some(grader) = config.get_str("grader_command") {
            tool = tool.with_grader(grader);
        }
        tool
    }

    pub fn with_grader(mut self, command: impl Into<String>) -> Self {
        self.grader = Some(command.into());
        self
    }

    pub fn with_pass_threshold(mut self, threshold: u8) -> Self {
        self.pass_threshold = threshold;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn grade(&self, url: &str, style_guide: &Map<String, Value>) -> Result<UiGrade> {
        let Some(grader) = &self.grader else {
            return Ok(self.finalize(url, PLACEHOLDER_SCORE as f64, Vec::new()));
        };

        let mut words = grader.split_whitespace();
        let program = words.next().ok_or_else(|| ToolError::BackendUnavailable {
            tool: UI_GRADE_TOOL.to_string(),
            message: "empty grader command".to_string(),
        })?;
        let style_guide = Value::Object(style_guide.clone()).to_string();
        let args: Vec<&str> = words.chain([url, style_guide.as_str()]).collect();

        let output = run_engine(UI_GRADE_TOOL, program, args, self.timeout).await?;
        let report: GraderReport =
            serde_json::from_slice(&output.stdout).map_err(|e| ToolError::MalformedOutput {
                tool: UI_GRADE_TOOL.to_string(),
                message: e.to_string(),
            })?;

        Ok(self.finalize(url, report.score, report.issues))
    }

    /// Clamps the score and enforces the pass/fail contract on `issues`.
    fn finalize(&self, url: &str, score: f64, mut issues: Vec<String>) -> UiGrade {
        let score = if score.is_finite() {
            score.round().clamp(0.0, 100.0) as u8
        } else {
            0
        };

        if score >= self.pass_threshold {
            issues.clear();
        } else if issues.is_empty() {
            issues.push(format!(
                "score {} is below the passing threshold of {}",
                score, self.pass_threshold
            ));
        }

        UiGrade {
            url: url.to_string(),
            score,
            issues,
        }
    }
}

impl Default for UiGradeTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for UiGradeTool {
    fn name(&self) -> &str {
        UI_GRADE_TOOL
    }

    fn description(&self) -> &str {
        "Grade a web page's UI against a style guide and list issues"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "Page to grade"
                },
                "style_guide": {
                    "type": "object",
                    "description": "Style rules to grade against (optional)"
                }
            },
            "required": ["url"]
        })
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let args = normalize_args(UI_GRADE_TOOL, args, "url")?;
        let url = extract_string_arg(UI_GRADE_TOOL, &args, "url")?;
        let style_guide = match args.get("style_guide") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(guide)) => guide.clone(),
            Some(other) => {
                return Err(ToolError::invalid_input(
                    UI_GRADE_TOOL,
                    format!("'style_guide' must be an object, got {}", other),
                ));
            }
        };

        let grade = self.grade(&url, &style_guide).await?;
        tracing::debug!(url = %grade.url, score = grade.score, "UI graded");

        serde_json::to_value(grade).map_err(|e| ToolError::Other(e.into()))
    }
}
