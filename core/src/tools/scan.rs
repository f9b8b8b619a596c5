use crate::config::ToolConfig;
use crate::error::{Result, ToolError};
use crate::tools::{
    SCAN_TOOL, extract_string_arg, extract_string_arg_opt, normalize_args, run_engine,
};
use crate::traits::Tool;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::ffi::OsString;
use std::io::Write;
use std::time::Duration;

const DEFAULT_COMMAND: &str = "semgrep";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u64>,
}

impl Finding {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: "INFO".to_string(),
            message: message.into(),
            check_id: None,
            line: None,
        }
    }

    /// Maps one entry of the engine's `results` array.
    fn from_result(result: &Value) -> Self {
        let extra = &result["extra"];
        let check_id = result["check_id"].as_str().map(str::to_string);

        Self {
            severity: extra["severity"].as_str().unwrap_or("INFO").to_string(),
            message: extra["message"]
                .as_str()
                .or(check_id.as_deref())
                .unwrap_or_default()
                .to_string(),
            line: result["start"]["line"].as_u64(),
            check_id,
        }
    }
}

/// Static-analysis scan through an external Semgrep-compatible CLI.
///
/// `command` may carry leading arguments (`"python -m semgrep"`); the tool
/// appends `--json <file>`.
pub struct ScanTool {
    command: String,
    timeout: Duration,
}

impl ScanTool {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn from_config(config: &ToolConfig) -> Self {
        Self::new(config.str_or("command", DEFAULT_COMMAND)).with_timeout(Duration::from_secs(
            config.u64_or("timeout_secs", DEFAULT_TIMEOUT_SECS),
        ))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn scan(&self, code: &str, lang: &str) -> Result<Vec<Finding>> {
        let mut source = tempfile::Builder::new()
            .prefix("mcphub-scan-")
            .suffix(&format!(".{}", lang))
            .tempfile()
            .map_err(|e| ToolError::io(std::env::temp_dir(), e))?;
        if let Err(e) = source.write_all(code.as_bytes()).and_then(|_| source.flush()) {
            return Err(ToolError::io(source.path(), e));
        }

        let mut words = self.command.split_whitespace();
        let program = words.next().unwrap_or(DEFAULT_COMMAND);
        let args = words
            .map(OsString::from)
            .chain([OsString::from("--json"), source.path().as_os_str().to_os_string()]);

        let output = match run_engine(SCAN_TOOL, program, args, self.timeout).await {
            Ok(output) => output,
            Err(e) => match e.unavailable_reason() {
                Some(reason) => {
                    tracing::info!(command = %self.command, "{}; skipping scan", reason);
                    return Ok(vec![Finding::info(format!("{}; skipping scan.", reason))]);
                }
                None => return Err(e),
            },
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() && stdout.trim().is_empty() {
            tracing::warn!(
                command = %self.command,
                status = %output.status,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "Scan engine failed without a report"
            );
        }

        parse_findings(&stdout)
    }
}

/// Parses the engine's JSON report. Empty output means no findings.
pub fn parse_findings(stdout: &str) -> Result<Vec<Finding>> {
    let stdout = stdout.trim();
    if stdout.is_empty() {
        return Ok(Vec::new());
    }

    let report: Value = serde_json::from_str(stdout).map_err(|e| ToolError::MalformedOutput {
        tool: SCAN_TOOL.to_string(),
        message: e.to_string(),
    })?;

    Ok(report["results"]
        .as_array()
        .map(|results| results.iter().map(Finding::from_result).collect())
        .unwrap_or_default())
}

#[async_trait]
impl Tool for ScanTool {
    fn name(&self) -> &str {
        SCAN_TOOL
    }

    fn description(&self) -> &str {
        "Scan a source snippet for security and quality findings"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "code": {
                    "type": "string",
                    "description": "Source code to scan"
                },
                "lang": {
                    "type": "string",
                    "description": "File extension for the language (default: 'python')"
                }
            },
            "required": ["code"]
        })
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let args = normalize_args(SCAN_TOOL, args, "code")?;
        let code = extract_string_arg(SCAN_TOOL, &args, "code")?;
        let lang = extract_string_arg_opt(&args, "lang", "python");

        let findings = self.scan(&code, &lang).await?;
        tracing::debug!(count = findings.len(), "Scan finished");

        serde_json::to_value(findings).map_err(|e| ToolError::Other(e.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn absent_engine_degrades_to_info_finding() {
        let tool = ScanTool::new("mcphub-missing-scanner");
        let result = tool.call(json!({"code": "password = 1"})).await.unwrap();

        let findings: Vec<Finding> = serde_json::from_value(result).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, "INFO");
        assert!(findings[0].message.contains("not installed"));
    }

    #[test]
    fn parses_engine_results() {
        let stdout = r#"{
            "results": [
                {
                    "check_id": "python.lang.security.hardcoded-password",
                    "path": "/tmp/x.py",
                    "start": {"line": 1, "col": 1},
                    "extra": {"severity": "WARNING", "message": "Hardcoded password"}
                },
                {"check_id": "bare.rule", "extra": {}}
            ],
            "errors": []
        }"#;

        let findings = parse_findings(stdout).unwrap();
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].severity, "WARNING");
        assert_eq!(findings[0].message, "Hardcoded password");
        assert_eq!(findings[0].line, Some(1));
        assert_eq!(findings[1].severity, "INFO");
        assert_eq!(findings[1].message, "bare.rule");
    }

    #[test]
    fn empty_output_has_no_findings() {
        assert!(parse_findings("").unwrap().is_empty());
        assert!(parse_findings("{}").unwrap().is_empty());
    }

    #[test]
    fn garbage_output_is_malformed() {
        let err = parse_findings("Traceback (most recent call last)").unwrap_err();
        assert!(matches!(err, ToolError::MalformedOutput { .. }));
    }

    #[cfg(unix)]
    fn shell_engine(tmp: &tempfile::TempDir, body: &str) -> String {
        let script = tmp.path().join("engine.sh");
        std::fs::write(&script, body).unwrap();
        format!("sh {}", script.display())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_engine_times_out() {
        let tmp = tempfile::TempDir::new().unwrap();
        let command = shell_engine(&tmp, "sleep 5\n");

        let tool = ScanTool::new(command).with_timeout(Duration::from_millis(200));
        let err = tool.call(json!({"code": "x = 1"})).await.unwrap_err();
        assert!(matches!(err, ToolError::Timeout { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn crashed_engine_without_report_has_no_findings() {
        let tmp = tempfile::TempDir::new().unwrap();
        let command = shell_engine(&tmp, "echo 'rules failed to load' >&2\nexit 2\n");

        let findings = ScanTool::new(command).scan("x = 1", "py").await.unwrap();
        assert!(findings.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn runs_configured_engine() {
        let tmp = tempfile::TempDir::new().unwrap();
        let command = shell_engine(
            &tmp,
            "echo '{\"results\": [{\"check_id\": \"r1\", \"extra\": {\"severity\": \"ERROR\", \"message\": \"bad\"}}]}'\n",
        );

        let tool = ScanTool::from_config(&ToolConfig::new().with("command", command));
        let findings = tool.scan("password = 1", "py").await.unwrap();
        assert_eq!(findings, vec![Finding {
            severity: "ERROR".into(),
            message: "bad".into(),
            check_id: Some("r1".into()),
            line: None,
        }]);
    }
}
