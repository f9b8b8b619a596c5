use crate::config::ToolConfig;
use crate::error::{Result, ToolError};
use crate::tools::{SEARCH_TOOL, extract_string_arg, extract_u64_arg_opt, normalize_args};
use crate::traits::Tool;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;

const DEFAULT_ENDPOINT: &str = "https://api.exa.ai/search";
const DEFAULT_NUM_RESULTS: u64 = 5;
const DEFAULT_RECENCY_DAYS: u64 = 30;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const SNIPPET_CHARS: usize = 300;
const API_KEY_ENV_VARS: &[&str] = &["EXA_API_KEY", "MCPHUB_EXA_API_KEY"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExaRequest<'a> {
    query: &'a str,
    num_results: u64,
    start_published_date: String,
    contents: ExaContents,
}

#[derive(Debug, Serialize)]
struct ExaContents {
    text: ExaText,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExaText {
    max_characters: usize,
}

#[derive(Debug, Deserialize)]
struct ExaResponse {
    #[serde(default)]
    results: Vec<ExaResult>,
}

#[derive(Debug, Deserialize)]
struct ExaResult {
    #[serde(default)]
    title: Option<String>,
    url: String,
    #[serde(default)]
    text: Option<String>,
}

impl From<ExaResult> for SearchHit {
    fn from(result: ExaResult) -> Self {
        let snippet = result
            .text
            .unwrap_or_default()
            .chars()
            .take(SNIPPET_CHARS)
            .collect();
        Self {
            title: result.title.unwrap_or_else(|| result.url.clone()),
            url: result.url,
            snippet,
        }
    }
}

/// Freshness-ranked web search. Without an API key it answers offline
/// with a single placeholder hit.
pub struct SearchTool {
    client: Result<reqwest::Client, String>,
    api_key: Option<String>,
    endpoint: String,
    num_results: u64,
}

impl SearchTool {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_timeout(api_key, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    fn with_timeout(api_key: Option<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                tracing::warn!(error = %e, "Failed to build search HTTP client");
                e.to_string()
            });

        Self {
            client,
            api_key,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            num_results: DEFAULT_NUM_RESULTS,
        }
    }

    pub fn from_config(config: &ToolConfig) -> Self {
        let api_key = resolve_api_key(API_KEY_ENV_VARS, config.get_str("api_key"));
        let timeout = Duration::from_secs(config.u64_or("timeout_secs", DEFAULT_TIMEOUT_SECS));

        let mut tool = Self::with_timeout(api_key, timeout)
            .with_num_results(config.u64_or("num_results", DEFAULT_NUM_RESULTS));
        if let Some(endpoint) = config.get_str("endpoint") {
            tool = tool.with_endpoint(endpoint);
        }
        tool
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_num_results(mut self, num_results: u64) -> Self {
        self.num_results = num_results;
        self
    }

    pub fn is_live(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn search(&self, query: &str, recency_days: u64) -> Result<Vec<SearchHit>> {
        let Some(api_key) = &self.api_key else {
            tracing::debug!(query, "No search API key configured; returning placeholder");
            return Ok(vec![placeholder_hit(query)]);
        };

        let unavailable = |message: String| ToolError::BackendUnavailable {
            tool: SEARCH_TOOL.to_string(),
            message,
        };
        let client = self
            .client
            .as_ref()
            .map_err(|e| unavailable(format!("HTTP client unavailable: {}", e)))?;

        let request = ExaRequest {
            query,
            num_results: self.num_results,
            start_published_date: start_published_date(Utc::now(), recency_days),
            contents: ExaContents {
                text: ExaText {
                    max_characters: SNIPPET_CHARS,
                },
            },
        };

        let response = client
            .post(&self.endpoint)
            .header("x-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(unavailable(format!("Search API error {}: {}", status, error_text)));
        }

        let body: ExaResponse = response
            .json()
            .await
            .map_err(|e| ToolError::MalformedOutput {
                tool: SEARCH_TOOL.to_string(),
                message: e.to_string(),
            })?;

        let hits: Vec<SearchHit> = body.results.into_iter().map(SearchHit::from).collect();
        tracing::debug!(query, count = hits.len(), "Search finished");
        Ok(hits)
    }
}

fn resolve_api_key(env_vars: &[&str], config_key: Option<&str>) -> Option<String> {
    env_vars
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|key| !key.is_empty()))
        .or_else(|| config_key.filter(|key| !key.is_empty()).map(str::to_string))
}

fn start_published_date(now: DateTime<Utc>, recency_days: u64) -> String {
    let days = i64::try_from(recency_days).unwrap_or(i64::MAX);
    let start = ChronoDuration::try_days(days)
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    start.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn placeholder_hit(query: &str) -> SearchHit {
    let id = uuid::Uuid::new_v4().simple().to_string();
    SearchHit {
        title: format!("Simulated result for '{}'", query),
        url: format!("https://example.com/{}", &id[..8]),
        snippet: "Offline placeholder; configure an API key for live results.".to_string(),
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        SEARCH_TOOL
    }

    fn description(&self) -> &str {
        "Search the web for recent developer-focused results"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query"
                },
                "recency_days": {
                    "type": "integer",
                    "description": "Only include results published within this many days (default: 30)"
                }
            },
            "required": ["query"]
        })
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let args = normalize_args(SEARCH_TOOL, args, "query")?;
        let query = extract_string_arg(SEARCH_TOOL, &args, "query")?;
        let recency_days = extract_u64_arg_opt(&args, "recency_days", DEFAULT_RECENCY_DAYS);

        let hits = self.search(&query, recency_days).await?;
        serde_json::to_value(hits).map_err(|e| ToolError::Other(e.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn offline_mode_returns_placeholder() {
        let tool = SearchTool::new(None);
        assert!(!tool.is_live());

        let result = tool.call(json!("agentic RAG CrewAI")).await.unwrap();
        let hits: Vec<SearchHit> = serde_json::from_value(result).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Simulated result for 'agentic RAG CrewAI'");
        assert!(hits[0].url.starts_with("https://example.com/"));
        assert_eq!(hits[0].url.len(), "https://example.com/".len() + 8);
    }

    #[tokio::test]
    async fn query_is_required() {
        let err = SearchTool::new(None)
            .call(json!({"recency_days": 7}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput { .. }));
    }

    #[test]
    fn recency_window_is_rfc3339() {
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 12, 0, 0).unwrap();
        assert_eq!(start_published_date(now, 30), "2024-03-01T12:00:00.000Z");
        assert_eq!(start_published_date(now, 0), "2024-03-31T12:00:00.000Z");
    }

    #[test]
    fn huge_recency_window_saturates() {
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 12, 0, 0).unwrap();
        assert!(!start_published_date(now, u64::MAX).is_empty());
    }

    #[test]
    fn maps_api_results() {
        let body: ExaResponse = serde_json::from_value(json!({
            "results": [
                {"title": "Tokio tutorial", "url": "https://tokio.rs", "text": "a".repeat(500)},
                {"url": "https://untitled.example"}
            ]
        }))
        .unwrap();

        let hits: Vec<SearchHit> = body.results.into_iter().map(SearchHit::from).collect();
        assert_eq!(hits[0].title, "Tokio tutorial");
        assert_eq!(hits[0].snippet.len(), SNIPPET_CHARS);
        assert_eq!(hits[1].title, "https://untitled.example");
        assert!(hits[1].snippet.is_empty());
    }

    #[test]
    fn request_uses_camel_case() {
        let request = ExaRequest {
            query: "rust",
            num_results: 3,
            start_published_date: "2024-01-01T00:00:00.000Z".into(),
            contents: ExaContents {
                text: ExaText { max_characters: 10 },
            },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["numResults"], 3);
        assert_eq!(value["startPublishedDate"], "2024-01-01T00:00:00.000Z");
        assert_eq!(value["contents"]["text"]["maxCharacters"], 10);
    }

    #[tokio::test]
    async fn broken_client_is_backend_unavailable() {
        let mut tool = SearchTool::new(Some("key".into()));
        tool.client = Err("TLS backend cannot be initialized".into());

        let err = tool.search("rust", 7).await.unwrap_err();
        assert!(
            matches!(err, ToolError::BackendUnavailable { ref message, .. } if message.contains("TLS backend"))
        );
    }

    #[test]
    fn config_key_used_when_env_missing() {
        let key = resolve_api_key(&["MCPHUB_TEST_UNSET_SEARCH_KEY"], Some("from-config"));
        assert_eq!(key.as_deref(), Some("from-config"));
        assert!(resolve_api_key(&["MCPHUB_TEST_UNSET_SEARCH_KEY"], Some("")).is_none());
    }
}
