use futures::future::BoxFuture;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use hive_core::error::Result;
use hive_core::traits::Tool;
use hive_core::types::ToolContext;

const DEFAULT_BASE_URL: &str = "https://api.firecrawl.dev/v1";
pub const API_KEY_ENV: &str = "FIRECRAWL_API_KEY";

/// Scrapes a page through the Firecrawl API.
///
/// Problems (no URL, no API key, HTTP or API errors) come back in the
/// result's `error` field instead of failing the tool call.
pub struct FirecrawlTool {
    api_key: Option<String>,
    base_url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FirecrawlInput {
    #[serde(default)]
    url: String,
    #[serde(default = "default_format")]
    format: String,
    #[serde(default = "default_only_main_content")]
    only_main_content: bool,
}

fn default_format() -> String {
    "markdown".to_string()
}

fn default_only_main_content() -> bool {
    true
}

impl FirecrawlTool {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.is_empty()),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Key taken from `FIRECRAWL_API_KEY`.
    pub fn from_env() -> Self {
        let tool = Self::new(std::env::var(API_KEY_ENV).ok());
        if tool.api_key.is_none() {
            debug!("{} not set, firecrawl calls will report an error", API_KEY_ENV);
        }
        tool
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn scrape(&self, params: FirecrawlInput) -> serde_json::Value {
        if params.url.is_empty() {
            return failure("", "No URL provided");
        }
        let Some(api_key) = &self.api_key else {
            return failure(
                &params.url,
                &format!("{} environment variable is required", API_KEY_ENV),
            );
        };

        debug!(url = %params.url, format = %params.format, "Scraping through Firecrawl");
        let response = reqwest::Client::new()
            .post(format!("{}/scrape", self.base_url))
            .bearer_auth(api_key)
            .json(&json!({
                "url": params.url,
                "formats": [params.format],
                "onlyMainContent": params.only_main_content,
            }))
            .send()
            .await;

        let body = match response {
            Ok(resp) if resp.status().is_success() => resp.json::<serde_json::Value>().await,
            Ok(resp) => {
                let status = resp.status();
                let text = resp.text().await.unwrap_or_default();
                warn!(url = %params.url, %status, "Firecrawl API error");
                return failure(
                    &params.url,
                    &format!("Firecrawl API error: {} - {}", status.as_u16(), text),
                );
            }
            Err(e) => Err(e),
        };

        match body {
            Ok(data) => extract(&params.url, &params.format, &data),
            Err(e) => failure(&params.url, &format!("Failed to scrape URL: {}", e)),
        }
    }
}

impl Tool for FirecrawlTool {
    fn name(&self) -> &str {
        "firecrawl"
    }

    fn timeout_secs(&self) -> u64 {
        60
    }

    fn description(&self) -> &str {
        "Use it to scrape and extract clean content from any website URL. Returns markdown, HTML, or plain text with metadata."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "url": { "type": "string", "description": "Page to scrape" },
                "format": {
                    "type": "string",
                    "enum": ["markdown", "html", "text"],
                    "description": "Content format (default: markdown)"
                },
                "onlyMainContent": {
                    "type": "boolean",
                    "description": "Drop navigation and boilerplate (default: true)"
                }
            },
            "required": ["url"]
        })
    }

    fn execute(
        &self,
        input: serde_json::Value,
        _ctx: ToolContext,
    ) -> BoxFuture<'_, Result<serde_json::Value>> {
        Box::pin(async move {
            let params = match serde_json::from_value::<FirecrawlInput>(input) {
                Ok(p) => p,
                Err(e) => return Ok(failure("", &format!("Invalid input: {}", e))),
            };
            Ok(self.scrape(params).await)
        })
    }
}

fn failure(url: &str, error: &str) -> serde_json::Value {
    json!({ "url": url, "content": "", "error": error })
}

/// Pull the requested format out of a `/scrape` response, falling back to
/// markdown.
fn extract(url: &str, format: &str, response: &serde_json::Value) -> serde_json::Value {
    let data = &response["data"];
    let content = data[format]
        .as_str()
        .filter(|s| !s.is_empty())
        .or_else(|| data["markdown"].as_str())
        .unwrap_or_default();
    let metadata = match &data["metadata"] {
        serde_json::Value::Object(m) => serde_json::Value::Object(m.clone()),
        _ => json!({}),
    };
    json!({ "url": url, "content": content, "metadata": metadata })
}
