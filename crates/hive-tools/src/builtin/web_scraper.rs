use std::sync::OnceLock;

use futures::future::BoxFuture;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use hive_core::error::{HiveError, Result};
use hive_core::traits::Tool;
use hive_core::types::ToolContext;

const DEFAULT_MAX_LENGTH: usize = 20_000;

/// Fetches a page and returns its title and visible text.
pub struct WebScraperTool;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebScraperInput {
    url: String,
    #[serde(default)]
    max_length: Option<usize>,
}

impl Tool for WebScraperTool {
    fn name(&self) -> &str {
        "web-scraper"
    }

    fn timeout_secs(&self) -> u64 {
        60
    }

    fn description(&self) -> &str {
        "Scrape a web page. Returns the HTTP status, page title, and text content with markup removed."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "Page to fetch"
                },
                "maxLength": {
                    "type": "integer",
                    "description": "Maximum characters of text to return (default: 20000)"
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
            let params: WebScraperInput = serde_json::from_value(input)
                .map_err(|e| HiveError::ToolValidation(e.to_string()))?;
            let max_length = params.max_length.unwrap_or(DEFAULT_MAX_LENGTH);

            debug!(url = %params.url, "Scraping page");

            let client = reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .user_agent(concat!("hive/", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(|e| execution_error(format!("Failed to create HTTP client: {}", e)))?;

            let resp = client
                .get(&params.url)
                .send()
                .await
                .map_err(|e| execution_error(format!("Request failed: {}", e)))?;

            let status = resp.status().as_u16();
            let body = resp
                .text()
                .await
                .map_err(|e| execution_error(format!("Failed to read response body: {}", e)))?;

            Ok(scrape(&params.url, status, &body, max_length))
        })
    }
}

fn execution_error(message: String) -> HiveError {
    HiveError::ToolExecution {
        tool: "web-scraper".to_string(),
        message,
    }
}

fn scrape(url: &str, status: u16, html: &str, max_length: usize) -> serde_json::Value {
    let mut result = json!({
        "url": url,
        "status": status,
        "text": truncate(&strip_html(html), max_length),
    });
    if let Some(title) = extract_title(html) {
        result["title"] = json!(title);
    }
    result
}

struct Patterns {
    title: Regex,
    blocks: Regex,
    tags: Regex,
    blank_lines: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        title: Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("title pattern"),
        blocks: Regex::new(r"(?is)<(script|style|noscript)[^>]*>.*?</(script|style|noscript)>")
            .expect("block pattern"),
        tags: Regex::new(r"<[^>]+>").expect("tag pattern"),
        blank_lines: Regex::new(r"\n\s*\n(\s*\n)+").expect("blank line pattern"),
    })
}

fn extract_title(html: &str) -> Option<String> {
    let caps = patterns().title.captures(html)?;
    let title = decode_entities(caps[1].trim());
    (!title.is_empty()).then_some(title)
}

fn strip_html(html: &str) -> String {
    let p = patterns();
    let text = p.blocks.replace_all(html, "");
    let text = p.tags.replace_all(&text, "");
    let text = decode_entities(&text);
    let text = p.blank_lines.replace_all(&text, "\n\n");
    text.trim().to_string()
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}\n\n[truncated at {} chars]", &text[..idx], max_chars),
        None => text.to_string(),
    }
}
