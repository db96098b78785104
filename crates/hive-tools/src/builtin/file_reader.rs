use std::path::Path;

use futures::future::BoxFuture;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use hive_core::error::Result;
use hive_core::traits::Tool;
use hive_core::types::ToolContext;

use super::resolve_path;

/// Reads `.json`, `.csv`, `.txt`, and `.md` files into structured content.
///
/// Problems with the input or the file come back as an `error` field so the
/// model can react to them.
pub struct FileReaderTool;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileReaderInput {
    #[serde(default)]
    file_path: Option<String>,
}

impl Tool for FileReaderTool {
    fn name(&self) -> &str {
        "file-reader"
    }

    fn description(&self) -> &str {
        "Use it to read and parse files (JSON, CSV, TXT, MD). Provide a file path to extract its content."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "filePath": {
                    "type": "string",
                    "description": "Absolute path, or path relative to the working directory"
                }
            },
            "required": ["filePath"]
        })
    }

    fn execute(
        &self,
        input: serde_json::Value,
        ctx: ToolContext,
    ) -> BoxFuture<'_, Result<serde_json::Value>> {
        Box::pin(async move {
            let params: FileReaderInput =
                serde_json::from_value(input).unwrap_or(FileReaderInput { file_path: None });

            let Some(file_path) = params.file_path.filter(|p| !p.is_empty()) else {
                return Ok(failure("unknown", 0, "No file path provided"));
            };

            let path = resolve_path(&file_path, &ctx.working_dir);
            let size = match tokio::fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => meta.len(),
                _ => return Ok(failure("unknown", 0, format!("File not found: {}", file_path))),
            };

            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_ascii_lowercase)
                .unwrap_or_default();
            debug!(path = %path.display(), format = %ext, "Reading file");

            let format = match ext.as_str() {
                "json" => "json",
                "csv" => "csv",
                "txt" | "md" => "text",
                _ => {
                    return Ok(failure(
                        "unsupported",
                        size,
                        format!("Unsupported file format: .{}", ext),
                    ))
                }
            };

            match read_content(&path, format).await {
                Ok(content) => Ok(json!({ "content": content, "format": format, "size": size })),
                Err(e) => Ok(failure(&ext, size, format!("Error reading file: {}", e))),
            }
        })
    }
}

async fn read_content(path: &Path, format: &str) -> std::result::Result<serde_json::Value, String> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| e.to_string())?;
    match format {
        "json" => serde_json::from_str(&text).map_err(|e| e.to_string()),
        "csv" => Ok(parse_csv(&text)),
        _ => Ok(serde_json::Value::String(text)),
    }
}

/// Header row keys every following row. Missing cells become empty strings.
fn parse_csv(text: &str) -> serde_json::Value {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let Some(header) = lines.next() else {
        return json!([]);
    };
    let headers: Vec<&str> = header.split(',').map(str::trim).collect();

    let rows = lines
        .map(|line| {
            let cells: Vec<&str> = line.split(',').map(str::trim).collect();
            let row: serde_json::Map<String, serde_json::Value> = headers
                .iter()
                .enumerate()
                .map(|(i, h)| (h.to_string(), json!(cells.get(i).copied().unwrap_or(""))))
                .collect();
            serde_json::Value::Object(row)
        })
        .collect();
    serde_json::Value::Array(rows)
}

fn failure(format: &str, size: u64, error: impl Into<String>) -> serde_json::Value {
    json!({ "content": "", "format": format, "size": size, "error": error.into() })
}
