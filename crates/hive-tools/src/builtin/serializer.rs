use futures::future::BoxFuture;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use hive_core::error::{HiveError, Result};
use hive_core::traits::Tool;
use hive_core::types::ToolContext;

use super::resolve_path;

/// Writes an array of objects to a CSV file.
pub struct SerializerTool;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SerializerInput {
    data: Vec<serde_json::Value>,
    output_path: String,
}

impl Tool for SerializerTool {
    fn name(&self) -> &str {
        "serializer"
    }

    fn description(&self) -> &str {
        "Serialize an array of objects to a CSV file. The header comes from the first object's keys."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "data": {
                    "type": "array",
                    "items": { "type": "object" },
                    "description": "Rows to write"
                },
                "outputPath": {
                    "type": "string",
                    "description": "Destination CSV file"
                }
            },
            "required": ["data", "outputPath"]
        })
    }

    fn execute(
        &self,
        input: serde_json::Value,
        ctx: ToolContext,
    ) -> BoxFuture<'_, Result<serde_json::Value>> {
        Box::pin(async move {
            let params: SerializerInput = serde_json::from_value(input)
                .map_err(|e| HiveError::ToolValidation(e.to_string()))?;

            let path = resolve_path(&params.output_path, &ctx.working_dir);
            debug!(path = %path.display(), rows = params.data.len(), "Writing CSV");

            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, to_csv(&params.data))
                .await
                .map_err(|e| HiveError::ToolExecution {
                    tool: "serializer".to_string(),
                    message: format!("{}: {}", path.display(), e),
                })?;

            Ok(json!({ "saved": params.output_path, "rows": params.data.len() }))
        })
    }
}

fn to_csv(rows: &[serde_json::Value]) -> String {
    let Some(keys) = rows.first().and_then(|r| r.as_object()).map(|o| {
        o.keys().cloned().collect::<Vec<_>>()
    }) else {
        return String::new();
    };

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(keys.iter().map(|k| escape(k)).collect::<Vec<_>>().join(","));
    for row in rows {
        let cells: Vec<String> = keys
            .iter()
            .map(|k| match row.get(k) {
                None | Some(serde_json::Value::Null) => String::new(),
                Some(serde_json::Value::String(s)) => escape(s),
                Some(other) => escape(&other.to_string()),
            })
            .collect();
        lines.push(cells.join(","));
    }
    lines.join("\n")
}

fn escape(cell: &str) -> String {
    if cell.contains([',', '"', '\n']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}
