use std::sync::Arc;

use futures::future::BoxFuture;

use crate::config::ModelConfig;
use crate::descriptor::AgentDescriptor;
use crate::error::{HiveError, Result};
use crate::types::*;

/// LLM client: one complete chat exchange per call.
pub trait LlmClient: Send + Sync + 'static {
    /// Send a chat request and receive the full assistant reply.
    fn chat(
        &self,
        config: &ModelConfig,
        messages: Vec<ChatMessage>,
        tools: &[ToolDefinition],
    ) -> BoxFuture<'_, Result<ChatResponse>>;
}

/// A capability an agent can invoke during generation.
pub trait Tool: Send + Sync + 'static {
    /// Tool name (used in descriptors and LLM tool calls).
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// JSON Schema for tool input.
    fn input_schema(&self) -> serde_json::Value;

    /// Execute the tool. Input and output are opaque structured values.
    fn execute(
        &self,
        input: serde_json::Value,
        ctx: ToolContext,
    ) -> BoxFuture<'_, Result<serde_json::Value>>;

    /// Timeout in seconds for this tool.
    fn timeout_secs(&self) -> u64 {
        30
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// What a generation backend may use while answering a request.
#[derive(Clone, Default)]
pub struct GenerationContext {
    pub tools: Vec<Arc<dyn Tool>>,
    pub tool_ctx: ToolContext,
}

impl GenerationContext {
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Self {
        Self {
            tools,
            tool_ctx: ToolContext::default(),
        }
    }

    pub fn tool(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    /// Run a tool by name under its own timeout.
    pub async fn execute(&self, name: &str, input: serde_json::Value) -> Result<serde_json::Value> {
        let tool = self
            .tool(name)
            .ok_or_else(|| HiveError::ToolNotFound(name.to_string()))?;
        let timeout = std::time::Duration::from_secs(tool.timeout_secs());

        match tokio::time::timeout(timeout, tool.execute(input, self.tool_ctx.clone())).await {
            Ok(result) => result,
            Err(_) => Err(HiveError::ToolTimeout {
                tool: name.to_string(),
                timeout_secs: tool.timeout_secs(),
            }),
        }
    }
}

impl std::fmt::Debug for GenerationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationContext")
            .field(
                "tools",
                &self.tools.iter().map(|t| t.name()).collect::<Vec<_>>(),
            )
            .field("tool_ctx", &self.tool_ctx)
            .finish()
    }
}

/// Generation capability. Owns authentication, retries and tool round trips.
pub trait GenerationClient: Send + Sync + 'static {
    fn generate(
        &self,
        request: GenerationRequest,
        context: GenerationContext,
    ) -> BoxFuture<'_, Result<GenerationResponse>>;
}

/// Read access to results of previously completed units.
pub trait StateView: Send + Sync {
    fn get(&self, name: &str) -> Option<&serde_json::Value>;
}

/// Executes one unit: composition, generation, tool calls, artifact persistence.
pub trait StepRunner: Send + Sync {
    fn run<'a>(
        &'a self,
        agent: &'a AgentDescriptor,
        state: &'a dyn StateView,
    ) -> BoxFuture<'a, Result<serde_json::Value>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct SlowTool;

    impl Tool for SlowTool {
        fn name(&self) -> &str {
            "slow"
        }

        fn description(&self) -> &str {
            "never finishes in time"
        }

        fn input_schema(&self) -> serde_json::Value {
            json!({"type": "object"})
        }

        fn timeout_secs(&self) -> u64 {
            1
        }

        fn execute(
            &self,
            _input: serde_json::Value,
            _ctx: ToolContext,
        ) -> BoxFuture<'_, Result<serde_json::Value>> {
            Box::pin(async {
                tokio::time::sleep(std::time::Duration::from_secs(10)).await;
                Ok(json!(null))
            })
        }
    }

    #[test]
    fn tools_run_in_process_working_dir() {
        let context = GenerationContext::new(Vec::new());
        assert_eq!(context.tool_ctx.working_dir, std::env::current_dir().unwrap());
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error() {
        let err = GenerationContext::default()
            .execute("missing", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, HiveError::ToolNotFound(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_tool_times_out() {
        let context = GenerationContext::new(vec![Arc::new(SlowTool)]);
        assert_eq!(context.definitions()[0].name, "slow");

        let err = context.execute("slow", json!({})).await.unwrap_err();
        assert!(matches!(err, HiveError::ToolTimeout { timeout_secs: 1, .. }));
    }
}
