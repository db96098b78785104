use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::json;
use tracing::{debug, info, warn};

use hive_core::config::AppConfig;
use hive_core::descriptor::Provider;
use hive_core::error::{HiveError, Result};
use hive_core::traits::{GenerationClient, GenerationContext, LlmClient};
use hive_core::types::*;

use crate::create_client;
use crate::retry::RetryingClient;

/// Generation capability backed by chat clients.
///
/// Sends the composed request, runs any tool calls the model asks for, feeds
/// the results back, and repeats until the model answers without tools or
/// the round limit is reached.
pub struct ChatGenerator {
    clients: HashMap<Provider, Arc<dyn LlmClient>>,
    config: AppConfig,
}

impl ChatGenerator {
    /// One retrying client per provider, built from `config`.
    pub fn new(config: AppConfig) -> Self {
        let clients = Provider::ALL
            .into_iter()
            .map(|p| {
                let client: Arc<dyn LlmClient> =
                    Arc::new(RetryingClient::new(create_client(p), config.retry.clone()));
                (p, client)
            })
            .collect();
        Self { clients, config }
    }

    /// Route every provider to the same client.
    pub fn with_client(client: Arc<dyn LlmClient>, config: AppConfig) -> Self {
        let clients = Provider::ALL
            .into_iter()
            .map(|p| (p, client.clone()))
            .collect();
        Self { clients, config }
    }

    async fn run(
        &self,
        request: GenerationRequest,
        context: GenerationContext,
    ) -> Result<GenerationResponse> {
        let client = self
            .clients
            .get(&request.spec.provider)
            .cloned()
            .ok_or_else(|| HiveError::UnsupportedProvider(request.spec.provider.to_string()))?;
        let model = self.config.model_config(&request.spec);
        let definitions = context.definitions();
        let max_rounds = self.config.generation.max_tool_rounds;

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system {
            messages.push(ChatMessage::system(system));
        }
        messages.push(ChatMessage::user(request.prompt));

        let mut tool_calls = Vec::new();
        let mut rounds = 0;

        loop {
            let resp = client.chat(&model, messages.clone(), &definitions).await?;
            debug!(
                model = %model.model_id,
                input_tokens = resp.input_tokens,
                output_tokens = resp.output_tokens,
                "Chat turn complete"
            );

            let uses: Vec<(String, String, serde_json::Value)> = resp
                .message
                .tool_uses()
                .into_iter()
                .map(|(id, name, input)| (id.to_string(), name.to_string(), input.clone()))
                .collect();
            let content = resp.message.text();

            if uses.is_empty() {
                return Ok(GenerationResponse {
                    content,
                    tool_calls,
                });
            }
            if rounds >= max_rounds {
                warn!(max_rounds, "Tool round limit reached, returning partial answer");
                return Ok(GenerationResponse {
                    content,
                    tool_calls,
                });
            }
            rounds += 1;

            messages.push(resp.message);
            let mut results = Vec::with_capacity(uses.len());
            for (id, name, input) in uses {
                info!(tool = %name, "Running tool");
                let outcome = context.execute(&name, input.clone()).await;
                let (text, is_error, recorded) = match outcome {
                    Ok(value) => (value.to_string(), false, value),
                    Err(e) => {
                        warn!(tool = %name, error = %e, "Tool call failed");
                        (e.to_string(), true, json!({ "error": e.to_string() }))
                    }
                };
                tool_calls.push(ToolCallRecord {
                    name,
                    input,
                    result: recorded,
                });
                results.push(ContentBlock::ToolResult {
                    tool_use_id: id,
                    content: text,
                    is_error,
                });
            }
            messages.push(ChatMessage::tool_results(results));
        }
    }
}

impl GenerationClient for ChatGenerator {
    fn generate(
        &self,
        request: GenerationRequest,
        context: GenerationContext,
    ) -> BoxFuture<'_, Result<GenerationResponse>> {
        Box::pin(self.run(request, context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hive_core::descriptor::GenerationSpec;
    use hive_test_utils::{EchoTool, MockLlmClient};

    fn request() -> GenerationRequest {
        GenerationRequest {
            system: Some("You are terse.".into()),
            prompt: "Summarize".into(),
            spec: GenerationSpec::new(Provider::Mistral).with_temperature(0.1),
        }
    }

    #[tokio::test]
    async fn plain_answer_has_no_tool_calls() {
        let mock = Arc::new(MockLlmClient::new());
        mock.push_text("All done.");
        let gen = ChatGenerator::with_client(mock.clone(), AppConfig::default());

        let resp = gen
            .generate(request(), GenerationContext::default())
            .await
            .unwrap();
        assert_eq!(resp.content, "All done.");
        assert!(resp.tool_calls.is_empty());

        let calls = mock.calls();
        assert_eq!(calls[0].config.model_id, "mistral-small-latest");
        assert_eq!(calls[0].config.temperature, Some(0.1));
        assert_eq!(calls[0].messages[0].role, Role::System);
        assert_eq!(calls[0].messages[1].text(), "Summarize");
    }

    #[tokio::test]
    async fn runs_requested_tools_and_records_them() {
        let mock = Arc::new(MockLlmClient::new());
        mock.push_tool_use("t1", "echo", json!({"msg": "ping"}));
        mock.push_tool_use("t2", "missing-tool", json!({}));
        mock.push_text("Used the tools.");

        let gen = ChatGenerator::with_client(mock.clone(), AppConfig::default());
        let context = GenerationContext::new(vec![Arc::new(EchoTool)]);
        let resp = gen.generate(request(), context).await.unwrap();

        assert_eq!(resp.content, "Used the tools.");
        assert_eq!(resp.tool_calls.len(), 2);
        assert_eq!(resp.tool_calls[0].name, "echo");
        assert_eq!(resp.tool_calls[0].result, json!({"echo": {"msg": "ping"}}));
        assert!(resp.tool_calls[1].result["error"]
            .as_str()
            .unwrap()
            .contains("Tool not found"));

        let calls = mock.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].tools.len(), 1);
        let last = calls[2].messages.last().unwrap();
        assert!(matches!(
            &last.content[0],
            ContentBlock::ToolResult { is_error: true, .. }
        ));
    }

    #[tokio::test]
    async fn stops_after_round_limit() {
        let mock = Arc::new(MockLlmClient::new());
        for i in 0..5 {
            mock.push_tool_use(&format!("t{i}"), "echo", json!({}));
        }
        let mut config = AppConfig::default();
        config.generation.max_tool_rounds = 2;

        let gen = ChatGenerator::with_client(mock.clone(), config);
        let context = GenerationContext::new(vec![Arc::new(EchoTool)]);
        let resp = gen.generate(request(), context).await.unwrap();

        assert_eq!(resp.tool_calls.len(), 2);
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn client_errors_propagate() {
        let mock = Arc::new(MockLlmClient::new());
        mock.push_error(HiveError::LlmRequest("HTTP 401 Unauthorized".into()));
        let gen = ChatGenerator::with_client(mock, AppConfig::default());

        let err = gen
            .generate(request(), GenerationContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, HiveError::LlmRequest(_)));
    }
}
