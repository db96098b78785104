use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

use futures::future::BoxFuture;
use serde_json::json;

use hive_core::config::ModelConfig;
use hive_core::descriptor::AgentDescriptor;
use hive_core::error::{HiveError, Result};
use hive_core::traits::{GenerationClient, GenerationContext, LlmClient, StateView, StepRunner, Tool};
use hive_core::types::*;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// One request seen by [`MockLlmClient`].
#[derive(Debug, Clone)]
pub struct RecordedChat {
    pub config: ModelConfig,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolDefinition>,
}

/// Chat client replaying a scripted queue of replies.
#[derive(Default)]
pub struct MockLlmClient {
    script: Mutex<VecDeque<Result<ChatResponse>>>,
    calls: Mutex<Vec<RecordedChat>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_text(&self, text: &str) {
        self.push(Ok(reply(vec![ContentBlock::Text { text: text.into() }], StopReason::EndTurn)));
    }

    pub fn push_tool_use(&self, id: &str, name: &str, input: serde_json::Value) {
        self.push(Ok(reply(
            vec![ContentBlock::ToolUse {
                id: id.into(),
                name: name.into(),
                input,
            }],
            StopReason::ToolUse,
        )));
    }

    pub fn push_error(&self, error: HiveError) {
        self.push(Err(error));
    }

    fn push(&self, item: Result<ChatResponse>) {
        lock(&self.script).push_back(item);
    }

    pub fn calls(&self) -> Vec<RecordedChat> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }
}

fn reply(content: Vec<ContentBlock>, stop_reason: StopReason) -> ChatResponse {
    ChatResponse {
        message: ChatMessage {
            role: Role::Assistant,
            content,
        },
        stop_reason,
        input_tokens: 0,
        output_tokens: 0,
    }
}

impl LlmClient for MockLlmClient {
    fn chat(
        &self,
        config: &ModelConfig,
        messages: Vec<ChatMessage>,
        tools: &[ToolDefinition],
    ) -> BoxFuture<'_, Result<ChatResponse>> {
        lock(&self.calls).push(RecordedChat {
            config: config.clone(),
            messages,
            tools: tools.to_vec(),
        });
        let next = lock(&self.script)
            .pop_front()
            .unwrap_or_else(|| Err(HiveError::LlmParse("mock script exhausted".into())));
        Box::pin(async move { next })
    }
}

/// One request seen by [`MockGenerationClient`].
#[derive(Debug, Clone)]
pub struct RecordedGeneration {
    pub request: GenerationRequest,
    pub tools: Vec<String>,
}

/// Generation capability returning a fixed answer, or a fixed failure.
pub struct MockGenerationClient {
    outcome: std::result::Result<GenerationResponse, String>,
    requests: Mutex<Vec<RecordedGeneration>>,
}

impl MockGenerationClient {
    pub fn answering(content: &str) -> Self {
        Self {
            outcome: Ok(GenerationResponse {
                content: content.into(),
                tool_calls: Vec::new(),
            }),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with `HiveError::LlmRequest(message)`.
    pub fn failing(message: &str) -> Self {
        Self {
            outcome: Err(message.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<RecordedGeneration> {
        lock(&self.requests).clone()
    }
}

impl GenerationClient for MockGenerationClient {
    fn generate(
        &self,
        request: GenerationRequest,
        context: GenerationContext,
    ) -> BoxFuture<'_, Result<GenerationResponse>> {
        lock(&self.requests).push(RecordedGeneration {
            request,
            tools: context.tools.iter().map(|t| t.name().to_string()).collect(),
        });
        let outcome = self.outcome.clone().map_err(HiveError::LlmRequest);
        Box::pin(async move { outcome })
    }
}

/// One step execution seen by [`RecordingRunner`].
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerCall {
    pub agent: String,
    /// Dependency results that were available in shared state.
    pub dependency_results: Vec<(String, serde_json::Value)>,
}

/// Step runner that succeeds unless the agent is marked to fail, recording
/// every invocation.
#[derive(Default)]
pub struct RecordingRunner {
    failing: HashSet<String>,
    calls: Mutex<Vec<RunnerCall>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(mut self, agent: &str) -> Self {
        self.failing.insert(agent.to_string());
        self
    }

    pub fn calls(&self) -> Vec<RunnerCall> {
        lock(&self.calls).clone()
    }

    pub fn invoked(&self) -> Vec<String> {
        lock(&self.calls).iter().map(|c| c.agent.clone()).collect()
    }
}

impl StepRunner for RecordingRunner {
    fn run<'a>(
        &'a self,
        agent: &'a AgentDescriptor,
        state: &'a dyn StateView,
    ) -> BoxFuture<'a, Result<serde_json::Value>> {
        let dependency_results = agent
            .depends_on
            .iter()
            .filter_map(|d| state.get(d).map(|v| (d.clone(), v.clone())))
            .collect();
        lock(&self.calls).push(RunnerCall {
            agent: agent.name.clone(),
            dependency_results,
        });

        let outcome = if self.failing.contains(&agent.name) {
            Err(HiveError::LlmRequest(format!("scripted failure for {}", agent.name)))
        } else {
            Ok(json!({ "content": format!("{} done", agent.name), "toolCalls": [] }))
        };
        Box::pin(async move { outcome })
    }
}

/// Tool that returns its input under `echo`.
pub struct EchoTool;

impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echo the input back"
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({"type": "object"})
    }

    fn execute(
        &self,
        input: serde_json::Value,
        _ctx: ToolContext,
    ) -> BoxFuture<'_, Result<serde_json::Value>> {
        Box::pin(async move { Ok(json!({ "echo": input })) })
    }
}
