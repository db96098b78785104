//! Agent descriptors: the validated, immutable description of one unit.
//!
//! Descriptors are produced either from a parsed [`Value`] tree
//! ([`AgentDescriptor::from_value`]) or programmatically through
//! [`DescriptorBuilder`]. Both paths run the same checks and report every
//! violated field at once.

use std::fmt;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

use crate::error::ValidationErrors;
use crate::value::{Mapping, Value};

/// Generation backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Mistral,
    Claude,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::OpenAi, Provider::Mistral, Provider::Claude];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "openai" => Some(Provider::OpenAi),
            "mistral" => Some(Provider::Mistral),
            "claude" => Some(Provider::Claude),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Mistral => "mistral",
            Provider::Claude => "claude",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which backend to call and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSpec {
    pub provider: Provider,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

impl GenerationSpec {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            model: None,
            temperature: None,
            max_tokens: None,
            top_p: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    fn check(&self, errors: &mut ValidationErrors) {
        check_sampling(self.temperature, self.max_tokens, self.top_p, errors);
    }
}

/// Optional prompt templates overriding the composed defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

/// What the pipeline does after this unit fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnError {
    #[default]
    Stop,
    Continue,
}

impl OnError {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "stop" => Some(OnError::Stop),
            "continue" => Some(OnError::Continue),
            _ => None,
        }
    }
}

/// A validated agent descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personality: Option<String>,
    pub goals: Vec<String>,
    pub tasks: Vec<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    pub llm: GenerationSpec,
    #[serde(default)]
    pub prompts: PromptOverrides,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_result: Option<String>,
    #[serde(default)]
    pub on_error: OnError,
}

impl AgentDescriptor {
    /// Start building a descriptor programmatically.
    pub fn builder(name: impl Into<String>) -> DescriptorBuilder {
        DescriptorBuilder::new(name)
    }

    /// Validate a parsed tree against the descriptor schema.
    ///
    /// Type errors and semantic errors are collected together; the result is
    /// either a descriptor or the complete list of violations.
    pub fn from_value(value: &Value) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let map = match value.as_map() {
            Some(m) => m,
            None => {
                errors.push(
                    "",
                    format!("Expected a mapping at the top level, received {}", value.kind()),
                );
                return Err(errors);
            }
        };

        let mut builder = DescriptorBuilder::new("");
        let mut name_seen = false;
        if let Some(name) = field_string(map, "name", &mut errors) {
            builder.name = name;
            name_seen = true;
        } else if !map.contains_key("name") || map.get("name").is_some_and(Value::is_null) {
            errors.push("name", "Agent name is required");
        }

        builder.description = field_string(map, "description", &mut errors);
        builder.personality = field_string(map, "personality", &mut errors);
        builder.goals = field_string_list(map, "goals", &mut errors).unwrap_or_default();
        builder.tasks = field_string_list(map, "tasks", &mut errors).unwrap_or_default();
        builder.tools = field_string_list(map, "tools", &mut errors).unwrap_or_default();
        builder.output_result = field_string(map, "output_result", &mut errors);

        builder.depends_on = match present(map, "depends_on") {
            None => Vec::new(),
            Some(Value::Str(s)) => vec![s.clone()],
            Some(Value::Seq(_)) => field_string_list(map, "depends_on", &mut errors).unwrap_or_default(),
            Some(other) => {
                errors.push(
                    "depends_on",
                    format!("Expected string or sequence of strings, received {}", other.kind()),
                );
                Vec::new()
            }
        };

        builder.llm = parse_llm(map, &mut errors);
        builder.prompts = parse_prompts(map, &mut errors);

        builder.on_error = match present(map, "on_error") {
            None => OnError::Stop,
            Some(Value::Str(s)) => OnError::parse(s).unwrap_or_else(|| {
                errors.push(
                    "on_error",
                    format!("Invalid enum value. Expected 'stop' | 'continue', received '{}'", s),
                );
                OnError::Stop
            }),
            Some(other) => {
                errors.push("on_error", format!("Expected string, received {}", other.kind()));
                OnError::Stop
            }
        };

        // Missing-field errors for goals/tasks are already reported by the
        // type pass; the semantic pass would only repeat them.
        let goals_missing = errors.has_prefix("goals");
        let tasks_missing = errors.has_prefix("tasks");
        builder.check_into(&mut errors, name_seen, !goals_missing, !tasks_missing);

        if errors.is_empty() {
            Ok(builder.finish())
        } else {
            Err(errors)
        }
    }

    /// File name of the artifact written for this unit.
    pub fn artifact_file_name(&self) -> String {
        self.output_result
            .clone()
            .unwrap_or_else(|| format!("{}.json", self.name))
    }

    pub fn continues_on_error(&self) -> bool {
        self.on_error == OnError::Continue
    }
}

/// Builder for [`AgentDescriptor`]; `build` validates.
#[derive(Debug, Clone)]
pub struct DescriptorBuilder {
    name: String,
    description: Option<String>,
    personality: Option<String>,
    goals: Vec<String>,
    tasks: Vec<String>,
    depends_on: Vec<String>,
    llm: Option<GenerationSpec>,
    prompts: PromptOverrides,
    tools: Vec<String>,
    output_result: Option<String>,
    on_error: OnError,
}

impl DescriptorBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            personality: None,
            goals: vec![],
            tasks: vec![],
            depends_on: vec![],
            llm: None,
            prompts: PromptOverrides::default(),
            tools: vec![],
            output_result: None,
            on_error: OnError::Stop,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn personality(mut self, personality: impl Into<String>) -> Self {
        self.personality = Some(personality.into());
        self
    }

    pub fn goal(mut self, goal: impl Into<String>) -> Self {
        self.goals.push(goal.into());
        self
    }

    pub fn task(mut self, task: impl Into<String>) -> Self {
        self.tasks.push(task.into());
        self
    }

    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.depends_on.push(name.into());
        self
    }

    pub fn llm(mut self, spec: GenerationSpec) -> Self {
        self.llm = Some(spec);
        self
    }

    pub fn provider(self, provider: Provider) -> Self {
        self.llm(GenerationSpec::new(provider))
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompts.system = Some(prompt.into());
        self
    }

    pub fn user_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompts.user = Some(prompt.into());
        self
    }

    pub fn tool(mut self, tool: impl Into<String>) -> Self {
        self.tools.push(tool.into());
        self
    }

    pub fn output_result(mut self, file: impl Into<String>) -> Self {
        self.output_result = Some(file.into());
        self
    }

    pub fn on_error(mut self, policy: OnError) -> Self {
        self.on_error = policy;
        self
    }

    /// Validate and produce the descriptor.
    pub fn build(self) -> Result<AgentDescriptor, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        self.check_into(&mut errors, true, true, true);
        if errors.is_empty() {
            Ok(self.finish())
        } else {
            Err(errors)
        }
    }

    fn check_into(
        &self,
        errors: &mut ValidationErrors,
        check_name: bool,
        check_goals: bool,
        check_tasks: bool,
    ) {
        if check_name && self.name.trim().is_empty() {
            errors.push("name", "Agent name is required");
        }
        if check_goals && self.goals.is_empty() {
            errors.push("goals", "At least one goal is required");
        }
        if check_tasks && self.tasks.is_empty() {
            errors.push("tasks", "At least one task is required");
        }
        match &self.llm {
            Some(spec) => spec.check(errors),
            None if !errors.has_prefix("llm") => {
                errors.push("llm", "Required");
            }
            None => {}
        }
        if let Some(file) = &self.output_result {
            if !is_plain_relative(file) {
                errors.push(
                    "output_result",
                    "Must be a relative path inside the output directory",
                );
            }
        }
    }

    fn finish(self) -> AgentDescriptor {
        let mut tools: Vec<String> = Vec::with_capacity(self.tools.len());
        for tool in self.tools {
            if !tools.contains(&tool) {
                tools.push(tool);
            }
        }
        AgentDescriptor {
            name: self.name,
            description: self.description,
            personality: self.personality,
            goals: self.goals,
            tasks: self.tasks,
            depends_on: self.depends_on,
            // check_into guarantees presence before finish is reached
            llm: self.llm.unwrap_or_else(|| GenerationSpec::new(Provider::OpenAi)),
            prompts: self.prompts,
            tools,
            output_result: self.output_result,
            on_error: self.on_error,
        }
    }
}

fn check_sampling(
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    top_p: Option<f32>,
    errors: &mut ValidationErrors,
) {
    if let Some(t) = temperature {
        if !(0.0..=2.0).contains(&t) {
            errors.push("llm.temperature", "Number must be between 0 and 2");
        }
    }
    if max_tokens == Some(0) {
        errors.push("llm.max_tokens", "Number must be greater than 0");
    }
    if let Some(p) = top_p {
        if !(0.0..=1.0).contains(&p) {
            errors.push("llm.top_p", "Number must be between 0 and 1");
        }
    }
}

fn is_plain_relative(file: &str) -> bool {
    let path = Path::new(file);
    !file.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// A field counts as absent when missing or explicitly null.
fn present<'a>(map: &'a Mapping, key: &str) -> Option<&'a Value> {
    map.get(key).filter(|v| !v.is_null())
}

fn field_string(map: &Mapping, key: &str, errors: &mut ValidationErrors) -> Option<String> {
    match present(map, key)? {
        Value::Str(s) => Some(s.clone()),
        other => {
            errors.push(key, format!("Expected string, received {}", other.kind()));
            None
        }
    }
}

fn field_string_list(
    map: &Mapping,
    key: &str,
    errors: &mut ValidationErrors,
) -> Option<Vec<String>> {
    let value = match present(map, key) {
        Some(v) => v,
        None => {
            if matches!(key, "goals" | "tasks") {
                errors.push(key, "Required");
            }
            return None;
        }
    };

    let items = match value.as_seq() {
        Some(items) => items,
        None => {
            errors.push(key, format!("Expected sequence, received {}", value.kind()));
            return None;
        }
    };

    let mut out = Vec::with_capacity(items.len());
    let before = errors.len();
    for (i, item) in items.iter().enumerate() {
        match item {
            Value::Str(s) => out.push(s.clone()),
            other => errors.push(
                format!("{}.{}", key, i),
                format!("Expected string, received {}", other.kind()),
            ),
        }
    }
    if errors.len() > before {
        None
    } else {
        Some(out)
    }
}

fn parse_llm(map: &Mapping, errors: &mut ValidationErrors) -> Option<GenerationSpec> {
    let value = present(map, "llm")?;
    match value {
        Value::Str(s) => match Provider::parse(s) {
            Some(p) => Some(GenerationSpec::new(p)),
            None => {
                errors.push("llm", invalid_provider(s));
                None
            }
        },
        Value::Map(llm) => {
            let provider = match present(llm, "provider") {
                Some(Value::Str(s)) => match Provider::parse(s) {
                    Some(p) => Some(p),
                    None => {
                        errors.push("llm.provider", invalid_provider(s));
                        None
                    }
                },
                Some(other) => {
                    errors.push(
                        "llm.provider",
                        format!("Expected string, received {}", other.kind()),
                    );
                    None
                }
                None => {
                    errors.push("llm.provider", "Required");
                    None
                }
            };

            let model = match present(llm, "model") {
                Some(Value::Str(s)) => Some(s.clone()),
                Some(other) => {
                    errors.push("llm.model", format!("Expected string, received {}", other.kind()));
                    None
                }
                None => None,
            };

            let temperature = number_field(llm, "temperature", errors).map(|n| n as f32);
            let top_p = number_field(llm, "top_p", errors).map(|n| n as f32);
            let max_tokens = match present(llm, "max_tokens") {
                Some(Value::Int(n)) if *n > 0 && *n <= u32::MAX as i64 => Some(*n as u32),
                Some(Value::Int(_)) => {
                    errors.push("llm.max_tokens", "Number must be greater than 0");
                    None
                }
                Some(other) => {
                    errors.push(
                        "llm.max_tokens",
                        format!("Expected integer, received {}", other.kind()),
                    );
                    None
                }
                None => None,
            };

            // The builder only range-checks a spec that exists.
            if provider.is_none() {
                check_sampling(temperature, max_tokens, top_p, errors);
            }
            provider.map(|p| GenerationSpec {
                provider: p,
                model,
                temperature,
                max_tokens,
                top_p,
            })
        }
        other => {
            errors.push(
                "llm",
                format!("Expected provider name or mapping, received {}", other.kind()),
            );
            None
        }
    }
}

fn number_field(map: &Mapping, key: &str, errors: &mut ValidationErrors) -> Option<f64> {
    let value = present(map, key)?;
    match value.as_f64() {
        Some(n) => Some(n),
        None => {
            errors.push(
                format!("llm.{}", key),
                format!("Expected number, received {}", value.kind()),
            );
            None
        }
    }
}

fn parse_prompts(map: &Mapping, errors: &mut ValidationErrors) -> PromptOverrides {
    let value = match present(map, "prompts") {
        Some(v) => v,
        None => return PromptOverrides::default(),
    };
    let prompts = match value.as_map() {
        Some(m) => m,
        None => {
            errors.push("prompts", format!("Expected mapping, received {}", value.kind()));
            return PromptOverrides::default();
        }
    };

    let mut pick = |key: &str| match present(prompts, key) {
        Some(Value::Str(s)) => Some(s.clone()),
        Some(other) => {
            errors.push(
                format!("prompts.{}", key),
                format!("Expected string, received {}", other.kind()),
            );
            None
        }
        None => None,
    };

    PromptOverrides {
        system: pick("system"),
        user: pick("user"),
    }
}

fn invalid_provider(got: &str) -> String {
    let expected = Provider::ALL
        .iter()
        .map(|p| format!("'{}'", p))
        .collect::<Vec<_>>()
        .join(" | ");
    format!("Invalid enum value. Expected {}, received '{}'", expected, got)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(items: &[&str]) -> Value {
        Value::Seq(items.iter().map(|s| Value::from(*s)).collect())
    }

    fn minimal() -> Mapping {
        let mut map = Mapping::new();
        map.insert("name", Value::from("researcher"));
        map.insert("goals", seq(&["Find sources"]));
        map.insert("tasks", seq(&["Search", "Summarize"]));
        map.insert("llm", Value::from("mistral"));
        map
    }

    #[test]
    fn test_minimal_descriptor_defaults() {
        let agent = AgentDescriptor::from_value(&Value::Map(minimal())).unwrap();
        assert_eq!(agent.name, "researcher");
        assert_eq!(agent.llm.provider, Provider::Mistral);
        assert!(agent.depends_on.is_empty());
        assert!(agent.tools.is_empty());
        assert_eq!(agent.on_error, OnError::Stop);
        assert_eq!(agent.artifact_file_name(), "researcher.json");
    }

    #[test]
    fn test_depends_on_accepts_string_or_sequence() {
        let mut map = minimal();
        map.insert("depends_on", Value::from("planner"));
        let agent = AgentDescriptor::from_value(&Value::Map(map.clone())).unwrap();
        assert_eq!(agent.depends_on, vec!["planner"]);

        map.insert("depends_on", seq(&["planner", "scout"]));
        let agent = AgentDescriptor::from_value(&Value::Map(map)).unwrap();
        assert_eq!(agent.depends_on, vec!["planner", "scout"]);
    }

    #[test]
    fn test_llm_mapping() {
        let mut llm = Mapping::new();
        llm.insert("provider", Value::from("claude"));
        llm.insert("model", Value::from("claude-sonnet-4-20250514"));
        llm.insert("temperature", Value::Int(1));
        llm.insert("max_tokens", Value::Int(2048));
        llm.insert("top_p", Value::Float(0.9));
        let mut map = minimal();
        map.insert("llm", Value::Map(llm));

        let agent = AgentDescriptor::from_value(&Value::Map(map)).unwrap();
        assert_eq!(agent.llm.provider, Provider::Claude);
        assert_eq!(agent.llm.model.as_deref(), Some("claude-sonnet-4-20250514"));
        assert_eq!(agent.llm.temperature, Some(1.0));
        assert_eq!(agent.llm.max_tokens, Some(2048));
        assert_eq!(agent.llm.top_p, Some(0.9));
    }

    #[test]
    fn test_reports_every_violation() {
        let mut llm = Mapping::new();
        llm.insert("provider", Value::from("gpt"));
        llm.insert("temperature", Value::Float(3.5));

        let mut map = Mapping::new();
        map.insert("name", Value::from(""));
        map.insert("goals", Value::Seq(vec![]));
        map.insert("tasks", Value::Seq(vec![Value::from("ok"), Value::Int(7)]));
        map.insert("llm", Value::Map(llm));
        map.insert("on_error", Value::from("retry"));

        let errors = AgentDescriptor::from_value(&Value::Map(map)).unwrap_err();
        assert!(errors.has_path("name"));
        assert!(errors.has_path("goals"));
        assert!(errors.has_path("tasks.1"));
        assert!(errors.has_path("llm.provider"));
        assert!(errors.has_path("on_error"));
        assert!(errors.has_path("llm.temperature"));
        assert_eq!(errors.len(), 6);
    }

    #[test]
    fn test_sampling_ranges_reported_without_provider() {
        let mut llm = Mapping::new();
        llm.insert("temperature", Value::Float(3.5));
        llm.insert("top_p", Value::Float(1.5));
        let mut map = minimal();
        map.insert("llm", Value::Map(llm));

        let errors = AgentDescriptor::from_value(&Value::Map(map)).unwrap_err();
        assert!(errors.has_path("llm.provider"));
        assert!(errors.has_path("llm.temperature"));
        assert!(errors.has_path("llm.top_p"));
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_sampling_ranges_reported_once_with_provider() {
        let mut llm = Mapping::new();
        llm.insert("provider", Value::from("claude"));
        llm.insert("temperature", Value::Float(3.5));
        let mut map = minimal();
        map.insert("llm", Value::Map(llm));

        let errors = AgentDescriptor::from_value(&Value::Map(map)).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors.has_path("llm.temperature"));
    }

    #[test]
    fn test_missing_required_fields() {
        let errors = AgentDescriptor::from_value(&Value::Map(Mapping::new())).unwrap_err();
        assert!(errors.has_path("name"));
        assert!(errors.has_path("goals"));
        assert!(errors.has_path("tasks"));
        assert!(errors.has_path("llm"));
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn test_root_must_be_mapping() {
        let errors = AgentDescriptor::from_value(&Value::from("nope")).unwrap_err();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_builder_validates() {
        let agent = AgentDescriptor::builder("writer")
            .goal("Write the report")
            .task("Draft")
            .provider(Provider::OpenAi)
            .depends_on("researcher")
            .tool("serializer")
            .tool("serializer")
            .on_error(OnError::Continue)
            .build()
            .unwrap();
        assert_eq!(agent.tools, vec!["serializer"]);
        assert!(agent.continues_on_error());

        let errors = AgentDescriptor::builder("broken")
            .llm(GenerationSpec::new(Provider::OpenAi).with_top_p(1.5))
            .build()
            .unwrap_err();
        assert!(errors.has_path("goals"));
        assert!(errors.has_path("tasks"));
        assert!(errors.has_path("llm.top_p"));
    }

    #[test]
    fn test_output_result_must_stay_inside_output_dir() {
        let mut map = minimal();
        map.insert("output_result", Value::from("../escape.json"));
        let errors = AgentDescriptor::from_value(&Value::Map(map.clone())).unwrap_err();
        assert!(errors.has_path("output_result"));

        map.insert("output_result", Value::from("reports/summary.json"));
        let agent = AgentDescriptor::from_value(&Value::Map(map)).unwrap();
        assert_eq!(agent.artifact_file_name(), "reports/summary.json");
    }
}
