//! Composition of the generation request for one unit.

use std::sync::Arc;

use hive_core::{AgentDescriptor, GenerationRequest, Tool};

const MISSION_LINE: &str = "You are an autonomous agent executing a defined mission.";
const OUTPUT_LINE: &str = "Return structured JSON output.";

/// Build the request from the descriptor, its resolved tools, and the stored
/// results of the dependencies that have one.
pub fn compose_request(
    agent: &AgentDescriptor,
    tools: &[Arc<dyn Tool>],
    dependency_results: &[(String, serde_json::Value)],
) -> GenerationRequest {
    let system = [agent.personality.as_deref(), agent.prompts.system.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    let mut lines = vec![agent
        .prompts
        .user
        .clone()
        .unwrap_or_else(|| MISSION_LINE.to_string())];

    if let Some(description) = &agent.description {
        lines.push(format!("Mission: {}", description));
    }
    lines.push(format!("Goals: {}", agent.goals.join("; ")));
    lines.push(format!("Tasks: {}", agent.tasks.join("; ")));

    if !tools.is_empty() {
        lines.push("Available tools:".to_string());
        for tool in tools {
            lines.push(format!("- {}: {}", tool.name(), tool.description()));
        }
    }

    if !dependency_results.is_empty() {
        lines.push("Results from previous agents:".to_string());
        for (name, result) in dependency_results {
            let rendered =
                serde_json::to_string_pretty(result).unwrap_or_else(|_| result.to_string());
            lines.push(format!("[{}]\n{}", name, rendered));
        }
    }

    lines.push(OUTPUT_LINE.to_string());

    GenerationRequest {
        system: (!system.is_empty()).then(|| system.join("\n\n")),
        prompt: lines.join("\n"),
        spec: agent.llm.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hive_core::{AgentDescriptor, Provider};
    use hive_test_utils::{agent, EchoTool};
    use serde_json::json;

    #[test]
    fn default_prompt_shape() {
        let a = AgentDescriptor::builder("writer")
            .goal("Draft a post")
            .goal("Keep it short")
            .task("Outline")
            .task("Write")
            .provider(Provider::Claude)
            .build()
            .unwrap();
        let req = compose_request(&a, &[], &[]);
        assert_eq!(
            req.prompt,
            "You are an autonomous agent executing a defined mission.\n\
             Goals: Draft a post; Keep it short\n\
             Tasks: Outline; Write\n\
             Return structured JSON output."
        );
        assert!(req.system.is_none());
        assert_eq!(req.spec.provider, Provider::Claude);
    }

    #[test]
    fn overrides_tools_and_dependencies() {
        let a = AgentDescriptor::builder("editor")
            .description("Polish drafts")
            .personality("Meticulous.")
            .system_prompt("Answer in French.")
            .user_prompt("Edit the draft below.")
            .goal("Fix typos")
            .task("Proofread")
            .depends_on("writer")
            .provider(Provider::OpenAi)
            .build()
            .unwrap();
        let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(EchoTool)];
        let deps = vec![("writer".to_string(), json!({"content": "draft"}))];

        let req = compose_request(&a, &tools, &deps);
        assert_eq!(req.system.as_deref(), Some("Meticulous.\n\nAnswer in French."));
        assert!(req.prompt.starts_with("Edit the draft below.\nMission: Polish drafts\n"));
        assert!(req.prompt.contains("Available tools:\n- echo: Echo the input back"));
        assert!(req.prompt.contains("[writer]\n{\n  \"content\": \"draft\"\n}"));
        assert!(req.prompt.ends_with(OUTPUT_LINE));
    }

    #[test]
    fn no_dependency_section_without_results() {
        let req = compose_request(&agent("b", &["a"]), &[], &[]);
        assert!(!req.prompt.contains("Results from previous agents"));
    }
}
