use std::collections::HashMap;
use std::path::Path;

use hive_core::descriptor::{AgentDescriptor, OnError, Provider};
use hive_core::traits::StateView;

/// A valid descriptor with one goal and one task.
pub fn agent(name: &str, deps: &[&str]) -> AgentDescriptor {
    builder(name, deps)
        .build()
        .unwrap_or_else(|e| panic!("fixture descriptor {name} is invalid: {e}"))
}

/// Like [`agent`] with an explicit failure policy.
pub fn agent_with_policy(name: &str, deps: &[&str], on_error: OnError) -> AgentDescriptor {
    builder(name, deps)
        .on_error(on_error)
        .build()
        .unwrap_or_else(|e| panic!("fixture descriptor {name} is invalid: {e}"))
}

fn builder(name: &str, deps: &[&str]) -> hive_core::descriptor::DescriptorBuilder {
    let mut b = AgentDescriptor::builder(name)
        .goal(format!("Goal of {name}"))
        .task(format!("Task of {name}"))
        .provider(Provider::OpenAi);
    for dep in deps {
        b = b.depends_on(*dep);
    }
    b
}

/// Descriptor file text equivalent to [`agent`].
pub fn agent_yaml(name: &str, deps: &[&str]) -> String {
    let mut text = format!(
        "name: {name}\ngoals:\n  - Goal of {name}\ntasks:\n  - Task of {name}\nllm: openai\n"
    );
    if !deps.is_empty() {
        text.push_str("depends_on:\n");
        for dep in deps {
            text.push_str(&format!("  - {dep}\n"));
        }
    }
    text
}

/// Write `(file name, contents)` pairs into `dir`.
pub fn write_team(dir: &Path, files: &[(&str, String)]) {
    std::fs::create_dir_all(dir).unwrap_or_else(|e| panic!("create {}: {e}", dir.display()));
    for (file, contents) in files {
        let path = dir.join(file);
        std::fs::write(&path, contents).unwrap_or_else(|e| panic!("write {}: {e}", path.display()));
    }
}

/// An explicit variable source for placeholder substitution.
pub fn env_vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// In-memory shared state.
#[derive(Debug, Default, Clone)]
pub struct MapState(pub HashMap<String, serde_json::Value>);

impl MapState {
    pub fn with(mut self, name: &str, value: serde_json::Value) -> Self {
        self.0.insert(name.to_string(), value);
        self
    }
}

impl StateView for MapState {
    fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.0.get(name)
    }
}
