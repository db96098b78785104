use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{debug, info};

use hive_core::{AgentDescriptor, GenerationClient, GenerationContext, Result, StateView, StepRunner};
use hive_tools::ToolRegistry;

use crate::prompt::compose_request;

/// Executes one unit: resolves tools and prior results, calls the generation
/// capability, and writes the result artifact.
pub struct AgentRunner {
    generator: Arc<dyn GenerationClient>,
    tools: ToolRegistry,
    output_dir: PathBuf,
}

impl AgentRunner {
    pub fn new(
        generator: Arc<dyn GenerationClient>,
        tools: ToolRegistry,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            generator,
            tools,
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn artifact_path(&self, agent: &AgentDescriptor) -> PathBuf {
        self.output_dir.join(agent.artifact_file_name())
    }

    async fn execute(
        &self,
        agent: &AgentDescriptor,
        state: &dyn StateView,
    ) -> Result<serde_json::Value> {
        let tools = self.tools.resolve(&agent.tools);

        let mut dependency_results = Vec::with_capacity(agent.depends_on.len());
        for dep in &agent.depends_on {
            match state.get(dep) {
                Some(result) => dependency_results.push((dep.clone(), result.clone())),
                None => debug!(agent = %agent.name, dependency = %dep, "No stored result, omitted"),
            }
        }

        let request = compose_request(agent, &tools, &dependency_results);
        // Tools resolve relative paths against the process working directory.
        let context = GenerationContext::new(tools);

        let response = self.generator.generate(request, context).await?;
        let result = serde_json::to_value(&response)?;

        let path = self.artifact_path(agent);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, serde_json::to_string_pretty(&result)?).await?;
        info!(agent = %agent.name, artifact = %path.display(), "Wrote agent output");

        Ok(result)
    }
}

impl StepRunner for AgentRunner {
    fn run<'a>(
        &'a self,
        agent: &'a AgentDescriptor,
        state: &'a dyn StateView,
    ) -> BoxFuture<'a, Result<serde_json::Value>> {
        Box::pin(self.execute(agent, state))
    }
}
