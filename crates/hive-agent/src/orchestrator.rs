use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use hive_core::{AgentDescriptor, AppConfig, EventBus, GenerationClient, Result, StepRunner};
use hive_llm::ChatGenerator;
use hive_loader::DescriptorLoader;
use hive_memory::SharedStateStore;
use hive_tools::ToolRegistry;

use crate::executor::PipelineExecutor;
use crate::metrics::PipelineMetrics;
use crate::resolver::{resolve, ExecutionPlan};
use crate::runner::AgentRunner;

/// Loads a team, resolves its plan, and runs it against shared state.
pub struct Orchestrator {
    team_dir: PathBuf,
    agents: Vec<AgentDescriptor>,
    state: SharedStateStore,
    executor: PipelineExecutor,
}

impl Orchestrator {
    /// Open a team directory with the real generation and tool stack.
    ///
    /// Any descriptor that fails to load aborts with [`hive_core::HiveError::Load`].
    pub fn open(team_dir: &Path, config: &AppConfig) -> Result<Self> {
        let generator: Arc<dyn GenerationClient> = Arc::new(ChatGenerator::new(config.clone()));
        Self::open_with(team_dir, config, &DescriptorLoader::new(), generator)
    }

    /// Open a team with an explicit loader and generation capability.
    pub fn open_with(
        team_dir: &Path,
        config: &AppConfig,
        loader: &DescriptorLoader,
        generator: Arc<dyn GenerationClient>,
    ) -> Result<Self> {
        let agents = loader.load_dir(team_dir)?.into_result()?;
        let output_dir = team_dir.join(&config.run.output_dir_name);
        std::fs::create_dir_all(&output_dir)?;

        let runner = AgentRunner::new(generator, ToolRegistry::with_builtins(), output_dir);
        let state = SharedStateStore::open(&config.run.state_file);

        info!(team = %team_dir.display(), agents = agents.len(), "Opened team");
        Ok(Self::from_parts(team_dir, agents, state, Arc::new(runner)))
    }

    /// Assemble from already-loaded pieces.
    pub fn from_parts(
        team_dir: impl Into<PathBuf>,
        agents: Vec<AgentDescriptor>,
        state: SharedStateStore,
        runner: Arc<dyn StepRunner>,
    ) -> Self {
        Self {
            team_dir: team_dir.into(),
            agents,
            state,
            executor: PipelineExecutor::new(runner),
        }
    }

    pub fn team_dir(&self) -> &Path {
        &self.team_dir
    }

    /// Descriptors in load order.
    pub fn agents(&self) -> &[AgentDescriptor] {
        &self.agents
    }

    pub fn state(&self) -> &SharedStateStore {
        &self.state
    }

    pub fn events(&self) -> &EventBus {
        self.executor.events()
    }

    pub fn plan(&self) -> Result<ExecutionPlan> {
        resolve(&self.agents)
    }

    /// Resolve and execute the whole team. Resolution errors are returned
    /// before any unit runs; unit failures are reported in the metrics.
    pub async fn run_all(&mut self) -> Result<PipelineMetrics> {
        let plan = self.plan()?;
        Ok(self.executor.execute(&plan, &mut self.state).await)
    }
}
