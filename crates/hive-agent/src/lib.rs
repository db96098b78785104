//! The orchestration engine: dependency resolution, the sequential pipeline
//! executor, and the step runner that talks to generation and tools.

pub mod executor;
pub mod metrics;
pub mod orchestrator;
pub mod prompt;
pub mod resolver;
pub mod runner;

pub use executor::PipelineExecutor;
pub use metrics::{PipelineMetrics, StepMetrics, StepStatus};
pub use orchestrator::Orchestrator;
pub use prompt::compose_request;
pub use resolver::{resolve, ExecutionPlan};
pub use runner::AgentRunner;
