//! Mocks and fixtures shared by hive's test suites.

pub mod fixtures;
pub mod mocks;

pub use fixtures::{agent, agent_with_policy, agent_yaml, env_vars, write_team, MapState};
pub use mocks::{
    EchoTool, MockGenerationClient, MockLlmClient, RecordedChat, RecordedGeneration,
    RecordingRunner, RunnerCall,
};
