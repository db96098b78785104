//! Core types, traits, and errors shared by every hive crate.

pub mod config;
pub mod descriptor;
pub mod error;
pub mod event;
pub mod traits;
pub mod types;
pub mod value;

pub use config::{AppConfig, ModelConfig, RetryConfig};
pub use descriptor::{AgentDescriptor, DescriptorBuilder, GenerationSpec, OnError, PromptOverrides, Provider};
pub use error::{FieldError, FileFailure, HiveError, Result, ValidationErrors};
pub use event::{EventBus, PipelineEvent};
pub use traits::*;
pub use types::*;
pub use value::{Mapping, Value};
