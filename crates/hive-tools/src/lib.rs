//! Tool capabilities available to agents.

pub mod builtin;
pub mod registry;

pub use registry::ToolRegistry;
