//! Descriptor loading: tokenizer, parser, placeholder substitution, and the
//! directory loader that ties them to schema validation.

pub mod lexer;
pub mod loader;
pub mod parser;
pub mod template;

pub use loader::{DescriptorLoader, LoadOutcome};
pub use parser::parse;
pub use template::{EnvSource, ProcessEnv};
