use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HiveError {
    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // Descriptor errors
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("{0}")]
    Validation(ValidationErrors),

    #[error("{}", render_load_failures(.0))]
    Load(Vec<FileFailure>),

    // Plan errors
    #[error("Dependency not found: {agent} depends on {dependency}")]
    MissingDependency { agent: String, dependency: String },

    #[error("Circular dependency detected at: {0}")]
    CircularDependency(String),

    #[error("Duplicate agent name: {0}")]
    DuplicateAgent(String),

    // Generation errors
    #[error("LLM provider not supported: {0}")]
    UnsupportedProvider(String),

    #[error("LLM request failed: {0}")]
    LlmRequest(String),

    #[error("LLM response parse error: {0}")]
    LlmParse(String),

    // Tool errors
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Tool execution failed: {tool}: {message}")]
    ToolExecution { tool: String, message: String },

    #[error("Tool timeout after {timeout_secs}s: {tool}")]
    ToolTimeout { tool: String, timeout_secs: u64 },

    #[error("Tool input validation failed: {0}")]
    ToolValidation(String),

    // Storage errors
    #[error("Shared state error: {0}")]
    State(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HiveError>;

/// A single schema violation, addressed by a dotted path into the descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

impl FieldError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Every field violation found while validating one descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError::new(path, message));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldError> {
        self.0.iter()
    }

    /// Whether any violation was reported for exactly this path.
    pub fn has_path(&self, path: &str) -> bool {
        self.0.iter().any(|e| e.path == path)
    }

    /// Whether any violation was reported for this path or one nested under it.
    pub fn has_prefix(&self, path: &str) -> bool {
        self.0.iter().any(|e| {
            e.path == path
                || e.path
                    .strip_prefix(path)
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Agent configuration validation failed:")?;
        for err in &self.0 {
            writeln!(f, "  • {}", err)?;
        }
        Ok(())
    }
}

/// A descriptor file that could not be loaded, with the reason.
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: HiveError,
}

impl fmt::Display for FileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string());
        write!(f, "Error loading agent from {}:\n{}", name, self.error)
    }
}

fn render_load_failures(failures: &[FileFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_render_every_field() {
        let mut errors = ValidationErrors::new();
        errors.push("goals", "At least one goal is required");
        errors.push("llm.temperature", "must be between 0 and 2");

        let text = HiveError::Validation(errors).to_string();
        assert!(text.starts_with("Agent configuration validation failed:"));
        assert!(text.contains("  • goals: At least one goal is required"));
        assert!(text.contains("  • llm.temperature: must be between 0 and 2"));
    }

    #[test]
    fn test_load_failure_names_file() {
        let err = HiveError::Load(vec![FileFailure {
            path: PathBuf::from("teams/demo/writer.yml"),
            error: HiveError::Parse {
                line: 3,
                message: "tabs are not allowed in indentation".into(),
            },
        }]);
        let text = err.to_string();
        assert!(text.contains("writer.yml"));
        assert!(text.contains("line 3"));
    }

    #[test]
    fn test_missing_dependency_message() {
        let err = HiveError::MissingDependency {
            agent: "writer".into(),
            dependency: "researcher".into(),
        };
        assert_eq!(
            err.to_string(),
            "Dependency not found: writer depends on researcher"
        );
    }
}
