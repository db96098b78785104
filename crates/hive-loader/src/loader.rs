use std::path::{Path, PathBuf};
use std::sync::Arc;

use hive_core::{AgentDescriptor, FileFailure, HiveError, Result};
use tracing::{debug, info, warn};

use crate::parser::parse;
use crate::template::{substitute_value, EnvSource, ProcessEnv};

/// Descriptors loaded from one directory, plus the files that failed.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    /// Valid descriptors in file-name order.
    pub agents: Vec<AgentDescriptor>,
    pub failures: Vec<FileFailure>,
}

impl LoadOutcome {
    /// Succeed only when every file loaded.
    pub fn into_result(self) -> Result<Vec<AgentDescriptor>> {
        if self.failures.is_empty() {
            Ok(self.agents)
        } else {
            Err(HiveError::Load(self.failures))
        }
    }
}

/// Reads descriptor files: parse, substitute placeholders, validate.
#[derive(Clone)]
pub struct DescriptorLoader {
    env: Arc<dyn EnvSource>,
}

impl Default for DescriptorLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DescriptorLoader {
    /// Loader resolving placeholders from the process environment.
    pub fn new() -> Self {
        Self::with_env(ProcessEnv)
    }

    pub fn with_env(env: impl EnvSource + 'static) -> Self {
        Self { env: Arc::new(env) }
    }

    /// Parse and validate one descriptor from text.
    pub fn parse_descriptor(&self, source: &str) -> Result<AgentDescriptor> {
        let mut tree = parse(source)?;

        for name in substitute_value(&mut tree, self.env.as_ref()) {
            warn!(variable = %name, "Unresolved template variable left as-is");
        }

        AgentDescriptor::from_value(&tree).map_err(HiveError::Validation)
    }

    pub fn load_file(&self, path: &Path) -> Result<AgentDescriptor> {
        let source = std::fs::read_to_string(path)?;
        let agent = self.parse_descriptor(&source)?;
        debug!(agent = %agent.name, path = %path.display(), "Loaded descriptor");
        Ok(agent)
    }

    /// Load every `.yml`/`.yaml` file in `dir`.
    ///
    /// A failing file is recorded and skipped; the others still load. Only
    /// an unreadable directory is an error here.
    pub fn load_dir(&self, dir: &Path) -> Result<LoadOutcome> {
        let mut outcome = LoadOutcome::default();

        for path in descriptor_files(dir)? {
            match self.load_file(&path) {
                Ok(agent) => outcome.agents.push(agent),
                Err(error) => {
                    warn!(path = %path.display(), %error, "Failed to load descriptor");
                    outcome.failures.push(FileFailure { path, error });
                }
            }
        }

        info!(
            dir = %dir.display(),
            loaded = outcome.agents.len(),
            failed = outcome.failures.len(),
            "Loaded team descriptors"
        );
        Ok(outcome)
    }
}

fn descriptor_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(HiveError::Config(format!(
            "Team directory not found: {}",
            dir.display()
        )));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_descriptor = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == "yml" || e == "yaml");
        if is_descriptor && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
