use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

const EXAMPLE_AGENT: &str = "\
name: example-agent
goals:
  - Example goal
tasks:
  - Example task
llm: mistral
tools:
  - web-scraper
";

/// Create `<teams_dir>/<name>/` with an `output/` directory and an example
/// descriptor. Returns the team directory.
pub fn add_team(teams_dir: &Path, name: &str, output_dir_name: &str) -> Result<PathBuf> {
    check_name("team", name)?;
    let team_dir = teams_dir.join(name);
    fs::create_dir_all(team_dir.join(output_dir_name))
        .with_context(|| format!("Failed to create {}", team_dir.display()))?;

    write_new(&team_dir, "example-agent", EXAMPLE_AGENT)?;
    Ok(team_dir)
}

/// Write `<name>.yml` into an existing team. Returns the file written.
pub fn add_agent(team_dir: &Path, name: &str) -> Result<PathBuf> {
    check_name("agent", name)?;
    if !team_dir.is_dir() {
        bail!("Team directory not found: {}", team_dir.display());
    }
    write_new(team_dir, name, &agent_template(name))
}

fn agent_template(name: &str) -> String {
    format!(
        "name: {name}
goals:
  - Describe what this agent must achieve
tasks:
  - Step 1
  - Step 2
llm: mistral
tools:
  - web-scraper
"
    )
}

/// Names end up as path components.
fn check_name(kind: &str, name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        bail!("Invalid {kind} name '{name}': use letters, digits, '-' or '_'");
    }
    Ok(())
}

/// Write `<stem>.yml`, falling back to `<stem>-1.yml`, `<stem>-2.yml`, ...
/// when the file already exists. Existing files are never touched.
fn write_new(dir: &Path, stem: &str, contents: &str) -> Result<PathBuf> {
    let mut path = dir.join(format!("{stem}.yml"));
    let mut suffix = 1;
    while path.exists() {
        path = dir.join(format!("{stem}-{suffix}.yml"));
        suffix += 1;
    }
    fs::write(&path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
