mod scaffold;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hive_agent::{resolve, Orchestrator};
use hive_core::{AppConfig, PipelineEvent};
use hive_loader::DescriptorLoader;

#[derive(Parser)]
#[command(name = "hive", version, about = "Run teams of LLM agents in dependency order")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "hive.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every agent of a team in dependency order
    Run {
        /// Team directory name under the teams directory
        team: String,
        /// Print the final metrics as JSON instead of the summary
        #[arg(long)]
        json: bool,
    },
    /// Show the execution order of a team without running it
    Plan {
        team: String,
    },
    /// Manage teams
    Team {
        #[command(subcommand)]
        action: TeamAction,
    },
    /// Manage agents
    Agent {
        #[command(subcommand)]
        action: AgentAction,
    },
}

#[derive(Subcommand)]
enum TeamAction {
    /// Create a team directory with an example agent
    Add { name: String },
}

#[derive(Subcommand)]
enum AgentAction {
    /// Create an agent descriptor in a team
    Add {
        name: String,
        /// Team to add the agent to
        #[arg(long)]
        team: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = AppConfig::load_or_default(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log.filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run { team, json } => run_team(&config, &team, json).await,
        Commands::Plan { team } => {
            let agents = DescriptorLoader::new()
                .load_dir(&config.team_dir(&team))?
                .into_result()?;
            let plan = resolve(&agents)?;
            println!("Execution plan for team '{}':", team);
            for (i, step) in plan.iter().enumerate() {
                if step.depends_on.is_empty() {
                    println!("  {}. {}", i + 1, step.name);
                } else {
                    println!("  {}. {} (after {})", i + 1, step.name, step.depends_on.join(", "));
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Team {
            action: TeamAction::Add { name },
        } => {
            let dir = scaffold::add_team(
                &PathBuf::from(&config.run.teams_dir),
                &name,
                &config.run.output_dir_name,
            )?;
            println!("Team '{}' created at {}", name, dir.display());
            Ok(ExitCode::SUCCESS)
        }
        Commands::Agent {
            action: AgentAction::Add { name, team },
        } => {
            let path = scaffold::add_agent(&config.team_dir(&team), &name)?;
            println!("Agent '{}' created at {}", name, path.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_team(config: &AppConfig, team: &str, json: bool) -> anyhow::Result<ExitCode> {
    let mut orch = Orchestrator::open(&config.team_dir(team), config)?;
    info!(team, state = %orch.state().path().display(), "Running team");

    let print_handle = tokio::spawn(print_progress(orch.events().subscribe()));

    let result = orch.run_all().await;
    // A resolution error publishes nothing, so the printer would never finish.
    if result.is_err() {
        print_handle.abort();
    }
    let metrics = result?;
    print_handle.await.ok();

    if json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
    } else {
        println!("{}", metrics.summary());
    }

    Ok(if metrics.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Print step status to stderr until the pipeline finishes. Returns the
/// number of events shown.
async fn print_progress(mut rx: broadcast::Receiver<PipelineEvent>) -> usize {
    let mut shown = 0;
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(missed)) => {
                warn!(missed, "Progress output fell behind");
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        shown += 1;
        match event {
            PipelineEvent::StepStarted { name, .. } => {
                eprintln!("→ {}", name);
            }
            PipelineEvent::StepSucceeded { name, duration_ms } => {
                eprintln!("✔ {} ({} ms)", name, duration_ms);
            }
            PipelineEvent::StepFailed {
                name,
                duration_ms,
                error,
            } => {
                eprintln!("✖ {} ({} ms): {}", name, duration_ms, error);
            }
            PipelineEvent::StepSkipped { name } => {
                eprintln!("↷ {} skipped", name);
            }
            PipelineEvent::PipelineFinished { .. } => break,
            PipelineEvent::PipelineStarted { .. } => {}
        }
    }
    shown
}

#[cfg(test)]
mod tests {
    use super::*;
    use hive_core::EventBus;

    #[tokio::test]
    async fn progress_survives_a_burst_of_skips() {
        let bus = EventBus::new(4);
        let rx = bus.subscribe();
        bus.publish(PipelineEvent::PipelineStarted { total: 10 });
        for i in 0..10 {
            bus.publish(PipelineEvent::StepSkipped {
                name: format!("unit-{i}"),
            });
        }
        bus.publish(PipelineEvent::PipelineFinished {
            succeeded: 0,
            failed: 0,
            skipped: 10,
        });

        // Only the newest four events are still buffered.
        assert_eq!(print_progress(rx).await, 4);
    }

    #[tokio::test]
    async fn progress_stops_when_bus_is_dropped() {
        let bus = EventBus::new(4);
        let rx = bus.subscribe();
        bus.publish(PipelineEvent::StepStarted {
            name: "a".into(),
            index: 0,
        });
        drop(bus);

        assert_eq!(print_progress(rx).await, 1);
    }
}
