//! Dependency resolution: descriptors in, a linear execution plan out.

use std::collections::HashMap;

use hive_core::{AgentDescriptor, HiveError, Result};
use tracing::debug;

/// Descriptors ordered so that every unit follows all of its dependencies.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionPlan {
    steps: Vec<AgentDescriptor>,
}

impl ExecutionPlan {
    pub fn steps(&self) -> &[AgentDescriptor] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AgentDescriptor> {
        self.steps.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.steps.iter().map(|a| a.name.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a ExecutionPlan {
    type Item = &'a AgentDescriptor;
    type IntoIter = std::slice::Iter<'a, AgentDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Order `agents` depth-first, visiting dependencies in declaration order and
/// roots in input order. Identical input always yields the identical plan.
///
/// Fails without a partial plan on a duplicate name, a dependency missing
/// from the set, or a cycle.
pub fn resolve(agents: &[AgentDescriptor]) -> Result<ExecutionPlan> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(agents.len());
    for (i, agent) in agents.iter().enumerate() {
        if index.insert(agent.name.as_str(), i).is_some() {
            return Err(HiveError::DuplicateAgent(agent.name.clone()));
        }
    }

    let mut marks = vec![Mark::Unvisited; agents.len()];
    let mut steps = Vec::with_capacity(agents.len());
    // Explicit stack of (agent, next dependency to visit).
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for root in 0..agents.len() {
        if marks[root] != Mark::Unvisited {
            continue;
        }
        marks[root] = Mark::InProgress;
        stack.push((root, 0));

        while let Some(top) = stack.last_mut() {
            let (current, next_dep) = *top;
            let deps = &agents[current].depends_on;

            if next_dep == deps.len() {
                stack.pop();
                marks[current] = Mark::Done;
                steps.push(agents[current].clone());
                continue;
            }
            top.1 += 1;

            let dep_name = &deps[next_dep];
            let dep = *index
                .get(dep_name.as_str())
                .ok_or_else(|| HiveError::MissingDependency {
                    agent: agents[current].name.clone(),
                    dependency: dep_name.clone(),
                })?;

            match marks[dep] {
                Mark::Unvisited => {
                    marks[dep] = Mark::InProgress;
                    stack.push((dep, 0));
                }
                Mark::InProgress => {
                    return Err(HiveError::CircularDependency(dep_name.clone()));
                }
                Mark::Done => {}
            }
        }
    }

    let plan = ExecutionPlan { steps };
    debug!(order = ?plan.names(), "Resolved execution plan");
    Ok(plan)
}
