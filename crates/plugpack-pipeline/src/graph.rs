//! Stage graph and its executor.
//!
//! Stages are submitted with their dependencies before anything runs. The
//! executor then runs every stage whose dependencies have completed, up to a
//! parallelism limit, on Tokio's blocking pool.
//!
//! Two kinds of edges exist:
//!
//! - [`DependencyKind::Hard`]: the dependent consumes the dependency's
//!   outputs. If the dependency fails or is skipped, the dependent is skipped.
//! - [`DependencyKind::Ordering`]: the dependent only runs after the
//!   dependency has finished, whatever its outcome. The registry aggregator
//!   uses these edges to wait for every module.
//!
//! # Examples
//!
//! ```
//! use plugpack_core::Result;
//! use plugpack_pipeline::{Freshness, FingerprintCache, Stage, TaskGraph};
//!
//! struct Hello;
//!
//! impl Stage for Hello {
//!     fn name(&self) -> &'static str { "hello" }
//!     fn freshness(&self) -> Freshness { Freshness::AlwaysStale }
//!     fn execute(&self) -> Result<()> { Ok(()) }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<()> {
//! let mut graph = TaskGraph::new();
//! let first = graph.submit(Hello, &[]);
//! graph.submit(Hello, &[first]);
//!
//! let report = graph.execute(2, &mut FingerprintCache::in_memory()).await?;
//! assert!(report.is_success());
//! assert_eq!(report.tasks().len(), 2);
//! # Ok(())
//! # }
//! ```

use crate::FingerprintCache;
use plugpack_core::{Error, Result};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Whether a stage may be skipped when its inputs did not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// The stage runs on every build.
    AlwaysStale,
    /// The stage is skipped when its fingerprint matches the cache and all of
    /// its outputs exist.
    Fingerprinted,
}

/// One unit of work in the graph.
///
/// `execute` runs on a blocking thread and may do synchronous I/O and spawn
/// processes.
pub trait Stage: Send + Sync {
    /// Stage name, unique within a module.
    fn name(&self) -> &'static str;

    /// Module the stage belongs to; `None` for workspace-wide stages.
    fn module(&self) -> Option<&str> {
        None
    }

    /// Up-to-date checking capability.
    fn freshness(&self) -> Freshness {
        Freshness::Fingerprinted
    }

    /// Fingerprint of everything the stage reads. `None` disables skipping
    /// for this run.
    ///
    /// # Errors
    ///
    /// Returns an error if an input cannot be read.
    fn fingerprint(&self) -> Result<Option<String>> {
        Ok(None)
    }

    /// Files the stage produces. A skip requires all of them to exist.
    fn outputs(&self) -> Vec<PathBuf> {
        Vec::new()
    }

    /// Repopulates deferred cells from persisted outputs when the stage is
    /// skipped as up-to-date.
    ///
    /// # Errors
    ///
    /// Returns an error if the outputs cannot be read back; the stage then
    /// runs normally.
    fn restore(&self) -> Result<()> {
        Ok(())
    }

    /// Does the work.
    ///
    /// # Errors
    ///
    /// Returns the error that halts this stage and its hard dependents.
    fn execute(&self) -> Result<()>;
}

/// Handle of a submitted stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(usize);

impl TaskId {
    /// Submission index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Kind of a dependency edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    /// Skip the dependent when the dependency did not complete successfully.
    Hard,
    /// Only wait for the dependency.
    Ordering,
}

/// Result of one task.
#[derive(Debug)]
pub enum TaskOutcome {
    /// The stage ran and succeeded.
    Succeeded,
    /// The stage was skipped because its inputs had not changed.
    UpToDate,
    /// The stage ran and failed.
    Failed {
        /// Why
        error: Error,
    },
    /// The stage never ran because a hard dependency did not complete.
    Skipped {
        /// Label of the dependency that failed or was skipped
        blocked_by: String,
    },
}

impl TaskOutcome {
    /// Returns `true` for [`Succeeded`](Self::Succeeded) and
    /// [`UpToDate`](Self::UpToDate).
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Succeeded | Self::UpToDate)
    }

    /// Short status word.
    #[must_use]
    pub const fn status(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::UpToDate => "up-to-date",
            Self::Failed { .. } => "failed",
            Self::Skipped { .. } => "skipped",
        }
    }
}

/// Outcome of one task, with its identity.
#[derive(Debug)]
pub struct TaskReport {
    /// `module:stage`, or the stage name for workspace-wide stages.
    pub label: String,
    /// Owning module.
    pub module: Option<String>,
    /// Stage name.
    pub stage: &'static str,
    /// What happened.
    pub outcome: TaskOutcome,
}

/// Outcomes of every task, in submission order.
#[derive(Debug, Default)]
pub struct BuildReport {
    tasks: Vec<TaskReport>,
}

impl BuildReport {
    /// Every task report.
    #[must_use]
    pub fn tasks(&self) -> &[TaskReport] {
        &self.tasks
    }

    /// Report of the task with the given label.
    #[must_use]
    pub fn task(&self, label: &str) -> Option<&TaskReport> {
        self.tasks.iter().find(|t| t.label == label)
    }

    /// Failed tasks.
    pub fn failures(&self) -> impl Iterator<Item = &TaskReport> {
        self.tasks
            .iter()
            .filter(|t| matches!(t.outcome, TaskOutcome::Failed { .. }))
    }

    /// Returns `true` if every task succeeded or was up-to-date.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.tasks.iter().all(|t| t.outcome.is_complete())
    }

    /// Number of tasks whose outcome has the given status word.
    #[must_use]
    pub fn count(&self, status: &str) -> usize {
        self.tasks.iter().filter(|t| t.outcome.status() == status).count()
    }
}

struct TaskNode {
    stage: Arc<dyn Stage>,
    deps: Vec<(TaskId, DependencyKind)>,
}

impl TaskNode {
    fn label(&self) -> String {
        match self.stage.module() {
            Some(module) => format!("{module}:{}", self.stage.name()),
            None => self.stage.name().to_string(),
        }
    }
}

/// Directed acyclic graph of stages.
#[derive(Default)]
pub struct TaskGraph {
    tasks: Vec<TaskNode>,
}

impl fmt::Debug for TaskGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskGraph")
            .field("tasks", &self.tasks.iter().map(TaskNode::label).collect::<Vec<_>>())
            .finish()
    }
}

enum StageRun {
    Ran { fingerprint: Option<String> },
    UpToDate,
}

fn run_stage(stage: &dyn Stage, previous: Option<&str>) -> Result<StageRun> {
    if stage.freshness() == Freshness::AlwaysStale {
        stage.execute()?;
        return Ok(StageRun::Ran { fingerprint: None });
    }

    let fingerprint = stage.fingerprint()?;
    if let (Some(current), Some(previous)) = (fingerprint.as_deref(), previous)
        && current == previous
        && stage.outputs().iter().all(|p| p.exists())
    {
        match stage.restore() {
            Ok(()) => return Ok(StageRun::UpToDate),
            Err(e) => tracing::warn!("Cannot restore outputs of {}, running it again: {}", stage.name(), e),
        }
    }

    stage.execute()?;
    Ok(StageRun::Ran { fingerprint })
}

impl TaskGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a stage with hard dependencies on `deps`.
    pub fn submit(&mut self, stage: impl Stage + 'static, deps: &[TaskId]) -> TaskId {
        self.submit_shared(Arc::new(stage), deps)
    }

    /// Adds an already shared stage with hard dependencies on `deps`.
    pub fn submit_shared(&mut self, stage: Arc<dyn Stage>, deps: &[TaskId]) -> TaskId {
        let id = TaskId(self.tasks.len());
        self.tasks.push(TaskNode {
            stage,
            deps: deps.iter().map(|d| (*d, DependencyKind::Hard)).collect(),
        });
        id
    }

    /// Adds an edge: `task` runs after `dependency`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] if either id does not belong to this graph.
    pub fn depend_on(&mut self, task: TaskId, dependency: TaskId, kind: DependencyKind) -> Result<()> {
        if dependency.0 >= self.tasks.len() {
            return Err(Error::Internal {
                message: format!("unknown task id {}", dependency.0),
            });
        }
        let node = self.tasks.get_mut(task.0).ok_or_else(|| Error::Internal {
            message: format!("unknown task id {}", task.0),
        })?;
        node.deps.push((dependency, kind));
        Ok(())
    }

    /// Label of a task (`module:stage`).
    #[must_use]
    pub fn label(&self, task: TaskId) -> Option<String> {
        self.tasks.get(task.0).map(TaskNode::label)
    }

    /// Number of tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns `true` if no task was submitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Checks that every edge points to a task of this graph and that there
    /// is no cycle.
    fn validate(&self) -> Result<()> {
        let mut indegree = vec![0usize; self.tasks.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.tasks.len()];
        for (index, node) in self.tasks.iter().enumerate() {
            for (dep, _) in &node.deps {
                if dep.0 >= self.tasks.len() {
                    return Err(Error::Internal {
                        message: format!("{} depends on unknown task id {}", node.label(), dep.0),
                    });
                }
                indegree[index] += 1;
                dependents[dep.0].push(index);
            }
        }

        let mut queue: VecDeque<usize> = (0..self.tasks.len()).filter(|i| indegree[*i] == 0).collect();
        let mut visited = 0;
        while let Some(index) = queue.pop_front() {
            visited += 1;
            for &dependent in &dependents[index] {
                indegree[dependent] -= 1;
                if indegree[dependent] == 0 {
                    queue.push_back(dependent);
                }
            }
        }

        if visited < self.tasks.len() {
            let stuck = indegree.iter().position(|d| *d > 0).unwrap_or(0);
            return Err(Error::GraphCycle {
                task: self.tasks[stuck].label(),
            });
        }
        Ok(())
    }

    /// Runs the graph.
    ///
    /// At most `max_parallel` stages run at once. Fingerprints of stages that
    /// succeed are recorded in `cache`; fingerprints of failed stages are
    /// forgotten.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphCycle`] if the graph has a cycle. Stage failures
    /// are not errors of `execute`; they are reported in the [`BuildReport`].
    pub async fn execute(self, max_parallel: usize, cache: &mut FingerprintCache) -> Result<BuildReport> {
        self.validate()?;

        let count = self.tasks.len();
        let max_parallel = max_parallel.max(1);
        let labels: Vec<String> = self.tasks.iter().map(TaskNode::label).collect();
        let previous: Arc<BTreeMap<String, String>> = Arc::new(cache.snapshot());

        let mut pending: Vec<usize> = self.tasks.iter().map(|n| n.deps.len()).collect();
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); count];
        for (index, node) in self.tasks.iter().enumerate() {
            for (dep, _) in &node.deps {
                dependents[dep.0].push(index);
            }
        }

        let mut outcomes: Vec<Option<TaskOutcome>> = (0..count).map(|_| None).collect();
        let mut ready: VecDeque<usize> = (0..count).filter(|i| pending[*i] == 0).collect();
        let mut running: JoinSet<(usize, Result<StageRun>)> = JoinSet::new();
        let mut in_flight: HashMap<tokio::task::Id, usize> = HashMap::new();

        tracing::debug!("Executing {} task(s) with parallelism {}", count, max_parallel);

        loop {
            while running.len() < max_parallel
                && let Some(index) = ready.pop_front()
            {
                let node = &self.tasks[index];
                let blocked_by = node.deps.iter().find_map(|(dep, kind)| {
                    let complete = outcomes[dep.0].as_ref().is_some_and(TaskOutcome::is_complete);
                    (*kind == DependencyKind::Hard && !complete).then(|| labels[dep.0].clone())
                });

                if let Some(blocked_by) = blocked_by {
                    tracing::info!("Skipping {} because {} did not complete", labels[index], blocked_by);
                    outcomes[index] = Some(TaskOutcome::Skipped { blocked_by });
                    release(index, &dependents, &mut pending, &mut ready);
                    continue;
                }

                let stage = Arc::clone(&node.stage);
                let previous = Arc::clone(&previous);
                let label = labels[index].clone();
                tracing::debug!("Starting {}", label);
                let handle = running.spawn_blocking(move || {
                    let result = run_stage(stage.as_ref(), previous.get(&label).map(String::as_str));
                    (index, result)
                });
                in_flight.insert(handle.id(), index);
            }

            let Some(joined) = running.join_next_with_id().await else {
                break;
            };

            let (index, outcome) = match joined {
                Ok((id, (index, result))) => {
                    in_flight.remove(&id);
                    let label = &labels[index];
                    let outcome = match result {
                        Ok(StageRun::Ran { fingerprint }) => {
                            match fingerprint {
                                Some(fp) => cache.record(label.clone(), fp),
                                None => cache.invalidate(label),
                            }
                            tracing::debug!("Finished {}", label);
                            TaskOutcome::Succeeded
                        }
                        Ok(StageRun::UpToDate) => {
                            tracing::debug!("{} is up-to-date", label);
                            TaskOutcome::UpToDate
                        }
                        Err(error) => {
                            cache.invalidate(label);
                            tracing::warn!("{} failed: {}", label, error);
                            TaskOutcome::Failed { error }
                        }
                    };
                    (index, outcome)
                }
                Err(join_error) => {
                    let Some(index) = in_flight.remove(&join_error.id()) else {
                        return Err(Error::Internal {
                            message: format!("lost track of a finished stage: {join_error}"),
                        });
                    };
                    cache.invalidate(&labels[index]);
                    tracing::warn!("{} panicked: {}", labels[index], join_error);
                    let error = Error::Internal {
                        message: format!("stage {} panicked", labels[index]),
                    };
                    (index, TaskOutcome::Failed { error })
                }
            };

            outcomes[index] = Some(outcome);
            release(index, &dependents, &mut pending, &mut ready);
        }

        let tasks = self
            .tasks
            .iter()
            .zip(labels)
            .zip(outcomes)
            .map(|((node, label), outcome)| TaskReport {
                label,
                module: node.stage.module().map(str::to_string),
                stage: node.stage.name(),
                outcome: outcome.unwrap_or_else(|| TaskOutcome::Failed {
                    error: Error::Internal {
                        message: "stage was never scheduled".to_string(),
                    },
                }),
            })
            .collect();

        Ok(BuildReport { tasks })
    }
}

/// Marks `index` finished and queues dependents that have nothing left to
/// wait for.
fn release(index: usize, dependents: &[Vec<usize>], pending: &mut [usize], ready: &mut VecDeque<usize>) {
    for &dependent in &dependents[index] {
        pending[dependent] -= 1;
        if pending[dependent] == 0 {
            ready.push_back(dependent);
        }
    }
}
