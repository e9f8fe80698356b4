//! Training trigger
//!
//! Launches the external training command from inside the server.
//!
//! ## Modes
//!
//! - **Blocking** (default): the `/train` request waits for the process to
//!   exit. Success is reported whenever the process could be launched; its
//!   exit status is logged but not inspected.
//! - **Background**: the request enqueues a task and returns its id at once.
//!   A single worker runs queued tasks one after another and records their
//!   final state, which `/train/{id}` reports. Only the most recent
//!   [`RETAINED_TASKS`] finished tasks are remembered.
//!
//! The child inherits the server's stdout/stderr, so training output lands in
//! the server logs.

use std::{
    collections::{HashMap, VecDeque},
    fmt,
    process::ExitStatus,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, PoisonError,
    },
};

use thiserror::Error;
use tokio::sync::mpsc;

/// Reply for a launched blocking training run
pub const TRAINING_SUCCESS_MESSAGE: &str =
    "Training Successful! Check server logs for output from main.py.";

/// Prefix of every training failure reply
pub const TRAINING_FAILURE_PREFIX: &str = "Training Failed: ";

/// Pending tasks allowed in background mode before submissions are refused
pub const QUEUE_CAPACITY: usize = 16;

/// Finished tasks kept for `/train/{id}`; older ones are forgotten
pub const RETAINED_TASKS: usize = 64;

/// Error type for launching training
#[derive(Debug, Error)]
pub enum TrainError {
    /// The training process could not be started or waited on
    #[error("{0}")]
    Launch(#[from] std::io::Error),

    /// Background queue has no free slot
    #[error("training queue is full ({capacity} pending)")]
    QueueFull {
        /// Queue capacity
        capacity: usize,
    },

    /// Background worker is gone
    #[error("training worker is not running")]
    QueueClosed,
}

/// Program and arguments that run training
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainCommand {
    /// Executable name or path
    pub program: String,
    /// Arguments passed verbatim
    pub args: Vec<String>,
}

impl TrainCommand {
    /// Build a command
    #[must_use]
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Launch and wait for exit (no timeout)
    async fn run(&self) -> Result<ExitStatus, TrainError> {
        let mut child = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .spawn()?;
        Ok(child.wait().await?)
    }
}

impl Default for TrainCommand {
    fn default() -> Self {
        Self::new("python", vec!["main.py".to_string()])
    }
}

impl fmt::Display for TrainCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// How `/train` runs the command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum TrainMode {
    /// Wait for the process inside the request
    #[default]
    Blocking,
    /// Queue the run and answer immediately
    Background,
}

/// Identifier of a background training task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a background training task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    /// Waiting for the worker
    Queued,
    /// Process is running
    Running,
    /// Process exited; `None` when killed by a signal
    Finished {
        /// Exit code
        exit_code: Option<i32>,
    },
    /// Process could not be launched
    Failed(String),
}

impl TaskState {
    /// Whether the task will not change state again
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished { .. } | Self::Failed(_))
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => f.write_str("queued"),
            Self::Running => f.write_str("running"),
            Self::Finished {
                exit_code: Some(code),
            } => write!(f, "finished (exit code {code})"),
            Self::Finished { exit_code: None } => f.write_str("finished (terminated by signal)"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Result of one `/train` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrainOutcome {
    /// Blocking run launched and exited (status not inspected)
    Completed {
        /// Exit code, logged only
        exit_code: Option<i32>,
    },
    /// Background run queued
    Submitted(TaskId),
    /// Launch or submission failed
    Failed(String),
}

impl TrainOutcome {
    /// Plain-text reply for the HTTP client
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Completed { .. } => TRAINING_SUCCESS_MESSAGE.to_string(),
            Self::Submitted(id) => format!(
                "Training Submitted! Task {id} queued. Check server logs for output from main.py."
            ),
            Self::Failed(reason) => format!("{TRAINING_FAILURE_PREFIX}{reason}"),
        }
    }
}

/// Task states, with finished tasks evicted oldest first
#[derive(Debug)]
struct TaskTable {
    states: HashMap<TaskId, TaskState>,
    finished: VecDeque<TaskId>,
    retain: usize,
}

impl TaskTable {
    fn new(retain: usize) -> Self {
        Self {
            states: HashMap::new(),
            finished: VecDeque::new(),
            retain,
        }
    }

    fn set(&mut self, id: TaskId, state: TaskState) {
        let terminal = state.is_terminal();
        self.states.insert(id, state);
        if terminal {
            self.finished.push_back(id);
            while self.finished.len() > self.retain {
                if let Some(oldest) = self.finished.pop_front() {
                    self.states.remove(&oldest);
                }
            }
        }
    }

    fn get(&self, id: TaskId) -> Option<TaskState> {
        self.states.get(&id).cloned()
    }

    fn remove(&mut self, id: TaskId) {
        self.states.remove(&id);
    }
}

type SharedTasks = Arc<Mutex<TaskTable>>;

fn set_state(tasks: &SharedTasks, id: TaskId, state: TaskState) {
    tasks
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .set(id, state);
}

#[derive(Debug)]
struct BackgroundQueue {
    tx: mpsc::Sender<TaskId>,
    tasks: SharedTasks,
    next_id: AtomicU64,
}

#[derive(Debug)]
enum Runner {
    Blocking,
    Background(BackgroundQueue),
}

/// Launches training in the configured mode
#[derive(Debug)]
pub struct TrainingTrigger {
    command: TrainCommand,
    runner: Runner,
}

impl TrainingTrigger {
    /// Trigger that waits for the process inside the request
    #[must_use]
    pub fn blocking(command: TrainCommand) -> Self {
        Self {
            command,
            runner: Runner::Blocking,
        }
    }

    /// Trigger that queues runs for a background worker
    ///
    /// Must be called from within a tokio runtime; the worker task lives
    /// until the trigger is dropped.
    #[must_use]
    pub fn background(command: TrainCommand) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let queue = BackgroundQueue::new(tx);
        tokio::spawn(run_worker(command.clone(), rx, Arc::clone(&queue.tasks)));
        Self {
            command,
            runner: Runner::Background(queue),
        }
    }

    /// Build a trigger for `mode`
    #[must_use]
    pub fn with_mode(command: TrainCommand, mode: TrainMode) -> Self {
        match mode {
            TrainMode::Blocking => Self::blocking(command),
            TrainMode::Background => Self::background(command),
        }
    }

    /// Configured command
    #[must_use]
    pub fn command(&self) -> &TrainCommand {
        &self.command
    }

    /// Configured mode
    #[must_use]
    pub fn mode(&self) -> TrainMode {
        match self.runner {
            Runner::Blocking => TrainMode::Blocking,
            Runner::Background(_) => TrainMode::Background,
        }
    }

    /// Run (blocking) or enqueue (background) one training
    pub async fn trigger(&self) -> TrainOutcome {
        tracing::info!(command = %self.command, mode = ?self.mode(), "triggering training");
        let outcome = match &self.runner {
            Runner::Blocking => match self.command.run().await {
                Ok(status) => {
                    tracing::info!(exit_code = ?status.code(), "training process exited");
                    TrainOutcome::Completed {
                        exit_code: status.code(),
                    }
                },
                Err(e) => TrainOutcome::Failed(e.to_string()),
            },
            Runner::Background(queue) => match queue.submit() {
                Ok(id) => TrainOutcome::Submitted(id),
                Err(e) => TrainOutcome::Failed(e.to_string()),
            },
        };
        if let TrainOutcome::Failed(reason) = &outcome {
            tracing::error!(command = %self.command, %reason, "training launch failed");
        }
        outcome
    }

    /// State of a background task; always `None` in blocking mode
    #[must_use]
    pub fn status(&self, id: TaskId) -> Option<TaskState> {
        match &self.runner {
            Runner::Blocking => None,
            Runner::Background(queue) => queue
                .tasks
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get(id),
        }
    }
}

impl BackgroundQueue {
    fn new(tx: mpsc::Sender<TaskId>) -> Self {
        Self {
            tx,
            tasks: Arc::new(Mutex::new(TaskTable::new(RETAINED_TASKS))),
            next_id: AtomicU64::new(1),
        }
    }

    fn submit(&self) -> Result<TaskId, TrainError> {
        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed));
        set_state(&self.tasks, id, TaskState::Queued);
        if let Err(e) = self.tx.try_send(id) {
            self.tasks
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(id);
            return Err(match e {
                mpsc::error::TrySendError::Full(_) => TrainError::QueueFull {
                    capacity: QUEUE_CAPACITY,
                },
                mpsc::error::TrySendError::Closed(_) => TrainError::QueueClosed,
            });
        }
        Ok(id)
    }
}

async fn run_worker(command: TrainCommand, mut rx: mpsc::Receiver<TaskId>, tasks: SharedTasks) {
    while let Some(id) = rx.recv().await {
        set_state(&tasks, id, TaskState::Running);
        tracing::info!(task = %id, command = %command, "training task started");
        let state = match command.run().await {
            Ok(status) => TaskState::Finished {
                exit_code: status.code(),
            },
            Err(e) => TaskState::Failed(e.to_string()),
        };
        tracing::info!(task = %id, state = %state, "training task done");
        set_state(&tasks, id, state);
    }
}
