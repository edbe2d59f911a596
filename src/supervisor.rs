//! Supervised background task group.

use std::future::Future;

use tokio::sync::mpsc;
use tracing::warn;

use crate::error::AgentError;

/// Terminal failure of a supervised task.
#[derive(Debug)]
pub struct TaskFailure {
    /// Name the task was spawned under.
    pub task: &'static str,
    /// The error it exited with.
    pub error: AgentError,
}

/// Supervises the agent's long-running tasks.
///
/// Each spawned task reports its terminal result. The first error lands in a
/// single-slot completion signal and [`TaskGroup::wait`] resolves with it;
/// later failures are dropped. Surviving tasks are not interrupted — on
/// failure the process is expected to exit, which is an accepted
/// soft-shutdown limitation.
pub struct TaskGroup {
    tx: mpsc::Sender<TaskFailure>,
    rx: mpsc::Receiver<TaskFailure>,
}

impl TaskGroup {
    /// Create an empty group.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(1);
        Self { tx, rx }
    }

    /// Spawn `fut` under `name`.
    ///
    /// Supervised tasks run for the life of the process, so even a clean
    /// exit is worth a warning.
    pub fn spawn<F>(&self, name: &'static str, fut: F)
    where
        F: Future<Output = Result<(), AgentError>> + Send + 'static,
    {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            match fut.await {
                Ok(()) => warn!(task = name, "task exited"),
                Err(error) => {
                    warn!(task = name, error = %error, "task failed");
                    // the slot holds one failure; the first wins
                    let _ = tx.try_send(TaskFailure { task: name, error });
                }
            }
        });
    }

    /// Wait for the first task failure.
    ///
    /// Returns `None` only if every spawned task exits cleanly.
    pub async fn wait(mut self) -> Option<TaskFailure> {
        drop(self.tx);
        self.rx.recv().await
    }
}

impl Default for TaskGroup {
    fn default() -> Self {
        Self::new()
    }
}
