//! Task runtime adapter: runs controller tasks on tokio's blocking pool and
//! tracks each one through its state machine.

use std::any::Any;
use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::services::ports::task::{AsyncExecutor, BoxFuture, InterruptFlag, Task, TaskError, TaskState};

struct Progress<T> {
    state: TaskState,
    result: Option<T>,
    error: Option<TaskError>,
}

struct Shared<T> {
    progress: Mutex<Progress<T>>,
    changed: Condvar,
    interrupt: InterruptFlag,
    interruptible: bool,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, Progress<T>> {
        self.progress.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct TaskMonitor<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for TaskMonitor<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> TaskMonitor<T> {
    pub fn state(&self) -> TaskState {
        self.shared.lock().state
    }

    /// Cancels a task that has not started yet, or interrupts a running
    /// interruptible one. Returns false when neither is possible.
    pub fn cancel(&self) -> bool {
        let mut progress = self.shared.lock();
        match progress.state {
            TaskState::NotStarted => {
                progress.state = TaskState::Canceled;
                drop(progress);
                self.shared.changed.notify_all();
                tracing::debug!("task canceled before start");
                true
            }
            TaskState::Started if self.shared.interruptible => {
                self.shared.interrupt.interrupt();
                tracing::debug!("task interrupt requested");
                true
            }
            _ => false,
        }
    }

    /// Blocks until the task finishes or `timeout` elapses.
    pub fn wait_timeout(&self, timeout: Duration) -> TaskState {
        let progress = self.shared.lock();
        let (progress, _) = self
            .shared
            .changed
            .wait_timeout_while(progress, timeout, |p| !p.state.is_finished())
            .unwrap_or_else(PoisonError::into_inner);
        progress.state
    }

    pub fn take_result(&self) -> Option<T> {
        self.shared.lock().result.take()
    }

    pub fn error(&self) -> Option<TaskError> {
        self.shared.lock().error.clone()
    }
}

pub struct TaskRuntime {
    runtime: tokio::runtime::Runtime,
}

impl TaskRuntime {
    pub fn new(worker_threads: usize, blocking_threads: usize) -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(worker_threads.max(1))
            .max_blocking_threads(blocking_threads.max(1))
            .thread_name("navstack-task")
            .enable_all()
            .build()
            .or_else(|e| {
                tracing::error!(
                    error = %e,
                    "Failed to create multi-thread tokio runtime, falling back to current-thread"
                );
                tokio::runtime::Builder::new_current_thread()
                    .max_blocking_threads(blocking_threads.max(1))
                    .enable_all()
                    .build()
            })?;
        Ok(Self { runtime })
    }

    pub fn submit<T: Send + 'static>(&self, task: Task<T>) -> TaskMonitor<T> {
        let shared = Arc::new(Shared {
            progress: Mutex::new(Progress {
                state: TaskState::NotStarted,
                result: None,
                error: None,
            }),
            changed: Condvar::new(),
            interrupt: InterruptFlag::new(),
            interruptible: task.interruptible,
        });
        let monitor = TaskMonitor {
            shared: Arc::clone(&shared),
        };
        self.runtime.spawn_blocking(move || run(&shared, task));
        monitor
    }
}

impl AsyncExecutor for TaskRuntime {
    fn spawn(&self, task: BoxFuture) {
        self.runtime.spawn(task);
    }
}

fn run<T>(shared: &Shared<T>, task: Task<T>) {
    {
        let mut progress = shared.lock();
        if progress.state != TaskState::NotStarted {
            return;
        }
        progress.state = TaskState::Started;
    }
    shared.changed.notify_all();

    let Task { body, on_error, .. } = task;
    let interrupt = shared.interrupt.clone();
    let outcome = match catch_unwind(AssertUnwindSafe(move || body(&interrupt))) {
        Ok(outcome) => outcome,
        Err(payload) => Err(TaskError::Panicked(panic_message(payload.as_ref()))),
    };

    let (state, value, error) = match outcome {
        Ok(value) => (TaskState::Done, Some(value), None),
        Err(TaskError::Interrupted) => (TaskState::Interrupted, None, None),
        Err(err) => (TaskState::Erred, None, Some(err)),
    };

    if let Some(err) = &error {
        match on_error {
            Some(handler) => {
                if let Err(payload) = catch_unwind(AssertUnwindSafe(|| handler(err))) {
                    tracing::warn!(
                        error = %err,
                        panic = %panic_message(payload.as_ref()),
                        "task error handler panicked"
                    );
                }
            }
            None => tracing::warn!(error = %err, "task failed"),
        }
    }

    {
        let mut progress = shared.lock();
        progress.state = state;
        progress.result = value;
        progress.error = error;
    }
    shared.changed.notify_all();
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
#[path = "../../../tests/unit/services/adapters/runtime.rs"]
mod tests;
