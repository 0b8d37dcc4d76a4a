use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

pub type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Fire-and-forget execution of async work.
pub trait AsyncExecutor: Send + Sync {
    fn spawn(&self, task: BoxFuture);
}

/// `NotStarted -> Started -> {Done | Erred | Canceled | Interrupted}`;
/// a task canceled before it starts goes straight to `Canceled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    NotStarted,
    Started,
    Done,
    Erred,
    Canceled,
    Interrupted,
}

impl TaskState {
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            TaskState::Done | TaskState::Erred | TaskState::Canceled | TaskState::Interrupted
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("task failed: {0}")]
    Failed(String),
    #[error("task interrupted")]
    Interrupted,
    #[error("task panicked: {0}")]
    Panicked(String),
}

impl TaskError {
    pub fn failed(reason: impl std::fmt::Display) -> Self {
        TaskError::Failed(reason.to_string())
    }
}

/// Cooperative interrupt signal handed to a running task body.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interrupt(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_interrupted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Interrupted)` once interruption was requested; use with `?`.
    pub fn check(&self) -> Result<(), TaskError> {
        if self.is_interrupted() {
            Err(TaskError::Interrupted)
        } else {
            Ok(())
        }
    }
}

type Body<T> = Box<dyn FnOnce(&InterruptFlag) -> Result<T, TaskError> + Send>;
type ErrorHandler = Box<dyn FnOnce(&TaskError) + Send>;

/// A unit of controller-level background work.
pub struct Task<T> {
    pub(crate) body: Body<T>,
    pub(crate) interruptible: bool,
    pub(crate) on_error: Option<ErrorHandler>,
}

impl<T: Send + 'static> Task<T> {
    pub fn new<F>(body: F) -> Self
    where
        F: FnOnce(&InterruptFlag) -> Result<T, TaskError> + Send + 'static,
    {
        Self {
            body: Box::new(body),
            interruptible: false,
            on_error: None,
        }
    }

    /// The body polls its [`InterruptFlag`]; cancel may interrupt it.
    pub fn interruptible(mut self) -> Self {
        self.interruptible = true;
        self
    }

    /// Receives the error instead of the log.
    pub fn on_error<F>(mut self, handler: F) -> Self
    where
        F: FnOnce(&TaskError) + Send + 'static,
    {
        self.on_error = Some(Box::new(handler));
        self
    }
}
