//! 应用上下文：组合根
//!
//! 持有对象图、导航管理器、状态保存器和任务运行时；
//! 每个测试都可以构造一个全新的上下文。

use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use super::graph::ObjectGraph;
use crate::navigation::{NavigationManager, Navigator};
use crate::services::adapters::{
    get_state_file_path, FileStore, MemoryStore, TaskMonitor, TaskRuntime,
};
use crate::services::ports::{FrameworkConfig, KeyValueStore, StoreError, Task};
use crate::state::{self, StateKeeper};

pub struct AppContext {
    config: FrameworkConfig,
    graph: Arc<ObjectGraph>,
    navigation: NavigationManager,
    state: StateKeeper,
    tasks: Mutex<Option<Arc<TaskRuntime>>>,
}

impl AppContext {
    /// Default config, in-memory state.
    pub fn new() -> Self {
        Self::with_store(FrameworkConfig::default(), Arc::new(MemoryStore::new()))
    }

    pub fn with_store(config: FrameworkConfig, store: Arc<dyn KeyValueStore>) -> Self {
        let graph = Arc::new(ObjectGraph::new());
        let navigation = NavigationManager::with_options(Arc::clone(&graph), config.log_history);
        Self {
            config,
            graph,
            navigation,
            state: StateKeeper::new(store),
            tasks: Mutex::new(None),
        }
    }

    /// State persisted to `path`, or to the per-user state file when `None`.
    pub fn persistent(config: FrameworkConfig, path: Option<&Path>) -> Result<Self, StoreError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => get_state_file_path().ok_or_else(|| {
                StoreError::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    "Cannot determine state directory",
                ))
            })?,
        };
        let store = FileStore::open(path)?;
        Ok(Self::with_store(config, Arc::new(store)))
    }

    pub fn config(&self) -> &FrameworkConfig {
        &self.config
    }

    pub fn graph(&self) -> &Arc<ObjectGraph> {
        &self.graph
    }

    pub fn navigation(&self) -> &NavigationManager {
        &self.navigation
    }

    pub fn navigate(&self, sender: impl Into<Arc<str>>) -> Navigator {
        self.navigation.navigate(sender)
    }

    pub fn state(&self) -> &StateKeeper {
        &self.state
    }

    pub fn save_navigation(&self) -> state::Result<()> {
        self.state.save_navigation(&self.navigation)
    }

    pub fn restore_navigation(&self) -> state::Result<bool> {
        self.state.restore_navigation(&self.navigation)
    }

    /// The task runtime, started on first use.
    pub fn tasks(&self) -> io::Result<Arc<TaskRuntime>> {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(runtime) = tasks.as_ref() {
            return Ok(Arc::clone(runtime));
        }
        let runtime = Arc::new(TaskRuntime::new(
            self.config.task_worker_threads,
            self.config.task_blocking_threads,
        )?);
        *tasks = Some(Arc::clone(&runtime));
        Ok(runtime)
    }

    pub fn run_task<T: Send + 'static>(&self, task: Task<T>) -> io::Result<TaskMonitor<T>> {
        Ok(self.tasks()?.submit(task))
    }
}

impl Default for AppContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/core/context.rs"]
mod tests;
