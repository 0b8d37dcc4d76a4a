use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameworkConfig {
    /// Async worker threads of the task runtime.
    pub task_worker_threads: usize,
    /// Upper bound of concurrently running blocking tasks.
    pub task_blocking_threads: usize,
    /// Log the whole history after every navigation.
    pub log_history: bool,
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    pub log_filter: String,
    pub log_file_name: String,
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        Self {
            task_worker_threads: 2,
            task_blocking_threads: 4,
            log_history: false,
            log_filter: "navstack=info".to_string(),
            log_file_name: "navstack.log".to_string(),
        }
    }
}
