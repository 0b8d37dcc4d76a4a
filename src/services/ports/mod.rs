//! Service ports: traits + data contracts.

pub mod config;
pub mod store;
pub mod task;

pub use config::FrameworkConfig;
pub use store::{KeyValueStore, StoreError};
pub use task::{AsyncExecutor, BoxFuture, InterruptFlag, Task, TaskError, TaskState};
