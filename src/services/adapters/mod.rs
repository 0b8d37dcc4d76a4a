//! Service adapters: runtime and storage implementations.

pub mod paths;
pub mod runtime;
pub mod settings;
pub mod store;

pub use paths::{ensure_log_dir, get_config_path, get_log_dir, get_state_file_path};
pub use runtime::{TaskMonitor, TaskRuntime};
pub use settings::{ensure_config_file, load_config, load_config_or_default, ConfigError};
pub use store::{FileStore, MemoryStore};
