//! 应用数据路径
//!
//! - macOS: ~/Library/Application Support/navstack
//! - Linux: $XDG_DATA_HOME/navstack 或 ~/.local/share/navstack
//! - Windows: %APPDATA%\navstack

use std::path::PathBuf;

const APP_NAME: &str = "navstack";
const LOG_DIR: &str = "logs";
const STATE_FILE: &str = "state.json";
const CONFIG_FILE: &str = "config.json";

fn get_app_data_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        std::env::var("HOME").ok().map(|home| {
            PathBuf::from(home)
                .join("Library/Application Support")
                .join(APP_NAME)
        })
    }

    #[cfg(target_os = "linux")]
    {
        if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
            Some(PathBuf::from(xdg).join(APP_NAME))
        } else {
            std::env::var("HOME")
                .ok()
                .map(|home| PathBuf::from(home).join(".local/share").join(APP_NAME))
        }
    }

    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA")
            .ok()
            .map(|appdata| PathBuf::from(appdata).join(APP_NAME))
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        None
    }
}

pub fn get_log_dir() -> Option<PathBuf> {
    get_app_data_dir().map(|p| p.join(LOG_DIR))
}

/// Default location of the persisted state document.
pub fn get_state_file_path() -> Option<PathBuf> {
    get_app_data_dir().map(|p| p.join(STATE_FILE))
}

pub fn get_config_path() -> Option<PathBuf> {
    get_app_data_dir().map(|p| p.join(CONFIG_FILE))
}

pub fn ensure_log_dir() -> std::io::Result<PathBuf> {
    let dir = get_log_dir().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Cannot determine log directory",
        )
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
    }

    Ok(dir)
}
