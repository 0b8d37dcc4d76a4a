use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("store document is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// External key-value persistence (saved instance state, preferences...).
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn put(&self, key: &str, value: String) -> Result<(), StoreError>;

    fn remove(&self, key: &str) -> Result<bool, StoreError>;

    fn keys(&self) -> Result<Vec<String>, StoreError>;
}
