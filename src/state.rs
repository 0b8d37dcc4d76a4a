//! 状态保存与恢复
//!
//! 每个有状态控制器的模型以其类型名为 key 序列化进键值存储；
//! 导航模型存放在固定 key 下。

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::type_name;
use std::sync::Arc;
use thiserror::Error;

use crate::models::NavigationModel;
use crate::navigation::NavigationManager;
use crate::services::ports::store::{KeyValueStore, StoreError};

pub const NAVIGATION_STATE_KEY: &str = "navstack.navigation";

pub type Result<T> = std::result::Result<T, StateError>;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to (de)serialize state for {key}: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A controller whose model survives configuration changes and process death.
pub trait StateManaged {
    type Model: Serialize + DeserializeOwned;

    fn model(&self) -> &Self::Model;

    fn restore_model(&mut self, model: Self::Model);

    fn state_key(&self) -> String {
        type_name::<Self>().to_string()
    }
}

#[derive(Clone)]
pub struct StateKeeper {
    store: Arc<dyn KeyValueStore>,
}

impl StateKeeper {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub fn save<C: StateManaged>(&self, controller: &C) -> Result<()> {
        let key = controller.state_key();
        let json = serde_json::to_string(controller.model()).map_err(|source| {
            StateError::Serialize {
                key: key.clone(),
                source,
            }
        })?;
        self.store.put(&key, json)?;
        tracing::trace!(key = %key, "controller state saved");
        Ok(())
    }

    /// Returns false when nothing was saved for this controller.
    pub fn restore<C: StateManaged>(&self, controller: &mut C) -> Result<bool> {
        let key = controller.state_key();
        let Some(json) = self.store.get(&key)? else {
            return Ok(false);
        };
        let model = serde_json::from_str::<C::Model>(&json)
            .map_err(|source| StateError::Serialize { key: key.clone(), source })?;
        controller.restore_model(model);
        tracing::trace!(key = %key, "controller state restored");
        Ok(true)
    }

    pub fn discard<C: StateManaged>(&self, controller: &C) -> Result<bool> {
        Ok(self.store.remove(&controller.state_key())?)
    }

    pub fn save_navigation(&self, manager: &NavigationManager) -> Result<()> {
        let model = manager.model();
        let json = serde_json::to_string(&model).map_err(|source| StateError::Serialize {
            key: NAVIGATION_STATE_KEY.to_string(),
            source,
        })?;
        self.store.put(NAVIGATION_STATE_KEY, json)?;
        Ok(())
    }

    /// Returns false when no navigation state was saved.
    pub fn restore_navigation(&self, manager: &NavigationManager) -> Result<bool> {
        let Some(json) = self.store.get(NAVIGATION_STATE_KEY)? else {
            return Ok(false);
        };
        let model: NavigationModel =
            serde_json::from_str(&json).map_err(|source| StateError::Serialize {
                key: NAVIGATION_STATE_KEY.to_string(),
                source,
            })?;
        manager.restore_model(model);
        Ok(true)
    }
}

#[cfg(test)]
#[path = "../tests/unit/state.rs"]
mod tests;
