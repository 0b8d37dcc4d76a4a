use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::event::NavigationEvent;
use super::navigator::Navigator;
use crate::core::graph::ObjectGraph;
use crate::models::{Location, NavigationModel};
use crate::services::bus::{EventBus, EventReceiver, SubscriptionId};

/// Owns the navigation model and hands out [`Navigator`]s.
///
/// Cloning is cheap and every clone drives the same history. The model is
/// only locked for the duration of a single operation; callers are expected
/// to serialize navigation onto one thread.
#[derive(Clone)]
pub struct NavigationManager {
    inner: Arc<Inner>,
}

struct Inner {
    model: Mutex<NavigationModel>,
    graph: Arc<ObjectGraph>,
    bus: EventBus<NavigationEvent>,
    log_history: bool,
    next_navigator: AtomicU64,
}

impl NavigationManager {
    pub fn new(graph: Arc<ObjectGraph>) -> Self {
        Self::with_options(graph, false)
    }

    pub fn with_options(graph: Arc<ObjectGraph>, log_history: bool) -> Self {
        Self {
            inner: Arc::new(Inner {
                model: Mutex::new(NavigationModel::new()),
                graph,
                bus: EventBus::new(),
                log_history,
                next_navigator: AtomicU64::new(1),
            }),
        }
    }

    pub fn graph(&self) -> &Arc<ObjectGraph> {
        &self.inner.graph
    }

    pub(crate) fn lock_model(&self) -> MutexGuard<'_, NavigationModel> {
        self.inner
            .model
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn navigate(&self, sender: impl Into<Arc<str>>) -> Navigator {
        let id = self.inner.next_navigator.fetch_add(1, Ordering::Relaxed);
        Navigator::new(id, sender.into(), self.clone())
    }

    pub fn current_location(&self) -> Option<Location> {
        self.lock_model().current_location().cloned()
    }

    /// Snapshot of the model, for persistence.
    pub fn model(&self) -> NavigationModel {
        self.lock_model().clone()
    }

    /// Replaces the whole history, e.g. after process death. No event is
    /// posted.
    pub fn restore_model(&self, model: NavigationModel) {
        tracing::debug!(history = ?model.location_ids(), "navigation model restored");
        *self.lock_model() = model;
    }

    /// Ids from the current location to the root.
    pub fn history_ids(&self) -> Vec<Option<String>> {
        self.lock_model().location_ids()
    }

    pub fn events(&self) -> &EventBus<NavigationEvent> {
        &self.inner.bus
    }

    pub fn subscribe<F>(&self, f: F) -> SubscriptionId
    where
        F: Fn(&NavigationEvent) + Send + Sync + 'static,
    {
        self.inner.bus.subscribe(f)
    }

    pub fn receiver(&self) -> EventReceiver<NavigationEvent> {
        self.inner.bus.channel()
    }

    pub(crate) fn post(&self, event: &NavigationEvent) {
        if self.inner.log_history && !event.is_app_exit() {
            self.dump_history();
        }
        self.inner.bus.post(event);
    }

    /// Logs the current history at debug level.
    pub fn dump_history(&self) {
        let model = self.lock_model();
        match model.current_location() {
            Some(current) => tracing::debug!(history = %current, "navigation history"),
            None => tracing::debug!("navigation history is empty"),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/navigation/manager.rs"]
mod tests;
