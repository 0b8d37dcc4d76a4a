//! Navigator：一次导航操作的构建器
//!
//! 生命周期：Created -> EventPosted -> Settled
//! - with() 预先引用控制器，直到 settle 才释放
//! - to()/back()/back_to() 修改模型并发出事件
//! - 没有位置变化时不发事件，预引用的实例在 Navigator 丢弃时释放

use compact_str::CompactString;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use super::event::{AppExitEvent, BackEvent, ForwardEvent, NavigationEvent};
use super::manager::NavigationManager;
use crate::core::graph::ObjectGraph;
use crate::core::service::{GraphError, Service};
use crate::models::Location;

pub type Result<T> = std::result::Result<T, NavigationError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    #[error("failed to prepare navigation: {0}")]
    Graph(#[from] GraphError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ClearTarget {
    All,
    To(CompactString),
}

/// Options of a forward navigation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Forwarder {
    clear: Option<ClearTarget>,
    interim: bool,
}

impl Forwarder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops history above `location_id` before pushing. Falls back to a
    /// plain push when `location_id` is not in the history.
    pub fn clear_to(mut self, location_id: &str) -> Self {
        self.clear = Some(ClearTarget::To(CompactString::from(location_id)));
        self
    }

    /// Drops the whole history; the new location becomes the root.
    pub fn clear_all(mut self) -> Self {
        self.clear = Some(ClearTarget::All);
        self
    }

    /// Interim locations are skipped by a single-step back.
    pub fn interim(mut self, interim: bool) -> Self {
        self.interim = interim;
        self
    }

    pub fn clear_to_location_id(&self) -> Option<&str> {
        match &self.clear {
            Some(ClearTarget::To(id)) => Some(id.as_str()),
            _ => None,
        }
    }

    pub fn is_clear_all(&self) -> bool {
        matches!(self.clear, Some(ClearTarget::All))
    }

    pub fn is_interim(&self) -> bool {
        self.interim
    }
}

type Release = Box<dyn FnOnce(&ObjectGraph) -> crate::core::service::Result<()> + Send>;

struct PendingRelease {
    service: String,
    release: Release,
}

/// Work that must happen exactly once when the transition settles.
struct SettleWork {
    graph: Arc<ObjectGraph>,
    releases: Vec<PendingRelease>,
    on_settled: Option<Box<dyn FnOnce() + Send>>,
}

impl SettleWork {
    fn settle(mut self) {
        if let Some(callback) = self.on_settled.take() {
            callback();
        }
        self.release_all();
    }

    fn release_all(&mut self) {
        for pending in self.releases.drain(..) {
            if let Err(err) = (pending.release)(&self.graph) {
                tracing::warn!(service = %pending.service, error = %err, "failed to release navigation dependency");
            }
        }
    }
}

impl Drop for SettleWork {
    fn drop(&mut self) {
        self.release_all();
    }
}

/// Shared by the events a navigator posts. The first `destroy` settles.
#[derive(Clone)]
pub struct NavigatorHandle {
    id: u64,
    work: Arc<Mutex<Option<SettleWork>>>,
}

impl NavigatorHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Runs the settle callback and releases prepared instances. Returns
    /// false when already settled.
    pub fn destroy(&self) -> bool {
        let work = self
            .work
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match work {
            Some(work) => {
                tracing::trace!(navigator = self.id, "settled");
                work.settle();
                true
            }
            None => false,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.work
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl fmt::Debug for NavigatorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigatorHandle")
            .field("id", &self.id)
            .field("settled", &self.is_settled())
            .finish()
    }
}

pub struct Navigator {
    id: u64,
    sender: Arc<str>,
    manager: NavigationManager,
    work: SettleWork,
}

impl Navigator {
    pub(crate) fn new(id: u64, sender: Arc<str>, manager: NavigationManager) -> Self {
        let graph = Arc::clone(manager.graph());
        Self {
            id,
            sender,
            manager,
            work: SettleWork {
                graph,
                releases: Vec::new(),
                on_settled: None,
            },
        }
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// References `T` and hands it to `prepare` before navigating. The
    /// reference is held until the navigation settles.
    pub fn with<T, F>(mut self, qualifier: Option<&str>, prepare: F) -> Result<Self>
    where
        T: Service,
        F: FnOnce(&T),
    {
        let instance = self.work.graph.reference::<T>(qualifier)?;

        // Queued first so a panicking `prepare` still releases on drop.
        let held = Arc::clone(&instance);
        let owned_qualifier = qualifier.map(str::to_string);
        self.work.releases.push(PendingRelease {
            service: std::any::type_name::<T>().to_string(),
            release: Box::new(move |graph: &ObjectGraph| {
                graph.dereference(&held, owned_qualifier.as_deref())
            }),
        });

        prepare(instance.as_ref());
        Ok(self)
    }

    pub fn on_settled<F>(mut self, callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.work.on_settled = Some(Box::new(callback));
        self
    }

    fn into_handle(self) -> (Arc<str>, NavigationManager, NavigatorHandle) {
        let handle = NavigatorHandle {
            id: self.id,
            work: Arc::new(Mutex::new(Some(self.work))),
        };
        (self.sender, self.manager, handle)
    }

    /// Forward navigation. Returns the posted event, or `None` when the
    /// location did not change.
    pub fn to(self, location_id: &str, forwarder: Forwarder) -> Option<NavigationEvent> {
        let (last, current, clear_top, cleared_to) = {
            let mut model = self.manager.lock_model();
            let last = model.current_location().cloned();

            let mut clear_top = false;
            let mut cleared_to: Option<Location> = None;
            match &forwarder.clear {
                Some(ClearTarget::All) => clear_top = true,
                Some(ClearTarget::To(target)) => {
                    match last.as_ref().and_then(|loc| loc.find(target)) {
                        Some(found) => {
                            clear_top = true;
                            cleared_to = Some(found.clone());
                        }
                        None => {
                            tracing::debug!(
                                clear_to = %target,
                                location = location_id,
                                "clear-to location not in history, navigating without clearing"
                            );
                        }
                    }
                }
                None => {}
            }

            let changed = clear_top || last.as_ref().and_then(Location::id) != Some(location_id);
            if !changed {
                tracing::debug!(location = location_id, "already at location, navigation skipped");
                return None;
            }

            let previous = if clear_top { cleared_to.clone() } else { last.clone() };
            let current = Location::new(Some(location_id), previous, forwarder.interim);
            model.set_current_location(Some(current.clone()));
            (last, current, clear_top, cleared_to)
        };

        let (sender, manager, navigator) = self.into_handle();
        let event = NavigationEvent::Forward(ForwardEvent {
            sender,
            last_location: last,
            current_location: current,
            clear_top,
            cleared_top_to_location: cleared_to,
            navigator,
        });
        manager.post(&event);
        Some(event)
    }

    /// One step back, skipping interim locations.
    pub fn back(self) -> Option<NavigationEvent> {
        let (last, current) = {
            let mut model = self.manager.lock_model();
            let Some(last) = model.current_location().cloned() else {
                tracing::warn!(sender = %self.sender, "back navigation without a current location");
                return None;
            };
            let current = last.previous_non_interim().cloned();
            model.set_current_location(current.clone());
            (last, current)
        };
        Some(self.post_back(last, current, false))
    }

    /// Fast rewind. `None` rewinds to the root; otherwise to the nearest
    /// ancestor with `location_id`. Unknown targets are ignored.
    pub fn back_to(self, location_id: Option<&str>) -> Option<NavigationEvent> {
        let (last, current) = {
            let mut model = self.manager.lock_model();
            let Some(last) = model.current_location().cloned() else {
                tracing::warn!(sender = %self.sender, "fast rewind without a current location");
                return None;
            };
            if last.is_root() {
                tracing::debug!("fast rewind at root, nothing to do");
                return None;
            }
            let target = match location_id {
                None => Some(last.root_location().clone()),
                Some(id) => last
                    .ancestors()
                    .skip(1)
                    .find(|loc| loc.id() == Some(id))
                    .cloned(),
            };
            let Some(target) = target else {
                tracing::warn!(
                    to = location_id.unwrap_or_default(),
                    "fast rewind target not in history, navigation skipped"
                );
                return None;
            };
            model.set_current_location(Some(target.clone()));
            (last, Some(target))
        };
        Some(self.post_back(last, current, true))
    }

    fn post_back(
        self,
        last: Location,
        current: Option<Location>,
        fast_rewind: bool,
    ) -> NavigationEvent {
        let (sender, manager, navigator) = self.into_handle();
        let exiting = current.is_none();
        let event = NavigationEvent::Back(BackEvent {
            sender: Arc::clone(&sender),
            last_location: last,
            current_location: current,
            fast_rewind,
            navigator,
        });
        manager.post(&event);
        if exiting {
            tracing::info!(sender = %sender, "history exhausted, exiting");
            manager.post(&NavigationEvent::AppExit(AppExitEvent { sender }));
        }
        event
    }
}

#[cfg(test)]
#[path = "../../tests/unit/navigation/navigator.rs"]
mod tests;
