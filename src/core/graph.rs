//! 引用计数对象图
//!
//! - 按 (类型, qualifier) 注册工厂
//! - 第一次 reference 时构造并缓存，之后共享同一实例
//! - 引用计数归零时调用 on_disposed 并移出缓存
//! - 子图查找失败时委托给父图

use rustc_hash::FxHashMap;
use std::any::{type_name, Any};
use std::ops::Deref;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::{self, ThreadId};

use super::service::{GraphError, Result, Service, ServiceKey};

type AnyInstance = Arc<dyn Any + Send + Sync>;
type Factory = Arc<dyn Fn(&ObjectGraph) -> Result<Built> + Send + Sync>;

struct Built {
    instance: AnyInstance,
    service: Arc<dyn Service>,
}

struct Entry {
    instance: AnyInstance,
    service: Arc<dyn Service>,
    count: usize,
}

#[derive(Default)]
struct GraphState {
    entries: FxHashMap<ServiceKey, Entry>,
    constructing: FxHashMap<ServiceKey, ThreadId>,
    /// Key each blocked thread is waiting on.
    waiting: FxHashMap<ThreadId, ServiceKey>,
}

impl GraphState {
    /// Whether waiting for `owner` would, through other waiting builders,
    /// end up waiting for `me`.
    fn leads_back_to(&self, owner: ThreadId, me: ThreadId) -> bool {
        let mut current = owner;
        for _ in 0..=self.waiting.len() {
            if current == me {
                return true;
            }
            let next = self
                .waiting
                .get(&current)
                .and_then(|key| self.constructing.get(key));
            match next {
                Some(owner) => current = *owner,
                None => return false,
            }
        }
        false
    }
}

/// Clears a construction mark and wakes waiters, also when the factory
/// unwinds.
struct ConstructionMark<'a> {
    graph: &'a ObjectGraph,
    key: &'a ServiceKey,
}

impl Drop for ConstructionMark<'_> {
    fn drop(&mut self) {
        self.graph.lock_state().constructing.remove(self.key);
        self.graph.constructed.notify_all();
    }
}

/// Identity of an injection target, its address while injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId(usize);

impl TargetId {
    pub fn of<T: ?Sized>(target: &T) -> Self {
        Self(target as *const T as *const () as usize)
    }
}

pub trait GraphMonitor: Send + Sync {
    fn on_inject(&self, target: TargetId, type_name: &'static str);

    fn on_release(&self, target: TargetId, type_name: &'static str);
}

/// Explicit injection point. Implementors inject/release each of their
/// [`Dependency`] fields.
pub trait Injectable {
    fn inject(&mut self, graph: &ObjectGraph) -> Result<()>;

    fn release(&mut self, graph: &ObjectGraph) -> Result<()>;
}

pub struct ObjectGraph {
    parent: Option<Arc<ObjectGraph>>,
    providers: RwLock<FxHashMap<ServiceKey, Factory>>,
    state: Mutex<GraphState>,
    constructed: Condvar,
    monitors: RwLock<Vec<Arc<dyn GraphMonitor>>>,
}

impl ObjectGraph {
    pub fn new() -> Self {
        Self {
            parent: None,
            providers: RwLock::new(FxHashMap::default()),
            state: Mutex::new(GraphState::default()),
            constructed: Condvar::new(),
            monitors: RwLock::new(Vec::new()),
        }
    }

    pub fn child(parent: Arc<ObjectGraph>) -> Self {
        Self {
            parent: Some(parent),
            ..Self::new()
        }
    }

    pub fn parent(&self) -> Option<&Arc<ObjectGraph>> {
        self.parent.as_ref()
    }

    pub fn register<T, F>(&self, factory: F) -> Result<()>
    where
        T: Service,
        F: Fn(&ObjectGraph) -> Result<T> + Send + Sync + 'static,
    {
        self.insert_provider::<T, F>(None, factory)
    }

    pub fn register_qualified<T, F>(&self, qualifier: &str, factory: F) -> Result<()>
    where
        T: Service,
        F: Fn(&ObjectGraph) -> Result<T> + Send + Sync + 'static,
    {
        self.insert_provider::<T, F>(Some(qualifier), factory)
    }

    fn insert_provider<T, F>(&self, qualifier: Option<&str>, factory: F) -> Result<()>
    where
        T: Service,
        F: Fn(&ObjectGraph) -> Result<T> + Send + Sync + 'static,
    {
        let key = ServiceKey::of::<T>(qualifier);
        let mut providers = self
            .providers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if providers.contains_key(&key) {
            return Err(GraphError::AlreadyRegistered(key.to_string()));
        }
        let factory: Factory = Arc::new(move |graph: &ObjectGraph| {
            let instance = Arc::new(factory(graph)?);
            Ok(Built {
                instance: instance.clone(),
                service: instance,
            })
        });
        tracing::trace!(service = %key, "provider registered");
        providers.insert(key, factory);
        Ok(())
    }

    /// Whether this graph (not its parents) has a provider for the key.
    pub fn provides<T: Service>(&self, qualifier: Option<&str>) -> bool {
        self.factory(&ServiceKey::of::<T>(qualifier)).is_some()
    }

    fn factory(&self, key: &ServiceKey) -> Option<Factory> {
        self.providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn lock_state(&self) -> MutexGuard<'_, GraphState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Increments the reference count, constructing on first use.
    pub fn reference<T: Service>(&self, qualifier: Option<&str>) -> Result<Arc<T>> {
        let key = ServiceKey::of::<T>(qualifier);
        let Some(factory) = self.factory(&key) else {
            return match &self.parent {
                Some(parent) => parent.reference::<T>(qualifier),
                None => Err(GraphError::MissingProvider(key.to_string())),
            };
        };

        let instance = self.acquire(&key, &factory)?;
        match instance.downcast::<T>() {
            Ok(instance) => Ok(instance),
            Err(_) => {
                self.decrement(&key, None);
                Err(GraphError::TypeMismatch(key.to_string()))
            }
        }
    }

    fn acquire(&self, key: &ServiceKey, factory: &Factory) -> Result<AnyInstance> {
        let me = thread::current().id();
        let mut state = self.lock_state();
        loop {
            if let Some(entry) = state.entries.get_mut(key) {
                entry.count += 1;
                tracing::trace!(service = %key, count = entry.count, "referenced");
                return Ok(entry.instance.clone());
            }
            match state.constructing.get(key).copied() {
                Some(owner) if state.leads_back_to(owner, me) => {
                    return Err(GraphError::CircularDependency(key.to_string()));
                }
                Some(_) => {
                    state.waiting.insert(me, key.clone());
                    state = self
                        .constructed
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner);
                    state.waiting.remove(&me);
                }
                None => break,
            }
        }
        state.constructing.insert(key.clone(), me);
        drop(state);
        let mark = ConstructionMark { graph: self, key };

        // Factories may reference other services, so build outside the lock.
        let built = factory(self)?;
        built.service.on_created();

        let instance = built.instance.clone();
        self.lock_state().entries.insert(
            key.clone(),
            Entry {
                instance: built.instance,
                service: built.service,
                count: 1,
            },
        );
        tracing::debug!(service = %key, "created");
        drop(mark);
        Ok(instance)
    }

    /// Decrements the reference count, disposing at zero.
    ///
    /// Releasing something that is no longer cached is logged and ignored.
    pub fn dereference<T: Service>(&self, instance: &Arc<T>, qualifier: Option<&str>) -> Result<()> {
        let key = ServiceKey::of::<T>(qualifier);
        if self.factory(&key).is_none() {
            return match &self.parent {
                Some(parent) => parent.dereference(instance, qualifier),
                None => Err(GraphError::MissingProvider(key.to_string())),
            };
        }
        self.decrement(&key, Some(Arc::as_ptr(instance) as *const ()));
        Ok(())
    }

    fn decrement(&self, key: &ServiceKey, expected: Option<*const ()>) {
        let mut state = self.lock_state();
        let Some(entry) = state.entries.get_mut(key) else {
            tracing::warn!(service = %key, "dereference of an instance that is already disposed");
            return;
        };
        if let Some(ptr) = expected {
            if Arc::as_ptr(&entry.instance) as *const () != ptr {
                tracing::warn!(service = %key, "dereference of a stale instance ignored");
                return;
            }
        }
        entry.count -= 1;
        tracing::trace!(service = %key, count = entry.count, "dereferenced");
        if entry.count > 0 {
            return;
        }
        let disposed = state.entries.remove(key);
        drop(state);
        if let Some(entry) = disposed {
            entry.service.on_disposed();
            tracing::debug!(service = %key, name = entry.service.name(), "disposed");
        }
    }

    /// Live references held on this graph (parents are not consulted).
    pub fn reference_count<T: Service>(&self, qualifier: Option<&str>) -> usize {
        self.lock_state()
            .entries
            .get(&ServiceKey::of::<T>(qualifier))
            .map_or(0, |entry| entry.count)
    }

    pub fn cached_len(&self) -> usize {
        self.lock_state().entries.len()
    }

    /// References `T` and hands back a guard that dereferences on drop.
    pub fn scoped<T: Service>(&self, qualifier: Option<&str>) -> Result<Scoped<'_, T>> {
        let instance = self.reference::<T>(qualifier)?;
        Ok(Scoped {
            graph: self,
            qualifier: qualifier.map(str::to_string),
            instance: Some(instance),
        })
    }

    pub fn add_monitor(&self, monitor: Arc<dyn GraphMonitor>) {
        self.monitors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(monitor);
    }

    pub fn remove_monitor(&self, monitor: &Arc<dyn GraphMonitor>) {
        self.monitors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|m| !Arc::ptr_eq(m, monitor));
    }

    fn monitors(&self) -> Vec<Arc<dyn GraphMonitor>> {
        self.monitors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Populates every dependency of `target`. On failure whatever was
    /// already injected is released again.
    pub fn inject<I: Injectable + ?Sized>(&self, target: &mut I) -> Result<()> {
        if let Err(err) = target.inject(self) {
            if let Err(rollback) = target.release(self) {
                tracing::warn!(error = %rollback, "rollback after failed injection");
            }
            return Err(err);
        }
        let id = TargetId::of(&*target);
        for monitor in self.monitors() {
            monitor.on_inject(id, type_name::<I>());
        }
        Ok(())
    }

    pub fn release<I: Injectable + ?Sized>(&self, target: &mut I) -> Result<()> {
        target.release(self)?;
        let id = TargetId::of(&*target);
        for monitor in self.monitors() {
            monitor.on_release(id, type_name::<I>());
        }
        Ok(())
    }
}

impl Default for ObjectGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// A field that the graph fills on inject and empties on release.
pub struct Dependency<T: Service> {
    qualifier: Option<String>,
    instance: Option<Arc<T>>,
}

impl<T: Service> Dependency<T> {
    pub fn new() -> Self {
        Self {
            qualifier: None,
            instance: None,
        }
    }

    pub fn qualified(qualifier: &str) -> Self {
        Self {
            qualifier: Some(qualifier.to_string()),
            instance: None,
        }
    }

    pub fn get(&self) -> Option<&Arc<T>> {
        self.instance.as_ref()
    }

    pub fn is_injected(&self) -> bool {
        self.instance.is_some()
    }

    /// No-op when already injected.
    pub fn inject(&mut self, graph: &ObjectGraph) -> Result<()> {
        if self.instance.is_none() {
            self.instance = Some(graph.reference::<T>(self.qualifier.as_deref())?);
        }
        Ok(())
    }

    /// No-op when not injected.
    pub fn release(&mut self, graph: &ObjectGraph) -> Result<()> {
        match self.instance.take() {
            Some(instance) => graph.dereference(&instance, self.qualifier.as_deref()),
            None => Ok(()),
        }
    }
}

impl<T: Service> Default for Dependency<T> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Scoped<'g, T: Service> {
    graph: &'g ObjectGraph,
    qualifier: Option<String>,
    instance: Option<Arc<T>>,
}

impl<T: Service> Scoped<'_, T> {
    pub fn instance(&self) -> &Arc<T> {
        // Only `Drop` takes the instance out.
        match &self.instance {
            Some(instance) => instance,
            None => unreachable!("scoped instance taken before drop"),
        }
    }
}

impl<T: Service> Deref for Scoped<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.instance()
    }
}

impl<T: Service> Drop for Scoped<'_, T> {
    fn drop(&mut self) {
        if let Some(instance) = self.instance.take() {
            if let Err(err) = self.graph.dereference(&instance, self.qualifier.as_deref()) {
                tracing::warn!(error = %err, "scoped release failed");
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/core/graph.rs"]
mod tests;
