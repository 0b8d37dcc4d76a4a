//! 事件总线：进程内发布/订阅
//!
//! - post 在调用线程上同步投递
//! - 投递顺序即订阅顺序
//! - channel 订阅者的接收端被丢弃后自动退订

use slotmap::{new_key_type, SlotMap};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

new_key_type! { pub struct SubscriptionId; }

enum Subscriber<E> {
    Callback(Arc<dyn Fn(&E) + Send + Sync>),
    Channel(Sender<E>),
}

impl<E> Clone for Subscriber<E> {
    fn clone(&self) -> Self {
        match self {
            Subscriber::Callback(f) => Subscriber::Callback(Arc::clone(f)),
            Subscriber::Channel(tx) => Subscriber::Channel(tx.clone()),
        }
    }
}

struct Registry<E> {
    subscribers: SlotMap<SubscriptionId, Subscriber<E>>,
    order: Vec<SubscriptionId>,
}

pub struct EventBus<E> {
    registry: Mutex<Registry<E>>,
}

pub struct EventReceiver<E> {
    id: SubscriptionId,
    rx: Receiver<E>,
}

impl<E: Clone + Send + 'static> EventBus<E> {
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(Registry {
                subscribers: SlotMap::with_key(),
                order: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Registry<E>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(&self, subscriber: Subscriber<E>) -> SubscriptionId {
        let mut registry = self.lock();
        let id = registry.subscribers.insert(subscriber);
        registry.order.push(id);
        id
    }

    pub fn subscribe<F>(&self, f: F) -> SubscriptionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.insert(Subscriber::Callback(Arc::new(f)))
    }

    /// Subscribes a channel; events are drained with [`EventReceiver::try_recv`].
    pub fn channel(&self) -> EventReceiver<E> {
        let (tx, rx) = mpsc::channel();
        let id = self.insert(Subscriber::Channel(tx));
        EventReceiver { id, rx }
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut registry = self.lock();
        let removed = registry.subscribers.remove(id).is_some();
        if removed {
            registry.order.retain(|s| *s != id);
        }
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// Delivers `event` to every subscriber, in subscription order.
    pub fn post(&self, event: &E) {
        let snapshot: Vec<(SubscriptionId, Subscriber<E>)> = {
            let registry = self.lock();
            registry
                .order
                .iter()
                .filter_map(|id| registry.subscribers.get(*id).map(|s| (*id, s.clone())))
                .collect()
        };

        let mut dead = Vec::new();
        for (id, subscriber) in snapshot {
            match subscriber {
                Subscriber::Callback(f) => f(event),
                Subscriber::Channel(tx) => {
                    if tx.send(event.clone()).is_err() {
                        dead.push(id);
                    }
                }
            }
        }

        for id in dead {
            tracing::debug!(?id, "dropping disconnected subscriber");
            self.unsubscribe(id);
        }
    }
}

impl<E: Clone + Send + 'static> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventReceiver<E> {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn try_recv(&mut self) -> Result<E, TryRecvError> {
        self.rx.try_recv()
    }

    pub fn drain(&mut self) -> Vec<E> {
        let mut out = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            out.push(event);
        }
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/services/bus.rs"]
mod tests;
