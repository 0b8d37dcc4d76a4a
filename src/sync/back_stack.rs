//! 视图回退栈同步器
//!
//! 消费导航事件，维护与导航模型链一致的可见栈（根在前）：
//! - 前进：截断到新位置的父节点深度，再压入
//! - 后退：弹出到当前位置深度（快速回退/跳过 interim 时一次弹出多个）
//! - 暂停期间事件排队，resume 时按顺序应用（可见状态滞后于模型）
//! - 每个事件应用后 settle 对应的 Navigator

use std::collections::VecDeque;

use crate::models::{Location, NavigationModel};
use crate::navigation::{NavigationEvent, NavigationManager};
use crate::services::bus::EventReceiver;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackEntry {
    pub location_id: Option<String>,
    pub interim: bool,
}

impl StackEntry {
    fn from_location(location: &Location) -> Self {
        Self {
            location_id: location.id().map(str::to_string),
            interim: location.is_interim(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Forward; `popped` entries were cleared before the push.
    Pushed { popped: usize },
    Popped { count: usize },
    Exited,
    /// Queued until [`BackStack::resume`].
    Deferred,
}

pub struct BackStack {
    entries: Vec<StackEntry>,
    committable: bool,
    pending: VecDeque<NavigationEvent>,
    exited: bool,
    receiver: Option<EventReceiver<NavigationEvent>>,
}

impl BackStack {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            committable: true,
            pending: VecDeque::new(),
            exited: false,
            receiver: None,
        }
    }

    /// Subscribes to `manager`; call [`BackStack::pump`] to apply events.
    pub fn attach(manager: &NavigationManager) -> Self {
        let mut stack = Self::from_model(&manager.model());
        stack.receiver = Some(manager.receiver());
        stack
    }

    /// Rebuilds the visible stack from a (restored) model.
    pub fn from_model(model: &NavigationModel) -> Self {
        let mut stack = Self::new();
        if let Some(current) = model.current_location() {
            stack.rebuild(current);
        }
        stack
    }

    fn rebuild(&mut self, current: &Location) {
        let mut entries: Vec<StackEntry> =
            current.ancestors().map(StackEntry::from_location).collect();
        entries.reverse();
        self.entries = entries;
    }

    pub fn entries(&self) -> &[StackEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn top(&self) -> Option<&StackEntry> {
        self.entries.last()
    }

    /// Ids root first.
    pub fn ids(&self) -> Vec<Option<&str>> {
        self.entries
            .iter()
            .map(|e| e.location_id.as_deref())
            .collect()
    }

    pub fn is_committable(&self) -> bool {
        self.committable
    }

    pub fn is_exited(&self) -> bool {
        self.exited
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn pause(&mut self) {
        self.committable = false;
    }

    /// Applies everything queued while paused, oldest first.
    pub fn resume(&mut self) -> Vec<Transition> {
        self.committable = true;
        let mut applied = Vec::with_capacity(self.pending.len());
        while let Some(event) = self.pending.pop_front() {
            applied.push(self.apply(event));
        }
        applied
    }

    /// Drains the attached receiver.
    pub fn pump(&mut self) -> Vec<Transition> {
        let events = match self.receiver.as_mut() {
            Some(rx) => rx.drain(),
            None => return Vec::new(),
        };
        events.into_iter().map(|e| self.handle(e)).collect()
    }

    pub fn handle(&mut self, event: NavigationEvent) -> Transition {
        if !self.committable {
            tracing::debug!(pending = self.pending.len() + 1, "back stack not committable, deferring");
            self.pending.push_back(event);
            return Transition::Deferred;
        }
        self.apply(event)
    }

    fn apply(&mut self, event: NavigationEvent) -> Transition {
        let transition = match &event {
            NavigationEvent::Forward(e) => {
                let keep = e.current_location.depth() - 1;
                let popped = self.truncate(keep);
                self.entries
                    .push(StackEntry::from_location(&e.current_location));
                self.exited = false;
                if e.clear_top {
                    tracing::debug!(popped, "cleared back stack");
                }
                self.verify(Some(&e.current_location));
                Transition::Pushed { popped }
            }
            NavigationEvent::Back(e) => {
                let keep = e.current_location.as_ref().map_or(0, Location::depth);
                let count = self.truncate(keep);
                if e.fast_rewind {
                    tracing::debug!(count, "fast rewind");
                }
                self.verify(e.current_location.as_ref());
                Transition::Popped { count }
            }
            NavigationEvent::AppExit(_) => {
                self.entries.clear();
                self.exited = true;
                Transition::Exited
            }
        };
        if let Some(navigator) = event.navigator() {
            navigator.destroy();
        }
        transition
    }

    fn truncate(&mut self, keep: usize) -> usize {
        let count = self.entries.len().saturating_sub(keep);
        self.entries.truncate(keep);
        count
    }

    fn verify(&mut self, current: Option<&Location>) {
        let expected = current.map(|c| c.id());
        let actual = self.top().map(|e| e.location_id.as_deref());
        if expected != actual || current.map_or(0, Location::depth) != self.entries.len() {
            tracing::warn!(?expected, ?actual, "back stack out of sync, rebuilding");
            match current {
                Some(current) => self.rebuild(current),
                None => self.entries.clear(),
            }
        }
    }
}

impl Default for BackStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sync/back_stack.rs"]
mod tests;
