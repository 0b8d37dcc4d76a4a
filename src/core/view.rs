//! 视图生命周期绑定
//!
//! 视图创建时从对象图注入控制器，销毁时释放；
//! 控制器是否存活完全由引用计数决定。

use super::graph::{Injectable, ObjectGraph};
use super::service::Result;

pub trait View: Injectable {
    fn on_created(&mut self) {}

    fn on_destroyed(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Detached,
    Created,
    Destroyed,
}

pub struct ViewHost<V: View> {
    view: V,
    state: ViewState,
}

impl<V: View> ViewHost<V> {
    pub fn new(view: V) -> Self {
        Self {
            view,
            state: ViewState::Detached,
        }
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    /// Injects the view's dependencies. Calling it on a created view does
    /// nothing.
    pub fn create(&mut self, graph: &ObjectGraph) -> Result<()> {
        if self.state == ViewState::Created {
            return Ok(());
        }
        graph.inject(&mut self.view)?;
        self.state = ViewState::Created;
        self.view.on_created();
        Ok(())
    }

    /// Releases the view's dependencies. Only a created view is released.
    pub fn destroy(&mut self, graph: &ObjectGraph) -> Result<()> {
        if self.state != ViewState::Created {
            return Ok(());
        }
        self.view.on_destroyed();
        self.state = ViewState::Destroyed;
        graph.release(&mut self.view)
    }

    pub fn into_inner(self) -> V {
        self.view
    }
}

#[cfg(test)]
#[path = "../../tests/unit/core/view.rs"]
mod tests;
