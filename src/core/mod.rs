//! 核心框架模块
//!
//! - Service: 可被对象图管理的组件
//! - ObjectGraph: 引用计数的依赖注入容器
//! - View: 视图生命周期与注入/释放
//! - Context: 应用上下文（组合根）

pub mod context;
pub mod graph;
pub mod service;
pub mod view;

pub use context::AppContext;
pub use graph::{Dependency, GraphMonitor, Injectable, ObjectGraph, Scoped, TargetId};
pub use service::{GraphError, Service, ServiceKey};
pub use view::{View, ViewHost, ViewState};
