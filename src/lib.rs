//! navstack - 导航历史与引用计数依赖注入框架
//!
//! 模块结构：
//! - core: 核心框架（Service, ObjectGraph, View, AppContext）
//! - models: 数据模型（Location, NavigationModel）
//! - navigation: 导航层（NavigationManager, Navigator, NavigationEvent）
//! - sync: 视图回退栈同步
//! - services: 服务层（事件总线、任务运行时、键值存储、配置）
//! - state: 状态保存与恢复

pub mod core;
pub mod logging;
pub mod models;
pub mod navigation;
pub mod services;
pub mod state;
pub mod sync;
