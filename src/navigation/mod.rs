//! 导航层
//!
//! - NavigationManager: 持有导航模型，创建 Navigator
//! - Navigator: 前进/后退/清栈/interim 跳过
//! - NavigationEvent: 发给视图层的前进/后退/退出事件

pub mod event;
pub mod manager;
pub mod navigator;

pub use event::{AppExitEvent, BackEvent, ForwardEvent, NavigationEvent};
pub use manager::NavigationManager;
pub use navigator::{Forwarder, NavigationError, Navigator, NavigatorHandle};
