//! 数据模型层

pub mod location;
pub mod navigation;

pub use location::{Ancestors, Location};
pub use navigation::{LocationRecord, NavigationModel};
