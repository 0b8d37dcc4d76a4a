//! View-layer synchronization of navigation events.

pub mod back_stack;

pub use back_stack::{BackStack, StackEntry, Transition};
