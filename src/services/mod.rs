//! Services layer (ports + adapters).
//!
//! - `ports`: contracts/types the framework core depends on.
//! - `adapters`: runtime and storage implementations of those ports.
//! - `bus`: in-process publish/subscribe.

pub mod adapters;
pub mod bus;
pub mod ports;

pub use bus::{EventBus, EventReceiver, SubscriptionId};
