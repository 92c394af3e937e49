//! Event Publisher (spec §4.4): the adapter between the lifecycle
//! controller and the two surfaces external observers watch — the
//! process-wide `endpoint:status:changed` bus, and the manager's own
//! `configChange` listener registration.

pub mod bus;
pub mod config_change;

pub use bus::{BroadcastEventBus, EventBus};
pub use config_change::ConfigChangeListeners;
