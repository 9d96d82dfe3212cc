//! Iteration notifications
//!
//! The only event the orchestrator publishes is [`IterationEvent`], one per
//! completed iteration. Hosts subscribe through an [`IterationBus`].
//!
//! ```rust,ignore
//! let bus = Arc::new(IterationBus::with_default_capacity());
//! let mut rx = bus.subscribe();
//! let mut orchestrator = Orchestrator::new("presentation", config, pipeline).with_event_bus(bus);
//! ```

mod bus;
mod types;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, IterationBus};
pub use types::IterationEvent;
