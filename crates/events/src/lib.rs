//! Domain events and their distribution.
//!
//! Workflows publish an event after a state change commits; read-side
//! consumers (admin screens, caches) subscribe explicitly instead of
//! re-querying on a database change feed.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::InMemoryEventBus;
