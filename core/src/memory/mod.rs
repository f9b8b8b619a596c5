pub mod event;
pub mod store;

pub use event::MemoryEvent;
pub use store::{DEFAULT_STORE_PATH, EventStore};
