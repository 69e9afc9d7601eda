//! Event bus adapters.
//!
//! - `InMemoryEventBus` - In-process bus routing by `LiveEventKind`

mod in_memory;

pub use in_memory::InMemoryEventBus;
