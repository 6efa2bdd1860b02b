//! Storage infrastructure - source of record implementations

mod in_memory;

pub use in_memory::InMemorySocialStore;
