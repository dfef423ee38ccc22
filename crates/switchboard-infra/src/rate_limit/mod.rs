//! Window counter store implementations.

mod memory;

pub use memory::InMemoryWindowCounterStore;
