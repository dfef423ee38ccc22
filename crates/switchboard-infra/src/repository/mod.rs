//! Repository implementations.

mod memory;

pub use memory::{InMemoryContactRepository, InMemoryConversationRepository};
