//! Repository implementations

mod memory;

pub use memory::{InMemoryDataEventRepository, InMemoryRepositoryProvider, InMemoryStreamRepository};
