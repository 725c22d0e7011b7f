//! Storage adapters implementing the `Database` port.

mod in_memory;

pub use in_memory::InMemoryDatabase;
