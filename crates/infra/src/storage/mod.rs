//! Durable key-value storage adapters for the session store

pub mod file_store;
pub mod memory;

pub use file_store::FileKeyValueStore;
pub use memory::MemoryKeyValueStore;
