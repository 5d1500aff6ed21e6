//! Storage backends

pub mod file;
pub mod memory;

pub use file::JsonFileBackend;
pub use memory::InMemoryBackend;
