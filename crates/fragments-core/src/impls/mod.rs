//! Backend implementations shipped with the core.
//!
//! Only the in-memory map lives here; networked stores implement the same
//! [`StorageBackend`](crate::ports::StorageBackend) trait out of tree.

pub mod memory;

pub use self::memory::InMemoryBackend;
