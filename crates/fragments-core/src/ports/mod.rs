//! Ports: the seams this core depends on, with implementations swappable
//! behind traits.

pub mod clock;
pub mod storage;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::storage::{BackendError, StorageBackend};
