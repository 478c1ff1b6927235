//! fragments-core
//!
//! Storage and retrieval core for user-owned content fragments: small binary
//! blobs with separate metadata (id, owner, content type, size, timestamps).
//!
//! # Module layout
//! - **domain**: the `Fragment` entity and its invariants, ids, content-type
//!   parsing, the supported-type registry, and the error taxonomy
//! - **ports**: the `StorageBackend` and `Clock` seams this core depends on
//! - **repository**: owner-scoped list/get/save/data/delete operations over
//!   a backend
//! - **convert**: extension-based conversion of payload representations
//!   (markdown to HTML today; the table extends)
//! - **impls**: the in-memory backend for tests and development
//!
//! Authentication, HTTP semantics, and production backends live upstream and
//! downstream of this crate; the only contract here is the port traits.

pub mod convert;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod repository;

pub use self::convert::{Converted, ConversionEngine};
pub use self::domain::{
    ContentTypeRegistry, Fragment, FragmentError, FragmentId, OwnerId, StorageStep,
};
pub use self::impls::InMemoryBackend;
pub use self::ports::{BackendError, Clock, FixedClock, StorageBackend, SystemClock};
pub use self::repository::{FragmentRepository, Listing};
