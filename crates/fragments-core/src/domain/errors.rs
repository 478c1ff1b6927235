//! Error taxonomy for the fragments core.
//!
//! Five kinds, kept distinct so an API layer can map each to its own
//! user-visible failure: bad construction input, bad call arguments, absent
//! records, backend failures (with the step that failed), and unsupported
//! conversions.

use thiserror::Error;

use super::ids::{FragmentId, OwnerId};
use crate::ports::storage::BackendError;

/// The backend artifact a failed storage operation was touching.
///
/// Two-step operations (`set_data` writes metadata, then the payload) are not
/// atomic; the step tells the caller how far the operation got before it
/// failed, so they can decide on retry or manual reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageStep {
    /// Reading or writing the metadata record.
    Metadata,
    /// Reading or writing the byte payload.
    Data,
    /// Removing the record and payload together.
    Delete,
}

#[derive(Debug, Error)]
pub enum FragmentError {
    /// Input rejected at construction time (unsupported or malformed
    /// content type).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A required argument was missing or empty.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// No metadata record exists for the requested (owner, id).
    #[error("fragment {id} not found for owner {owner}")]
    NotFound { owner: OwnerId, id: FragmentId },

    /// A backend call failed. Never swallowed: every backend failure the
    /// repository sees surfaces as this variant.
    #[error("storage failure at the {step:?} step")]
    Storage {
        step: StorageStep,
        #[source]
        source: BackendError,
    },

    /// No conversion is registered for this (type, extension) pair. The
    /// caller decides whether that is a client error.
    #[error("cannot convert {mime_type} to .{extension}")]
    UnsupportedConversion {
        mime_type: String,
        extension: String,
    },
}
