//! The fragment entity: metadata for one stored content blob.
//!
//! The byte payload lives separately in the backend; `size` tracks its
//! length and the repository keeps the two in step on every data write.
//! Fields are private because the interesting invariants are about what may
//! *not* change: id, owner, and content type are fixed at construction, and
//! `updated`/`size` only move through the mutation methods.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::content_type::{ContentTypeRegistry, parse_content_type};
use super::errors::FragmentError;
use super::ids::{FragmentId, OwnerId};

/// Metadata for one stored fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    id: FragmentId,
    owner_id: OwnerId,
    #[serde(rename = "type")]
    content_type: String,
    size: u64,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
}

impl Fragment {
    /// Create a fresh fragment owned by `owner_id`.
    ///
    /// The id is generated from `now`, `created`/`updated` are `now`, and
    /// `size` starts at 0 until data is attached. Fails with a validation
    /// error if the registry does not accept the content type's base type;
    /// the type is not re-validated afterwards, because it never changes.
    pub fn new(
        owner_id: OwnerId,
        content_type: &str,
        registry: &ContentTypeRegistry,
        now: DateTime<Utc>,
    ) -> Result<Self, FragmentError> {
        validate_type(content_type, registry)?;
        Ok(Self {
            id: FragmentId::generate(now.timestamp_millis() as u64),
            owner_id,
            content_type: content_type.to_string(),
            size: 0,
            created: now,
            updated: now,
        })
    }

    /// Rebuild a fragment from stored metadata, re-running construction
    /// validation. For backends or API layers that reconstruct the entity
    /// from a persisted record rather than a `Fragment` value.
    pub fn rehydrate(
        id: FragmentId,
        owner_id: OwnerId,
        content_type: &str,
        size: u64,
        created: DateTime<Utc>,
        updated: DateTime<Utc>,
        registry: &ContentTypeRegistry,
    ) -> Result<Self, FragmentError> {
        validate_type(content_type, registry)?;
        Ok(Self {
            id,
            owner_id,
            content_type: content_type.to_string(),
            size,
            created,
            updated,
        })
    }

    /// True if `value` names a content type `registry` accepts for storage.
    /// Malformed input reports as unsupported, never as an error, so
    /// validation call sites need no error handling.
    pub fn is_supported_type(registry: &ContentTypeRegistry, value: &str) -> bool {
        registry.is_supported(value)
    }

    pub fn id(&self) -> FragmentId {
        self.id
    }

    pub fn owner_id(&self) -> &OwnerId {
        &self.owner_id
    }

    /// The content type as given at construction, parameters included.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Byte length of the currently stored payload (0 before any data write).
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn updated(&self) -> DateTime<Utc> {
        self.updated
    }

    /// The base MIME type with parameters stripped:
    /// `"text/plain; charset=utf-8"` -> `"text/plain"`.
    pub fn mime_type(&self) -> String {
        // The type was validated at construction, so parsing cannot fail;
        // fall back to the raw string rather than panic if it somehow does.
        parse_content_type(&self.content_type)
            .map(|parsed| parsed.essence)
            .unwrap_or_else(|_| self.content_type.clone())
    }

    /// True if this fragment holds a `text/*` type.
    pub fn is_text(&self) -> bool {
        self.mime_type().starts_with("text/")
    }

    /// The MIME types this fragment's data can be served as, its own base
    /// type first.
    pub fn formats(&self, registry: &ContentTypeRegistry) -> Vec<String> {
        registry.formats_for(&self.mime_type())
    }

    /// Refresh `updated`. Every metadata or data mutation goes through here.
    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        self.updated = now;
    }

    /// Record the byte length of a just-written payload.
    pub(crate) fn set_size(&mut self, size: u64) {
        self.size = size;
    }
}

fn validate_type(content_type: &str, registry: &ContentTypeRegistry) -> Result<(), FragmentError> {
    if registry.is_supported(content_type) {
        Ok(())
    } else {
        Err(FragmentError::Validation(format!(
            "unsupported or malformed content type: {content_type}"
        )))
    }
}
