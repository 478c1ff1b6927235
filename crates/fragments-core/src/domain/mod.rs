//! Domain model: identifiers, content types, the fragment entity, errors.

pub mod content_type;
pub mod errors;
pub mod fragment;
pub mod ids;

pub use self::content_type::{
    ContentTypeRegistry, MalformedContentType, ParsedContentType, parse_content_type,
};
pub use self::errors::{FragmentError, StorageStep};
pub use self::fragment::Fragment;
pub use self::ids::{FragmentId, OwnerId};
