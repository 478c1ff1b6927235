//! Content-type parsing and the supported-type registry.
//!
//! Parsing is a pure function: malformed input yields a
//! [`MalformedContentType`] value, never a panic, so validation call sites
//! can treat "unparseable" as "unsupported" without any error handling of
//! their own.

use std::collections::{BTreeSet, HashMap};

use thiserror::Error;
use tracing::warn;

/// A content-type string that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed content type: {input:?}")]
pub struct MalformedContentType {
    pub input: String,
}

/// A parsed content type: the base `type/subtype` plus any parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedContentType {
    /// Base MIME type, lowercased, parameters stripped (`text/plain`).
    pub essence: String,
    /// `key=value` parameters in written order (e.g. `charset=utf-8`).
    pub parameters: Vec<(String, String)>,
}

/// Parse a content-type string into its essence and parameters.
///
/// `"text/plain; charset=utf-8"` parses to essence `"text/plain"` with one
/// parameter. Anything without a `type/subtype` shape is malformed.
pub fn parse_content_type(input: &str) -> Result<ParsedContentType, MalformedContentType> {
    let malformed = || MalformedContentType {
        input: input.to_string(),
    };

    let mut parts = input.split(';');
    let essence = parts.next().unwrap_or("").trim().to_ascii_lowercase();

    let (ty, subtype) = essence.split_once('/').ok_or_else(malformed)?;
    if ty.is_empty() || subtype.is_empty() || !is_token(ty) || !is_token(subtype) {
        return Err(malformed());
    }

    let mut parameters = Vec::new();
    for param in parts {
        let param = param.trim();
        let (key, value) = param.split_once('=').ok_or_else(malformed)?;
        let key = key.trim().to_ascii_lowercase();
        if key.is_empty() || !is_token(&key) {
            return Err(malformed());
        }
        parameters.push((key, value.trim().trim_matches('"').to_string()));
    }

    Ok(ParsedContentType { essence, parameters })
}

/// The token characters RFC 7231 allows in type and subtype names.
fn is_token(s: &str) -> bool {
    s.chars().all(|c| {
        c.is_ascii_alphanumeric()
            || matches!(
                c,
                '!' | '#' | '$' | '%' | '&' | '\'' | '*' | '+' | '-' | '.' | '^' | '_' | '`'
                    | '|' | '~'
            )
    })
}

/// Registry of supported base types, known file extensions, and available
/// conversions.
///
/// An explicit value rather than a global: fragment validation and the
/// conversion engine both hold one, so tests can substitute the allow-list.
/// Adding a conversion path is a table entry here plus a renderer in the
/// conversion engine, not a structural change.
#[derive(Debug, Clone)]
pub struct ContentTypeRegistry {
    supported: BTreeSet<String>,
    /// File extension -> the base type it natively names (`md` -> `text/markdown`).
    extensions: HashMap<String, String>,
    /// (source base type, target extension) -> resulting base type.
    conversions: HashMap<(String, String), String>,
}

impl ContentTypeRegistry {
    /// Registry accepting the given base types, with the standard extension
    /// table and no conversions registered.
    pub fn new<I, S>(supported: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let extensions = [
            ("txt", "text/plain"),
            ("md", "text/markdown"),
            ("markdown", "text/markdown"),
            ("html", "text/html"),
            ("json", "application/json"),
        ]
        .into_iter()
        .map(|(ext, essence)| (ext.to_string(), essence.to_string()))
        .collect();

        Self {
            supported: supported
                .into_iter()
                .map(|s| s.into().to_ascii_lowercase())
                .collect(),
            extensions,
            conversions: HashMap::new(),
        }
    }

    /// Declare that data of `source` type may be requested with `extension`
    /// and comes back as `target`.
    pub fn register_conversion(mut self, source: &str, extension: &str, target: &str) -> Self {
        self.conversions.insert(
            (source.to_ascii_lowercase(), extension.to_ascii_lowercase()),
            target.to_ascii_lowercase(),
        );
        self
    }

    /// True if `value`'s base type (parameters stripped) is accepted for
    /// storage. Malformed input is unsupported, not an error.
    pub fn is_supported(&self, value: &str) -> bool {
        match parse_content_type(value) {
            Ok(parsed) => {
                let supported = self.supported.contains(&parsed.essence);
                if !supported {
                    warn!(content_type = value, "unsupported content type");
                }
                supported
            }
            Err(_) => {
                warn!(content_type = value, "malformed content type");
                false
            }
        }
    }

    /// The base type an extension natively names, if we know the extension.
    pub fn mime_for_extension(&self, extension: &str) -> Option<&str> {
        self.extensions
            .get(&extension.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// The type that converting `source` data via `extension` produces, if
    /// such a conversion is registered.
    pub fn conversion_target(&self, source: &str, extension: &str) -> Option<&str> {
        self.conversions
            .get(&(source.to_ascii_lowercase(), extension.to_ascii_lowercase()))
            .map(String::as_str)
    }

    /// All base types data of `essence` can be served as, itself first.
    pub fn formats_for(&self, essence: &str) -> Vec<String> {
        let mut formats = vec![essence.to_string()];
        for ((source, _extension), target) in &self.conversions {
            if source == essence && !formats.contains(target) {
                formats.push(target.clone());
            }
        }
        formats
    }
}

impl Default for ContentTypeRegistry {
    /// The shipping configuration: plain text and markdown are storable, and
    /// markdown can be rendered to HTML.
    fn default() -> Self {
        Self::new(["text/plain", "text/markdown"]).register_conversion(
            "text/markdown",
            "html",
            "text/html",
        )
    }
}
