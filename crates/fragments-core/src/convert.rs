//! Extension-based conversion of fragment payloads.
//!
//! Works on an in-memory copy of the bytes only; stored fragments and their
//! metadata are never touched. Adding a conversion path is one table entry
//! in the registry plus one renderer entry here.

use std::collections::HashMap;

use pulldown_cmark::{Parser, html};
use tracing::debug;

use crate::domain::content_type::ContentTypeRegistry;
use crate::domain::{Fragment, FragmentError};

/// Renders one representation into another. Pure: bytes in, bytes out.
type Renderer = fn(&[u8]) -> Vec<u8>;

/// Output of a conversion: the derived bytes and the content type they carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Converted {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Converts fragment payloads based on a requested file extension.
pub struct ConversionEngine {
    registry: ContentTypeRegistry,
    /// (source base type, target extension) -> renderer.
    renderers: HashMap<(String, String), Renderer>,
}

impl ConversionEngine {
    /// Engine over `registry`, with a renderer for every conversion the
    /// shipping registry declares (today: markdown to HTML).
    pub fn new(registry: ContentTypeRegistry) -> Self {
        let mut renderers: HashMap<(String, String), Renderer> = HashMap::new();
        renderers.insert(
            ("text/markdown".to_string(), "html".to_string()),
            render_markdown,
        );
        Self {
            registry,
            renderers,
        }
    }

    pub fn registry(&self) -> &ContentTypeRegistry {
        &self.registry
    }

    /// Convert `data` to the representation named by `target_extension`.
    ///
    /// No extension, or an extension naming the fragment's own base type,
    /// passes the bytes through unchanged under the original content type.
    /// A pair without a registered conversion is `UnsupportedConversion`;
    /// whether that is a client error is the caller's call.
    pub fn convert(
        &self,
        fragment: &Fragment,
        data: &[u8],
        target_extension: Option<&str>,
    ) -> Result<Converted, FragmentError> {
        let essence = fragment.mime_type();

        let identity = || Converted {
            bytes: data.to_vec(),
            content_type: fragment.content_type().to_string(),
        };

        let Some(extension) = target_extension else {
            return Ok(identity());
        };
        if self.registry.mime_for_extension(extension) == Some(essence.as_str()) {
            return Ok(identity());
        }

        let unsupported = || FragmentError::UnsupportedConversion {
            mime_type: essence.clone(),
            extension: extension.to_string(),
        };
        let target = self
            .registry
            .conversion_target(&essence, extension)
            .ok_or_else(unsupported)?;
        let renderer = self
            .renderers
            .get(&(essence.clone(), extension.to_ascii_lowercase()))
            .ok_or_else(unsupported)?;

        let bytes = renderer(data);
        debug!(from = %essence, to = %target, size = bytes.len(), "converted fragment data");
        Ok(Converted {
            bytes,
            content_type: target.to_string(),
        })
    }
}

/// Markdown to HTML via pulldown-cmark.
fn render_markdown(data: &[u8]) -> Vec<u8> {
    let source = String::from_utf8_lossy(data);
    let mut out = String::new();
    html::push_html(&mut out, Parser::new(&source));
    out.into_bytes()
}
