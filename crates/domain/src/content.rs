//! Content rules for review drafts
//!
//! Visible length is measured in Unicode scalar values after removing
//! `<...>` tags and trimming. Size caps count UTF-8 bytes.

use serde_json::Value;

use crate::errors::DomainError;

/// Default hard cap on the raw content size (1 MiB)
pub const DEFAULT_MAX_CONTENT_BYTES: usize = 1024 * 1024;
/// Default minimum visible characters
pub const DEFAULT_MIN_TEXT_CHARS: usize = 10;
/// Default maximum title length in characters
pub const DEFAULT_MAX_TITLE_CHARS: usize = 200;
/// Default cap on serialised metadata (64 KiB)
pub const DEFAULT_MAX_METADATA_BYTES: usize = 64 * 1024;

/// Limits applied to draft input before any store access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentLimits {
    pub max_content_bytes: usize,
    pub min_text_chars: usize,
    pub max_title_chars: usize,
    pub max_metadata_bytes: usize,
}

impl Default for ContentLimits {
    fn default() -> Self {
        Self {
            max_content_bytes: DEFAULT_MAX_CONTENT_BYTES,
            min_text_chars: DEFAULT_MIN_TEXT_CHARS,
            max_title_chars: DEFAULT_MAX_TITLE_CHARS,
            max_metadata_bytes: DEFAULT_MAX_METADATA_BYTES,
        }
    }
}

impl ContentLimits {
    /// Check the review body
    pub fn check_content(&self, content: &str) -> Result<(), DomainError> {
        if content.len() > self.max_content_bytes {
            return Err(DomainError::ContentTooLarge {
                max: self.max_content_bytes,
                actual: content.len(),
            });
        }
        let visible = visible_length(content);
        if visible < self.min_text_chars {
            return Err(DomainError::ContentTooShort {
                min: self.min_text_chars,
                actual: visible,
            });
        }
        Ok(())
    }

    /// Check the optional title
    pub fn check_title(&self, title: Option<&str>) -> Result<(), DomainError> {
        let Some(title) = title else {
            return Ok(());
        };
        let chars = title.chars().count();
        if chars > self.max_title_chars {
            return Err(DomainError::TitleTooLong {
                max: self.max_title_chars,
                actual: chars,
            });
        }
        Ok(())
    }

    /// Check that metadata is a JSON object within the size cap
    pub fn check_metadata(&self, metadata: Option<&Value>) -> Result<(), DomainError> {
        let Some(metadata) = metadata else {
            return Ok(());
        };
        if !metadata.is_object() {
            return Err(DomainError::InvalidMetadata(
                "metadata must be a JSON object".to_string(),
            ));
        }
        let size = serde_json::to_vec(metadata)
            .map_err(|e| DomainError::InvalidMetadata(e.to_string()))?
            .len();
        if size > self.max_metadata_bytes {
            return Err(DomainError::InvalidMetadata(format!(
                "metadata is {size} bytes (maximum {})",
                self.max_metadata_bytes
            )));
        }
        Ok(())
    }
}

/// Remove `<...>` tags, keeping the text between them
///
/// A `<` without a closing `>` is kept as literal text.
pub fn strip_markup(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        match rest[start..].find('>') {
            Some(end) => rest = &rest[start + end + 1..],
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            },
        }
    }
    out.push_str(rest);
    out
}

/// Number of visible characters after stripping markup and trimming
pub fn visible_length(content: &str) -> usize {
    strip_markup(content).trim().chars().count()
}
