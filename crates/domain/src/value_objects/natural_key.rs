//! Natural key used to deduplicate catalog books created from inline snapshots
//!
//! An ISBN always wins over title and author. Text parts are normalised so
//! that "데미안 " and "데미안" or "The Stranger" and "the stranger!" map to
//! the same key.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Derived, non-opaque catalog deduplication key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NaturalKey(String);

impl NaturalKey {
    /// Build a key from a raw ISBN field
    ///
    /// The field may hold several space or comma separated ISBNs
    /// ("8937460440 9788937460449"). A 13-digit ISBN is preferred, a
    /// 10-digit one is the fallback and is rewritten to its 978-prefixed
    /// 13-digit form, so both spellings of one book share a key. Returns
    /// `None` when neither is present.
    pub fn from_isbn(raw: &str) -> Option<Self> {
        let candidates: Vec<String> = raw
            .split(|c: char| c.is_whitespace() || c == ',')
            .map(|token| {
                token
                    .chars()
                    .filter(|c| c.is_ascii_digit() || *c == 'X' || *c == 'x')
                    .map(|c| c.to_ascii_uppercase())
                    .collect::<String>()
            })
            .collect();

        let isbn13 = candidates
            .iter()
            .find(|c| c.len() == 13 && c.chars().all(|ch| ch.is_ascii_digit()))
            .cloned();
        let isbn10 = || {
            candidates
                .iter()
                .find(|c| c.len() == 10 && c.chars().take(9).all(|ch| ch.is_ascii_digit()))
                .map(|c| isbn10_to_isbn13(c))
        };

        isbn13.or_else(isbn10).map(|isbn| Self(format!("isbn:{isbn}")))
    }

    /// Build a key from a title and an optional primary author
    ///
    /// Returns `None` when the title normalises to nothing.
    pub fn from_title_author(title: &str, author: Option<&str>) -> Option<Self> {
        let title = normalize_text(title);
        if title.is_empty() {
            return None;
        }
        let author = author.map(normalize_text).unwrap_or_default();
        Some(Self(format!("title:{title}|author:{author}")))
    }

    /// Rebuild a key from its stored representation
    pub fn from_stored(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the key was derived from an ISBN
    pub fn is_isbn(&self) -> bool {
        self.0.starts_with("isbn:")
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rewrite an ISBN-10 as its 978-prefixed ISBN-13
///
/// The old check digit is dropped and a new one computed with the
/// alternating 1/3 weights of ISBN-13.
fn isbn10_to_isbn13(isbn10: &str) -> String {
    let body = format!("978{}", &isbn10[..9]);
    let sum: u32 = body
        .chars()
        .filter_map(|c| c.to_digit(10))
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { d } else { d * 3 })
        .sum();
    let check = (10 - sum % 10) % 10;
    format!("{body}{check}")
}

/// Lowercase, drop punctuation, and collapse whitespace
///
/// Letters and digits of every script are kept, so Hangul titles survive.
pub fn normalize_text(input: &str) -> String {
    input
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c
            } else {
                ' '
            }
        })
        .flat_map(char::to_lowercase)
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
