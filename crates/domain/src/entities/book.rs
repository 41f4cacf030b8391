//! Book snapshot carried inline by drafts and the canonical catalog record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::{
    errors::DomainError,
    value_objects::{BookId, NaturalKey},
};

/// Inline book data captured when the user picked a book that was not yet
/// in the catalog
///
/// Accepts either `authors: [..]` or a single `author: ".."` on input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct BookSnapshot {
    /// Book title as shown by the search source
    #[validate(length(min = 1, max = 500))]
    pub title: String,
    /// Authors, primary author first
    #[serde(
        default,
        alias = "author",
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    #[validate(length(max = 50))]
    pub authors: Vec<String>,
    /// Raw ISBN field, possibly "isbn10 isbn13"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 64))]
    pub isbn: Option<String>,
    /// Publisher name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 500))]
    pub publisher: Option<String>,
    /// Cover thumbnail URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(url)]
    pub thumbnail: Option<String>,
}

impl BookSnapshot {
    /// Create a snapshot with a title and a single author
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            authors: vec![author.into()],
            isbn: None,
            publisher: None,
            thumbnail: None,
        }
    }

    /// Set the ISBN field
    #[must_use]
    pub fn with_isbn(mut self, isbn: impl Into<String>) -> Self {
        self.isbn = Some(isbn.into());
        self
    }

    /// Set the thumbnail URL
    #[must_use]
    pub fn with_thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail = Some(url.into());
        self
    }

    /// The first listed author, if any
    pub fn primary_author(&self) -> Option<&str> {
        self.authors
            .iter()
            .map(|a| a.trim())
            .find(|a| !a.is_empty())
    }

    /// Derive the catalog deduplication key
    ///
    /// ISBN first, then normalised title plus primary author.
    pub fn natural_key(&self) -> Option<NaturalKey> {
        self.isbn
            .as_deref()
            .and_then(NaturalKey::from_isbn)
            .or_else(|| NaturalKey::from_title_author(&self.title, self.primary_author()))
    }

    /// Check field constraints and that a natural key can be derived
    pub fn check(&self) -> Result<(), DomainError> {
        self.validate()
            .map_err(|e| DomainError::InvalidBookData(e.to_string()))?;
        if self.natural_key().is_none() {
            return Err(DomainError::InvalidBookData(
                "title has no usable characters".to_string(),
            ));
        }
        Ok(())
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(author)) => vec![author],
        Some(OneOrMany::Many(authors)) => authors,
    })
}

/// Canonical catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogBook {
    /// Catalog identifier
    pub id: BookId,
    /// Unique deduplication key
    pub natural_key: NaturalKey,
    pub title: String,
    pub authors: Vec<String>,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub thumbnail: Option<String>,
    /// Created from a draft snapshot rather than by the ingestion pipeline
    pub is_manual_entry: bool,
    pub created_at: DateTime<Utc>,
}

impl CatalogBook {
    /// Build a new catalog record from an inline snapshot
    pub fn from_snapshot(
        snapshot: &BookSnapshot,
        natural_key: NaturalKey,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: BookId::new(),
            natural_key,
            title: snapshot.title.trim().to_string(),
            authors: snapshot.authors.clone(),
            isbn: snapshot.isbn.clone(),
            publisher: snapshot.publisher.clone(),
            thumbnail: snapshot.thumbnail.clone(),
            is_manual_entry: true,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_author_field_is_accepted() {
        let snapshot: BookSnapshot =
            serde_json::from_str(r#"{"title":"데미안","author":"헤르만 헤세"}"#).unwrap();
        assert_eq!(snapshot.authors, vec!["헤르만 헤세".to_string()]);
        assert_eq!(snapshot.primary_author(), Some("헤르만 헤세"));
    }

    #[test]
    fn author_list_is_accepted() {
        let snapshot: BookSnapshot = serde_json::from_str(
            r#"{"title":"Good Omens","authors":["Terry Pratchett","Neil Gaiman"]}"#,
        )
        .unwrap();
        assert_eq!(snapshot.primary_author(), Some("Terry Pratchett"));
    }

    #[test]
    fn natural_key_prefers_isbn() {
        let snapshot = BookSnapshot::new("데미안", "헤르만 헤세")
            .with_isbn("8937460440 9788937460449");
        assert_eq!(snapshot.natural_key().unwrap().as_str(), "isbn:9788937460449");
    }

    #[test]
    fn natural_key_falls_back_to_title_author() {
        let snapshot = BookSnapshot::new("데미안", "헤르만 헤세").with_isbn("n/a");
        assert_eq!(
            snapshot.natural_key().unwrap().as_str(),
            "title:데미안|author:헤르만 헤세"
        );
    }

    #[test]
    fn empty_title_fails_check() {
        let snapshot = BookSnapshot::new("", "someone");
        assert!(matches!(snapshot.check(), Err(DomainError::InvalidBookData(_))));
    }

    #[test]
    fn bad_thumbnail_fails_check() {
        let snapshot = BookSnapshot::new("Demian", "Hesse").with_thumbnail("not a url");
        assert!(snapshot.check().is_err());
    }

    #[test]
    fn catalog_book_from_snapshot_is_manual() {
        let snapshot = BookSnapshot::new(" Demian ", "Hesse");
        let key = snapshot.natural_key().unwrap();
        let book = CatalogBook::from_snapshot(&snapshot, key.clone(), Utc::now());
        assert!(book.is_manual_entry);
        assert_eq!(book.title, "Demian");
        assert_eq!(book.natural_key, key);
    }
}
