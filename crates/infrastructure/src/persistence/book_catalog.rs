//! SQLite book catalog
//!
//! The `natural_key` column is `UNIQUE`; a losing concurrent insert comes
//! back as `Duplicate` and the caller re-reads the winner.

use application::{error::ApplicationError, ports::BookCatalogPort};
use async_trait::async_trait;
use domain::{BookId, CatalogBook, NaturalKey};
use sqlx::SqlitePool;
use tracing::{debug, instrument};

use super::{
    error::map_sqlx_error,
    timestamps::{from_db_time, to_db_time},
};

const BOOK_COLUMNS: &str =
    "id, natural_key, title, authors, isbn, publisher, thumbnail, is_manual_entry, created_at";

/// SQLite-backed book catalog
#[derive(Debug, Clone)]
pub struct SqliteBookCatalog {
    pool: SqlitePool,
}

impl SqliteBookCatalog {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BookRow {
    id: String,
    natural_key: String,
    title: String,
    authors: String,
    isbn: Option<String>,
    publisher: Option<String>,
    thumbnail: Option<String>,
    is_manual_entry: bool,
    created_at: String,
}

impl BookRow {
    fn into_book(self) -> Result<CatalogBook, ApplicationError> {
        Ok(CatalogBook {
            id: BookId::parse(&self.id)
                .map_err(|e| ApplicationError::Internal(format!("Invalid stored book id: {e}")))?,
            natural_key: NaturalKey::from_stored(self.natural_key),
            title: self.title,
            authors: serde_json::from_str(&self.authors)
                .map_err(|e| ApplicationError::Internal(format!("Invalid stored authors: {e}")))?,
            isbn: self.isbn,
            publisher: self.publisher,
            thumbnail: self.thumbnail,
            is_manual_entry: self.is_manual_entry,
            created_at: from_db_time(&self.created_at)?,
        })
    }
}

#[async_trait]
impl BookCatalogPort for SqliteBookCatalog {
    #[instrument(skip(self), fields(natural_key = %key))]
    async fn find_by_natural_key(
        &self,
        key: &NaturalKey,
    ) -> Result<Option<CatalogBook>, ApplicationError> {
        let sql = format!("SELECT {BOOK_COLUMNS} FROM books WHERE natural_key = $1");
        let row: Option<BookRow> = sqlx::query_as(&sql)
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        row.map(BookRow::into_book).transpose()
    }

    #[instrument(skip(self, book), fields(book_id = %book.id, natural_key = %book.natural_key))]
    async fn create(&self, book: &CatalogBook) -> Result<CatalogBook, ApplicationError> {
        let authors = serde_json::to_string(&book.authors)
            .map_err(|e| ApplicationError::Internal(format!("Failed to encode authors: {e}")))?;

        sqlx::query(
            "INSERT INTO books (id, natural_key, title, authors, isbn, publisher, thumbnail, \
             is_manual_entry, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(book.id.to_string())
        .bind(book.natural_key.as_str())
        .bind(&book.title)
        .bind(authors)
        .bind(book.isbn.as_deref())
        .bind(book.publisher.as_deref())
        .bind(book.thumbnail.as_deref())
        .bind(book.is_manual_entry)
        .bind(to_db_time(book.created_at))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        debug!("Catalog entry created");
        Ok(book.clone())
    }

    #[instrument(skip(self), fields(book_id = %id))]
    async fn get(&self, id: &BookId) -> Result<Option<CatalogBook>, ApplicationError> {
        let sql = format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = $1");
        let row: Option<BookRow> = sqlx::query_as(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        row.map(BookRow::into_book).transpose()
    }
}
