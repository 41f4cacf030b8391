//! Port for the canonical book catalog
//!
//! Implementations must reject a second record with the same natural key
//! (`Duplicate`) so that find-or-create stays safe across processes.

use async_trait::async_trait;
use domain::{BookId, CatalogBook, NaturalKey};
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait BookCatalogPort: Send + Sync {
    /// Look up a catalog record by its natural key
    async fn find_by_natural_key(
        &self,
        key: &NaturalKey,
    ) -> Result<Option<CatalogBook>, ApplicationError>;

    /// Insert a new record; `Duplicate` if the natural key exists
    async fn create(&self, book: &CatalogBook) -> Result<CatalogBook, ApplicationError>;

    /// Look up a catalog record by id
    async fn get(&self, id: &BookId) -> Result<Option<CatalogBook>, ApplicationError>;
}
