//! Books service.

use async_trait::async_trait;
use mockall::automock;

use crate::{
    database::Db,
    domain::books::{
        errors::BooksServiceError,
        records::{BookRecord, BookUuid, NewBook},
        repository::PgBooksRepository,
    },
};

#[derive(Debug, Clone)]
pub struct PgBooksService {
    db: Db,
    repository: PgBooksRepository,
}

impl PgBooksService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgBooksRepository::new(),
        }
    }

    /// Add a book to the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the book already exists or the insert fails.
    pub async fn create_book(&self, book: NewBook) -> Result<BookRecord, BooksServiceError> {
        let mut tx = self.db.pool().begin().await?;

        let created = self.repository.create_book(&mut tx, book).await?;

        tx.commit().await?;

        Ok(created)
    }
}

#[async_trait]
impl BooksService for PgBooksService {
    async fn get_book(&self, book: BookUuid) -> Result<BookRecord, BooksServiceError> {
        let mut tx = self.db.pool().begin().await?;

        let record = self.repository.get_book(&mut tx, book).await?;

        tx.commit().await?;

        Ok(record)
    }
}

#[automock]
#[async_trait]
/// Read-only catalog lookups used to seed cart lines.
pub trait BooksService: Send + Sync {
    /// Retrieve the current snapshot of a single book.
    async fn get_book(&self, book: BookUuid) -> Result<BookRecord, BooksServiceError>;
}
