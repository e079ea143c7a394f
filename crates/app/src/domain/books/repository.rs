//! Books Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query_as};

use crate::domain::books::records::{BookRecord, BookUuid, NewBook};

const GET_BOOK_SQL: &str = include_str!("sql/get_book.sql");
const CREATE_BOOK_SQL: &str = include_str!("sql/create_book.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgBooksRepository;

impl PgBooksRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn get_book(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        book: BookUuid,
    ) -> Result<BookRecord, sqlx::Error> {
        query_as::<Postgres, BookRecord>(GET_BOOK_SQL)
            .bind(book.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn create_book(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        book: NewBook,
    ) -> Result<BookRecord, sqlx::Error> {
        query_as::<Postgres, BookRecord>(CREATE_BOOK_SQL)
            .bind(book.uuid.into_uuid())
            .bind(book.title)
            .bind(book.author)
            .bind(book.price)
            .bind(book.cover_image)
            .fetch_one(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for BookRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: BookUuid::from_uuid(row.try_get("uuid")?),
            title: row.try_get("title")?,
            author: row.try_get("author")?,
            price: row.try_get("price")?,
            cover_image: row.try_get("cover_image")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}
