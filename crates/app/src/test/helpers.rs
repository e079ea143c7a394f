//! Test Helpers

use rust_decimal::Decimal;

use crate::{
    domain::books::{
        BooksServiceError,
        records::{BookRecord, BookUuid, NewBook},
    },
    test::TestContext,
};

pub(crate) async fn create_book(
    ctx: &TestContext,
    title: &str,
    price: Decimal,
) -> Result<BookRecord, BooksServiceError> {
    ctx.books
        .create_book(NewBook {
            uuid: BookUuid::now_v7(),
            title: title.to_string(),
            author: "Test Author".to_string(),
            price,
            cover_image: format!("{}.jpg", title.to_lowercase()),
        })
        .await
}
