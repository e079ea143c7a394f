//! Book Records

use bookshelf::NewCartItem;
use jiff::Timestamp;
use rust_decimal::Decimal;

use crate::uuids::TypedUuid;

/// Book UUID
pub type BookUuid = TypedUuid<BookRecord>;

/// Book Record
#[derive(Debug, Clone, PartialEq)]
pub struct BookRecord {
    pub uuid: BookUuid,
    pub title: String,
    pub author: String,
    pub price: Decimal,
    pub cover_image: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl BookRecord {
    /// Snapshot the book as a cart line candidate, capturing the current price.
    #[must_use]
    pub fn to_cart_item(&self) -> NewCartItem {
        NewCartItem {
            id: self.uuid.to_string(),
            title: self.title.clone(),
            author: self.author.clone(),
            price: self.price,
            cover_image: self.cover_image.clone(),
        }
    }
}

/// New Book Data
#[derive(Debug, Clone, PartialEq)]
pub struct NewBook {
    pub uuid: BookUuid,
    pub title: String,
    pub author: String,
    pub price: Decimal,
    pub cover_image: String,
}
