//! Cart errors.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{
    cart::limits::MAX_QUANTITY,
    domain::{books::BooksServiceError, orders::OrdersServiceError},
};

/// Errors returned to callers of the cart service.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("quantity must be between 1 and {}", MAX_QUANTITY)]
    InvalidQuantity,

    #[error("cart item `{id}` is not a book id")]
    InvalidItemId {
        id: String,
        #[source]
        source: uuid::Error,
    },

    #[error("price {0} cannot be stored in an order")]
    InvalidPrice(Decimal),

    #[error("cart total would exceed what an order can hold")]
    TotalTooLarge,

    #[error("book lookup failed")]
    Book(#[from] BooksServiceError),

    #[error("cart sync worker has stopped")]
    WorkerStopped,
}

/// Failures while mirroring the cart. These never reach the caller of a mutation; the worker
/// logs them and raises a notification instead.
#[derive(Debug, Error)]
pub enum CartSyncError {
    #[error("cart item `{id}` is not a book id")]
    InvalidItemId {
        id: String,
        #[source]
        source: uuid::Error,
    },

    #[error("pending order disappeared while saving")]
    OrderVanished,

    #[error(transparent)]
    Orders(#[from] OrdersServiceError),

    #[error(transparent)]
    Local(#[from] LocalCartError),
}

#[derive(Debug, Error)]
pub enum LocalCartError {
    #[error("failed to access local cart file")]
    Io(#[from] std::io::Error),

    #[error("local cart file is not valid JSON")]
    Json(#[from] serde_json::Error),
}
