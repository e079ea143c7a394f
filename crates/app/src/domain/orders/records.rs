//! Order Records

use std::{fmt, str::FromStr};

use bookshelf::CartItem;
use jiff::Timestamp;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::{domain::books::records::BookUuid, identity::UserUuid, uuids::TypedUuid};

/// Order UUID
pub type OrderUuid = TypedUuid<OrderRecord>;

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    /// Not yet checked out; doubles as the durable cart.
    Pending,
    Completed,
    Cancelled,
}

impl OrderStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown order status string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown order status `{0}`")]
pub struct UnknownOrderStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownOrderStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(UnknownOrderStatus(other.to_string())),
        }
    }
}

/// Order Record
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRecord {
    pub uuid: OrderUuid,
    pub user_uuid: UserUuid,
    pub status: OrderStatus,
    pub total: Decimal,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Order Item UUID
pub type OrderItemUuid = TypedUuid<OrderItemRecord>;

/// Order line joined with the display fields of its book.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItemRecord {
    pub uuid: OrderItemUuid,
    pub order_uuid: OrderUuid,
    pub book_uuid: BookUuid,
    pub title: String,
    pub author: String,
    pub cover_image: String,
    pub quantity: u32,

    /// Price captured when the book was added, not the live catalog price.
    pub price_at_time: Decimal,
}

impl From<OrderItemRecord> for CartItem {
    fn from(record: OrderItemRecord) -> Self {
        Self {
            id: record.book_uuid.to_string(),
            title: record.title,
            author: record.author,
            price: record.price_at_time,
            cover_image: record.cover_image,
            quantity: record.quantity,
        }
    }
}
