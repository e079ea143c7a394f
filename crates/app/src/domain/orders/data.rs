//! Order Data

use bookshelf::CartItem;
use rust_decimal::Decimal;

use crate::domain::books::records::BookUuid;

/// New Order Item Data
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderItem {
    pub book_uuid: BookUuid,
    pub quantity: u32,
    pub price_at_time: Decimal,
}

impl TryFrom<&CartItem> for NewOrderItem {
    type Error = uuid::Error;

    fn try_from(item: &CartItem) -> Result<Self, Self::Error> {
        Ok(Self {
            book_uuid: item.id.parse()?,
            quantity: item.quantity,
            price_at_time: item.price,
        })
    }
}
