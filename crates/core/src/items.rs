//! Items

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A product snapshot that is about to enter the cart.
///
/// Carries everything a cart line needs except the quantity, which the cart owns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCartItem {
    /// Product identifier, stable across sessions.
    pub id: String,

    /// Book title at the time the item was added.
    pub title: String,

    /// Book author at the time the item was added.
    pub author: String,

    /// Unit price captured at add-time.
    pub price: Decimal,

    /// Cover image reference, display only.
    pub cover_image: String,
}

impl NewCartItem {
    /// Turn the snapshot into a cart line with the given quantity.
    pub fn with_quantity(self, quantity: u32) -> CartItem {
        CartItem {
            id: self.id,
            title: self.title,
            author: self.author,
            price: self.price,
            cover_image: self.cover_image,
            quantity,
        }
    }
}

/// One distinct product line in the cart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Product identifier, unique within a cart.
    pub id: String,

    /// Book title at the time the item was added.
    pub title: String,

    /// Book author at the time the item was added.
    pub author: String,

    /// Unit price captured at add-time. Never refreshed from the catalog.
    pub price: Decimal,

    /// Cover image reference, display only.
    pub cover_image: String,

    /// Number of units, always at least one while the line is in a cart.
    pub quantity: u32,
}

impl CartItem {
    /// Returns the price of the whole line (unit price × quantity), or `None` if it overflows.
    pub fn line_total(&self) -> Option<Decimal> {
        self.price.checked_mul(Decimal::from(self.quantity))
    }
}
