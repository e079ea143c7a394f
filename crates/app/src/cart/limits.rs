//! Bounds a cart line must respect to be stored in a pending order.

use bookshelf::{CartItem, CartState};
use rust_decimal::Decimal;

use crate::{cart::errors::CartError, domain::books::records::BookUuid};

/// `order_items.quantity` is an `INTEGER`.
pub(crate) const MAX_QUANTITY: u32 = i32::MAX.unsigned_abs();

/// `order_items.price_at_time` is `NUMERIC(10, 2)`.
fn max_price() -> Decimal {
    Decimal::new(99_999_999_99, 2)
}

/// `orders.total` is `NUMERIC(12, 2)`.
fn max_total() -> Decimal {
    Decimal::new(9_999_999_999_99, 2)
}

pub(crate) fn check_item(id: &str, price: Decimal) -> Result<(), CartError> {
    id.parse::<BookUuid>()
        .map_err(|source| CartError::InvalidItemId {
            id: id.to_string(),
            source,
        })?;

    if price < Decimal::ZERO || price > max_price() {
        return Err(CartError::InvalidPrice(price));
    }

    Ok(())
}

pub(crate) fn check_quantity(quantity: u32) -> Result<(), CartError> {
    if (1..=MAX_QUANTITY).contains(&quantity) {
        Ok(())
    } else {
        Err(CartError::InvalidQuantity)
    }
}

/// A stored line, e.g. one read back from the signed-out cart file.
pub(crate) fn check_line(item: &CartItem) -> Result<(), CartError> {
    check_item(&item.id, item.price)?;
    check_quantity(item.quantity)
}

/// The cart a mutation would produce.
pub(crate) fn check_cart(cart: &CartState) -> Result<(), CartError> {
    if cart.items().iter().any(|item| item.quantity > MAX_QUANTITY) {
        return Err(CartError::InvalidQuantity);
    }

    if cart.total() > max_total() {
        return Err(CartError::TotalTooLarge);
    }

    Ok(())
}
