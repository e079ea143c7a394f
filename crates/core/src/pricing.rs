//! Pricing

use rust_decimal::Decimal;
use rusty_money::{Money, iso::Currency};

use crate::items::CartItem;

/// Calculates the total price of a list of cart lines from scratch.
///
/// An empty list totals zero. Returns `None` if the sum does not fit in a [`Decimal`].
pub fn total_price(items: &[CartItem]) -> Option<Decimal> {
    items.iter().try_fold(Decimal::ZERO, |acc, item| {
        item.line_total().and_then(|line| acc.checked_add(line))
    })
}

/// Formats an amount for display in the given currency.
pub fn format_amount(amount: Decimal, currency: &'static Currency) -> String {
    format!("{}", Money::from_decimal(amount, currency))
}
