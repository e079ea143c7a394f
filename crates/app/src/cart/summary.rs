//! Cart summary table.

use std::io;

use bookshelf::{CartState, pricing::format_amount};
use rusty_money::iso::Currency;
use tabled::{
    builder::Builder,
    settings::{Alignment, Style, object::Columns},
};

/// Write the cart as a table followed by its total.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn write_cart(
    mut out: impl io::Write,
    cart: &CartState,
    currency: &'static Currency,
) -> io::Result<()> {
    if cart.is_empty() {
        return writeln!(out, "Your cart is empty.");
    }

    let mut builder = Builder::default();

    builder.push_record(["Book", "Title", "Author", "Price", "Qty", "Line total"]);

    for item in cart.items() {
        builder.push_record([
            item.id.clone(),
            item.title.clone(),
            item.author.clone(),
            format_amount(item.price, currency),
            item.quantity.to_string(),
            item.line_total()
                .map_or_else(String::new, |line| format_amount(line, currency)),
        ]);
    }

    let mut table = builder.build();

    table.with(Style::modern_rounded());
    table.modify(Columns::new(3..6), Alignment::right());

    writeln!(out, "{table}")?;
    writeln!(out, "Total: {}", format_amount(cart.total(), currency))
}
