//! Cart
//!
//! The cart state machine. Every change to a [`CartState`] goes through a [`CartAction`], and
//! applying an action is synchronous, infallible and free of side effects. The running `total`
//! is adjusted alongside `items` so that it always equals the sum of the line totals.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    items::{CartItem, NewCartItem},
    pricing::total_price,
};

/// Discrete cart transitions.
///
/// An action that would overflow a quantity or the total leaves the cart unchanged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CartAction {
    /// Add one unit of a product, merging with an existing line for the same id.
    AddItem(NewCartItem),

    /// Delete the line with the given id.
    RemoveItem(String),

    /// Set the quantity of an existing line. Zero is ignored.
    UpdateQuantity {
        /// Line id.
        id: String,

        /// New quantity, must be at least one to have any effect.
        quantity: u32,
    },

    /// Empty the cart.
    ClearCart,

    /// Replace the cart wholesale, e.g. when hydrating from a pending order.
    SetCart(Vec<CartItem>),
}

/// The cart aggregate: ordered, id-unique lines plus their derived total.
///
/// Serializes for display and export only; rebuild a cart from stored lines with
/// [`CartAction::SetCart`] so the total is recomputed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CartState {
    items: Vec<CartItem>,
    total: Decimal,
}

impl CartState {
    /// Create an empty cart.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines in the order they were first added.
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Sum of `price × quantity` over every line.
    pub fn total(&self) -> Decimal {
        self.total
    }

    /// Number of distinct lines.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up a line by product id.
    pub fn item(&self, id: &str) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Quantity held for a product id, zero when absent.
    pub fn quantity_of(&self, id: &str) -> u32 {
        self.item(id).map_or(0, |item| item.quantity)
    }

    /// Consume the cart, returning its lines.
    pub fn into_items(self) -> Vec<CartItem> {
        self.items
    }

    /// Apply an action in place. Returns `true` if the cart changed.
    pub fn apply(&mut self, action: CartAction) -> bool {
        match action {
            CartAction::AddItem(item) => self.add_item(item),
            CartAction::RemoveItem(id) => self.remove_item(&id),
            CartAction::UpdateQuantity { id, quantity } => self.update_quantity(&id, quantity),
            CartAction::ClearCart => self.clear(),
            CartAction::SetCart(items) => self.set_items(items),
        }
    }

    fn add_item(&mut self, item: NewCartItem) -> bool {
        if let Some(existing) = self.items.iter_mut().find(|line| line.id == item.id) {
            let (Some(quantity), Some(total)) = (
                existing.quantity.checked_add(1),
                self.total.checked_add(existing.price),
            ) else {
                return false;
            };

            existing.quantity = quantity;
            self.total = total;

            return true;
        }

        let Some(total) = self.total.checked_add(item.price) else {
            return false;
        };

        self.total = total;
        self.items.push(item.with_quantity(1));

        true
    }

    fn remove_item(&mut self, id: &str) -> bool {
        let Some(position) = self.items.iter().position(|line| line.id == id) else {
            return false;
        };

        let Some(total) = self
            .items
            .get(position)
            .and_then(CartItem::line_total)
            .and_then(|line| self.total.checked_sub(line))
        else {
            return false;
        };

        self.items.remove(position);
        self.total = total;

        true
    }

    fn update_quantity(&mut self, id: &str, quantity: u32) -> bool {
        if quantity < 1 {
            return false;
        }

        let Some(line) = self.items.iter_mut().find(|line| line.id == id) else {
            return false;
        };

        if line.quantity == quantity {
            return false;
        }

        let delta = Decimal::from(quantity) - Decimal::from(line.quantity);

        let Some(total) = delta
            .checked_mul(line.price)
            .and_then(|change| self.total.checked_add(change))
        else {
            return false;
        };

        line.quantity = quantity;
        self.total = total;

        true
    }

    fn clear(&mut self) -> bool {
        if self.items.is_empty() && self.total.is_zero() {
            return false;
        }

        self.items.clear();
        self.total = Decimal::ZERO;

        true
    }

    fn set_items(&mut self, items: Vec<CartItem>) -> bool {
        let mut merged: Vec<CartItem> = Vec::with_capacity(items.len());

        // Duplicate ids fold into the first line; empty lines never enter the cart.
        for item in items.into_iter().filter(|item| item.quantity > 0) {
            match merged.iter_mut().find(|line| line.id == item.id) {
                Some(line) => line.quantity = line.quantity.saturating_add(item.quantity),
                None => merged.push(item),
            }
        }

        // A cart whose total cannot be represented is rejected whole.
        let Some(total) = total_price(&merged) else {
            return false;
        };

        if merged == self.items && total == self.total {
            return false;
        }

        self.items = merged;
        self.total = total;

        true
    }
}

/// Compute the next cart state from the current one and an action.
pub fn reduce(state: &CartState, action: CartAction) -> CartState {
    let mut next = state.clone();
    next.apply(action);

    next
}
