//! Bookshelf
//!
//! Bookshelf is the storefront cart engine: a pure, synchronous cart state machine with
//! exact decimal pricing. Persistence and identity concerns live in `bookshelf-app`.

pub mod cart;
pub mod items;
pub mod pricing;

pub use cart::{CartAction, CartState, reduce};
pub use items::{CartItem, NewCartItem};
