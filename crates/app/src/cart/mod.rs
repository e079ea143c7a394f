//! Cart
//!
//! [`CartService`] owns the in-memory cart and is the only writer of it. Every mutation is
//! checked against what a pending order can store, applied locally, and then queued for the
//! background sync worker, which mirrors a snapshot of the cart into the signed-in user's
//! pending order. Identity changes drive
//! hydration from that order (sign-in) or a local reset (sign-out).

pub mod config;
pub mod errors;
mod limits;
pub mod local;
mod service;
mod session;
mod state;
pub mod summary;
mod sync;

pub use config::{AnonymousCart, CartConfig, CartCurrency};
pub use errors::{CartError, CartSyncError, LocalCartError};
pub use local::{JsonFileCartStore, LocalCartStore};
pub use service::{CartDeps, CartService};
pub use summary::write_cart;
