//! Orders
//!
//! The remote mirror of a user's cart: one `pending` order per user whose lines record the
//! quantity and the price captured when each book was added.

pub mod data;
pub mod errors;
pub mod records;
mod repositories;
pub mod service;

pub use errors::OrdersServiceError;
pub use service::*;
