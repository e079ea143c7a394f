//! Bookshelf application: cart service, persistence and identity wiring.

pub mod cart;
pub mod config;
pub mod context;
pub mod database;
pub mod domain;
pub mod identity;
pub mod notifications;
pub mod observability;

#[cfg(test)]
mod test;

mod uuids;
