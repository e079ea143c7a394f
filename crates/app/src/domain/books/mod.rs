//! Books

pub mod errors;
pub mod records;
mod repository;
pub mod service;

pub use errors::BooksServiceError;
pub use service::*;
