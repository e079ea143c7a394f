//! Domain services backed by `PostgreSQL`.

pub mod books;
pub mod orders;
