//! Identity errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity provider unavailable")]
    Unavailable,

    #[error("session lookup failed: {0}")]
    Lookup(String),
}
