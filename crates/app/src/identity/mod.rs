//! Identity
//!
//! The cart only consumes the observable side of authentication: who is signed in right now,
//! and a stream of session changes. Issuing sessions is the identity provider's business.

mod errors;
mod local;
mod models;
mod provider;

pub use errors::IdentityError;
pub use local::LocalIdentityProvider;
pub use models::*;
pub use provider::*;
