//! Identity Models

use crate::uuids::TypedUuid;

/// Marker for identifiers issued by the identity provider.
#[derive(Debug)]
pub struct User;

/// User UUID
pub type UserUuid = TypedUuid<User>;

/// An authenticated session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub user: UserUuid,
}

impl Session {
    #[must_use]
    pub fn new(user: UserUuid) -> Self {
        Self { user }
    }
}

/// Session lifecycle events published by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn(Session),
    SignedOut,
    UserUpdated(Session),
}
