//! Identity provider contract.

use async_trait::async_trait;
use mockall::automock;
use tokio::sync::broadcast;

use crate::identity::{IdentityError, Session, SessionEvent};

#[automock]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The session that is active right now, if any.
    async fn current_session(&self) -> Result<Option<Session>, IdentityError>;

    /// Subscribe to session changes that happen after this call.
    fn subscribe(&self) -> broadcast::Receiver<SessionEvent>;
}
