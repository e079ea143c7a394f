//! In-process identity provider.

use async_trait::async_trait;
use tokio::sync::{broadcast, watch};
use tracing::debug;

use crate::identity::{IdentityError, IdentityProvider, Session, SessionEvent, UserUuid};

const EVENT_CAPACITY: usize = 16;

/// Identity provider that lives in the current process.
///
/// Used by the CLI, where the acting user is given on the command line, and in tests.
#[derive(Debug)]
pub struct LocalIdentityProvider {
    session: watch::Sender<Option<Session>>,
    events: broadcast::Sender<SessionEvent>,
}

impl Default for LocalIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalIdentityProvider {
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            session: watch::Sender::new(None),
            events,
        }
    }

    /// Start a session for `user`, replacing any current one.
    pub fn sign_in(&self, user: UserUuid) {
        let session = Session::new(user);

        self.session.send_replace(Some(session));
        self.publish(SessionEvent::SignedIn(session));
    }

    /// End the current session. Does nothing when nobody is signed in.
    pub fn sign_out(&self) {
        if self.session.send_replace(None).is_some() {
            self.publish(SessionEvent::SignedOut);
        }
    }

    /// Refresh the current session's user details.
    pub fn update_user(&self, user: UserUuid) {
        let session = Session::new(user);

        self.session.send_replace(Some(session));
        self.publish(SessionEvent::UserUpdated(session));
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is fine: the current session is still readable.
        if self.events.send(event).is_err() {
            debug!(?event, "session event had no subscribers");
        }
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn current_session(&self) -> Result<Option<Session>, IdentityError> {
        Ok(*self.session.borrow())
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}
