//! Identity listener.

use std::sync::{Arc, Weak};

use tokio::sync::broadcast::{Receiver, error::RecvError};
use tracing::{debug, error, warn};

use crate::{
    cart::service::{CartInner, CartService},
    identity::{IdentityProvider, SessionEvent},
};

/// Forward session changes to the cart until either side goes away.
pub(crate) async fn listen(
    cart: Weak<CartInner>,
    identity: Arc<dyn IdentityProvider>,
    mut events: Receiver<SessionEvent>,
) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "missed session events, re-reading current session");

                match identity.current_session().await {
                    Ok(Some(session)) => SessionEvent::SignedIn(session),
                    Ok(None) => SessionEvent::SignedOut,
                    Err(error) => {
                        error!(%error, "failed to read current session");
                        continue;
                    }
                }
            }
            Err(RecvError::Closed) => break,
        };

        let Some(inner) = cart.upgrade() else {
            break;
        };

        CartService::from_inner(inner)
            .handle_session_event(event)
            .await;
    }

    debug!("session listener stopped");
}
