//! User-facing notifications.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Success,
    Destructive,
}

/// A toast-style message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub description: String,
}

impl Notification {
    #[must_use]
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            title: title.into(),
            description: description.into(),
        }
    }

    #[must_use]
    pub fn destructive(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Destructive,
            title: title.into(),
            description: description.into(),
        }
    }

    #[must_use]
    pub fn item_added(title: &str) -> Self {
        Self::success("Added to cart", format!("{title} has been added to your cart."))
    }

    #[must_use]
    pub fn item_removed() -> Self {
        Self::success("Removed from cart", "Item has been removed from your cart.")
    }

    #[must_use]
    pub fn cart_not_saved() -> Self {
        Self::destructive(
            "Cart not saved",
            "Your latest cart changes could not be saved. They will be retried on your next change.",
        )
    }

    #[must_use]
    pub fn cart_not_loaded() -> Self {
        Self::destructive("Cart not loaded", "Your saved cart could not be loaded.")
    }

    #[must_use]
    pub fn book_unavailable() -> Self {
        Self::destructive("Book unavailable", "That book could not be found.")
    }
}

/// Fan-out of notifications to any number of listeners.
#[derive(Debug, Clone)]
pub struct Notifier {
    sender: broadcast::Sender<Notification>,
}

impl Notifier {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));

        Self { sender }
    }

    pub fn notify(&self, notification: Notification) {
        if let Err(broadcast::error::SendError(dropped)) = self.sender.send(notification) {
            trace!(title = %dropped.title, "notification had no listeners");
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn item_added_names_the_book() {
        let notification = Notification::item_added("1984");

        assert_eq!(notification.kind, NotificationKind::Success);
        assert_eq!(notification.title, "Added to cart");
        assert_eq!(notification.description, "1984 has been added to your cart.");
    }

    #[tokio::test]
    async fn subscribers_receive_notifications() -> TestResult {
        let notifier = Notifier::new(4);
        let mut receiver = notifier.subscribe();

        notifier.notify(Notification::item_removed());

        assert_eq!(receiver.recv().await?, Notification::item_removed());

        Ok(())
    }

    #[test]
    fn notify_without_listeners_is_silent() {
        let notifier = Notifier::new(0);

        notifier.notify(Notification::cart_not_loaded());
    }
}
