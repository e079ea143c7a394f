//! Cart service.

use std::sync::{Arc, OnceLock};

use bookshelf::{CartAction, CartState, NewCartItem};
use tokio::{
    sync::{
        broadcast,
        mpsc::{self, error::TrySendError},
        oneshot, watch,
    },
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    cart::{
        config::CartConfig,
        errors::CartError,
        limits,
        local::LocalCartStore,
        session,
        state::CartStore,
        sync::{SyncIntent, SyncWorker},
    },
    domain::{
        books::{BooksService, records::BookUuid},
        orders::PendingOrdersService,
    },
    identity::{IdentityProvider, SessionEvent, UserUuid},
    notifications::{Notification, Notifier},
};

/// Collaborators the cart talks to.
pub struct CartDeps {
    pub identity: Arc<dyn IdentityProvider>,
    pub books: Arc<dyn BooksService>,
    pub orders: Arc<dyn PendingOrdersService>,

    /// Storage for the signed-out cart. `None` keeps it in memory only.
    pub local: Option<Arc<dyn LocalCartStore>>,
}

pub(crate) struct CartInner {
    store: Arc<CartStore>,
    intents: mpsc::Sender<SyncIntent>,
    books: Arc<dyn BooksService>,
    persists_anonymous: bool,
    listener: OnceLock<JoinHandle<()>>,
}

impl Drop for CartInner {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.get() {
            listener.abort();
        }
    }
}

/// Handle to the cart. Cheap to clone; all clones share one cart.
///
/// Mutations update the local cart immediately and return without waiting for persistence.
/// Persistence failures surface as notifications, never as errors from the mutation.
#[derive(Clone)]
pub struct CartService {
    inner: Arc<CartInner>,
}

impl CartService {
    /// Build the cart, spawn its sync worker and identity listener, and adopt the current
    /// session.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn start(config: &CartConfig, deps: CartDeps) -> Self {
        let store = Arc::new(CartStore::new(Notifier::new(config.notification_capacity)));
        let (intents, receiver) = mpsc::channel(config.sync_queue_capacity.max(1));

        if let Some(local) = &deps.local {
            load_anonymous_cart(&store, local.as_ref()).await;
        }

        let worker = SyncWorker::new(Arc::clone(&store), deps.orders, deps.local.clone());

        tokio::spawn(worker.run(receiver));

        // Subscribe before reading the session so no change slips in between.
        let events = deps.identity.subscribe();

        let current = match deps.identity.current_session().await {
            Ok(session) => session,
            Err(error) => {
                warn!(%error, "failed to read current session, starting signed out");
                None
            }
        };

        let inner = Arc::new(CartInner {
            store,
            intents,
            books: deps.books,
            persists_anonymous: deps.local.is_some(),
            listener: OnceLock::new(),
        });

        let listener = tokio::spawn(session::listen(
            Arc::downgrade(&inner),
            Arc::clone(&deps.identity),
            events,
        ));

        // Freshly created, so the cell is always empty here.
        let _ = inner.listener.set(listener);

        let cart = Self { inner };

        if let Some(session) = current {
            cart.handle_session_event(SessionEvent::SignedIn(session))
                .await;
        }

        cart
    }

    pub(crate) fn from_inner(inner: Arc<CartInner>) -> Self {
        Self { inner }
    }

    /// Current cart contents.
    #[must_use]
    pub fn state(&self) -> CartState {
        self.inner.store.snapshot()
    }

    /// Observe every change to the cart.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.inner.store.subscribe()
    }

    #[must_use]
    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.inner.store.notifier.subscribe()
    }

    /// The signed-in user the cart belongs to, if any.
    #[must_use]
    pub fn user(&self) -> Option<UserUuid> {
        self.inner.store.session().user
    }

    /// Add one unit of `item`, merging with a line for the same book.
    ///
    /// # Errors
    ///
    /// Returns an error if the line could not be stored in a pending order: the id is not a
    /// book id, the price is out of range, or the cart total would grow too large. The cart is
    /// left unchanged.
    pub fn add_item(&self, item: NewCartItem) -> Result<(), CartError> {
        limits::check_item(&item.id, item.price)?;

        let notification = Notification::item_added(&item.title);

        if self.try_dispatch(CartAction::AddItem(item))? {
            self.inner.store.notifier.notify(notification);
        }

        Ok(())
    }

    /// Add one copy of a catalog book, priced as the catalog lists it right now.
    ///
    /// # Errors
    ///
    /// Returns an error if the book cannot be looked up or its line could not be stored. The
    /// cart is left unchanged.
    pub async fn add_book(&self, book: BookUuid) -> Result<(), CartError> {
        let record = match self.inner.books.get_book(book).await {
            Ok(record) => record,
            Err(error) => {
                warn!(%book, %error, "book lookup failed");

                self.inner
                    .store
                    .notifier
                    .notify(Notification::book_unavailable());

                return Err(error.into());
            }
        };

        self.add_item(record.to_cart_item())
    }

    pub fn remove_item(&self, id: &str) {
        if self.dispatch(CartAction::RemoveItem(id.to_string())) {
            self.inner.store.notifier.notify(Notification::item_removed());
        }
    }

    /// Set the quantity of a line already in the cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] for a quantity below 1 or above what an order line
    /// can hold, and [`CartError::TotalTooLarge`] if the new total could not be stored.
    pub fn update_quantity(&self, id: &str, quantity: u32) -> Result<(), CartError> {
        limits::check_quantity(quantity)?;

        self.try_dispatch(CartAction::UpdateQuantity {
            id: id.to_string(),
            quantity,
        })?;

        Ok(())
    }

    pub fn clear_cart(&self) {
        self.dispatch(CartAction::ClearCart);
    }

    /// Wait until every intent queued before this call has been processed.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync worker is no longer running.
    pub async fn flush(&self) -> Result<(), CartError> {
        let (done, flushed) = oneshot::channel();

        self.inner
            .intents
            .send(SyncIntent::Flush(done))
            .await
            .map_err(|_| CartError::WorkerStopped)?;

        flushed.await.map_err(|_| CartError::WorkerStopped)
    }

    /// React to a session change from the identity provider.
    pub async fn handle_session_event(&self, event: SessionEvent) {
        let user = match event {
            SessionEvent::SignedIn(session) | SessionEvent::UserUpdated(session) => {
                Some(session.user)
            }
            SessionEvent::SignedOut => None,
        };

        // Emptied in the same step when another user's cart would otherwise leak across.
        let Some((_, current)) = self.inner.store.switch_session(user) else {
            debug!(?event, "session unchanged");
            return;
        };

        match current.user {
            Some(user) => {
                info!(%user, epoch = current.epoch, "session started");

                let hydrate = SyncIntent::Hydrate {
                    user,
                    epoch: current.epoch,
                };

                if self.inner.intents.send(hydrate).await.is_err() {
                    warn!(%user, "cart sync worker stopped, cart not hydrated");
                }
            }
            None => {
                // Local only: the pending order stays for the next sign-in.
                info!(epoch = current.epoch, "session ended, cart cleared");
            }
        }
    }

    fn dispatch(&self, action: CartAction) -> bool {
        let changed = self.inner.store.dispatch(action);

        if changed {
            self.request_save();
        }

        changed
    }

    fn try_dispatch(&self, action: CartAction) -> Result<bool, CartError> {
        let changed = self
            .inner
            .store
            .try_dispatch(action, limits::check_cart)?;

        if changed {
            self.request_save();
        }

        Ok(changed)
    }

    fn request_save(&self) {
        let store = &self.inner.store;
        let session = store.session();

        if session.user.is_none() && !self.inner.persists_anonymous {
            return;
        }

        if !store.claim_save() {
            debug!(epoch = session.epoch, "save already queued");
            return;
        }

        match self.inner.intents.try_send(SyncIntent::Save {
            epoch: session.epoch,
        }) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                // The next change queues a fresh snapshot.
                store.release_save();

                warn!(epoch = session.epoch, "cart sync queue full, save deferred");

                store.notifier.notify(Notification::cart_not_saved());
            }
            Err(TrySendError::Closed(_)) => {
                warn!("cart sync worker stopped, change not saved");

                store.notifier.notify(Notification::cart_not_saved());
            }
        }
    }
}

async fn load_anonymous_cart(store: &CartStore, local: &dyn LocalCartStore) {
    match local.load().await {
        Ok(items) if items.is_empty() => {}
        Ok(items) => {
            let items: Vec<_> = items
                .into_iter()
                .filter(|item| match limits::check_line(item) {
                    Ok(()) => true,
                    Err(error) => {
                        warn!(id = %item.id, %error, "dropping stored cart line");
                        false
                    }
                })
                .collect();

            debug!(lines = items.len(), "restored signed-out cart");

            store.dispatch(CartAction::SetCart(items));
        }
        Err(error) => {
            warn!(%error, "failed to restore signed-out cart");

            store.notifier.notify(Notification::cart_not_loaded());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        path::PathBuf,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use bookshelf::CartItem;
    use jiff::Timestamp;
    use rust_decimal::Decimal;
    use testresult::TestResult;
    use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

    use crate::{
        cart::local::MockLocalCartStore,
        domain::{
            books::{BooksServiceError, MockBooksService, records::BookRecord},
            orders::{
                MockPendingOrdersService, OrdersServiceError,
                data::NewOrderItem,
                records::{OrderItemRecord, OrderItemUuid, OrderRecord, OrderStatus, OrderUuid},
            },
        },
        identity::{LocalIdentityProvider, MockIdentityProvider, Session},
        notifications::NotificationKind,
    };

    use super::*;

    fn identity(session: Option<Session>) -> Arc<MockIdentityProvider> {
        let (events, _) = broadcast::channel(8);
        let mut identity = MockIdentityProvider::new();

        identity
            .expect_subscribe()
            .returning(move || events.subscribe());
        identity
            .expect_current_session()
            .returning(move || Ok(session));

        Arc::new(identity)
    }

    async fn start(
        identity: Arc<dyn IdentityProvider>,
        books: MockBooksService,
        orders: MockPendingOrdersService,
    ) -> CartService {
        CartService::start(
            &CartConfig::default(),
            CartDeps {
                identity,
                books: Arc::new(books),
                orders: Arc::new(orders),
                local: None,
            },
        )
        .await
    }

    fn pending_order(user: UserUuid) -> OrderRecord {
        OrderRecord {
            uuid: OrderUuid::now_v7(),
            user_uuid: user,
            status: OrderStatus::Pending,
            total: Decimal::ZERO,
            created_at: Timestamp::UNIX_EPOCH,
            updated_at: Timestamp::UNIX_EPOCH,
        }
    }

    fn order_line(
        order: &OrderRecord,
        title: &str,
        price: Decimal,
        quantity: u32,
    ) -> OrderItemRecord {
        OrderItemRecord {
            uuid: OrderItemUuid::now_v7(),
            order_uuid: order.uuid,
            book_uuid: BookUuid::now_v7(),
            title: title.to_string(),
            author: "Author".to_string(),
            cover_image: String::new(),
            quantity,
            price_at_time: price,
        }
    }

    fn book(title: &str, price: Decimal) -> NewCartItem {
        NewCartItem {
            id: BookUuid::now_v7().to_string(),
            title: title.to_string(),
            author: "Author".to_string(),
            price,
            cover_image: String::new(),
        }
    }

    /// Orders mock whose saves are reported on the returned channel.
    fn recording_orders(
        existing: Option<OrderRecord>,
    ) -> (MockPendingOrdersService, UnboundedReceiver<Vec<NewOrderItem>>) {
        let (saved, saves) = unbounded_channel();
        let mut orders = MockPendingOrdersService::new();

        let found = existing.clone();
        orders
            .expect_find_pending_order()
            .returning(move |_| Ok(found.clone()));
        orders
            .expect_get_order_items()
            .returning(|_, _| Ok(Vec::new()));

        if existing.is_none() {
            orders
                .expect_create_pending_order()
                .returning(|user| Ok(pending_order(user)));
        }

        orders
            .expect_replace_order_items()
            .returning(move |user, _, items| {
                let _ = saved.send(items);

                Ok(pending_order(user))
            });

        (orders, saves)
    }

    #[tokio::test]
    async fn anonymous_changes_stay_local() -> TestResult {
        let cart = start(
            identity(None),
            MockBooksService::new(),
            MockPendingOrdersService::new(),
        )
        .await;
        let mut notifications = cart.notifications();
        let item = book("1984", Decimal::new(12_50, 2));

        cart.add_item(item.clone())?;
        cart.add_item(item.clone())?;
        cart.flush().await?;

        assert_eq!(cart.state().quantity_of(&item.id), 2);
        assert_eq!(cart.state().total(), Decimal::new(25_00, 2));
        assert_eq!(notifications.try_recv()?, Notification::item_added("1984"));

        Ok(())
    }

    #[tokio::test]
    async fn sign_in_hydrates_from_pending_order_without_saving() -> TestResult {
        let user = UserUuid::now_v7();
        let order = pending_order(user);
        let lines = vec![
            order_line(&order, "Dune", Decimal::new(9_99, 2), 3),
            order_line(&order, "1984", Decimal::new(12_50, 2), 1),
        ];

        let mut orders = MockPendingOrdersService::new();
        orders
            .expect_find_pending_order()
            .returning(move |_| Ok(Some(order.clone())));
        orders
            .expect_get_order_items()
            .returning(move |_, _| Ok(lines.clone()));

        let cart = start(
            identity(Some(Session::new(user))),
            MockBooksService::new(),
            orders,
        )
        .await;

        cart.flush().await?;

        let state = cart.state();

        assert_eq!(cart.user(), Some(user));
        assert_eq!(state.len(), 2);
        assert_eq!(state.items().first().map(|item| item.title.as_str()), Some("Dune"));
        assert_eq!(state.total(), Decimal::new(42_47, 2));

        Ok(())
    }

    #[tokio::test]
    async fn rapid_changes_are_saved_as_one_snapshot() -> TestResult {
        let user = UserUuid::now_v7();
        let (orders, mut saves) = recording_orders(Some(pending_order(user)));

        let cart = start(
            identity(Some(Session::new(user))),
            MockBooksService::new(),
            orders,
        )
        .await;

        cart.flush().await?;

        let dune = book("Dune", Decimal::new(9_99, 2));
        let orwell = book("1984", Decimal::new(12_50, 2));

        cart.add_item(dune.clone())?;
        cart.add_item(orwell.clone())?;
        cart.update_quantity(&dune.id, 3)?;
        cart.flush().await?;

        let saved = saves.try_recv()?;

        assert_eq!(saved.len(), 2);
        assert_eq!(saved.first().map(|line| line.quantity), Some(3));
        assert_eq!(
            saved.first().map(|line| line.price_at_time),
            Some(Decimal::new(9_99, 2))
        );
        assert!(saves.try_recv().is_err(), "expected a single save");

        Ok(())
    }

    #[tokio::test]
    async fn first_signed_in_add_creates_pending_order() -> TestResult {
        let user = UserUuid::now_v7();
        let (orders, mut saves) = recording_orders(None);

        let cart = start(
            identity(Some(Session::new(user))),
            MockBooksService::new(),
            orders,
        )
        .await;

        cart.flush().await?;
        cart.add_item(book("Dune", Decimal::new(9_99, 2)))?;
        cart.flush().await?;

        assert_eq!(saves.try_recv()?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn clearing_signed_in_cart_saves_empty_snapshot() -> TestResult {
        let user = UserUuid::now_v7();
        let (orders, mut saves) = recording_orders(Some(pending_order(user)));

        let cart = start(
            identity(Some(Session::new(user))),
            MockBooksService::new(),
            orders,
        )
        .await;

        cart.flush().await?;
        cart.add_item(book("Dune", Decimal::new(9_99, 2)))?;
        cart.flush().await?;
        cart.clear_cart();
        cart.flush().await?;

        assert_eq!(saves.try_recv()?.len(), 1);
        assert!(saves.try_recv()?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn failed_save_notifies_and_keeps_local_cart() -> TestResult {
        let user = UserUuid::now_v7();
        let order = pending_order(user);

        let mut orders = MockPendingOrdersService::new();
        orders
            .expect_find_pending_order()
            .returning(move |_| Ok(Some(order.clone())));
        orders
            .expect_get_order_items()
            .returning(|_, _| Ok(Vec::new()));
        orders
            .expect_replace_order_items()
            .returning(|_, _, _| Err(OrdersServiceError::InvalidData));

        let cart = start(
            identity(Some(Session::new(user))),
            MockBooksService::new(),
            orders,
        )
        .await;

        cart.flush().await?;

        let mut notifications = cart.notifications();
        let item = book("Dune", Decimal::new(9_99, 2));

        cart.add_item(item.clone())?;
        cart.flush().await?;

        assert_eq!(cart.state().quantity_of(&item.id), 1);
        assert_eq!(notifications.try_recv()?, Notification::item_added("Dune"));

        let failure = notifications.try_recv()?;

        assert_eq!(failure.kind, NotificationKind::Destructive);
        assert_eq!(failure.title, "Cart not saved");

        Ok(())
    }

    #[tokio::test]
    async fn failed_hydration_leaves_cart_untouched() -> TestResult {
        let mut orders = MockPendingOrdersService::new();
        orders
            .expect_find_pending_order()
            .returning(|_| Err(OrdersServiceError::InvalidData));

        let cart = start(identity(None), MockBooksService::new(), orders).await;
        let mut notifications = cart.notifications();
        let item = book("Dune", Decimal::new(9_99, 2));

        cart.add_item(item.clone())?;
        cart.handle_session_event(SessionEvent::SignedIn(Session::new(UserUuid::now_v7())))
            .await;
        cart.flush().await?;

        assert_eq!(cart.state().quantity_of(&item.id), 1);
        assert_eq!(notifications.try_recv()?, Notification::item_added("Dune"));
        assert_eq!(notifications.try_recv()?, Notification::cart_not_loaded());

        Ok(())
    }

    #[tokio::test]
    async fn sign_in_without_pending_order_adopts_local_cart() -> TestResult {
        let (orders, mut saves) = recording_orders(None);

        let cart = start(identity(None), MockBooksService::new(), orders).await;
        let item = book("Dune", Decimal::new(9_99, 2));

        cart.add_item(item.clone())?;
        cart.add_item(item.clone())?;
        cart.handle_session_event(SessionEvent::SignedIn(Session::new(UserUuid::now_v7())))
            .await;
        cart.flush().await?;

        let saved = saves.try_recv()?;

        assert_eq!(saved.len(), 1);
        assert_eq!(saved.first().map(|line| line.quantity), Some(2));
        assert_eq!(cart.state().quantity_of(&item.id), 2);

        Ok(())
    }

    #[tokio::test]
    async fn sign_out_clears_cart_without_remote_writes() -> TestResult {
        let user = UserUuid::now_v7();
        let order = pending_order(user);
        let lines = vec![order_line(&order, "Dune", Decimal::new(9_99, 2), 1)];

        let mut orders = MockPendingOrdersService::new();
        orders
            .expect_find_pending_order()
            .returning(move |_| Ok(Some(order.clone())));
        orders
            .expect_get_order_items()
            .returning(move |_, _| Ok(lines.clone()));

        let cart = start(
            identity(Some(Session::new(user))),
            MockBooksService::new(),
            orders,
        )
        .await;

        cart.flush().await?;

        assert_eq!(cart.state().len(), 1);

        cart.handle_session_event(SessionEvent::SignedOut).await;
        cart.flush().await?;

        assert!(cart.state().is_empty());
        assert_eq!(cart.state().total(), Decimal::ZERO);
        assert_eq!(cart.user(), None);

        Ok(())
    }

    #[tokio::test]
    async fn save_queued_before_sign_out_is_dropped() -> TestResult {
        let user = UserUuid::now_v7();
        let order = pending_order(user);

        // No replace expectation: a save would panic the worker and fail the flush.
        let mut orders = MockPendingOrdersService::new();
        orders
            .expect_find_pending_order()
            .returning(move |_| Ok(Some(order.clone())));
        orders
            .expect_get_order_items()
            .returning(|_, _| Ok(Vec::new()));

        let cart = start(
            identity(Some(Session::new(user))),
            MockBooksService::new(),
            orders,
        )
        .await;

        cart.flush().await?;
        cart.add_item(book("Dune", Decimal::new(9_99, 2)))?;
        cart.handle_session_event(SessionEvent::SignedOut).await;
        cart.flush().await?;

        assert!(cart.state().is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn switching_users_does_not_leak_previous_cart() -> TestResult {
        let first = UserUuid::now_v7();
        let second = UserUuid::now_v7();
        let order = pending_order(first);
        let lines = vec![order_line(&order, "Dune", Decimal::new(9_99, 2), 2)];

        let mut orders = MockPendingOrdersService::new();
        orders
            .expect_find_pending_order()
            .returning(move |user| Ok((user == first).then(|| order.clone())));
        orders
            .expect_get_order_items()
            .returning(move |_, _| Ok(lines.clone()));

        let cart = start(
            identity(Some(Session::new(first))),
            MockBooksService::new(),
            orders,
        )
        .await;

        cart.flush().await?;

        assert_eq!(cart.state().len(), 1);

        cart.handle_session_event(SessionEvent::SignedIn(Session::new(second)))
            .await;
        cart.flush().await?;

        assert!(cart.state().is_empty());
        assert_eq!(cart.user(), Some(second));

        Ok(())
    }

    #[tokio::test]
    async fn repeated_sign_in_for_same_user_does_not_rehydrate() -> TestResult {
        let user = UserUuid::now_v7();
        let order = pending_order(user);

        let mut orders = MockPendingOrdersService::new();
        orders
            .expect_find_pending_order()
            .times(1)
            .returning(move |_| Ok(Some(order.clone())));
        orders
            .expect_get_order_items()
            .returning(|_, _| Ok(Vec::new()));

        let cart = start(
            identity(Some(Session::new(user))),
            MockBooksService::new(),
            orders,
        )
        .await;

        cart.handle_session_event(SessionEvent::UserUpdated(Session::new(user)))
            .await;
        cart.handle_session_event(SessionEvent::SignedIn(Session::new(user)))
            .await;

        // A second lookup would exceed `times(1)` and panic the worker.
        cart.flush().await?;

        Ok(())
    }

    #[tokio::test]
    async fn update_quantity_rejects_zero() -> TestResult {
        let cart = start(
            identity(None),
            MockBooksService::new(),
            MockPendingOrdersService::new(),
        )
        .await;
        let item = book("Dune", Decimal::new(9_99, 2));

        cart.add_item(item.clone())?;

        let result = cart.update_quantity(&item.id, 0);

        assert!(
            matches!(result, Err(CartError::InvalidQuantity)),
            "expected InvalidQuantity, got {result:?}"
        );
        assert_eq!(cart.state().quantity_of(&item.id), 1);

        Ok(())
    }

    #[tokio::test]
    async fn removing_missing_item_raises_no_notification() -> TestResult {
        let cart = start(
            identity(None),
            MockBooksService::new(),
            MockPendingOrdersService::new(),
        )
        .await;
        let mut notifications = cart.notifications();
        let item = book("Dune", Decimal::new(9_99, 2));

        cart.remove_item(&item.id);
        cart.add_item(item.clone())?;
        cart.remove_item(&item.id);

        assert_eq!(notifications.try_recv()?, Notification::item_added("Dune"));
        assert_eq!(notifications.try_recv()?, Notification::item_removed());
        assert!(cart.state().is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn add_book_seeds_line_from_catalog() -> TestResult {
        let uuid = BookUuid::now_v7();

        let mut books = MockBooksService::new();
        books.expect_get_book().returning(move |uuid| {
            Ok(BookRecord {
                uuid,
                title: "1984".to_string(),
                author: "George Orwell".to_string(),
                price: Decimal::new(12_50, 2),
                cover_image: "1984.jpg".to_string(),
                created_at: Timestamp::UNIX_EPOCH,
                updated_at: Timestamp::UNIX_EPOCH,
            })
        });

        let cart = start(identity(None), books, MockPendingOrdersService::new()).await;

        cart.add_book(uuid).await?;

        let state = cart.state();
        let line = state.item(&uuid.to_string());

        assert_eq!(line.map(|line| line.price), Some(Decimal::new(12_50, 2)));
        assert_eq!(line.map(|line| line.quantity), Some(1));

        Ok(())
    }

    #[tokio::test]
    async fn add_unknown_book_notifies_and_leaves_cart_unchanged() -> TestResult {
        let mut books = MockBooksService::new();
        books
            .expect_get_book()
            .returning(|_| Err(BooksServiceError::NotFound));

        let cart = start(identity(None), books, MockPendingOrdersService::new()).await;
        let mut notifications = cart.notifications();

        let result = cart.add_book(BookUuid::now_v7()).await;

        assert!(
            matches!(result, Err(CartError::Book(BooksServiceError::NotFound))),
            "expected book lookup error, got {result:?}"
        );
        assert_eq!(notifications.try_recv()?, Notification::book_unavailable());
        assert!(cart.state().is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn follows_identity_provider_events() -> TestResult {
        let user = UserUuid::now_v7();
        let provider = Arc::new(LocalIdentityProvider::new());

        let (orders, _saves) = recording_orders(None);

        let cart = start(
            Arc::clone(&provider) as Arc<dyn IdentityProvider>,
            MockBooksService::new(),
            orders,
        )
        .await;

        provider.sign_in(user);

        for _ in 0..100 {
            if cart.user().is_some() {
                break;
            }

            tokio::task::yield_now().await;
        }

        assert_eq!(cart.user(), Some(user));

        cart.add_item(book("Dune", Decimal::new(9_99, 2)))?;
        provider.sign_out();

        for _ in 0..100 {
            if cart.user().is_none() {
                break;
            }

            tokio::task::yield_now().await;
        }

        assert_eq!(cart.user(), None);
        assert!(cart.state().is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn signed_out_cart_is_restored_and_saved_locally() -> TestResult {
        let id = BookUuid::now_v7().to_string();
        let stored = CartItem {
            id: id.clone(),
            title: "1984".to_string(),
            author: "George Orwell".to_string(),
            price: Decimal::new(12_50, 2),
            cover_image: String::new(),
            quantity: 2,
        };
        let (saved, mut saves) = unbounded_channel();

        let mut local = MockLocalCartStore::new();
        let restored = stored.clone();
        let unstorable = CartItem {
            id: "b1".to_string(),
            ..stored.clone()
        };
        local
            .expect_load()
            .returning(move || Ok(vec![restored.clone(), unstorable.clone()]));
        local.expect_save().returning(move |items| {
            let _ = saved.send(items);

            Ok(())
        });

        let config = CartConfig {
            anonymous_cart_path: Some(PathBuf::from("unused.json")),
            ..CartConfig::default()
        };

        let cart = CartService::start(
            &config,
            CartDeps {
                identity: identity(None),
                books: Arc::new(MockBooksService::new()),
                orders: Arc::new(MockPendingOrdersService::new()),
                local: Some(Arc::new(local)),
            },
        )
        .await;

        assert_eq!(cart.state().len(), 1);
        assert_eq!(cart.state().total(), Decimal::new(25_00, 2));

        cart.update_quantity(&id, 1)?;
        cart.flush().await?;

        let saved = saves.try_recv()?;

        assert_eq!(saved.first().map(|item| item.quantity), Some(1));

        Ok(())
    }

    #[tokio::test]
    async fn unstorable_line_is_rejected_and_later_changes_still_save() -> TestResult {
        let user = UserUuid::now_v7();
        let (orders, mut saves) = recording_orders(Some(pending_order(user)));

        let cart = start(
            identity(Some(Session::new(user))),
            MockBooksService::new(),
            orders,
        )
        .await;

        cart.flush().await?;

        let mut notifications = cart.notifications();

        let result = cart.add_item(NewCartItem {
            id: "b1".to_string(),
            ..book("1984", Decimal::new(12_50, 2))
        });

        assert!(
            matches!(result, Err(CartError::InvalidItemId { ref id, .. }) if id == "b1"),
            "expected InvalidItemId, got {result:?}"
        );
        assert!(cart.state().is_empty());

        let dune = book("Dune", Decimal::new(9_99, 2));

        cart.add_item(dune.clone())?;
        cart.flush().await?;

        let saved = saves.try_recv()?;

        assert_eq!(saved.len(), 1);
        assert_eq!(
            saved.first().map(|line| line.book_uuid.to_string()),
            Some(dune.id)
        );
        assert_eq!(notifications.try_recv()?, Notification::item_added("Dune"));
        assert!(notifications.try_recv().is_err(), "unexpected notification");

        Ok(())
    }

    #[tokio::test]
    async fn out_of_range_prices_and_quantities_are_rejected() -> TestResult {
        let cart = start(
            identity(None),
            MockBooksService::new(),
            MockPendingOrdersService::new(),
        )
        .await;
        let item = book("Dune", Decimal::new(9_99, 2));

        let result = cart.add_item(book("Dune", Decimal::new(100_000_000, 0)));

        assert!(
            matches!(result, Err(CartError::InvalidPrice(_))),
            "expected InvalidPrice, got {result:?}"
        );

        cart.add_item(item.clone())?;

        let result = cart.update_quantity(&item.id, u32::MAX);

        assert!(
            matches!(result, Err(CartError::InvalidQuantity)),
            "expected InvalidQuantity, got {result:?}"
        );
        assert_eq!(cart.state().quantity_of(&item.id), 1);

        Ok(())
    }

    #[tokio::test]
    async fn quantity_that_would_overflow_order_total_is_rejected() -> TestResult {
        let cart = start(
            identity(None),
            MockBooksService::new(),
            MockPendingOrdersService::new(),
        )
        .await;
        let item = book("Atlas", Decimal::new(99_999_999_99, 2));

        cart.add_item(item.clone())?;

        let result = cart.update_quantity(&item.id, 1_000);

        assert!(
            matches!(result, Err(CartError::TotalTooLarge)),
            "expected TotalTooLarge, got {result:?}"
        );
        assert_eq!(cart.state().quantity_of(&item.id), 1);

        Ok(())
    }

    #[tokio::test]
    async fn full_sync_queue_notifies_and_next_change_saves() -> TestResult {
        let user = UserUuid::now_v7();
        let (orders, mut saves) = recording_orders(None);

        let config = CartConfig {
            sync_queue_capacity: 1,
            ..CartConfig::default()
        };

        // The queued hydration fills the queue until the worker first runs.
        let cart = CartService::start(
            &config,
            CartDeps {
                identity: identity(Some(Session::new(user))),
                books: Arc::new(MockBooksService::new()),
                orders: Arc::new(orders),
                local: None,
            },
        )
        .await;
        let mut notifications = cart.notifications();
        let item = book("Dune", Decimal::new(9_99, 2));

        cart.add_item(item.clone())?;

        let received = [notifications.try_recv()?, notifications.try_recv()?];

        assert!(
            received.contains(&Notification::cart_not_saved()),
            "expected a cart not saved notification, got {received:?}"
        );
        assert!(received.contains(&Notification::item_added("Dune")));

        cart.flush().await?;
        cart.add_item(item.clone())?;
        cart.flush().await?;

        let mut last = None;

        while let Ok(saved) = saves.try_recv() {
            last = Some(saved);
        }

        assert_eq!(
            last.and_then(|saved| saved.first().map(|line| line.quantity)),
            Some(2)
        );

        Ok(())
    }

    #[tokio::test]
    async fn missed_session_events_resync_from_provider() -> TestResult {
        let first = UserUuid::now_v7();
        let second = UserUuid::now_v7();
        let (events, _) = broadcast::channel(1);
        let (current, current_session) = watch::channel(None);
        let lookups = Arc::new(AtomicUsize::new(0));

        let mut identity = MockIdentityProvider::new();
        let subscriber = events.clone();
        identity
            .expect_subscribe()
            .returning(move || subscriber.subscribe());
        let counted = Arc::clone(&lookups);
        identity.expect_current_session().returning(move || {
            counted.fetch_add(1, Ordering::SeqCst);

            Ok(*current_session.borrow())
        });

        let mut orders = MockPendingOrdersService::new();
        orders
            .expect_find_pending_order()
            .times(1)
            .withf(move |user| *user == second)
            .returning(|_| Ok(None));

        let cart = start(Arc::new(identity), MockBooksService::new(), orders).await;

        // One slot, two events: the listener lags before it first runs.
        current.send_replace(Some(Session::new(second)));
        events.send(SessionEvent::SignedIn(Session::new(first)))?;
        events.send(SessionEvent::SignedIn(Session::new(second)))?;

        for _ in 0..100 {
            if lookups.load(Ordering::SeqCst) == 2 && cart.user() == Some(second) {
                break;
            }

            tokio::task::yield_now().await;
        }

        assert_eq!(lookups.load(Ordering::SeqCst), 2);
        assert_eq!(cart.user(), Some(second));

        cart.flush().await?;

        Ok(())
    }
}
