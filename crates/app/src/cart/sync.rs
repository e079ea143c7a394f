//! Background mirror of the cart into the pending order.

use std::sync::Arc;

use bookshelf::{CartAction, CartItem, CartState};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::{
    cart::{errors::CartSyncError, local::LocalCartStore, state::CartStore},
    domain::orders::{
        OrdersServiceError, PendingOrdersService, data::NewOrderItem, records::OrderRecord,
    },
    identity::UserUuid,
    notifications::Notification,
};

/// Work queued for the sync worker.
#[derive(Debug)]
pub(crate) enum SyncIntent {
    /// Persist whatever the cart holds when the intent is processed.
    Save { epoch: u64 },

    /// Replace the cart with the user's pending order.
    Hydrate { user: UserUuid, epoch: u64 },

    /// Answer once every earlier intent has been handled.
    Flush(oneshot::Sender<()>),
}

pub(crate) struct SyncWorker {
    store: Arc<CartStore>,
    orders: Arc<dyn PendingOrdersService>,
    local: Option<Arc<dyn LocalCartStore>>,
}

impl SyncWorker {
    pub(crate) fn new(
        store: Arc<CartStore>,
        orders: Arc<dyn PendingOrdersService>,
        local: Option<Arc<dyn LocalCartStore>>,
    ) -> Self {
        Self {
            store,
            orders,
            local,
        }
    }

    /// Drain intents in order until every sender is gone.
    pub(crate) async fn run(self, mut intents: mpsc::Receiver<SyncIntent>) {
        while let Some(intent) = intents.recv().await {
            match intent {
                SyncIntent::Save { epoch } => self.save(epoch).await,
                SyncIntent::Hydrate { user, epoch } => self.hydrate(user, epoch).await,
                SyncIntent::Flush(done) => {
                    // The caller may have stopped waiting.
                    let _ = done.send(());
                }
            }
        }

        debug!("cart sync worker stopped");
    }

    async fn save(&self, epoch: u64) {
        if !self.store.is_current(epoch) {
            debug!(epoch, "dropping save queued for a previous session");
            return;
        }

        // Released before reading so a change made during the save queues another one.
        self.store.release_save();

        let Some((session, snapshot)) = self.store.snapshot_for(epoch) else {
            debug!(epoch, "session ended before save");
            return;
        };

        let result = match session.user {
            Some(user) => self.save_remote(user, &snapshot).await,
            None => self.save_local(&snapshot).await,
        };

        match result {
            Ok(()) => {
                debug!(
                    epoch,
                    lines = snapshot.len(),
                    total = %snapshot.total(),
                    "cart saved"
                );
            }
            Err(error) => {
                error!(epoch, %error, "failed to save cart");

                self.store.notifier.notify(Notification::cart_not_saved());
            }
        }
    }

    async fn save_remote(&self, user: UserUuid, snapshot: &CartState) -> Result<(), CartSyncError> {
        let lines = order_lines(snapshot.items())?;

        let order = match self.orders.find_pending_order(user).await? {
            Some(order) => order,
            // An empty cart never creates an order.
            None if lines.is_empty() => return Ok(()),
            None => self.create_pending_order(user).await?,
        };

        self.orders
            .replace_order_items(user, order.uuid, lines)
            .await?;

        Ok(())
    }

    async fn create_pending_order(&self, user: UserUuid) -> Result<OrderRecord, CartSyncError> {
        match self.orders.create_pending_order(user).await {
            Ok(order) => Ok(order),
            Err(OrdersServiceError::AlreadyExists) => {
                debug!(%user, "pending order created concurrently, re-reading");

                self.orders
                    .find_pending_order(user)
                    .await?
                    .ok_or(CartSyncError::OrderVanished)
            }
            Err(error) => Err(error.into()),
        }
    }

    async fn save_local(&self, snapshot: &CartState) -> Result<(), CartSyncError> {
        let Some(local) = &self.local else {
            return Ok(());
        };

        local.save(snapshot.items().to_vec()).await?;

        Ok(())
    }

    async fn hydrate(&self, user: UserUuid, epoch: u64) {
        if !self.store.is_current(epoch) {
            debug!(%user, epoch, "dropping hydration for a previous session");
            return;
        }

        let loaded = match self.load_remote(user).await {
            Ok(loaded) => loaded,
            Err(error) => {
                error!(%user, %error, "failed to load pending order");

                self.store.notifier.notify(Notification::cart_not_loaded());

                return;
            }
        };

        match loaded {
            Some(items) => {
                let lines = items.len();

                // The session may have changed while the order was loading.
                if self.store.dispatch_for(epoch, CartAction::SetCart(items)).is_none() {
                    debug!(%user, epoch, "discarding hydration for a previous session");
                    return;
                }

                info!(%user, lines, "hydrated cart from pending order");
            }
            None => {
                let Some((_, snapshot)) = self.store.snapshot_for(epoch) else {
                    debug!(%user, epoch, "discarding hydration for a previous session");
                    return;
                };

                if snapshot.is_empty() {
                    debug!(%user, "no pending order to hydrate from");
                } else {
                    info!(%user, lines = snapshot.len(), "adopting local cart for signed-in user");

                    if let Err(error) = self.save_remote(user, &snapshot).await {
                        error!(%user, %error, "failed to save adopted cart");

                        self.store.notifier.notify(Notification::cart_not_saved());

                        return;
                    }
                }
            }
        }

        self.discard_local().await;
    }

    async fn load_remote(&self, user: UserUuid) -> Result<Option<Vec<CartItem>>, CartSyncError> {
        let Some(order) = self.orders.find_pending_order(user).await? else {
            return Ok(None);
        };

        let items = self.orders.get_order_items(user, order.uuid).await?;

        Ok(Some(items.into_iter().map(CartItem::from).collect()))
    }

    /// The signed-in session now owns the cart, so the signed-out copy is no longer needed.
    async fn discard_local(&self) {
        let Some(local) = &self.local else {
            return;
        };

        if let Err(error) = local.clear().await {
            warn!(%error, "failed to clear local cart");
        }
    }
}

fn order_lines(items: &[CartItem]) -> Result<Vec<NewOrderItem>, CartSyncError> {
    items
        .iter()
        .map(|item| {
            NewOrderItem::try_from(item).map_err(|source| CartSyncError::InvalidItemId {
                id: item.id.clone(),
                source,
            })
        })
        .collect()
}
