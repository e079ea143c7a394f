//! Pending orders service.

use async_trait::async_trait;
use mockall::automock;
use rust_decimal::Decimal;

use crate::{
    database::Db,
    domain::orders::{
        data::NewOrderItem,
        errors::OrdersServiceError,
        records::{OrderItemRecord, OrderRecord, OrderUuid},
        repositories::{PgOrderItemsRepository, PgOrdersRepository},
    },
    identity::UserUuid,
};

#[derive(Debug, Clone)]
pub struct PgPendingOrdersService {
    db: Db,
    orders_repository: PgOrdersRepository,
    items_repository: PgOrderItemsRepository,
}

impl PgPendingOrdersService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            orders_repository: PgOrdersRepository::new(),
            items_repository: PgOrderItemsRepository::new(),
        }
    }
}

#[async_trait]
impl PendingOrdersService for PgPendingOrdersService {
    async fn find_pending_order(
        &self,
        user: UserUuid,
    ) -> Result<Option<OrderRecord>, OrdersServiceError> {
        let mut tx = self.db.begin_user_transaction(user).await?;

        let order = self
            .orders_repository
            .find_pending_order(&mut tx, user)
            .await?;

        tx.commit().await?;

        Ok(order)
    }

    async fn create_pending_order(&self, user: UserUuid) -> Result<OrderRecord, OrdersServiceError> {
        let mut tx = self.db.begin_user_transaction(user).await?;

        let created = self
            .orders_repository
            .create_pending_order(&mut tx, OrderUuid::now_v7(), user)
            .await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn get_order_items(
        &self,
        user: UserUuid,
        order: OrderUuid,
    ) -> Result<Vec<OrderItemRecord>, OrdersServiceError> {
        let mut tx = self.db.begin_user_transaction(user).await?;

        let items = self.items_repository.get_order_items(&mut tx, order).await?;

        tx.commit().await?;

        Ok(items)
    }

    async fn replace_order_items(
        &self,
        user: UserUuid,
        order: OrderUuid,
        items: Vec<NewOrderItem>,
    ) -> Result<OrderRecord, OrdersServiceError> {
        let mut tx = self.db.begin_user_transaction(user).await?;

        self.items_repository
            .delete_order_items(&mut tx, order)
            .await?;

        let mut total = Decimal::ZERO;

        for (position, item) in items.iter().enumerate() {
            self.items_repository
                .create_order_item(
                    &mut tx,
                    order,
                    item,
                    i32::try_from(item.quantity)?,
                    i32::try_from(position)?,
                )
                .await?;

            total += item.price_at_time * Decimal::from(item.quantity);
        }

        // Fails with `NotFound` when the order is gone, no longer pending, or not ours.
        let updated = self
            .orders_repository
            .update_order_total(&mut tx, order, total)
            .await?;

        tx.commit().await?;

        Ok(updated)
    }
}

#[automock]
#[async_trait]
/// Durable mirror of a user's cart as a `pending` order.
pub trait PendingOrdersService: Send + Sync {
    /// Retrieve the user's pending order, if any.
    async fn find_pending_order(
        &self,
        user: UserUuid,
    ) -> Result<Option<OrderRecord>, OrdersServiceError>;

    /// Create an empty pending order for the user.
    async fn create_pending_order(&self, user: UserUuid) -> Result<OrderRecord, OrdersServiceError>;

    /// Lines of an order joined with their books, in cart order.
    async fn get_order_items(
        &self,
        user: UserUuid,
        order: OrderUuid,
    ) -> Result<Vec<OrderItemRecord>, OrdersServiceError>;

    /// Overwrite every line of an order with the given snapshot and update its total.
    async fn replace_order_items(
        &self,
        user: UserUuid,
        order: OrderUuid,
        items: Vec<NewOrderItem>,
    ) -> Result<OrderRecord, OrdersServiceError>;
}
