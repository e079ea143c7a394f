//! App Context

use std::sync::Arc;

use thiserror::Error;

use crate::{
    cart::{AnonymousCart, CartConfig, CartDeps, CartService, JsonFileCartStore, LocalCartStore},
    database::{self, Db},
    domain::{books::PgBooksService, orders::PgPendingOrdersService},
    identity::IdentityProvider,
};

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("failed to connect to database")]
    Database(#[source] sqlx::Error),
}

/// Explicitly constructed services, handed to whatever needs them.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub books: Arc<PgBooksService>,
    pub orders: Arc<PgPendingOrdersService>,
}

impl AppContext {
    /// Build application context from a database URL.
    ///
    /// # Errors
    ///
    /// Returns an error when establishing a database connection fails.
    pub async fn from_database_url(url: &str) -> Result<Self, AppInitError> {
        let pool = database::connect(url)
            .await
            .map_err(AppInitError::Database)?;

        Ok(Self::new(Db::new(pool)))
    }

    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            books: Arc::new(PgBooksService::new(db.clone())),
            orders: Arc::new(PgPendingOrdersService::new(db)),
        }
    }

    /// Start a cart bound to `identity` and backed by this context's services.
    pub async fn start_cart(
        &self,
        config: &CartConfig,
        identity: Arc<dyn IdentityProvider>,
    ) -> CartService {
        let local: Option<Arc<dyn LocalCartStore>> = match config.anonymous_cart() {
            AnonymousCart::Memory => None,
            AnonymousCart::File(path) => Some(Arc::new(JsonFileCartStore::new(path))),
        };

        CartService::start(
            config,
            CartDeps {
                identity,
                books: self.books.clone(),
                orders: self.orders.clone(),
                local,
            },
        )
        .await
    }
}
