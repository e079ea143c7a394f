//! Cart configuration.

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use rusty_money::iso::{self, Currency};

#[derive(Debug, Clone, Args)]
pub struct CartConfig {
    /// Maximum number of queued sync intents
    #[arg(long, env = "CART_SYNC_QUEUE_CAPACITY", default_value_t = 32)]
    pub sync_queue_capacity: usize,

    /// Buffered notifications per listener before older ones are dropped
    #[arg(long, env = "CART_NOTIFICATION_CAPACITY", default_value_t = 16)]
    pub notification_capacity: usize,

    /// Keep the signed-out cart in this JSON file between runs
    #[arg(long, env = "ANONYMOUS_CART_PATH")]
    pub anonymous_cart_path: Option<PathBuf>,

    /// Currency used when displaying amounts
    #[arg(long, env = "CART_CURRENCY", value_enum, default_value_t = CartCurrency::Gbp)]
    pub currency: CartCurrency,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            sync_queue_capacity: 32,
            notification_capacity: 16,
            anonymous_cart_path: None,
            currency: CartCurrency::Gbp,
        }
    }
}

impl CartConfig {
    #[must_use]
    pub fn anonymous_cart(&self) -> AnonymousCart {
        match &self.anonymous_cart_path {
            Some(path) => AnonymousCart::File(path.clone()),
            None => AnonymousCart::Memory,
        }
    }
}

/// Where a signed-out cart lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnonymousCart {
    /// Lost when the process exits.
    Memory,
    File(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CartCurrency {
    Gbp,
    Usd,
    Eur,
}

impl CartCurrency {
    #[must_use]
    pub fn currency(self) -> &'static Currency {
        match self {
            Self::Gbp => iso::GBP,
            Self::Usd => iso::USD,
            Self::Eur => iso::EUR,
        }
    }
}
