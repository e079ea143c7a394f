use std::{io, sync::Arc};

use bookshelf_app::{
    cart::{CartConfig, CartService, write_cart},
    config::DatabaseConfig,
    context::AppContext,
    domain::books::records::BookUuid,
    identity::{LocalIdentityProvider, UserUuid},
    notifications::{Notification, NotificationKind},
};
use clap::{Args, Subcommand};
use tokio::sync::broadcast::Receiver;

#[derive(Debug, Args)]
pub(crate) struct CartCommand {
    /// Act as this signed-in user; omit for a signed-out cart
    #[arg(long, env = "BOOKSHELF_USER", global = true)]
    user: Option<UserUuid>,

    #[command(flatten)]
    database: DatabaseConfig,

    #[command(flatten)]
    cart: CartConfig,

    #[command(subcommand)]
    command: CartSubcommand,
}

#[derive(Debug, Subcommand)]
enum CartSubcommand {
    /// Print the cart
    Show,

    /// Add one copy of a catalog book
    Add {
        book: BookUuid,
    },

    /// Remove a line from the cart
    Remove {
        book: String,
    },

    /// Set the quantity of a line already in the cart
    SetQuantity {
        book: String,
        quantity: u32,
    },

    /// Empty the cart
    Clear,
}

pub(crate) async fn run(command: CartCommand) -> Result<(), String> {
    let ctx = AppContext::from_database_url(&command.database.database_url)
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;

    let identity = Arc::new(LocalIdentityProvider::new());

    if let Some(user) = command.user {
        identity.sign_in(user);
    }

    let cart = ctx.start_cart(&command.cart, identity).await;
    let mut notifications = cart.notifications();

    // Hydration is queued by start; wait for it before touching the cart.
    flush(&cart).await?;

    let result = apply(&cart, command.command).await;

    flush(&cart).await?;

    print_notifications(&mut notifications);

    result?;

    write_cart(io::stdout().lock(), &cart.state(), command.cart.currency.currency())
        .map_err(|error| format!("failed to print cart: {error}"))
}

async fn apply(cart: &CartService, command: CartSubcommand) -> Result<(), String> {
    match command {
        CartSubcommand::Show => {}
        CartSubcommand::Add { book } => cart
            .add_book(book)
            .await
            .map_err(|error| format!("failed to add book: {error}"))?,
        CartSubcommand::Remove { book } => cart.remove_item(&book),
        CartSubcommand::SetQuantity { book, quantity } => cart
            .update_quantity(&book, quantity)
            .map_err(|error| format!("failed to update quantity: {error}"))?,
        CartSubcommand::Clear => cart.clear_cart(),
    }

    Ok(())
}

async fn flush(cart: &CartService) -> Result<(), String> {
    cart.flush()
        .await
        .map_err(|error| format!("failed to sync cart: {error}"))
}

fn print_notifications(notifications: &mut Receiver<Notification>) {
    while let Ok(notification) = notifications.try_recv() {
        match notification.kind {
            NotificationKind::Success => {
                println!("{}: {}", notification.title, notification.description);
            }
            NotificationKind::Destructive => {
                eprintln!("{}: {}", notification.title, notification.description);
            }
        }
    }
}
