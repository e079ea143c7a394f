use bookshelf_app::{config::LoggingConfig, observability};
use clap::{Parser, Subcommand};

mod book;
mod cart;
mod db;

#[derive(Debug, Parser)]
#[command(name = "bookshelf-app", about = "Bookshelf CLI", long_about = None)]
pub(crate) struct Cli {
    #[command(flatten)]
    logging: LoggingConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Db(db::DbCommand),
    Book(book::BookCommand),
    Cart(cart::CartCommand),
}

impl Cli {
    pub(crate) async fn run(self) -> Result<(), String> {
        observability::init_logging(&self.logging)
            .map_err(|error| format!("failed to initialise logging: {error}"))?;

        match self.command {
            Commands::Db(command) => db::run(command).await,
            Commands::Book(command) => book::run(command).await,
            Commands::Cart(command) => cart::run(command).await,
        }
    }
}
