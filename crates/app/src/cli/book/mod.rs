use clap::{Args, Subcommand};

mod create;

#[derive(Debug, Args)]
pub(crate) struct BookCommand {
    #[command(subcommand)]
    command: BookSubcommand,
}

#[derive(Debug, Subcommand)]
enum BookSubcommand {
    /// Add a book to the catalog
    Create(create::CreateBookArgs),
}

pub(crate) async fn run(command: BookCommand) -> Result<(), String> {
    match command.command {
        BookSubcommand::Create(args) => create::run(args).await,
    }
}
