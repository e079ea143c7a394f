use bookshelf_app::{
    config::DatabaseConfig,
    context::AppContext,
    domain::books::records::{BookUuid, NewBook},
};
use clap::Args;
use rust_decimal::Decimal;

#[derive(Debug, Args)]
pub(crate) struct CreateBookArgs {
    #[arg(long)]
    title: String,

    #[arg(long)]
    author: String,

    /// Unit price, e.g. 12.50
    #[arg(long)]
    price: Decimal,

    #[arg(long, default_value = "")]
    cover_image: String,

    /// Optional book UUID; generated when omitted
    #[arg(long)]
    uuid: Option<BookUuid>,

    #[command(flatten)]
    database: DatabaseConfig,
}

pub(crate) async fn run(args: CreateBookArgs) -> Result<(), String> {
    if args.price.is_sign_negative() {
        return Err("price cannot be negative".to_string());
    }

    let ctx = AppContext::from_database_url(&args.database.database_url)
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;

    let book = ctx
        .books
        .create_book(NewBook {
            uuid: args.uuid.unwrap_or_else(BookUuid::now_v7),
            title: args.title,
            author: args.author,
            price: args.price,
            cover_image: args.cover_image,
        })
        .await
        .map_err(|error| format!("failed to create book: {error}"))?;

    println!("book_uuid: {}", book.uuid);
    println!("title: {}", book.title);
    println!("price: {}", book.price);

    Ok(())
}
