use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use libdesk::config::normalize_api_url;
use libdesk::net::types::{DEFAULT_BORROW_DAYS, IssueRequest, NewBook};
use libdesk::storage::FileStorage;
use libdesk::{
    ApiClient, ApiError, ClientConfig, ConfigError, Credentials, RegistrationData, Role, Route, SessionError,
    SessionStore, provide_session, use_session,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("not logged in; run `libdesk login` first")]
    NotLoggedIn,
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "libdesk", about = "Library management admin client")]
struct Cli {
    #[arg(long, env = "LIBDESK_API_URL")]
    base_url: Option<String>,

    #[arg(long, env = "LIBDESK_SESSION_FILE")]
    session_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and save the session.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "LIBDESK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account. Does not sign in.
    Register(RegisterArgs),
    /// Forget the saved session.
    Logout,
    /// Show the signed-in user.
    Whoami,
    Books(BooksCommand),
    Borrow(BorrowCommand),
    Users(UsersCommand),
}

#[derive(Args, Debug)]
struct RegisterArgs {
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long)]
    email: String,
    #[arg(long, env = "LIBDESK_PASSWORD", hide_env_values = true)]
    password: String,
    #[arg(long, default_value_t = Role::Reader)]
    role: Role,
}

#[derive(Args, Debug)]
struct BooksCommand {
    #[command(subcommand)]
    command: BooksSubcommand,
}

#[derive(Subcommand, Debug)]
enum BooksSubcommand {
    List,
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        author: String,
        #[arg(long)]
        isbn: String,
        #[arg(long, default_value_t = 2024)]
        published_year: i32,
        #[arg(long, default_value_t = 1)]
        copies: i32,
    },
    Delete {
        id: i64,
    },
}

#[derive(Args, Debug)]
struct BorrowCommand {
    #[command(subcommand)]
    command: BorrowSubcommand,
}

#[derive(Subcommand, Debug)]
enum BorrowSubcommand {
    Active,
    Issue {
        #[arg(long)]
        book_id: i64,
        #[arg(long)]
        user_card_id: i64,
        #[arg(long, default_value_t = DEFAULT_BORROW_DAYS)]
        days: u32,
    },
    Return {
        record_id: i64,
    },
}

#[derive(Args, Debug)]
struct UsersCommand {
    #[command(subcommand)]
    command: UsersSubcommand,
}

#[derive(Subcommand, Debug)]
enum UsersSubcommand {
    List,
    /// Issue a library card for a user.
    Card {
        user_id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = resolve_config(cli.base_url.as_deref(), cli.session_file)?;
    tracing::debug!(api_url = %config.api_url, session_file = %config.session_file.display(), "config loaded");

    let storage = Arc::new(FileStorage::new(config.session_file.clone()));
    let api = ApiClient::from_config(&config, storage);
    let store = SessionStore::new(api, Arc::new(report_redirect));

    provide_session(store, run(cli.command)).await
}

fn resolve_config(base_url: Option<&str>, session_file: Option<PathBuf>) -> Result<ClientConfig, CliError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(url) = base_url {
        config.api_url = normalize_api_url(url)?;
    }
    if let Some(path) = session_file {
        config.session_file = path;
    }
    Ok(config)
}

fn report_redirect(route: Route) {
    eprintln!("-> {route}");
}

async fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Login { email, password } => {
            let identity = use_session().login(&Credentials::new(email, password)).await?;
            print_json(&identity)
        }
        Command::Register(args) => {
            let data = RegistrationData {
                first_name: args.first_name,
                last_name: args.last_name,
                email: args.email,
                password: args.password,
                role: Some(args.role),
            };
            use_session().register(&data).await?;
            eprintln!("registered {}; log in to continue", data.email);
            Ok(())
        }
        Command::Logout => {
            use_session().logout().await;
            Ok(())
        }
        Command::Whoami => {
            let identity = use_session().identity().ok_or(CliError::NotLoggedIn)?;
            print_json(&identity)
        }
        Command::Books(books) => run_books(books).await,
        Command::Borrow(borrow) => run_borrow(borrow).await,
        Command::Users(users) => run_users(users).await,
    }
}

async fn run_books(books: BooksCommand) -> Result<(), CliError> {
    let api = require_login(Route::AdminBooks)?;
    match books.command {
        BooksSubcommand::List => print_json(&api.list_books().await?),
        BooksSubcommand::Add { title, author, isbn, published_year, copies } => {
            let created = api.create_book(&NewBook::new(title, author, isbn, published_year, copies)).await?;
            print_json(&created)
        }
        BooksSubcommand::Delete { id } => {
            api.delete_book(id).await?;
            eprintln!("deleted book {id}");
            Ok(())
        }
    }
}

async fn run_borrow(borrow: BorrowCommand) -> Result<(), CliError> {
    let api = require_login(Route::AdminBorrows)?;
    match borrow.command {
        BorrowSubcommand::Active => print_json(&api.active_borrows().await?),
        BorrowSubcommand::Issue { book_id, user_card_id, days } => {
            let issue = IssueRequest { book_id, user_card_id, days_to_borrow: days };
            print_json(&api.issue_book(&issue).await?)
        }
        BorrowSubcommand::Return { record_id } => print_json(&api.return_book(record_id).await?),
    }
}

async fn run_users(users: UsersCommand) -> Result<(), CliError> {
    let api = require_login(Route::AdminUsers)?;
    match users.command {
        UsersSubcommand::List => print_json(&api.list_users().await?),
        UsersSubcommand::Card { user_id } => print_json(&api.create_card(user_id).await?),
    }
}

/// Run the route guard for `route` and hand back the API client.
fn require_login(route: Route) -> Result<ApiClient, CliError> {
    let session = use_session();
    if !session.guard(route) {
        return Err(CliError::NotLoggedIn);
    }
    Ok(session.api().clone())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
