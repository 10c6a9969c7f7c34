//! Marigold CLI - browse the storefront and manage a cart and wishlist.
//!
//! # Usage
//!
//! ```bash
//! # Browse
//! mg products list
//! mg products search mascara
//! mg products show 7
//!
//! # Cart and wishlist (local until you log in)
//! mg cart toggle 7
//! mg wishlist list
//! mg cart summary
//!
//! # Account
//! mg login -e mona@example.com -p hunter2hunter2
//! mg whoami
//! mg logout
//!
//! # Management (admin and manager accounts)
//! mg users list
//! mg product delete 12
//! ```
//!
//! # Environment Variables
//!
//! See `marigold_storefront::config`. `MARIGOLD_API_URL` is required.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use marigold_core::{ProductId, Role, SelectionKind, UserId};
use marigold_storefront::config::ClientConfig;
use marigold_storefront::error::ClientError;
use marigold_storefront::state::AppState;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "mg")]
#[command(author, version, about = "Marigold storefront client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse the catalog
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// Log in with email and password
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long, env = "MARIGOLD_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and log in
    Signup(SignupArgs),
    /// Log out and forget everything stored locally
    Logout,
    /// Show the logged-in profile
    Whoami,
    /// Set or clear the profile photo
    Photo {
        #[command(subcommand)]
        action: PhotoAction,
    },
    /// Work with the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Work with the wishlist
    Wishlist {
        #[command(subcommand)]
        action: SelectionAction,
    },
    /// Manage user accounts (admin and manager)
    Users {
        #[command(subcommand)]
        action: UsersAction,
    },
    /// Manage catalog products (admin and manager)
    Product {
        #[command(subcommand)]
        action: ProductAction,
    },
}

#[derive(Subcommand)]
enum ProductsAction {
    /// List every product
    List,
    /// Search product titles
    Search { term: String },
    /// Show one product and related products
    Show { id: ProductId },
    /// List products in a category
    Category { name: String },
}

#[derive(Subcommand)]
enum PhotoAction {
    /// Store an image file as the profile photo
    Set { path: PathBuf },
    /// Remove the profile photo
    Clear,
}

#[derive(Subcommand)]
enum SelectionAction {
    /// List items
    List,
    /// Add a product
    Add { id: ProductId },
    /// Remove a product
    Remove { id: ProductId },
    /// Add the product if absent, otherwise remove it
    Toggle { id: ProductId },
}

#[derive(Subcommand)]
enum CartAction {
    #[command(flatten)]
    Selection(SelectionAction),
    /// Show order totals
    Summary,
}

#[derive(Args)]
pub struct SignupArgs {
    #[arg(long)]
    pub firstname: String,
    #[arg(long)]
    pub lastname: String,
    #[arg(long)]
    pub age: String,
    #[arg(short, long)]
    pub email: String,
    #[arg(long)]
    pub phone: String,
    #[arg(short, long, env = "MARIGOLD_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Subcommand)]
enum UsersAction {
    /// List every user
    List,
    /// Create a user with a role
    Create {
        #[command(flatten)]
        details: SignupArgs,
        /// Role (`user`, `admin`, `manager`)
        #[arg(short, long)]
        role: Option<Role>,
    },
    /// Update a user's profile
    Update {
        id: UserId,
        #[arg(long)]
        firstname: String,
        #[arg(long)]
        lastname: String,
        #[arg(long)]
        age: String,
        #[arg(short, long)]
        email: String,
        #[arg(long)]
        phone: String,
    },
    /// Delete a user
    Delete { id: UserId },
}

#[derive(Args)]
pub struct ProductArgs {
    /// Text field as `name=value`, repeatable (e.g. `-f title=Lamp -f price=19.99`)
    #[arg(short = 'f', long = "field", value_name = "NAME=VALUE")]
    pub fields: Vec<String>,
    /// Thumbnail image file
    #[arg(long)]
    pub thumbnail: Option<PathBuf>,
    /// Gallery image file, repeatable
    #[arg(long = "image")]
    pub images: Vec<PathBuf>,
}

#[derive(Subcommand)]
enum ProductAction {
    /// Create a product
    Add(ProductArgs),
    /// Update a product
    Update {
        id: ProductId,
        #[command(flatten)]
        form: ProductArgs,
        /// Existing gallery image path to keep, repeatable
        #[arg(long = "keep-image")]
        keep_images: Vec<String>,
    },
    /// Delete a product
    Delete { id: ProductId },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::debug!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    // Configuration is needed before Sentry, so its errors are reported
    // through a bare subscriber
    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing_subscriber::fmt::init();
            tracing::error!("{e}");
            std::process::exit(2);
        }
    };

    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "marigold_storefront=info,marigold_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_target(false),
        )
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if let Err(e) = run(cli, config).await {
        e.report();
        tracing::error!("{}", e.notice());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: ClientConfig) -> Result<(), ClientError> {
    let state = AppState::new(config)?;

    let notice = match cli.command {
        Commands::Products { action } => match action {
            ProductsAction::List => commands::products::list(&state).await?,
            ProductsAction::Search { term } => commands::products::search(&state, &term).await?,
            ProductsAction::Show { id } => commands::products::show(&state, id).await?,
            ProductsAction::Category { name } => {
                commands::products::category(&state, &name).await?
            }
        },
        Commands::Login { email, password } => {
            commands::account::login(&state, email, password).await?
        }
        Commands::Signup(args) => commands::account::signup(&state, args).await?,
        Commands::Logout => commands::account::logout(&state)?,
        Commands::Whoami => commands::account::whoami(&state),
        Commands::Photo { action } => match action {
            PhotoAction::Set { path } => commands::account::set_photo(&state, &path)?,
            PhotoAction::Clear => commands::account::clear_photo(&state)?,
        },
        Commands::Cart { action } => match action {
            CartAction::Selection(action) => {
                selection(&state, SelectionKind::Cart, action).await?
            }
            CartAction::Summary => commands::selections::summary(&state).await?,
        },
        Commands::Wishlist { action } => selection(&state, SelectionKind::Wishlist, action).await?,
        Commands::Users { action } => match action {
            UsersAction::List => commands::manage::list_users(&state).await?,
            UsersAction::Create { details, role } => {
                commands::manage::create_user(&state, details, role).await?
            }
            UsersAction::Update {
                id,
                firstname,
                lastname,
                age,
                email,
                phone,
            } => {
                let update = marigold_storefront::forms::UserUpdate {
                    firstname,
                    lastname,
                    age,
                    email,
                    phone,
                };
                commands::manage::update_user(&state, id, update).await?
            }
            UsersAction::Delete { id } => commands::manage::delete_user(&state, id).await?,
        },
        Commands::Product { action } => match action {
            ProductAction::Add(form) => commands::manage::add_product(&state, form).await?,
            ProductAction::Update {
                id,
                form,
                keep_images,
            } => commands::manage::update_product(&state, id, form, keep_images).await?,
            ProductAction::Delete { id } => commands::manage::delete_product(&state, id).await?,
        },
    };

    if let Some(notice) = notice {
        tracing::info!("{notice}");
    }
    Ok(())
}

async fn selection(
    state: &AppState,
    kind: SelectionKind,
    action: SelectionAction,
) -> Result<Option<marigold_storefront::error::Notice>, ClientError> {
    match action {
        SelectionAction::List => commands::selections::list(state, kind).await,
        SelectionAction::Add { id } => commands::selections::add(state, kind, id).await,
        SelectionAction::Remove { id } => commands::selections::remove(state, kind, id).await,
        SelectionAction::Toggle { id } => commands::selections::toggle(state, kind, id).await,
    }
}
