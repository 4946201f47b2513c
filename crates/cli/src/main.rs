//! Timberline CLI - Database migrations and back-office tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! tl-cli migrate
//!
//! # Create a 10% discount code good for 100 uses
//! tl-cli discount create -c SPRING10 -k percentage -v 10 --max-uses 100
//!
//! # Show or change the card-payment discount
//! tl-cli settings show
//! tl-cli settings set -p 5 --active
//!
//! # Inspect and update orders
//! tl-cli orders list
//! tl-cli orders status <ORDER_ID> fulfilled
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `discount create|list|deactivate` - Manage discount codes
//! - `settings show|set` - Card-payment discount settings
//! - `orders list|status` - Recent orders and status changes

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;

use timberline_core::{DiscountKind, OrderId, OrderStatus};

mod commands;

#[derive(Parser)]
#[command(name = "tl-cli")]
#[command(author, version, about = "Timberline CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Manage discount codes
    Discount {
        #[command(subcommand)]
        action: DiscountAction,
    },
    /// Card-payment discount settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Inspect and update orders
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
}

#[derive(Subcommand)]
enum DiscountAction {
    /// Create a new discount code
    Create {
        /// Code customers type at checkout (matched case-insensitively)
        #[arg(short, long)]
        code: String,

        /// Percentage off the subtotal, or a fixed amount
        #[arg(short, long, value_enum, default_value_t = KindArg::Percentage)]
        kind: KindArg,

        /// Percentage (0-100) or amount in the store currency
        #[arg(short, long)]
        value: Decimal,

        /// Maximum number of confirmed orders that may use the code
        #[arg(long)]
        max_uses: Option<i32>,

        /// Expiry as an RFC 3339 timestamp
        #[arg(long)]
        expires_at: Option<chrono::DateTime<chrono::Utc>>,
    },
    /// List all discount codes
    List,
    /// Stop a code from being applied
    Deactivate {
        /// Code to deactivate
        code: String,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Show the current settings
    Show,
    /// Replace the settings
    Set {
        /// Percentage off for card payments (0-100)
        #[arg(short, long)]
        percentage: Decimal,

        /// Whether the discount is offered
        #[arg(long)]
        active: bool,
    },
}

#[derive(Subcommand)]
enum OrdersAction {
    /// List the most recent orders
    List {
        /// Number of orders to show
        #[arg(short, long, default_value_t = 20)]
        limit: i64,
    },
    /// Change an order's status
    Status {
        /// Order to update
        id: OrderId,

        /// New status
        #[arg(value_enum)]
        status: StatusArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Percentage,
    Fixed,
}

impl From<KindArg> for DiscountKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Percentage => Self::Percentage,
            KindArg::Fixed => Self::Fixed,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusArg {
    Paid,
    Fulfilled,
    Cancelled,
    Refunded,
}

impl From<StatusArg> for OrderStatus {
    fn from(status: StatusArg) -> Self {
        match status {
            StatusArg::Paid => Self::Paid,
            StatusArg::Fulfilled => Self::Fulfilled,
            StatusArg::Cancelled => Self::Cancelled,
            StatusArg::Refunded => Self::Refunded,
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    let pool = commands::connect().await?;

    match cli.command {
        Commands::Migrate => commands::migrate::storefront(&pool).await?,
        Commands::Discount { action } => match action {
            DiscountAction::Create {
                code,
                kind,
                value,
                max_uses,
                expires_at,
            } => {
                commands::discount::create(&pool, code, kind.into(), value, max_uses, expires_at)
                    .await?;
            }
            DiscountAction::List => commands::discount::list(&pool).await?,
            DiscountAction::Deactivate { code } => {
                commands::discount::deactivate(&pool, &code).await?;
            }
        },
        Commands::Settings { action } => match action {
            SettingsAction::Show => commands::settings::show(&pool).await?,
            SettingsAction::Set { percentage, active } => {
                commands::settings::set(&pool, percentage, active).await?;
            }
        },
        Commands::Orders { action } => match action {
            OrdersAction::List { limit } => commands::orders::list(&pool, limit).await?,
            OrdersAction::Status { id, status } => {
                commands::orders::set_status(&pool, id, status.into()).await?;
            }
        },
    }
    Ok(())
}
