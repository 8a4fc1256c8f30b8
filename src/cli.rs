use clap::{Parser, Subcommand};

use crate::commands;
use crate::error::Result;

/// Cart Tools - inspect and edit storefront carts from your running browser
#[derive(Parser)]
#[command(name = "cart-tools")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// DevTools endpoint of the browser (port, host:port or URL)
    #[arg(long, env = "CART_TOOLS_CDP", global = true)]
    pub cdp: Option<String>,

    /// Maximum wait for a page operation, in milliseconds
    #[arg(long, env = "CART_TOOLS_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open the interactive cart tools popup for the active tab
    Popup,

    /// Show what the active tab supports (store, cart, product page)
    Context,

    /// Cart tools
    Cart {
        #[command(subcommand)]
        command: CartCommands,
    },

    /// Product tools (product pages only)
    Product {
        #[command(subcommand)]
        command: ProductCommands,
    },

    /// Open the feedback form inside the active tab
    Feedback,

    /// Toolbar badge with the cart item count
    Badge {
        #[command(subcommand)]
        command: BadgeCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum CartCommands {
    /// Print the cart and log it to the page console
    Show,

    /// Copy the cart JSON to the clipboard
    Copy,

    /// Remove every item from the cart
    Clear {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Blank every cart attribute
    StripAttributes {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum ProductCommands {
    /// Print the product and log it to the page console
    Show,

    /// Copy the product JSON to the clipboard
    Copy,

    /// List variants with their SKUs
    Skus,
}

#[derive(Subcommand)]
pub enum BadgeCommands {
    /// Print the badge text for the active tab once
    Show,

    /// Keep a status-bar badge updated (one JSON line per change)
    Watch,

    /// Ask a running watcher to refresh now
    Notify,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g. request.timeout_ms)
        key: String,
        /// Configuration value
        value: String,
    },

    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },

    /// Edit configuration file
    Edit,

    /// Show configuration file path
    Path,

    /// Delete the configuration file
    Reset,
}

impl Cli {
    pub async fn run(&self) -> Result<()> {
        match &self.command {
            Commands::Popup => commands::popup::run(self).await,
            Commands::Context => commands::context::run(self).await,
            Commands::Cart { command } => commands::cart::run(self, command).await,
            Commands::Product { command } => commands::product::run(self, command).await,
            Commands::Feedback => commands::feedback::run(self).await,
            Commands::Badge { command } => commands::badge::run(self, command).await,
            Commands::Config { command } => commands::config::run(self, command).await,
        }
    }
}
