use colored::Colorize;
use tokio::sync::mpsc;

use super::{connect, load_config};
use crate::api::badge_text;
use crate::badge::{notify, BadgeSync, LoopbackNotifier, StatusLineBadge};
use crate::cli::{BadgeCommands, Cli};
use crate::config::Config;
use crate::error::Result;
use crate::orchestrator::with_timeout;

pub async fn run(cli: &Cli, command: &BadgeCommands) -> Result<()> {
    let config = load_config(cli)?;
    match command {
        BadgeCommands::Show => show(cli, &config).await,
        BadgeCommands::Watch => watch(&config).await,
        BadgeCommands::Notify => send_notify(cli, &config).await,
    }
}

async fn show(cli: &Cli, config: &Config) -> Result<()> {
    let client = connect(config)?;
    let reader = client.clone();
    // Same rule as the watcher: anything that is not a cart is a blank badge.
    let text = match with_timeout(async move { reader.read_cart().await }, config.timeout(), "Reading cart").await {
        Ok(cart) => badge_text(&cart),
        Err(e) => {
            tracing::debug!("Badge cleared: {}", e);
            String::new()
        }
    };

    if cli.json {
        println!(
            "{}",
            serde_json::json!({ "text": text, "color": config.badge.color })
        );
    } else if text.is_empty() {
        println!("{}", "(empty)".dimmed());
    } else {
        println!("{}", text);
    }
    Ok(())
}

async fn watch(config: &Config) -> Result<()> {
    let listener = notify::bind(config.badge.notify_port).await?;
    tracing::info!(
        "Listening for badge notifications on 127.0.0.1:{}",
        config.badge.notify_port
    );

    let (tx, rx) = mpsc::unbounded_channel();
    let listen_handle = tokio::spawn(notify::listen(listener, tx));

    let sync = BadgeSync::new(connect(config)?, StatusLineBadge::stdout(), config.badge.color.clone());

    tokio::select! {
        _ = sync.watch(config.poll_interval(), rx) => {}
        _ = tokio::signal::ctrl_c() => tracing::info!("Received Ctrl-C, stopping badge watcher"),
    }

    listen_handle.abort();
    Ok(())
}

async fn send_notify(cli: &Cli, config: &Config) -> Result<()> {
    LoopbackNotifier::send(config.badge.notify_port).await?;
    if cli.json {
        println!("{}", serde_json::json!({ "status": "sent" }));
    } else {
        println!("{} Badge refresh requested", "✓".green());
    }
    Ok(())
}
