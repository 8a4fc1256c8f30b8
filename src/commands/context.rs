use colored::Colorize;

use super::{connect, load_config};
use crate::api::{format_summary, PageContext};
use crate::cli::Cli;
use crate::error::Result;
use crate::orchestrator::with_timeout;

pub async fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let client = connect(&config)?;

    let tab = client.bridge().active_tab().await?;
    let detect = client.clone();
    let context = with_timeout(
        async move { detect.detect_context().await },
        config.timeout(),
        "Detecting page",
    )
    .await?;

    if cli.json {
        println!(
            "{}",
            serde_json::json!({
                "url": tab.url,
                "context": context,
            })
        );
        return Ok(());
    }

    println!("{}", tab.url.dimmed());
    print_context(&context);
    Ok(())
}

fn flag(on: bool) -> colored::ColoredString {
    if on {
        "✓".green()
    } else {
        "○".dimmed()
    }
}

fn print_context(context: &PageContext) {
    println!("  {} Shopify store", flag(context.is_shopify));
    match &context.cart {
        Some(cart) => println!("  {} Cart: {}", flag(true), format_summary(cart)),
        None => println!("  {} Cart", flag(false)),
    }
    match &context.product_handle {
        Some(handle) => println!("  {} Product page: {}", flag(true), handle.cyan()),
        None => println!("  {} Product page", flag(false)),
    }
    if let Some(error) = &context.error {
        println!("    {}", format!("cart probe: {}", error).dimmed());
    }
}
