use colored::Colorize;
use dialoguer::Confirm;

use super::{controller, load_config, run_action};
use crate::api::{format_price, format_summary, Cart};
use crate::cli::{CartCommands, Cli};
use crate::error::{CartToolsError, Result};
use crate::orchestrator::{Action, Completion};

pub async fn run(cli: &Cli, command: &CartCommands) -> Result<()> {
    let (action, confirm) = match command {
        CartCommands::Show => (Action::LogCart, None),
        CartCommands::Copy => (Action::CopyCart, None),
        CartCommands::Clear { yes } => (Action::ClearCart, (!yes).then_some("Remove every item from the cart?")),
        CartCommands::StripAttributes { yes } => (
            Action::StripAttributes,
            (!yes).then_some("Remove all cart attributes?"),
        ),
    };

    if let Some(prompt) = confirm {
        if !cli.json && !confirmed(prompt)? {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    let config = load_config(cli)?;
    let mut ctl = controller(cli, &config)?;

    if let Completion::Cart(cart) = run_action(cli, &mut ctl, action).await? {
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&cart)?);
        } else if matches!(command, CartCommands::Show) {
            print_cart(&cart);
        }
    }
    Ok(())
}

pub(crate) fn confirmed(prompt: &str) -> Result<bool> {
    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| CartToolsError::Other(format!("Prompt failed: {}", e)))
}

pub(crate) fn print_cart(cart: &Cart) {
    println!();
    println!("{}", format_summary(cart).bold());

    if cart.items.is_empty() {
        println!("  {}", "Cart is empty".dimmed());
    }
    for item in &cart.items {
        let variant = item
            .variant_title
            .as_deref()
            .filter(|v| !v.is_empty())
            .map(|v| format!(" ({})", v))
            .unwrap_or_default();
        println!(
            "  {} × {}{}  {}",
            item.quantity,
            item.title,
            variant.dimmed(),
            format_price(cart, item.price).cyan()
        );
    }

    if !cart.attributes.is_empty() {
        println!();
        println!("{}", "Attributes:".bold());
        for (key, value) in &cart.attributes {
            println!("  {} = {}", key, value.dimmed());
        }
    }
}
