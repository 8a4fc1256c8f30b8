use colored::Colorize;

use super::{controller, load_config, run_action};
use crate::api::{format_minor_units, Product};
use crate::cli::{Cli, ProductCommands};
use crate::error::Result;
use crate::orchestrator::{Action, Completion};

pub async fn run(cli: &Cli, command: &ProductCommands) -> Result<()> {
    let action = match command {
        ProductCommands::Show => Action::LogProduct,
        ProductCommands::Copy => Action::CopyProduct,
        ProductCommands::Skus => Action::ListSkus,
    };

    let config = load_config(cli)?;
    let mut ctl = controller(cli, &config)?;

    if let Completion::Product(product) = run_action(cli, &mut ctl, action).await? {
        if cli.json {
            match command {
                ProductCommands::Skus => println!("{}", serde_json::to_string_pretty(&product.variants)?),
                _ => println!("{}", serde_json::to_string_pretty(&product)?),
            }
            return Ok(());
        }
        match command {
            ProductCommands::Show => print_product(&product),
            ProductCommands::Skus => print_variants(&product),
            ProductCommands::Copy => {}
        }
    }
    Ok(())
}

fn print_product(product: &Product) {
    println!();
    println!("{}", product.title.bold());
    if let Some(vendor) = product.vendor.as_deref().filter(|v| !v.is_empty()) {
        println!("  Vendor: {}", vendor);
    }
    if let Some(kind) = product.product_type.as_deref().filter(|t| !t.is_empty()) {
        println!("  Type: {}", kind);
    }
    println!(
        "  Available: {}",
        if product.available { "yes".green() } else { "no".red() }
    );
    println!("  Variants: {}", product.variants.len());
}

pub(crate) fn print_variants(product: &Product) {
    println!();
    println!("{}", product.title.bold());

    if product.variants.is_empty() {
        println!("  {}", "No variants".dimmed());
        return;
    }

    for variant in &product.variants {
        let sku = variant
            .sku
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or("—");
        let stock = match variant.inventory_quantity {
            Some(qty) => format!(" · {} in stock", qty),
            None => String::new(),
        };
        let marker = if variant.available { "✓".green() } else { "✗".red() };
        println!(
            "  {} {}  {}  {}{}",
            marker,
            variant.title,
            sku.cyan(),
            format_minor_units(variant.price),
            stock.dimmed()
        );
    }
}
