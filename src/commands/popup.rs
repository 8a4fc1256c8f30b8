use colored::Colorize;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Select;

use super::cart::confirmed;
use super::product::print_variants;
use super::{controller, load_config, render_status, CliController};
use crate::cli::Cli;
use crate::error::{CartToolsError, Result};
use crate::orchestrator::{lock, Action, Completion};

/// Interactive popup: summary, status line and a menu of the actions the
/// current page supports.
pub async fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let mut ctl = controller(cli, &config)?;
    let theme = ColorfulTheme::default();

    ctl.init().await;

    loop {
        render(&ctl);

        let (actions, labels) = {
            let controls = lock(ctl.controls());
            let actions = controls.available();
            let mut labels: Vec<String> = actions
                .iter()
                .map(|a| controls.label(*a).to_string())
                .collect();
            labels.push("Quit".to_string());
            (actions, labels)
        };

        let choice = Select::with_theme(&theme)
            .with_prompt("Cart tools")
            .items(&labels)
            .default(0)
            .interact_opt()
            .map_err(|e| CartToolsError::Other(format!("Prompt failed: {}", e)))?;

        let Some(action) = choice.and_then(|i| actions.get(i).copied()) else {
            break;
        };

        if action == Action::ClearCart && !confirmed("Remove every item from the cart?")? {
            continue;
        }

        match ctl.perform(action).await {
            Completion::Product(product) if action == Action::ListSkus => print_variants(&product),
            Completion::Closed => {
                render(&ctl);
                break;
            }
            _ => {}
        }
    }

    Ok(())
}

fn render(ctl: &CliController) {
    println!();
    let summary = ctl.summary();
    if summary.muted {
        println!("{}", summary.text.dimmed());
    } else {
        println!("{}", summary.text.bold());
    }
    if let Some(status) = ctl.status() {
        println!("{}", render_status(status));
    }
}
