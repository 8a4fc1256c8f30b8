pub mod badge;
pub mod cart;
pub mod config;
pub mod context;
pub mod feedback;
pub mod popup;
pub mod product;

use colored::Colorize;

use crate::api::StorefrontClient;
use crate::badge::LoopbackNotifier;
use crate::browser::CdpHost;
use crate::cli::Cli;
use crate::clipboard::SystemClipboard;
use crate::config::Config;
use crate::error::Result;
use crate::orchestrator::{Action, Completion, Controller, ControllerSettings, Status, StatusKind};

pub type CliController = Controller<CdpHost, SystemClipboard, LoopbackNotifier>;

/// Config file + env, with command-line flags on top.
pub fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load()?;
    if let Some(cdp) = &cli.cdp {
        config.browser.cdp_endpoint = cdp.clone();
    }
    if let Some(ms) = cli.timeout {
        config.set("request.timeout_ms", &ms.to_string())?;
    }
    Ok(config)
}

pub fn connect(config: &Config) -> Result<StorefrontClient<CdpHost>> {
    let host = CdpHost::new(&config.browser.cdp_endpoint)?;
    tracing::debug!("Using DevTools endpoint {}", host.endpoint());
    Ok(StorefrontClient::new(host))
}

pub fn controller(cli: &Cli, config: &Config) -> Result<CliController> {
    let settings = ControllerSettings {
        timeout: config.timeout(),
        feedback_url: config.feedback.url.clone(),
        spinner: !cli.json,
        ..Default::default()
    };
    Ok(Controller::new(
        connect(config)?,
        SystemClipboard::new(),
        LoopbackNotifier::new(config.badge.notify_port),
        settings,
    ))
}

/// Status line as shown under the popup controls.
pub fn render_status(status: &Status) -> String {
    match status.kind {
        StatusKind::Info => format!("{} {}", "…".dimmed(), status.message),
        StatusKind::Success => format!("{} {}", "✓".green(), status.message),
        StatusKind::Error => format!("{} {}", "✗".red(), status.message.red()),
    }
}

/// Run a single popup action outside the interactive popup.
///
/// Prints the status line (or JSON) and turns an error status into an error
/// so the process exits non-zero.
pub async fn run_action(cli: &Cli, ctl: &mut CliController, action: Action) -> Result<Completion> {
    let completion = ctl.perform(action).await;

    let Some(status) = ctl.status() else {
        return Ok(completion);
    };
    if let Some(error) = status.to_error() {
        return Err(error);
    }

    if !cli.json {
        println!("{}", render_status(status));
    }
    Ok(completion)
}
