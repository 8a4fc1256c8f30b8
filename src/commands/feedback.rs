use super::{controller, load_config, run_action};
use crate::cli::Cli;
use crate::error::Result;
use crate::orchestrator::Action;

pub async fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let mut ctl = controller(cli, &config)?;

    run_action(cli, &mut ctl, Action::Feedback).await?;
    if cli.json {
        println!("{}", serde_json::json!({ "status": "opened" }));
    }
    Ok(())
}
