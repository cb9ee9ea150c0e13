mod bootstrap_helpers;
mod bridge_config;
mod cli_args;
mod reconciler;
#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;

use bridge_config::BridgeConfig;
use cli_args::Cli;
use reconciler::{AlertInvocation, RunReport};

fn main() {
    bootstrap_helpers::init_tracing();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(report) => {
            if let Ok(text) = serde_json::to_string_pretty(&report) {
                println!("{text}");
            }
        }
        Err(error) => {
            tracing::error!("alert bridge run failed: {error:#}");
            std::process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> Result<RunReport> {
    let config = BridgeConfig::from_cli(cli)?;
    let invocation = AlertInvocation {
        assignee: cli.assignee.clone(),
        subject: cli.subject.clone(),
        body: cli.body.clone(),
        event_id: cli.event_id,
    };
    reconciler::run_alert(&config, &invocation)
}
