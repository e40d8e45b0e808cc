mod cli;
mod commands;
mod output;
mod prompt;

use std::process::ExitCode;

use agentcore_gateway_lifecycle::LifecycleError;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_tracing(&cli.global.log_level);

    match commands::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn report(err: &anyhow::Error) {
    let Some(lifecycle) = err.downcast_ref::<LifecycleError>() else {
        output::error(&format!("{err:#}"));
        return;
    };
    tracing::debug!(kind = ?lifecycle.kind(), "command failed");
    output::error(&lifecycle.to_string());
    if let LifecycleError::OrphanedGateway { gateway_id, .. } = lifecycle {
        output::warning(&format!(
            "Gateway {gateway_id} was left without a target. Remove it with: \
             agentcore-gateway-admin delete --gateway-id {gateway_id} --confirm"
        ));
    }
}
