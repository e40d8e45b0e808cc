use std::path::PathBuf;

use agentcore_gateway_lifecycle::api_spec::DEFAULT_API_SPEC_FILE;
use agentcore_gateway_lifecycle::config::DEFAULT_RECORD_FILE;
use agentcore_gateway_lifecycle::params::DEFAULT_PARAMETER_PREFIX;
use clap::{Args, Parser, Subcommand};
use url::Url;

/// Create and delete AgentCore gateways for the customer support application.
#[derive(Parser, Debug)]
#[command(name = "agentcore-gateway-admin")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// AWS region (falls back to AWS_DEFAULT_REGION).
    #[arg(long, env = "AWS_REGION", global = true)]
    pub region: Option<String>,

    /// Override the AgentCore control-plane endpoint.
    #[arg(long, env = "AGENTCORE_CONTROL_ENDPOINT", global = true)]
    pub endpoint_url: Option<Url>,

    /// Override the SSM endpoint used to resolve deployment parameters.
    #[arg(long, env = "AGENTCORE_SSM_ENDPOINT", global = true)]
    pub ssm_endpoint_url: Option<Url>,

    /// Local file holding the managed gateway's identity.
    #[arg(long, default_value = DEFAULT_RECORD_FILE, global = true)]
    pub config_file: PathBuf,

    /// SSM namespace holding lambda_arn, machine_client_id, cognito_discovery_url, gateway_iam_role.
    #[arg(long, default_value = DEFAULT_PARAMETER_PREFIX, global = true)]
    pub parameter_prefix: String,

    /// Log filter (overridden by RUST_LOG).
    #[arg(long, default_value = "warn", global = true)]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new gateway with a Lambda target.
    Create(CreateArgs),
    /// Delete a gateway and all its targets.
    Delete(DeleteArgs),
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Name for the gateway.
    #[arg(long)]
    pub name: String,

    /// Path to the API specification file.
    #[arg(long, default_value = DEFAULT_API_SPEC_FILE)]
    pub api_spec_file: PathBuf,

    #[arg(long, default_value = "Customer Support AgentCore Gateway")]
    pub description: String,

    #[arg(long, default_value = "LambdaUsingSDK")]
    pub target_name: String,

    #[arg(long, default_value = "Lambda Target using SDK")]
    pub target_description: String,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Gateway ID to delete (read from the config file if omitted).
    #[arg(long)]
    pub gateway_id: Option<String>,

    /// Skip the confirmation prompt.
    #[arg(long)]
    pub confirm: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn create_defaults() {
        let cli = Cli::try_parse_from(["agentcore-gateway-admin", "create", "--name", "support"])
            .expect("parse");
        let Command::Create(args) = cli.command else {
            panic!("expected create");
        };
        assert_eq!(args.api_spec_file, PathBuf::from("lambda/api_spec.json"));
        assert_eq!(args.target_name, "LambdaUsingSDK");
        assert_eq!(cli.global.config_file, PathBuf::from("gateway.config"));
    }

    #[test]
    fn create_requires_name() {
        assert!(Cli::try_parse_from(["agentcore-gateway-admin", "create"]).is_err());
    }

    #[test]
    fn delete_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "agentcore-gateway-admin",
            "delete",
            "--gateway-id",
            "gw-1",
            "--confirm",
            "--config-file",
            "other.config",
        ])
        .expect("parse");
        let Command::Delete(args) = cli.command else {
            panic!("expected delete");
        };
        assert_eq!(args.gateway_id.as_deref(), Some("gw-1"));
        assert!(args.confirm);
        assert_eq!(cli.global.config_file, PathBuf::from("other.config"));
    }
}
