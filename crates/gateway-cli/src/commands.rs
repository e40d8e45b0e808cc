use std::io;

use agentcore_gateway_lifecycle::api::{CONTROL_PLANE_SIGNING_NAME, default_control_endpoint};
use agentcore_gateway_lifecycle::api_spec::load_api_spec;
use agentcore_gateway_lifecycle::model::validate_gateway_name;
use agentcore_gateway_lifecycle::params::{PARAMETER_STORE_SIGNING_NAME, default_ssm_endpoint};
use agentcore_gateway_lifecycle::{
    AgentCoreControlClient, AwsCredentials, GatewayLifecycle, LifecycleError, LifecycleSettings,
    ParameterKeys, RecordStore, Result, SigV4Signer, SsmParameterStore,
};
use anyhow::Context as _;
use url::Url;

use crate::cli::{Cli, Command, CreateArgs, DeleteArgs, GlobalArgs};
use crate::{output, prompt};

type Lifecycle = GatewayLifecycle<AgentCoreControlClient, SsmParameterStore>;

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Create(args) => create(&cli.global, args).await?,
        Command::Delete(args) => delete(&cli.global, args).await?,
    }
    Ok(())
}

async fn create(global: &GlobalArgs, args: CreateArgs) -> Result<()> {
    output::step(&format!("Creating AgentCore gateway: {}", args.name));

    // Local checks first: nothing remote happens if these fail.
    validate_gateway_name(&args.name)?;
    let api_spec = load_api_spec(&args.api_spec_file)?;

    let settings = LifecycleSettings {
        gateway_description: non_empty(args.description),
        target_name: args.target_name,
        target_description: non_empty(args.target_description),
        ..LifecycleSettings::default()
    };
    let (lifecycle, region) = connect(global, settings)?;
    output::key_value("Region", &region);

    let provisioned = lifecycle.create(&args.name, api_spec).await?;

    output::success(&format!("Gateway created: {}", provisioned.gateway.id));
    output::success(&format!("Gateway target created: {}", provisioned.target_id));
    output::key_value("URL", &provisioned.gateway.gateway_url);
    output::key_value("ARN", &provisioned.gateway.gateway_arn);
    output::success(&format!(
        "Gateway configuration saved to {}",
        lifecycle.store().path().display()
    ));
    Ok(())
}

async fn delete(global: &GlobalArgs, args: DeleteArgs) -> anyhow::Result<()> {
    let store = RecordStore::new(&global.config_file);
    let gateway_id = store.resolve_gateway_id(args.gateway_id.as_deref())?;
    if args.gateway_id.is_none() {
        output::info(&format!(
            "Using gateway ID from {}: {gateway_id}",
            store.path().display()
        ));
    }

    if !args.confirm {
        let question = format!(
            "Are you sure you want to delete gateway {gateway_id}? This action cannot be undone."
        );
        let confirmed = prompt::confirm(&mut io::stdin().lock(), &mut io::stdout(), &question)
            .context("read delete confirmation from stdin")?;
        if !confirmed {
            output::info("Operation cancelled");
            return Ok(());
        }
    }

    output::step(&format!("Deleting gateway: {gateway_id}"));
    let (lifecycle, _) = connect(global, LifecycleSettings::default())?;
    let report = lifecycle.delete(&gateway_id).await?;

    for target_id in &report.deleted_targets {
        output::success(&format!("Target {target_id} deleted"));
    }
    output::success(&format!("Gateway {} deleted", report.gateway_id));
    if report.record_removed {
        output::info(&format!("Removed {}", store.path().display()));
    }
    Ok(())
}

/// Build the signed clients and the lifecycle manager for this invocation.
fn connect(global: &GlobalArgs, settings: LifecycleSettings) -> Result<(Lifecycle, String)> {
    let region = resolve_region(global.region.as_deref())?;
    let credentials = AwsCredentials::from_env()?;

    let control_url = match &global.endpoint_url {
        Some(url) => url.clone(),
        None => parse_endpoint(&default_control_endpoint(&region))?,
    };
    let ssm_url = match &global.ssm_endpoint_url {
        Some(url) => url.clone(),
        None => parse_endpoint(&default_ssm_endpoint(&region))?,
    };
    tracing::debug!(%region, control = %control_url, ssm = %ssm_url, "endpoints resolved");

    let control = AgentCoreControlClient::new(
        control_url,
        SigV4Signer::new(credentials.clone(), &region, CONTROL_PLANE_SIGNING_NAME),
    );
    let params = SsmParameterStore::new(
        ssm_url,
        SigV4Signer::new(credentials, &region, PARAMETER_STORE_SIGNING_NAME),
    );
    let settings = LifecycleSettings {
        parameter_keys: ParameterKeys::with_prefix(&global.parameter_prefix),
        ..settings
    };
    let lifecycle = GatewayLifecycle::new(
        control,
        params,
        RecordStore::new(&global.config_file),
        settings,
    );
    Ok((lifecycle, region))
}

fn resolve_region(explicit: Option<&str>) -> Result<String> {
    explicit
        .map(str::to_string)
        .or_else(|| std::env::var("AWS_DEFAULT_REGION").ok())
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .ok_or_else(|| {
            LifecycleError::Config(
                "no AWS region configured; pass --region or set AWS_REGION".to_string(),
            )
        })
}

fn parse_endpoint(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| LifecycleError::Config(format!("invalid endpoint '{raw}': {e}")))
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
