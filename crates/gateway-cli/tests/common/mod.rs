#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};

use agentcore_gateway_lifecycle::params::DEFAULT_PARAMETER_PREFIX;
use agentcore_test_support::FakeAgentCore;
use anyhow::Context as _;
use serde_json::{Value, json};
use tokio::io::AsyncWriteExt as _;
use tokio::process::Command;

/// A fake service with every deployment parameter present, plus a scratch working dir.
pub struct Harness {
    pub fake: FakeAgentCore,
    pub dir: tempfile::TempDir,
}

impl Harness {
    pub async fn start() -> anyhow::Result<Self> {
        let fake = FakeAgentCore::start().await?;
        for (suffix, value) in [
            ("lambda_arn", "arn:aws:lambda:us-east-1:123456789012:function:support-tools"),
            ("machine_client_id", "client-123"),
            (
                "cognito_discovery_url",
                "https://cognito-idp.us-east-1.amazonaws.com/pool/.well-known/openid-configuration",
            ),
            ("gateway_iam_role", "arn:aws:iam::123456789012:role/gateway"),
        ] {
            fake.put_parameter(&format!("{DEFAULT_PARAMETER_PREFIX}/{suffix}"), value);
        }
        let dir = tempfile::tempdir().context("create working dir")?;
        Ok(Self { fake, dir })
    }

    pub fn record_path(&self) -> PathBuf {
        self.dir.path().join("gateway.config")
    }

    pub fn write_api_spec(&self) -> anyhow::Result<()> {
        let spec = json!([{
            "name": "get_order",
            "description": "Look up an order",
            "inputSchema": {"type": "object", "properties": {"orderId": {"type": "string"}}}
        }]);
        write_json(&self.dir.path().join("lambda/api_spec.json"), &spec)
    }

    pub fn write_record(&self, gateway_id: &str) -> anyhow::Result<()> {
        let record = json!({"gateway": {
            "id": gateway_id,
            "name": "seeded",
            "gateway_url": "https://example.invalid/mcp",
            "gateway_arn": "arn:aws:bedrock-agentcore:us-east-1:123456789012:gateway/x"
        }});
        write_json(&self.record_path(), &record)
    }

    pub fn recorded_gateway_id(&self) -> anyhow::Result<String> {
        let raw = std::fs::read_to_string(self.record_path()).context("read record")?;
        let v: Value = serde_json::from_str(&raw).context("parse record")?;
        v.pointer("/gateway/id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .context("record missing gateway.id")
    }

    /// Run the admin binary in the working dir against the fake, feeding `stdin`.
    pub async fn run(&self, args: &[&str], stdin: &str) -> anyhow::Result<Output> {
        let bin = env!("CARGO_BIN_EXE_agentcore-gateway-admin");
        let mut child = Command::new(bin)
            .args(args)
            .current_dir(self.dir.path())
            .env("AWS_ACCESS_KEY_ID", "AKIDEXAMPLE")
            .env("AWS_SECRET_ACCESS_KEY", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY")
            .env("AWS_REGION", "us-east-1")
            .env("AGENTCORE_CONTROL_ENDPOINT", self.fake.base_url())
            .env("AGENTCORE_SSM_ENDPOINT", self.fake.base_url())
            .env_remove("AWS_SESSION_TOKEN")
            .env_remove("RUST_LOG")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("spawn admin cli")?;
        if let Some(mut pipe) = child.stdin.take() {
            pipe.write_all(stdin.as_bytes())
                .await
                .context("write stdin")?;
        }
        child.wait_with_output().await.context("wait for admin cli")
    }
}

pub fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

pub fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

fn write_json(path: &Path, value: &Value) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("create parent dir")?;
    }
    std::fs::write(path, serde_json::to_vec_pretty(value)?).context("write json file")
}
