mod common;

use agentcore_test_support::RecordedCall;
use common::{Harness, stderr, stdout};

#[tokio::test(flavor = "multi_thread")]
async fn create_provisions_gateway_then_target_and_writes_record() -> anyhow::Result<()> {
    let h = Harness::start().await?;
    h.write_api_spec()?;

    let out = h.run(&["create", "--name", "SupportGateway"], "").await?;
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let ids = h.fake.gateway_ids();
    assert_eq!(ids.len(), 1);
    let gateway_id = &ids[0];
    assert_eq!(h.recorded_gateway_id()?, *gateway_id);
    assert_eq!(h.fake.target_ids(gateway_id).len(), 1);
    assert_eq!(
        h.fake.control_plane_calls(),
        vec![
            RecordedCall::CreateGateway {
                name: "SupportGateway".to_string()
            },
            RecordedCall::CreateGatewayTarget {
                gateway_id: gateway_id.clone()
            },
        ]
    );
    assert!(stdout(&out).contains(gateway_id.as_str()));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_api_spec_fails_before_any_remote_call() -> anyhow::Result<()> {
    let h = Harness::start().await?;

    let out = h.run(&["create", "--name", "SupportGateway"], "").await?;
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("API specification file not found"));
    assert!(h.fake.calls().is_empty());
    assert!(!h.record_path().exists());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_name_fails_before_any_remote_call() -> anyhow::Result<()> {
    let h = Harness::start().await?;
    h.write_api_spec()?;

    let out = h.run(&["create", "--name", "bad_name!"], "").await?;
    assert_eq!(out.status.code(), Some(1));
    assert!(h.fake.calls().is_empty());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_parameter_creates_nothing() -> anyhow::Result<()> {
    let h = Harness::start().await?;
    h.write_api_spec()?;

    let out = h
        .run(
            &["create", "--name", "SupportGateway", "--parameter-prefix", "/other/app"],
            "",
        )
        .await?;
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("/other/app/lambda_arn"));
    assert!(h.fake.control_plane_calls().is_empty());
    assert!(h.fake.gateway_ids().is_empty());
    assert!(!h.record_path().exists());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_target_reports_orphaned_gateway() -> anyhow::Result<()> {
    let h = Harness::start().await?;
    h.write_api_spec()?;
    h.fake.fail_target_creation();

    let out = h.run(&["create", "--name", "SupportGateway"], "").await?;
    assert_eq!(out.status.code(), Some(1));

    let ids = h.fake.gateway_ids();
    assert_eq!(ids.len(), 1);
    let err = stderr(&out);
    assert!(err.contains(ids[0].as_str()), "stderr: {err}");
    assert!(err.contains("delete --gateway-id"));
    assert!(!h.record_path().exists());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_gateway_create_stops_before_target_and_keeps_record() -> anyhow::Result<()> {
    let h = Harness::start().await?;
    h.write_api_spec()?;
    h.write_record("previous-0000000001")?;
    let before = std::fs::read_to_string(h.record_path())?;
    h.fake.fail_gateway_creation();

    let out = h.run(&["create", "--name", "SupportGateway"], "").await?;
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("AccessDeniedException"));
    assert_eq!(
        h.fake.control_plane_calls(),
        vec![RecordedCall::CreateGateway {
            name: "SupportGateway".to_string()
        }]
    );
    assert!(h.fake.gateway_ids().is_empty());
    assert_eq!(std::fs::read_to_string(h.record_path())?, before);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn second_create_replaces_the_record() -> anyhow::Result<()> {
    let h = Harness::start().await?;
    h.write_api_spec()?;

    let first = h.run(&["create", "--name", "first"], "").await?;
    assert!(first.status.success(), "stderr: {}", stderr(&first));
    let first_id = h.recorded_gateway_id()?;

    let second = h.run(&["create", "--name", "second"], "").await?;
    assert!(second.status.success(), "stderr: {}", stderr(&second));
    let second_id = h.recorded_gateway_id()?;

    assert_ne!(first_id, second_id);
    assert_eq!(h.fake.gateway_name(&second_id).as_deref(), Some("second"));
    assert_eq!(h.fake.gateway_ids().len(), 2);
    Ok(())
}
