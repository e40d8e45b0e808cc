use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{LifecycleError, Result};
use crate::model::{
    CreateGatewayRequest, CreateGatewayTargetRequest, CreatedGateway, CreatedGatewayTarget,
    GatewayTargetPage,
};
use crate::sigv4::{SigV4Signer, signed_request};

/// Service name used in the SigV4 credential scope.
pub const CONTROL_PLANE_SIGNING_NAME: &str = "bedrock-agentcore";

/// Largest page `ListGatewayTargets` will return.
pub const MAX_TARGETS_PAGE_SIZE: u32 = 100;

/// Default control-plane endpoint for a region.
#[must_use]
pub fn default_control_endpoint(region: &str) -> String {
    format!("https://bedrock-agentcore-control.{region}.amazonaws.com")
}

/// Gateway management operations consumed by the lifecycle manager.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn create_gateway(&self, req: &CreateGatewayRequest) -> Result<CreatedGateway>;

    async fn create_gateway_target(
        &self,
        gateway_id: &str,
        req: &CreateGatewayTargetRequest,
    ) -> Result<CreatedGatewayTarget>;

    async fn list_gateway_targets(
        &self,
        gateway_id: &str,
        max_results: u32,
        next_token: Option<&str>,
    ) -> Result<GatewayTargetPage>;

    async fn delete_gateway_target(&self, gateway_id: &str, target_id: &str) -> Result<()>;

    async fn delete_gateway(&self, gateway_id: &str) -> Result<()>;
}

/// HTTP client for the AgentCore control-plane REST API.
#[derive(Clone)]
pub struct AgentCoreControlClient {
    base: Url,
    signer: SigV4Signer,
    http: reqwest::Client,
}

impl AgentCoreControlClient {
    pub fn new(base: Url, signer: SigV4Signer) -> Self {
        Self {
            base,
            signer,
            http: reqwest::Client::new(),
        }
    }

    #[must_use]
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// `base` + encoded `segments` + trailing slash (the service's path style).
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| {
                LifecycleError::Config(format!("endpoint '{}' cannot carry a path", self.base))
            })?
            .pop_if_empty()
            .extend(segments)
            .push("");
        Ok(url)
    }

    async fn call<B: Serialize + ?Sized>(
        &self,
        operation: &'static str,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<Vec<u8>> {
        let mut headers = BTreeMap::new();
        let bytes = match body {
            Some(b) => {
                headers.insert("content-type".to_string(), "application/json".to_string());
                serde_json::to_vec(b).map_err(|e| {
                    LifecycleError::remote(operation, format!("encode request: {e}"))
                })?
            }
            None => Vec::new(),
        };

        tracing::debug!(operation, %method, %url, "control plane request");
        let resp = signed_request(&self.http, &self.signer, method, url, headers, bytes)?
            .send()
            .await
            .map_err(|e| LifecycleError::remote(operation, e.to_string()))?;

        let status = resp.status();
        let error_type = resp
            .headers()
            .get("x-amzn-errortype")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp
            .bytes()
            .await
            .map_err(|e| LifecycleError::remote(operation, format!("read response body: {e}")))?;

        if !status.is_success() {
            return Err(service_error(
                operation,
                status.as_u16(),
                error_type.as_deref(),
                &body,
            ));
        }
        Ok(body.to_vec())
    }

    async fn call_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        operation: &'static str,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<T> {
        let bytes = self.call(operation, method, url, body).await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| LifecycleError::remote(operation, format!("parse response: {e}")))
    }
}

#[async_trait]
impl ControlPlane for AgentCoreControlClient {
    async fn create_gateway(&self, req: &CreateGatewayRequest) -> Result<CreatedGateway> {
        let url = self.url(&["gateways"])?;
        self.call_json("CreateGateway", Method::POST, url, Some(req))
            .await
    }

    async fn create_gateway_target(
        &self,
        gateway_id: &str,
        req: &CreateGatewayTargetRequest,
    ) -> Result<CreatedGatewayTarget> {
        let url = self.url(&["gateways", gateway_id, "targets"])?;
        self.call_json("CreateGatewayTarget", Method::POST, url, Some(req))
            .await
    }

    async fn list_gateway_targets(
        &self,
        gateway_id: &str,
        max_results: u32,
        next_token: Option<&str>,
    ) -> Result<GatewayTargetPage> {
        let mut url = self.url(&["gateways", gateway_id, "targets"])?;
        {
            let mut q = url.query_pairs_mut();
            q.append_pair("maxResults", &max_results.to_string());
            if let Some(token) = next_token {
                q.append_pair("nextToken", token);
            }
        }
        self.call_json::<(), _>("ListGatewayTargets", Method::GET, url, None)
            .await
    }

    async fn delete_gateway_target(&self, gateway_id: &str, target_id: &str) -> Result<()> {
        let url = self.url(&["gateways", gateway_id, "targets", target_id])?;
        self.call::<()>("DeleteGatewayTarget", Method::DELETE, url, None)
            .await?;
        Ok(())
    }

    async fn delete_gateway(&self, gateway_id: &str) -> Result<()> {
        let url = self.url(&["gateways", gateway_id])?;
        self.call::<()>("DeleteGateway", Method::DELETE, url, None)
            .await?;
        Ok(())
    }
}

/// Map an AWS-style error response to `RemoteApi`.
///
/// The error code comes from `x-amzn-ErrorType` (`Code:meta`) or the body's `__type`
/// (`namespace#Code`); the message from `message`/`Message`.
pub(crate) fn service_error(
    operation: &'static str,
    status: u16,
    error_type_header: Option<&str>,
    body: &[u8],
) -> LifecycleError {
    let parsed: Option<serde_json::Value> = serde_json::from_slice(body).ok();
    let field = |name: &str| {
        parsed
            .as_ref()
            .and_then(|v| v.get(name))
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
    };

    let code = error_type_header
        .map(|h| h.split(':').next().unwrap_or(h).to_string())
        .or_else(|| field("__type"))
        .map(|c| c.rsplit('#').next().unwrap_or(&c).to_string())
        .filter(|c| !c.is_empty());
    let message = field("message")
        .or_else(|| field("Message"))
        .unwrap_or_else(|| {
            let text = String::from_utf8_lossy(body).trim().to_string();
            if text.is_empty() {
                "no error message".to_string()
            } else {
                text
            }
        });

    LifecycleError::RemoteApi {
        operation,
        status: Some(status),
        code,
        message,
    }
}
