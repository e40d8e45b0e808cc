use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::api::service_error;
use crate::error::{LifecycleError, Result};
use crate::sigv4::{SigV4Signer, signed_request};

/// Namespace the customer-support deployment writes its parameters under.
pub const DEFAULT_PARAMETER_PREFIX: &str = "/app/customersupport/agentcore";

pub const PARAMETER_STORE_SIGNING_NAME: &str = "ssm";

#[must_use]
pub fn default_ssm_endpoint(region: &str) -> String {
    format!("https://ssm.{region}.amazonaws.com")
}

/// Key-value lookup of deployment parameters.
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Fetch a parameter value.
    ///
    /// Implementations return [`LifecycleError::ParameterNotFound`] for absent keys.
    async fn get_parameter(&self, name: &str) -> Result<String>;
}

/// Full parameter names for everything `create` needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterKeys {
    pub lambda_arn: String,
    pub allowed_client_id: String,
    pub discovery_url: String,
    pub execution_role_arn: String,
}

impl ParameterKeys {
    #[must_use]
    pub fn with_prefix(prefix: &str) -> Self {
        let prefix = prefix.trim_end_matches('/');
        Self {
            lambda_arn: format!("{prefix}/lambda_arn"),
            allowed_client_id: format!("{prefix}/machine_client_id"),
            discovery_url: format!("{prefix}/cognito_discovery_url"),
            execution_role_arn: format!("{prefix}/gateway_iam_role"),
        }
    }
}

impl Default for ParameterKeys {
    fn default() -> Self {
        Self::with_prefix(DEFAULT_PARAMETER_PREFIX)
    }
}

/// Values resolved from the parameter store before any gateway is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayDependencies {
    pub lambda_arn: String,
    pub allowed_client_id: String,
    pub discovery_url: String,
    pub execution_role_arn: String,
}

impl GatewayDependencies {
    /// Look up every key in order; the first missing one aborts.
    ///
    /// # Errors
    ///
    /// Returns a dependency resolution error naming the key that failed.
    pub async fn resolve<P: ParameterStore + ?Sized>(
        store: &P,
        keys: &ParameterKeys,
    ) -> Result<Self> {
        let lambda_arn = store.get_parameter(&keys.lambda_arn).await?;
        let allowed_client_id = store.get_parameter(&keys.allowed_client_id).await?;
        let discovery_url = store.get_parameter(&keys.discovery_url).await?;
        let execution_role_arn = store.get_parameter(&keys.execution_role_arn).await?;
        Ok(Self {
            lambda_arn,
            allowed_client_id,
            discovery_url,
            execution_role_arn,
        })
    }
}

/// SSM `GetParameter` over the AWS JSON 1.1 protocol.
#[derive(Clone)]
pub struct SsmParameterStore {
    endpoint: Url,
    signer: SigV4Signer,
    http: reqwest::Client,
}

impl SsmParameterStore {
    pub fn new(endpoint: Url, signer: SigV4Signer) -> Self {
        Self {
            endpoint,
            signer,
            http: reqwest::Client::new(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct GetParameterRequest<'a> {
    name: &'a str,
    with_decryption: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetParameterResponse {
    parameter: SsmParameter,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SsmParameter {
    value: String,
}

#[async_trait]
impl ParameterStore for SsmParameterStore {
    async fn get_parameter(&self, name: &str) -> Result<String> {
        let failed = |message: String| LifecycleError::Parameter {
            name: name.to_string(),
            message,
        };

        let body = serde_json::to_vec(&GetParameterRequest {
            name,
            with_decryption: true,
        })
        .map_err(|e| failed(format!("encode request: {e}")))?;
        let mut headers = BTreeMap::new();
        headers.insert(
            "content-type".to_string(),
            "application/x-amz-json-1.1".to_string(),
        );
        headers.insert(
            "x-amz-target".to_string(),
            "AmazonSSM.GetParameter".to_string(),
        );

        tracing::debug!(parameter = name, "resolving parameter");
        let resp = signed_request(
            &self.http,
            &self.signer,
            Method::POST,
            self.endpoint.clone(),
            headers,
            body,
        )?
        .send()
        .await
        .map_err(|e| failed(e.to_string()))?;

        let status = resp.status();
        let error_type = resp
            .headers()
            .get("x-amzn-errortype")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| failed(format!("read response body: {e}")))?;

        if !status.is_success() {
            return Err(
                match service_error("GetParameter", status.as_u16(), error_type.as_deref(), &bytes)
                {
                    LifecycleError::RemoteApi {
                        code: Some(code), ..
                    } if code == "ParameterNotFound" => LifecycleError::ParameterNotFound {
                        name: name.to_string(),
                    },
                    other => failed(other.to_string()),
                },
            );
        }

        let parsed: GetParameterResponse = serde_json::from_slice(&bytes)
            .map_err(|e| failed(format!("parse response: {e}")))?;
        Ok(parsed.parameter.value)
    }
}
