use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{LifecycleError, Result};

/// Longest gateway name the control plane accepts (counted in alphanumerics).
pub const MAX_GATEWAY_NAME_LEN: usize = 100;

/// Identity of a provisioned gateway, as persisted in the local record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayRecord {
    pub id: String,
    pub name: String,
    pub gateway_url: String,
    pub gateway_arn: String,
}

/// On-disk shape of the local record: `{"gateway": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFile {
    pub gateway: GatewayRecord,
}

/// Result of a successful `create`: the gateway and the target bound to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedGateway {
    pub gateway: GatewayRecord,
    pub target_id: String,
}

/// Result of a successful `delete`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    pub gateway_id: String,
    pub deleted_targets: Vec<String>,
    /// Whether the local record pointed at this gateway and was removed.
    pub record_removed: bool,
}

/// Check a gateway name against the control plane's `([0-9a-zA-Z][-]?){1,100}` rule.
///
/// # Errors
///
/// Returns a configuration error describing the first violation.
pub fn validate_gateway_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(LifecycleError::Config(
            "gateway name must not be empty".to_string(),
        ));
    }

    let mut alnum = 0usize;
    let mut prev_hyphen = true;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            alnum += 1;
            prev_hyphen = false;
        } else if ch == '-' {
            if prev_hyphen {
                return Err(LifecycleError::Config(format!(
                    "invalid gateway name '{name}': hyphens must follow a letter or digit"
                )));
            }
            prev_hyphen = true;
        } else {
            return Err(LifecycleError::Config(format!(
                "invalid gateway name '{name}': only ASCII letters, digits and '-' are allowed"
            )));
        }
    }

    if alnum > MAX_GATEWAY_NAME_LEN {
        return Err(LifecycleError::Config(format!(
            "invalid gateway name '{name}': at most {MAX_GATEWAY_NAME_LEN} letters/digits"
        )));
    }
    Ok(())
}

// ---- control plane wire types ----

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGatewayRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub role_arn: String,
    pub protocol_type: ProtocolType,
    pub authorizer_type: AuthorizerType,
    pub authorizer_configuration: AuthorizerConfiguration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolType {
    #[serde(rename = "MCP")]
    Mcp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthorizerType {
    #[serde(rename = "CUSTOM_JWT")]
    CustomJwt,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizerConfiguration {
    #[serde(rename = "customJWTAuthorizer")]
    pub custom_jwt_authorizer: CustomJwtAuthorizer,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomJwtAuthorizer {
    pub allowed_clients: Vec<String>,
    pub discovery_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedGateway {
    pub gateway_id: String,
    pub gateway_url: String,
    pub gateway_arn: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGatewayTargetRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub target_configuration: TargetConfiguration,
    pub credential_provider_configurations: Vec<CredentialProviderConfiguration>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TargetConfiguration {
    pub mcp: McpTargetConfiguration,
}

#[derive(Debug, Clone, Serialize)]
pub struct McpTargetConfiguration {
    pub lambda: LambdaTargetConfiguration,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LambdaTargetConfiguration {
    pub lambda_arn: String,
    pub tool_schema: ToolSchema,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSchema {
    /// The api spec document, passed through untouched.
    pub inline_payload: Value,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialProviderConfiguration {
    pub credential_provider_type: CredentialProviderType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CredentialProviderType {
    GatewayIamRole,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedGatewayTarget {
    pub target_id: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayTargetSummary {
    pub target_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// One page of `ListGatewayTargets`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayTargetPage {
    #[serde(default)]
    pub items: Vec<GatewayTargetSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn gateway_names_follow_service_rule() {
        let longest = "x".repeat(100);
        let too_long = "x".repeat(101);
        for ok in ["a", "customer-support", "gw-1-", "A1b2C3", longest.as_str()] {
            validate_gateway_name(ok).unwrap_or_else(|e| panic!("{ok}: {e}"));
        }
        for bad in ["", "-gw", "gw--1", "gw_1", "gw 1", "gateway.prod", too_long.as_str()] {
            assert!(validate_gateway_name(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn create_gateway_request_uses_service_field_names() {
        let req = CreateGatewayRequest {
            name: "gw".to_string(),
            description: Some("Customer Support AgentCore Gateway".to_string()),
            role_arn: "arn:aws:iam::123:role/gw".to_string(),
            protocol_type: ProtocolType::Mcp,
            authorizer_type: AuthorizerType::CustomJwt,
            authorizer_configuration: AuthorizerConfiguration {
                custom_jwt_authorizer: CustomJwtAuthorizer {
                    allowed_clients: vec!["client-1".to_string()],
                    discovery_url: "https://idp/.well-known/openid-configuration".to_string(),
                },
            },
        };
        let v = serde_json::to_value(&req).expect("serialize");
        assert_eq!(v["protocolType"], "MCP");
        assert_eq!(v["authorizerType"], "CUSTOM_JWT");
        assert_eq!(v["roleArn"], "arn:aws:iam::123:role/gw");
        assert_eq!(
            v["authorizerConfiguration"]["customJWTAuthorizer"]["allowedClients"],
            json!(["client-1"])
        );
    }

    #[test]
    fn target_request_embeds_api_spec_verbatim() {
        let spec = json!([{"name": "get_order", "inputSchema": {"type": "object"}}]);
        let req = CreateGatewayTargetRequest {
            name: "LambdaUsingSDK".to_string(),
            description: None,
            target_configuration: TargetConfiguration {
                mcp: McpTargetConfiguration {
                    lambda: LambdaTargetConfiguration {
                        lambda_arn: "arn:aws:lambda:fn".to_string(),
                        tool_schema: ToolSchema {
                            inline_payload: spec.clone(),
                        },
                    },
                },
            },
            credential_provider_configurations: vec![CredentialProviderConfiguration {
                credential_provider_type: CredentialProviderType::GatewayIamRole,
            }],
        };
        let v = serde_json::to_value(&req).expect("serialize");
        assert_eq!(
            v["targetConfiguration"]["mcp"]["lambda"]["toolSchema"]["inlinePayload"],
            spec
        );
        assert_eq!(
            v["credentialProviderConfigurations"][0]["credentialProviderType"],
            "GATEWAY_IAM_ROLE"
        );
        assert!(v.get("description").is_none());
    }

    #[test]
    fn record_file_shape_is_nested_under_gateway() {
        let rec = RecordFile {
            gateway: GatewayRecord {
                id: "gw-1".to_string(),
                name: "support".to_string(),
                gateway_url: "https://gw".to_string(),
                gateway_arn: "arn:gw".to_string(),
            },
        };
        let v = serde_json::to_value(&rec).expect("serialize");
        assert_eq!(
            v,
            json!({"gateway": {
                "id": "gw-1",
                "name": "support",
                "gateway_url": "https://gw",
                "gateway_arn": "arn:gw",
            }})
        );
    }
}
