//! Ordered create/delete workflows for a gateway and its targets.

use std::collections::HashSet;

use serde_json::Value;

use crate::api::{ControlPlane, MAX_TARGETS_PAGE_SIZE};
use crate::config::RecordStore;
use crate::error::{LifecycleError, Result};
use crate::model::{
    AuthorizerConfiguration, AuthorizerType, CreateGatewayRequest, CreateGatewayTargetRequest,
    CredentialProviderConfiguration, CredentialProviderType, CustomJwtAuthorizer, DeleteReport,
    GatewayRecord, LambdaTargetConfiguration, McpTargetConfiguration, ProtocolType,
    ProvisionedGateway, TargetConfiguration, ToolSchema, validate_gateway_name,
};
use crate::params::{GatewayDependencies, ParameterKeys, ParameterStore};

/// Fixed request details for the gateways this tool creates.
#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    pub gateway_description: Option<String>,
    pub target_name: String,
    pub target_description: Option<String>,
    pub parameter_keys: ParameterKeys,
    /// `maxResults` for each `ListGatewayTargets` page.
    pub page_size: u32,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            gateway_description: Some("Customer Support AgentCore Gateway".to_string()),
            target_name: "LambdaUsingSDK".to_string(),
            target_description: Some("Lambda Target using SDK".to_string()),
            parameter_keys: ParameterKeys::default(),
            page_size: MAX_TARGETS_PAGE_SIZE,
        }
    }
}

/// Creates and deletes gateways, keeping the local record in step.
///
/// Every remote call is awaited before the next one is issued.
pub struct GatewayLifecycle<C, P> {
    control: C,
    params: P,
    store: RecordStore,
    settings: LifecycleSettings,
}

impl<C: ControlPlane, P: ParameterStore> GatewayLifecycle<C, P> {
    pub fn new(control: C, params: P, store: RecordStore, settings: LifecycleSettings) -> Self {
        Self {
            control,
            params,
            store,
            settings,
        }
    }

    #[must_use]
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Create a gateway with one Lambda target and record it locally.
    ///
    /// An existing record is overwritten; the gateway it named is left untouched remotely.
    ///
    /// # Errors
    ///
    /// * configuration error for an invalid name;
    /// * dependency resolution error if a parameter is missing (nothing created);
    /// * remote API error if the gateway cannot be created;
    /// * [`LifecycleError::OrphanedGateway`] if the gateway was created but the
    ///   target was not. The gateway is not rolled back and the record is not written.
    pub async fn create(&self, name: &str, api_spec: Value) -> Result<ProvisionedGateway> {
        validate_gateway_name(name)?;

        match self.store.load() {
            Ok(Some(previous)) => tracing::warn!(
                previous_gateway_id = %previous.id,
                path = %self.store.path().display(),
                "existing gateway record will be overwritten; the previous gateway is not deleted"
            ),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "ignoring unreadable gateway record"),
        }

        let deps = GatewayDependencies::resolve(&self.params, &self.settings.parameter_keys).await?;
        tracing::info!(
            gateway_name = name,
            execution_role = %deps.execution_role_arn,
            "creating gateway"
        );

        let created = self
            .control
            .create_gateway(&CreateGatewayRequest {
                name: name.to_string(),
                description: self.settings.gateway_description.clone(),
                role_arn: deps.execution_role_arn.clone(),
                protocol_type: ProtocolType::Mcp,
                authorizer_type: AuthorizerType::CustomJwt,
                authorizer_configuration: AuthorizerConfiguration {
                    custom_jwt_authorizer: CustomJwtAuthorizer {
                        allowed_clients: vec![deps.allowed_client_id.clone()],
                        discovery_url: deps.discovery_url.clone(),
                    },
                },
            })
            .await?;
        tracing::info!(gateway_id = %created.gateway_id, "gateway created");

        let target = self
            .control
            .create_gateway_target(
                &created.gateway_id,
                &CreateGatewayTargetRequest {
                    name: self.settings.target_name.clone(),
                    description: self.settings.target_description.clone(),
                    target_configuration: TargetConfiguration {
                        mcp: McpTargetConfiguration {
                            lambda: LambdaTargetConfiguration {
                                lambda_arn: deps.lambda_arn.clone(),
                                tool_schema: ToolSchema {
                                    inline_payload: api_spec,
                                },
                            },
                        },
                    },
                    credential_provider_configurations: vec![CredentialProviderConfiguration {
                        credential_provider_type: CredentialProviderType::GatewayIamRole,
                    }],
                },
            )
            .await
            .map_err(|source| {
                tracing::error!(
                    gateway_id = %created.gateway_id,
                    error = %source,
                    "target creation failed; gateway left without a target"
                );
                LifecycleError::OrphanedGateway {
                    gateway_id: created.gateway_id.clone(),
                    source: Box::new(source),
                }
            })?;
        tracing::info!(target_id = %target.target_id, "gateway target created");

        let gateway = GatewayRecord {
            id: created.gateway_id,
            name: name.to_string(),
            gateway_url: created.gateway_url,
            gateway_arn: created.gateway_arn,
        };
        self.store.save(&gateway)?;
        tracing::info!(path = %self.store.path().display(), "gateway record saved");

        Ok(ProvisionedGateway {
            gateway,
            target_id: target.target_id,
        })
    }

    /// Gateway to delete: `explicit` if given, else the recorded one. No remote calls.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when neither is available.
    pub fn resolve_gateway_id(&self, explicit: Option<&str>) -> Result<String> {
        self.store.resolve_gateway_id(explicit)
    }

    /// Delete every target of `gateway_id`, then the gateway, then the matching record.
    ///
    /// # Errors
    ///
    /// Returns a remote API error on the first failed call. Targets deleted before
    /// the failure stay deleted and the record is kept.
    pub async fn delete(&self, gateway_id: &str) -> Result<DeleteReport> {
        let target_ids = self.list_all_target_ids(gateway_id).await?;
        tracing::info!(gateway_id, targets = target_ids.len(), "deleting gateway targets");

        for target_id in &target_ids {
            self.control
                .delete_gateway_target(gateway_id, target_id)
                .await?;
            tracing::info!(gateway_id, target_id = %target_id, "target deleted");
        }

        self.control.delete_gateway(gateway_id).await?;
        tracing::info!(gateway_id, "gateway deleted");

        let record_removed = match self.store.load() {
            Ok(Some(record)) if record.id == gateway_id => self.store.remove()?,
            Ok(Some(record)) => {
                tracing::warn!(
                    recorded_gateway_id = %record.id,
                    "gateway record names a different gateway; leaving it in place"
                );
                false
            }
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %self.store.path().display(),
                    "gateway deleted but its record could not be read; leaving it in place"
                );
                false
            }
        };

        Ok(DeleteReport {
            gateway_id: gateway_id.to_string(),
            deleted_targets: target_ids,
            record_removed,
        })
    }

    async fn list_all_target_ids(&self, gateway_id: &str) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        let mut seen_tokens = HashSet::new();
        let mut next_token: Option<String> = None;
        loop {
            let page = self
                .control
                .list_gateway_targets(gateway_id, self.settings.page_size, next_token.as_deref())
                .await?;
            ids.extend(page.items.into_iter().map(|t| t.target_id));

            match page.next_token.filter(|t| !t.is_empty()) {
                Some(token) if !seen_tokens.insert(token.clone()) => {
                    return Err(LifecycleError::remote(
                        "ListGatewayTargets",
                        format!("pagination did not advance (nextToken '{token}' repeated)"),
                    ));
                }
                Some(token) => next_token = Some(token),
                None => return Ok(ids),
            }
        }
    }
}
