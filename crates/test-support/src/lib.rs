//! In-process stand-in for the AgentCore control plane and SSM `GetParameter`.
//!
//! Requests must carry a SigV4 `Authorization` header (it is not verified). Every
//! accepted call is appended to a log so tests can assert on order and count.

use anyhow::Context as _;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    GetParameter { name: String },
    CreateGateway { name: String },
    CreateGatewayTarget { gateway_id: String },
    ListGatewayTargets { gateway_id: String },
    DeleteGatewayTarget { gateway_id: String, target_id: String },
    DeleteGateway { gateway_id: String },
}

impl RecordedCall {
    #[must_use]
    pub fn is_parameter_lookup(&self) -> bool {
        matches!(self, RecordedCall::GetParameter { .. })
    }
}

#[derive(Debug)]
struct FakeGateway {
    name: String,
    targets: Vec<String>,
}

#[derive(Debug, Default)]
struct FakeState {
    calls: Vec<RecordedCall>,
    parameters: HashMap<String, String>,
    gateways: BTreeMap<String, FakeGateway>,
    next_id: u64,
    page_limit: Option<usize>,
    fail_gateway_creation: bool,
    fail_target_creation: bool,
}

impl FakeState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

type Shared = Arc<Mutex<FakeState>>;

/// A running fake service; the server stops when this is dropped.
pub struct FakeAgentCore {
    base_url: String,
    state: Shared,
    server: JoinHandle<()>,
}

impl Drop for FakeAgentCore {
    fn drop(&mut self) {
        self.server.abort();
    }
}

impl FakeAgentCore {
    /// Bind an ephemeral localhost port and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start() -> anyhow::Result<Self> {
        let state: Shared = Arc::default();
        let app = Router::new()
            .route("/", post(get_parameter))
            .route("/gateways/", post(create_gateway))
            .route("/gateways/{gateway_id}/", delete(delete_gateway))
            .route(
                "/gateways/{gateway_id}/targets/",
                post(create_gateway_target).get(list_gateway_targets),
            )
            .route(
                "/gateways/{gateway_id}/targets/{target_id}/",
                delete(delete_gateway_target),
            )
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind fake agentcore listener")?;
        let addr = listener.local_addr().context("fake listener address")?;
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            base_url: format!("http://{addr}"),
            state,
            server,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn put_parameter(&self, name: &str, value: &str) {
        self.state
            .lock()
            .parameters
            .insert(name.to_string(), value.to_string());
    }

    /// Create a gateway with `targets` targets directly, without logging a call.
    pub fn seed_gateway(&self, name: &str, targets: usize) -> String {
        let mut st = self.state.lock();
        let id = gateway_id_for(name, st.next_id());
        let target_ids = (0..targets)
            .map(|_| target_id_for(st.next_id()))
            .collect();
        st.gateways.insert(
            id.clone(),
            FakeGateway {
                name: name.to_string(),
                targets: target_ids,
            },
        );
        id
    }

    /// Cap every `ListGatewayTargets` page at `limit` items.
    pub fn set_page_limit(&self, limit: usize) {
        self.state.lock().page_limit = Some(limit.max(1));
    }

    /// Make every following `CreateGateway` fail with an access error.
    pub fn fail_gateway_creation(&self) {
        self.state.lock().fail_gateway_creation = true;
    }

    /// Make every following `CreateGatewayTarget` fail with a validation error.
    pub fn fail_target_creation(&self) {
        self.state.lock().fail_target_creation = true;
    }

    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    /// Calls other than parameter lookups.
    #[must_use]
    pub fn control_plane_calls(&self) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| !c.is_parameter_lookup())
            .collect()
    }

    #[must_use]
    pub fn gateway_ids(&self) -> Vec<String> {
        self.state.lock().gateways.keys().cloned().collect()
    }

    #[must_use]
    pub fn gateway_name(&self, gateway_id: &str) -> Option<String> {
        self.state
            .lock()
            .gateways
            .get(gateway_id)
            .map(|g| g.name.clone())
    }

    #[must_use]
    pub fn target_ids(&self, gateway_id: &str) -> Vec<String> {
        self.state
            .lock()
            .gateways
            .get(gateway_id)
            .map(|g| g.targets.clone())
            .unwrap_or_default()
    }
}

fn gateway_id_for(name: &str, n: u64) -> String {
    format!("{}-{n:010}", name.to_ascii_lowercase())
}

fn target_id_for(n: u64) -> String {
    format!("T{n:09}")
}

fn aws_error(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        [("x-amzn-errortype", format!("{code}:http://internal.amazon.com/"))],
        Json(json!({ "message": message })),
    )
        .into_response()
}

fn reject_unsigned(headers: &HeaderMap) -> Option<Response> {
    let signed = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("AWS4-HMAC-SHA256 Credential="));
    (!signed).then(|| {
        aws_error(
            StatusCode::FORBIDDEN,
            "MissingAuthenticationTokenException",
            "request is not signed",
        )
    })
}

async fn get_parameter(State(state): State<Shared>, headers: HeaderMap, body: Bytes) -> Response {
    if let Some(resp) = reject_unsigned(&headers) {
        return resp;
    }
    let target = headers
        .get("x-amz-target")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if target != "AmazonSSM.GetParameter" {
        return aws_error(
            StatusCode::BAD_REQUEST,
            "UnknownOperationException",
            &format!("unsupported target '{target}'"),
        );
    }
    let Some(name) = serde_json::from_slice::<Value>(&body)
        .ok()
        .and_then(|v| v.get("Name").and_then(Value::as_str).map(str::to_string))
    else {
        return aws_error(StatusCode::BAD_REQUEST, "ValidationException", "Name is required");
    };

    let mut st = state.lock();
    st.calls.push(RecordedCall::GetParameter { name: name.clone() });
    match st.parameters.get(&name) {
        Some(value) => Json(json!({
            "Parameter": {"Name": name, "Type": "String", "Value": value, "Version": 1}
        }))
        .into_response(),
        None => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "__type": "com.amazonaws.ssm#ParameterNotFound",
                "message": format!("parameter {name} not found"),
            })),
        )
            .into_response(),
    }
}

async fn create_gateway(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(resp) = reject_unsigned(&headers) {
        return resp;
    }
    let name = body
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let mut st = state.lock();
    st.calls.push(RecordedCall::CreateGateway { name: name.clone() });
    if st.fail_gateway_creation {
        return aws_error(
            StatusCode::FORBIDDEN,
            "AccessDeniedException",
            "role cannot be assumed by the gateway",
        );
    }
    if name.is_empty() || body.get("roleArn").and_then(Value::as_str).is_none() {
        return aws_error(
            StatusCode::BAD_REQUEST,
            "ValidationException",
            "name and roleArn are required",
        );
    }
    let id = gateway_id_for(&name, st.next_id());
    st.gateways.insert(
        id.clone(),
        FakeGateway {
            name: name.clone(),
            targets: Vec::new(),
        },
    );
    (
        StatusCode::ACCEPTED,
        Json(json!({
            "gatewayId": id,
            "gatewayArn": format!("arn:aws:bedrock-agentcore:us-east-1:123456789012:gateway/{id}"),
            "gatewayUrl": format!("https://{id}.gateway.bedrock-agentcore.us-east-1.amazonaws.com/mcp"),
            "name": name,
            "status": "CREATING",
            "protocolType": body.get("protocolType").cloned().unwrap_or(Value::Null),
            "authorizerType": body.get("authorizerType").cloned().unwrap_or(Value::Null),
        })),
    )
        .into_response()
}

async fn create_gateway_target(
    State(state): State<Shared>,
    Path(gateway_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(resp) = reject_unsigned(&headers) {
        return resp;
    }
    let mut st = state.lock();
    st.calls.push(RecordedCall::CreateGatewayTarget {
        gateway_id: gateway_id.clone(),
    });
    if st.fail_target_creation {
        return aws_error(
            StatusCode::BAD_REQUEST,
            "ValidationException",
            "tool schema rejected",
        );
    }
    if body
        .pointer("/targetConfiguration/mcp/lambda/toolSchema/inlinePayload")
        .is_none()
    {
        return aws_error(
            StatusCode::BAD_REQUEST,
            "ValidationException",
            "targetConfiguration.mcp.lambda.toolSchema.inlinePayload is required",
        );
    }
    let target_id = target_id_for(st.next_id());
    let Some(gateway) = st.gateways.get_mut(&gateway_id) else {
        return aws_error(
            StatusCode::NOT_FOUND,
            "ResourceNotFoundException",
            "gateway not found",
        );
    };
    gateway.targets.push(target_id.clone());
    (
        StatusCode::ACCEPTED,
        Json(json!({
            "targetId": target_id,
            "name": body.get("name").cloned().unwrap_or(Value::Null),
            "status": "CREATING",
        })),
    )
        .into_response()
}

async fn list_gateway_targets(
    State(state): State<Shared>,
    Path(gateway_id): Path<String>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if let Some(resp) = reject_unsigned(&headers) {
        return resp;
    }
    let mut st = state.lock();
    st.calls.push(RecordedCall::ListGatewayTargets {
        gateway_id: gateway_id.clone(),
    });

    let max_results = query
        .get("maxResults")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(100);
    if !(1..=100).contains(&max_results) {
        return aws_error(
            StatusCode::BAD_REQUEST,
            "ValidationException",
            "maxResults must be between 1 and 100",
        );
    }
    let page = st.page_limit.map_or(max_results, |l| l.min(max_results));
    let Ok(start) = query.get("nextToken").map_or(Ok(0), |t| t.parse::<usize>()) else {
        return aws_error(StatusCode::BAD_REQUEST, "ValidationException", "bad nextToken");
    };
    let Some(gateway) = st.gateways.get(&gateway_id) else {
        return aws_error(
            StatusCode::NOT_FOUND,
            "ResourceNotFoundException",
            "gateway not found",
        );
    };

    let start = start.min(gateway.targets.len());
    let end = (start + page).min(gateway.targets.len());
    let items: Vec<Value> = gateway.targets[start..end]
        .iter()
        .map(|t| json!({"targetId": t, "name": "LambdaUsingSDK", "status": "READY"}))
        .collect();
    let mut resp = json!({ "items": items });
    if end < gateway.targets.len() {
        resp["nextToken"] = json!(end.to_string());
    }
    Json(resp).into_response()
}

async fn delete_gateway_target(
    State(state): State<Shared>,
    Path((gateway_id, target_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if let Some(resp) = reject_unsigned(&headers) {
        return resp;
    }
    let mut st = state.lock();
    st.calls.push(RecordedCall::DeleteGatewayTarget {
        gateway_id: gateway_id.clone(),
        target_id: target_id.clone(),
    });
    let Some(gateway) = st.gateways.get_mut(&gateway_id) else {
        return aws_error(
            StatusCode::NOT_FOUND,
            "ResourceNotFoundException",
            "gateway not found",
        );
    };
    let before = gateway.targets.len();
    gateway.targets.retain(|t| *t != target_id);
    if gateway.targets.len() == before {
        return aws_error(
            StatusCode::NOT_FOUND,
            "ResourceNotFoundException",
            "target not found",
        );
    }
    (
        StatusCode::ACCEPTED,
        Json(json!({"targetId": target_id, "status": "DELETING"})),
    )
        .into_response()
}

async fn delete_gateway(
    State(state): State<Shared>,
    Path(gateway_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Some(resp) = reject_unsigned(&headers) {
        return resp;
    }
    let mut st = state.lock();
    st.calls.push(RecordedCall::DeleteGateway {
        gateway_id: gateway_id.clone(),
    });
    let remaining = match st.gateways.get(&gateway_id) {
        Some(g) => g.targets.len(),
        None => {
            return aws_error(
                StatusCode::NOT_FOUND,
                "ResourceNotFoundException",
                "gateway not found",
            );
        }
    };
    if remaining > 0 {
        return aws_error(
            StatusCode::CONFLICT,
            "ConflictException",
            "gateway still has targets",
        );
    }
    st.gateways.remove(&gateway_id);
    (
        StatusCode::ACCEPTED,
        Json(json!({"gatewayId": gateway_id, "status": "DELETING"})),
    )
        .into_response()
}
