//! Error types for `agentcore-gateway-lifecycle`.

use thiserror::Error;

/// Coarse classification used by callers to decide how to report a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Local inputs: record file, api spec, names, credentials, endpoints.
    Configuration,
    /// A parameter-store lookup did not produce a value.
    DependencyResolution,
    /// The control plane rejected or failed a request.
    RemoteApi,
}

/// Main error type for gateway lifecycle operations.
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// Configuration errors (missing inputs, invalid names, bad endpoints).
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration error: failed to read '{path}': {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: failed to write '{path}': {source}")]
    WriteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: failed to parse '{path}': {source}")]
    ParseFile {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Dependency resolution error: parameter '{name}' not found")]
    ParameterNotFound { name: String },

    #[error("Dependency resolution error: parameter '{name}': {message}")]
    Parameter { name: String, message: String },

    /// Non-success response (or transport failure) from the control plane.
    #[error("Remote API error: {operation} failed{}: {message}", status_suffix(.status, .code))]
    RemoteApi {
        operation: &'static str,
        status: Option<u16>,
        code: Option<String>,
        message: String,
    },

    /// The gateway exists remotely but its target could not be created.
    #[error("gateway '{gateway_id}' was created but its target was not: {source}")]
    OrphanedGateway {
        gateway_id: String,
        #[source]
        source: Box<LifecycleError>,
    },
}

fn status_suffix(status: &Option<u16>, code: &Option<String>) -> String {
    match (status, code) {
        (Some(s), Some(c)) => format!(" ({s} {c})"),
        (Some(s), None) => format!(" ({s})"),
        (None, Some(c)) => format!(" ({c})"),
        (None, None) => String::new(),
    }
}

impl LifecycleError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            LifecycleError::Config(_)
            | LifecycleError::ReadFile { .. }
            | LifecycleError::WriteFile { .. }
            | LifecycleError::ParseFile { .. } => ErrorKind::Configuration,
            LifecycleError::ParameterNotFound { .. } | LifecycleError::Parameter { .. } => {
                ErrorKind::DependencyResolution
            }
            LifecycleError::RemoteApi { .. } | LifecycleError::OrphanedGateway { .. } => {
                ErrorKind::RemoteApi
            }
        }
    }

    pub(crate) fn remote(operation: &'static str, message: impl Into<String>) -> Self {
        LifecycleError::RemoteApi {
            operation,
            status: None,
            code: None,
            message: message.into(),
        }
    }
}

/// Result type alias for lifecycle operations.
pub type Result<T> = std::result::Result<T, LifecycleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_api_message_includes_status_and_code() {
        let err = LifecycleError::RemoteApi {
            operation: "CreateGateway",
            status: Some(400),
            code: Some("ValidationException".to_string()),
            message: "name is invalid".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Remote API error: CreateGateway failed (400 ValidationException): name is invalid"
        );
        assert_eq!(err.kind(), ErrorKind::RemoteApi);
    }

    #[test]
    fn orphaned_gateway_is_a_remote_failure() {
        let err = LifecycleError::OrphanedGateway {
            gateway_id: "gw-1".to_string(),
            source: Box::new(LifecycleError::remote("CreateGatewayTarget", "boom")),
        };
        assert_eq!(err.kind(), ErrorKind::RemoteApi);
        assert!(err.to_string().contains("gw-1"));
    }
}
