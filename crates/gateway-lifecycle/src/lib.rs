//! Provision and tear down AgentCore gateways.
//!
//! A gateway is created together with one Lambda-backed target, and its identity is
//! written to a local record so later runs can delete it without repeating the id.
//! Deleting removes every target first, then the gateway, then the matching record.
//!
//! The control plane and parameter store sit behind the [`ControlPlane`] and
//! [`ParameterStore`] traits; [`AgentCoreControlClient`] and [`SsmParameterStore`]
//! are the SigV4-signed HTTP implementations.

pub mod api;
pub mod api_spec;
pub mod config;
pub mod error;
pub mod manager;
pub mod model;
pub mod params;
pub mod sigv4;

pub use api::{AgentCoreControlClient, ControlPlane};
pub use config::RecordStore;
pub use error::{ErrorKind, LifecycleError, Result};
pub use manager::{GatewayLifecycle, LifecycleSettings};
pub use model::{DeleteReport, GatewayRecord, ProvisionedGateway};
pub use params::{ParameterKeys, ParameterStore, SsmParameterStore};
pub use sigv4::{AwsCredentials, SigV4Signer};
