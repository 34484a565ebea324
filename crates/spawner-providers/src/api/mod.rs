//! Provider-native API surfaces.
//!
//! Each trait mirrors the subset of one cloud SDK the adapters call. The
//! sandbox cloud implements all three; SDK-backed clients plug in behind the
//! same traits.
pub mod aws;
pub mod azure;
pub mod gcp;

pub use aws::AwsApi;
pub use azure::AzureApi;
pub use gcp::GcpApi;

use async_trait::async_trait;
use spawner_core::Session;
use spawner_model::{Granularity, Secret};

use crate::fault::ApiResult;

/// Kubernetes API access of a cluster.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KubeAccess {
    pub endpoint: String,
    pub ca_data: String,
    pub token: Secret,
}

/// Poll result of an asynchronous provider operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationState {
    pub done: bool,
    /// Provider error the operation finished with.
    pub error: Option<String>,
    pub http_status: Option<u16>,
}

/// Resource id plus the operation that is still materializing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accepted {
    pub resource_id: String,
    pub operation: String,
}

/// Operation-handle polling shared by the clouds that return handles.
#[async_trait]
pub trait OperationApi: Send + Sync + 'static {
    async fn poll_operation(&self, session: &Session, operation: &str) -> ApiResult<OperationState>;
}

/// Cost query in provider-neutral terms.
#[derive(Debug, Clone, PartialEq)]
pub struct CostInput {
    pub start: String,
    pub end: String,
    pub granularity: Granularity,
    pub metric: String,
    /// Tag key the results are grouped by.
    pub group_key: String,
    /// Tag values to keep; empty keeps all.
    pub ids: Vec<String>,
}

/// Cost of one period, grouped by `"<group_key>$<value>"`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CostPeriod {
    pub start: String,
    pub groups: Vec<(String, f64)>,
}
