//! Operation catalogue: one `Request`/`Response` variant per RPC.
use crate::*;

#[derive(Debug, Clone, Default)]
pub struct HealthCheckRequest {}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HealthCheckResponse {}

#[derive(Debug, Clone, Default)]
pub struct EchoRequest {
    pub msg: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EchoResponse {
    pub msg: String,
}

/// Identifying fields a request exposes to routing and logging.
///
/// Implementations must never return secret material.
pub trait RequestMeta {
    /// Provider scope, or `None` for provider-independent operations.
    fn identity(&self) -> Option<&ProviderIdentity>;

    /// Primary resource the request acts on (cluster, volume, ...).
    fn subject(&self) -> Option<&str> {
        None
    }
}

macro_rules! request_meta {
    ($($req:ty => $subject:ident),* $(,)?) => {
        $(
            impl RequestMeta for $req {
                fn identity(&self) -> Option<&ProviderIdentity> {
                    Some(&self.identity)
                }

                fn subject(&self) -> Option<&str> {
                    request_meta!(@subject self, $subject)
                }
            }
        )*
    };
    (@subject $self:ident, none) => { None };
    (@subject $self:ident, $field:ident) => { Some($self.$field.as_str()) };
}

request_meta! {
    CreateClusterRequest => cluster_name,
    GetClusterRequest => cluster_name,
    GetClustersRequest => none,
    ClusterStatusRequest => cluster_name,
    DeleteClusterRequest => cluster_name,
    AddNodeRequest => cluster_name,
    DeleteNodeRequest => node_group,
    TagNodeInstanceRequest => node_group,
    CreateVolumeRequest => volume_type,
    GetVolumeRequest => volume_id,
    DeleteVolumeRequest => volume_id,
    CreateSnapshotRequest => volume_id,
    DeleteSnapshotRequest => snapshot_id,
    CreateSnapshotAndDeleteRequest => volume_id,
    CopySnapshotRequest => snapshot_id,
    AddTokenRequest => cluster_name,
    GetTokenRequest => cluster_name,
    AddRoute53RecordRequest => record_name,
    CreateRoute53RecordsRequest => none,
    GetRoute53TxtRecordsRequest => none,
    DeleteRoute53RecordsRequest => none,
    RegisterWithRancherRequest => cluster_name,
    RegisterClusterOidcRequest => cluster_name,
    GetWorkspacesCostRequest => none,
    GetApplicationsCostRequest => none,
    GetCostByTimeRequest => none,
    GetContainerRegistryAuthRequest => none,
    CreateContainerRegistryRepoRequest => name,
    PresignS3UrlRequest => bucket,
}

impl RequestMeta for HealthCheckRequest {
    fn identity(&self) -> Option<&ProviderIdentity> {
        None
    }
}

impl RequestMeta for EchoRequest {
    fn identity(&self) -> Option<&ProviderIdentity> {
        None
    }
}

impl RequestMeta for ReadCredentialRequest {
    fn identity(&self) -> Option<&ProviderIdentity> {
        None
    }

    fn subject(&self) -> Option<&str> {
        Some(self.account.as_str())
    }
}

impl RequestMeta for WriteCredentialRequest {
    fn identity(&self) -> Option<&ProviderIdentity> {
        None
    }

    fn subject(&self) -> Option<&str> {
        Some(self.account.as_str())
    }
}

macro_rules! operations {
    ($($variant:ident => $name:literal, $req:ty, $resp:ty;)*) => {
        /// Name of a neutral operation.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Operation {
            $($variant,)*
        }

        impl Operation {
            /// Every operation in RPC declaration order.
            pub const ALL: &'static [Operation] = &[$(Operation::$variant,)*];

            /// RPC method name.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Operation::$variant => $name,)*
                }
            }

            /// Look an operation up by RPC method name.
            pub fn from_name(name: &str) -> Option<Self> {
                Self::ALL.iter().copied().find(|op| op.as_str() == name)
            }
        }

        impl std::fmt::Display for Operation {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        /// Neutral request tagged by operation.
        #[derive(Debug, Clone)]
        pub enum Request {
            $($variant($req),)*
        }

        impl Request {
            pub fn operation(&self) -> Operation {
                match self {
                    $(Request::$variant(_) => Operation::$variant,)*
                }
            }

            fn meta(&self) -> &dyn RequestMeta {
                match self {
                    $(Request::$variant(r) => r,)*
                }
            }
        }

        /// Neutral response tagged by operation.
        #[derive(Debug, Clone)]
        pub enum Response {
            $($variant($resp),)*
        }

        impl Response {
            pub fn operation(&self) -> Operation {
                match self {
                    $(Response::$variant(_) => Operation::$variant,)*
                }
            }
        }

        $(
            impl From<$req> for Request {
                fn from(r: $req) -> Self {
                    Request::$variant(r)
                }
            }

            impl From<$resp> for Response {
                fn from(r: $resp) -> Self {
                    Response::$variant(r)
                }
            }

            impl TryFrom<Response> for $resp {
                type Error = ModelError;

                fn try_from(r: Response) -> Result<Self, Self::Error> {
                    match r {
                        Response::$variant(v) => Ok(v),
                        other => Err(ModelError::UnexpectedResponse {
                            expected: $name,
                            actual: other.operation().as_str(),
                        }),
                    }
                }
            }
        )*
    };
}

operations! {
    HealthCheck => "HealthCheck", HealthCheckRequest, HealthCheckResponse;
    Echo => "Echo", EchoRequest, EchoResponse;
    CreateCluster => "CreateCluster", CreateClusterRequest, CreateClusterResponse;
    GetCluster => "GetCluster", GetClusterRequest, GetClusterResponse;
    GetClusters => "GetClusters", GetClustersRequest, GetClustersResponse;
    ClusterStatus => "ClusterStatus", ClusterStatusRequest, ClusterStatusResponse;
    DeleteCluster => "DeleteCluster", DeleteClusterRequest, DeleteClusterResponse;
    AddNode => "AddNode", AddNodeRequest, AddNodeResponse;
    DeleteNode => "DeleteNode", DeleteNodeRequest, DeleteNodeResponse;
    TagNodeInstance => "TagNodeInstance", TagNodeInstanceRequest, TagNodeInstanceResponse;
    CreateVolume => "CreateVolume", CreateVolumeRequest, CreateVolumeResponse;
    GetVolume => "GetVolume", GetVolumeRequest, GetVolumeResponse;
    DeleteVolume => "DeleteVolume", DeleteVolumeRequest, DeleteVolumeResponse;
    CreateSnapshot => "CreateSnapshot", CreateSnapshotRequest, CreateSnapshotResponse;
    DeleteSnapshot => "DeleteSnapshot", DeleteSnapshotRequest, DeleteSnapshotResponse;
    CreateSnapshotAndDelete => "CreateSnapshotAndDelete", CreateSnapshotAndDeleteRequest, CreateSnapshotAndDeleteResponse;
    CopySnapshot => "CopySnapshot", CopySnapshotRequest, CopySnapshotResponse;
    AddToken => "AddToken", AddTokenRequest, AddTokenResponse;
    GetToken => "GetToken", GetTokenRequest, GetTokenResponse;
    AddRoute53Record => "AddRoute53Record", AddRoute53RecordRequest, AddRoute53RecordResponse;
    CreateRoute53Records => "CreateRoute53Records", CreateRoute53RecordsRequest, CreateRoute53RecordsResponse;
    GetRoute53TxtRecords => "GetRoute53TXTRecords", GetRoute53TxtRecordsRequest, GetRoute53TxtRecordsResponse;
    DeleteRoute53Records => "DeleteRoute53Records", DeleteRoute53RecordsRequest, DeleteRoute53RecordsResponse;
    RegisterWithRancher => "RegisterWithRancher", RegisterWithRancherRequest, RegisterWithRancherResponse;
    RegisterClusterOidc => "RegisterClusterOIDC", RegisterClusterOidcRequest, RegisterClusterOidcResponse;
    GetWorkspacesCost => "GetWorkspacesCost", GetWorkspacesCostRequest, GetWorkspacesCostResponse;
    GetApplicationsCost => "GetApplicationsCost", GetApplicationsCostRequest, GetApplicationsCostResponse;
    GetCostByTime => "GetCostByTime", GetCostByTimeRequest, GetCostByTimeResponse;
    ReadCredential => "ReadCredential", ReadCredentialRequest, ReadCredentialResponse;
    WriteCredential => "WriteCredential", WriteCredentialRequest, WriteCredentialResponse;
    GetContainerRegistryAuth => "GetContainerRegistryAuth", GetContainerRegistryAuthRequest, GetContainerRegistryAuthResponse;
    CreateContainerRegistryRepo => "CreateContainerRegistryRepo", CreateContainerRegistryRepoRequest, CreateContainerRegistryRepoResponse;
    PresignS3Url => "PresignS3Url", PresignS3UrlRequest, PresignS3UrlResponse;
}

impl Request {
    /// Provider scope of the request, `None` for provider-independent operations.
    pub fn identity(&self) -> Option<&ProviderIdentity> {
        self.meta().identity()
    }

    /// Primary resource name, used for logging.
    pub fn subject(&self) -> Option<&str> {
        self.meta().subject()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_names_round_trip() {
        for op in Operation::ALL {
            assert_eq!(Operation::from_name(op.as_str()), Some(*op));
        }
        assert_eq!(Operation::ALL.len(), 33);
        assert_eq!(Operation::GetRoute53TxtRecords.as_str(), "GetRoute53TXTRecords");
        assert_eq!(Operation::from_name("Nope"), None);
    }

    #[test]
    fn request_exposes_identity_and_subject() {
        let req: Request = DeleteClusterRequest {
            identity: ProviderIdentity::new("aws", "us-west-2", "team"),
            cluster_name: "c1".into(),
            force_delete: false,
        }
        .into();

        assert_eq!(req.operation(), Operation::DeleteCluster);
        assert_eq!(req.identity().map(|i| i.region.as_str()), Some("us-west-2"));
        assert_eq!(req.subject(), Some("c1"));

        let health: Request = HealthCheckRequest {}.into();
        assert!(health.identity().is_none());
    }

    #[test]
    fn response_conversion_checks_variant() {
        let resp: Response = EchoResponse { msg: "hi".into() }.into();
        let echo = EchoResponse::try_from(resp.clone()).unwrap();
        assert_eq!(echo.msg, "hi");

        let err = HealthCheckResponse::try_from(resp).unwrap_err();
        assert!(matches!(
            err,
            ModelError::UnexpectedResponse {
                expected: "HealthCheck",
                actual: "Echo"
            }
        ));
    }
}
