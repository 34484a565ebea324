//! The tonic service over the full facade and the sandbox cloud.
use std::{collections::HashMap, sync::Arc, time::Duration};

use spawner_api::{
    SpawnerApiService, SpawnerServiceClient, SpawnerServiceServer,
    client::{GrpcSweep, traced},
    proto::{self, spawner_service_server::SpawnerService},
};
use spawner_core::{
    Dispatcher, ErrorKind, Facade, PollConfig, ServiceContext, facade, noop_metrics,
    secrets::MemorySecretStore,
    session::{CredentialSessionFactory, SecretStoreResolver},
    sweep::delete_all_clusters,
};
use spawner_model::ProviderIdentity;
use spawner_providers::{
    AdapterDeps,
    aws::AwsSettings,
    sandbox::{SandboxCloud, SandboxRancher},
};
use tonic::{Code, Request};

const SECRET_REGION: &str = "us-east-1";

struct Stack {
    cloud: SandboxCloud,
    service: ServiceContext,
    api: SpawnerApiService<Facade>,
}

fn stack() -> Stack {
    let cloud = SandboxCloud::default();
    let secrets = Arc::new(MemorySecretStore::new());
    let resolver = Arc::new(SecretStoreResolver::new(secrets.clone()));
    let service = ServiceContext::new("test", noop_metrics());

    let deps = AdapterDeps {
        service: service.clone(),
        sessions: Arc::new(CredentialSessionFactory::new(resolver, SECRET_REGION)),
        secrets: secrets.clone(),
        rancher: Arc::new(SandboxRancher::new("https://rancher.sandbox")),
        poll: PollConfig::new(Duration::from_millis(1)),
        secret_host_region: SECRET_REGION.to_string(),
    };
    let registry = spawner_providers::registry(
        deps,
        cloud.aws.clone(),
        cloud.azure.clone(),
        cloud.gcp.clone(),
        AwsSettings {
            hosted_zone_id: "Z0SANDBOX".into(),
        },
    );
    let dispatcher = Dispatcher::new(registry, secrets, SECRET_REGION);
    let api = SpawnerApiService::new(Arc::new(facade(dispatcher, service.clone())));

    Stack {
        cloud,
        service,
        api,
    }
}

fn aws_cred() -> proto::write_credential_request::Cred {
    proto::write_credential_request::Cred::AwsCred(proto::AwsCredentials {
        access_key_id: "AKIASANDBOX".into(),
        secret_access_key: "secret_key".into(),
        session_token: String::new(),
    })
}

async fn seed_aws(api: &SpawnerApiService<Facade>, account: &str) {
    api.write_credential(Request::new(proto::WriteCredentialRequest {
        account: account.into(),
        r#type: "aws".into(),
        cred: Some(aws_cred()),
    }))
    .await
    .unwrap();
}

fn create_cluster(name: &str) -> proto::CreateClusterRequest {
    proto::CreateClusterRequest {
        provider: "aws".into(),
        region: "us-west-2".into(),
        account_name: "team".into(),
        cluster_name: name.into(),
        node: Some(proto::NodeSpec {
            name: "pool-a".into(),
            instance: "t3.medium".into(),
            disk_size_gb: 30,
            ..Default::default()
        }),
        labels: HashMap::from([("user".to_string(), "dev-tester".to_string())]),
    }
}

#[tokio::test]
async fn health_and_echo_need_no_provider() {
    let s = stack();
    s.api
        .health_check(Request::new(proto::HealthCheckRequest {}))
        .await
        .unwrap();

    let echoed = s
        .api
        .echo(traced(
            proto::EchoRequest {
                msg: "hello spawner".into(),
            },
            "cafebabe-345678",
        ))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(echoed.msg, "hello spawner");
    assert_eq!(s.service.operations(), 2);
}

#[tokio::test]
async fn credentials_round_trip_through_the_secret_store() {
    let s = stack();
    s.api
        .write_credential(Request::new(proto::WriteCredentialRequest {
            account: "nsp-dev".into(),
            r#type: "git-pat".into(),
            cred: Some(proto::write_credential_request::Cred::GitPat(
                proto::GitPersonalAccessToken {
                    token: "very-secret-token".into(),
                },
            )),
        }))
        .await
        .unwrap();

    let read = s
        .api
        .read_credential(Request::new(proto::ReadCredentialRequest {
            account: "nsp-dev".into(),
            r#type: "git-pat".into(),
        }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(read.r#type, "git-pat");
    match read.cred {
        Some(proto::read_credential_response::Cred::GitPat(t)) => {
            assert_eq!(t.token, "very-secret-token")
        }
        other => panic!("unexpected credentials: {other:?}"),
    }

    let missing = s
        .api
        .read_credential(Request::new(proto::ReadCredentialRequest {
            account: "nsp-dev".into(),
            r#type: "aws".into(),
        }))
        .await
        .unwrap_err();
    assert_eq!(missing.code(), Code::NotFound);
}

#[tokio::test]
async fn cluster_calls_without_credentials_are_unauthenticated() {
    let s = stack();
    let err = s.api.create_cluster(Request::new(create_cluster("c1"))).await.unwrap_err();
    assert_eq!(err.code(), Code::Unauthenticated);
}

#[tokio::test]
async fn cluster_lifecycle_over_the_service() {
    let s = stack();
    seed_aws(&s.api, "team").await;

    let created = s
        .api
        .create_cluster(Request::new(create_cluster("c1")))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(created.cluster_name, "c1");

    let status = s
        .api
        .cluster_status(Request::new(proto::ClusterStatusRequest {
            provider: "aws".into(),
            region: "us-west-2".into(),
            account_name: "team".into(),
            cluster_name: "c1".into(),
        }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(status.status, proto::ClusterStatus::Active as i32);

    let got = s
        .api
        .get_cluster(Request::new(proto::GetClusterRequest {
            provider: "aws".into(),
            region: "us-west-2".into(),
            account_name: "team".into(),
            cluster_name: "c1".into(),
        }))
        .await
        .unwrap()
        .into_inner();
    let cluster = got.cluster.unwrap();
    assert_eq!(cluster.nodes.len(), 1);
    assert_eq!(cluster.nodes[0].name, "pool-a");

    let delete = || proto::DeleteClusterRequest {
        provider: "aws".into(),
        region: "us-west-2".into(),
        account_name: "team".into(),
        cluster_name: "c1".into(),
        force_delete: true,
    };
    s.api.delete_cluster(Request::new(delete())).await.unwrap();
    for _ in 0..2 {
        let err = s.api.delete_cluster(Request::new(delete())).await.unwrap_err();
        assert_eq!(err.code(), Code::NotFound);
    }
}

#[tokio::test]
async fn early_tagging_is_a_failed_precondition() {
    let s = stack();
    seed_aws(&s.api, "team").await;
    s.api
        .create_cluster(Request::new(create_cluster("c1")))
        .await
        .unwrap();
    s.api
        .add_node(Request::new(proto::AddNodeRequest {
            provider: "aws".into(),
            region: "us-west-2".into(),
            account_name: "team".into(),
            cluster_name: "c1".into(),
            node: Some(proto::NodeSpec {
                name: "add-node-2".into(),
                machine_type: "m".into(),
                count: 2,
                ..Default::default()
            }),
        }))
        .await
        .unwrap();

    let tag = || proto::TagNodeInstanceRequest {
        provider: "aws".into(),
        region: "us-west-2".into(),
        account_name: "team".into(),
        cluster_name: "c1".into(),
        node_group: "add-node-2".into(),
        labels: HashMap::from([("label1".to_string(), "valuelabel1".to_string())]),
    };
    let err = s.api.tag_node_instance(Request::new(tag())).await.unwrap_err();
    assert_eq!(err.code(), Code::FailedPrecondition);

    let tagged = s
        .api
        .tag_node_instance(Request::new(tag()))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(tagged.instance_ids.len(), 2);
}

#[tokio::test]
async fn malformed_requests_are_invalid_arguments() {
    let s = stack();

    let mut no_node = create_cluster("c1");
    no_node.node = None;
    let err = s.api.create_cluster(Request::new(no_node)).await.unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);

    let mut unknown = create_cluster("c1");
    unknown.provider = "openstack".into();
    let err = s.api.create_cluster(Request::new(unknown)).await.unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);

    let err = s
        .api
        .get_workspaces_cost(Request::new(proto::GetWorkspacesCostRequest {
            provider: "aws".into(),
            account_name: "team".into(),
            start_date: "2022-04-01".into(),
            end_date: "2022-05-01".into(),
            granularity: "HOURLY".into(),
            ..Default::default()
        }))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
}

#[tokio::test]
async fn unsupported_operations_are_unimplemented() {
    let s = stack();
    let err = s
        .api
        .get_volume(Request::new(proto::GetVolumeRequest {
            provider: "gcp".into(),
            region: "us-central1".into(),
            account_name: "team".into(),
            volume_id: "disk-1".into(),
        }))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::Unimplemented);
}

#[tokio::test]
async fn sweep_over_the_wire_reports_every_cluster() {
    let s = stack();
    seed_aws(&s.api, "team").await;
    for name in ["a", "b", "c"] {
        s.api
            .create_cluster(Request::new(create_cluster(name)))
            .await
            .unwrap();
    }
    s.cloud.aws.fail_cluster_delete("b");

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let api = s.api;
    tokio::spawn(async move {
        tonic::transport::Server::builder()
            .add_service(SpawnerServiceServer::new(api))
            .serve_with_incoming(tokio_stream::wrappers::TcpListenerStream::new(listener))
            .await
    });

    let client = SpawnerServiceClient::connect(format!("http://{addr}"))
        .await
        .unwrap();
    let sweep = GrpcSweep::new(client, "sweep-test");
    let identity = ProviderIdentity::new("aws", "us-west-2", "team");

    let items = delete_all_clusters(&sweep, &identity).await.unwrap();
    let names: Vec<_> = items.iter().map(|i| i.cluster.as_str()).collect();
    assert_eq!(names, ["a", "b", "c"]);
    assert!(items[0].result.is_ok());
    assert_eq!(
        items[1].result.as_ref().unwrap_err().kind(),
        ErrorKind::Provider
    );
    assert!(items[2].result.is_ok());
}
