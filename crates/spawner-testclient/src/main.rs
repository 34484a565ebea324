mod requests;

use std::time::Duration;

use anyhow::{Context, bail};
use base64::Engine;
use clap::Parser;
use tonic::transport::Channel;
use tracing::{error, info};

use spawner_api::{
    SpawnerServiceClient,
    client::{Client, GrpcSweep, traced},
};
use spawner_core::sweep::{SweepItem, delete_all_clusters};
use spawner_model::ProviderIdentity;
use spawner_observe::{LoggerConfig, LoggerLevel, init_logger};

use crate::requests as req;

const TRACE_ID: &str = "cafebabe-345678-xcvbn-345678-QWDFVBNJI";

/// Calls one spawner RPC with a canned request and logs the response.
#[derive(Debug, Parser)]
#[command(name = "testclient", about = "Exercise a running spawner service")]
struct Args {
    /// gRPC address of spawner; `:8083` means localhost.
    #[arg(long, default_value = "http://127.0.0.1:8083")]
    grpc_addr: String,

    /// RPC to call, e.g. HealthCheck, CreateCluster, DeleteAllClustersInRegion.
    #[arg(long, default_value = "HealthCheck")]
    method: String,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    // 1) logger
    let cfg = LoggerConfig {
        level: LoggerLevel::new("info")?,
        ..Default::default()
    };
    init_logger(&cfg)?;

    // 2) args
    let args = Args::parse();
    let uri = endpoint_uri(&args.grpc_addr)?;

    // 3) connect
    let channel = Channel::from_shared(uri.clone())?
        .connect_timeout(Duration::from_secs(1))
        .connect()
        .await
        .with_context(|| format!("error connecting to {uri}"))?;
    let client = SpawnerServiceClient::new(channel);

    // 4) call
    if let Err(e) = run(client, &args.method).await {
        error!(method = %args.method, error = %e, "call failed");
        return Err(e);
    }
    Ok(())
}

/// Normalize `:8083`, `host:port` and full URIs into a connectable URI.
fn endpoint_uri(addr: &str) -> anyhow::Result<String> {
    let addr = addr.trim();
    if addr.is_empty() {
        bail!("host address is empty");
    }
    if addr.contains("://") {
        return Ok(addr.to_string());
    }
    if addr.starts_with(':') {
        return Ok(format!("http://127.0.0.1{addr}"));
    }
    Ok(format!("http://{addr}"))
}

macro_rules! call {
    ($client:ident.$method:ident($req:expr), $label:literal) => {{
        let resp = $client.$method(traced($req, TRACE_ID)).await?.into_inner();
        info!(response = ?resp, $label);
        resp
    }};
}

async fn run(mut client: Client, method: &str) -> anyhow::Result<()> {
    match method {
        "Echo" => {
            let msg = spawner_api::proto::EchoRequest {
                msg: "hello spawner".into(),
            };
            call!(client.echo(msg), "Echo");
        }
        "HealthCheck" => {
            call!(client.health_check(spawner_api::proto::HealthCheckRequest {}), "HealthCheck");
        }
        "CreateCluster" => {
            call!(client.create_cluster(req::create_cluster()), "CreateCluster");
        }
        "GetCluster" => {
            call!(client.get_cluster(req::get_cluster()), "GetCluster");
        }
        "GetClusters" => {
            call!(client.get_clusters(req::get_clusters()), "GetClusters");
        }
        "ClusterStatus" => {
            call!(client.cluster_status(req::cluster_status()), "ClusterStatus");
        }
        "AddNode" => {
            call!(client.add_node(req::add_node()), "AddNode");
        }
        "DeleteCluster" => {
            call!(client.delete_cluster(req::delete_cluster()), "DeleteCluster");
        }
        "DeleteAllClustersInRegion" => delete_all_in_region(client).await?,
        "DeleteNode" => {
            call!(client.delete_node(req::delete_node()), "DeleteNode");
        }
        "AddTag" => {
            call!(client.tag_node_instance(req::tag_node_instance()), "TagNodeInstance");
        }
        "AddToken" => {
            call!(client.add_token(req::add_token()), "AddToken");
        }
        "GetToken" => {
            let resp = call!(client.get_token(req::get_token()), "GetToken");
            let ca = base64::engine::general_purpose::STANDARD.encode(resp.ca_data.as_bytes());
            info!(ca = %ca, "base64 token");
        }
        "CreateVolume" => {
            call!(client.create_volume(req::create_volume()), "CreateVolume");
        }
        "DeleteVolume" => {
            call!(client.delete_volume(req::delete_volume()), "DeleteVolume");
        }
        "CreateSnapshot" => {
            call!(client.create_snapshot(req::create_snapshot()), "CreateSnapshot");
        }
        "DeleteSnapshot" => {
            call!(client.delete_snapshot(req::delete_snapshot()), "DeleteSnapshot");
        }
        "CreateSnapshotAndDelete" => {
            call!(
                client.create_snapshot_and_delete(req::create_snapshot_and_delete()),
                "CreateSnapshotAndDelete"
            );
        }
        "CopySnapshot" => {
            call!(client.copy_snapshot(req::copy_snapshot()), "CopySnapshot");
        }
        "RegisterWithRancher" => {
            call!(client.register_with_rancher(req::register_with_rancher()), "RegisterWithRancher");
        }
        "RegisterClusterOIDC" => {
            call!(client.register_cluster_oidc(req::register_cluster_oidc()), "RegisterClusterOIDC");
        }
        "AddRoute53Record" => {
            call!(client.add_route53_record(req::add_route53_record()), "AddRoute53Record");
        }
        "CreateRoute53Records" => {
            call!(
                client.create_route53_records(req::create_route53_records()),
                "CreateRoute53Records"
            );
        }
        "GetRoute53TXTRecords" => {
            call!(
                client.get_route53_txt_records(req::get_route53_txt_records()),
                "GetRoute53TXTRecords"
            );
        }
        "DeleteRoute53Records" => {
            call!(
                client.delete_route53_records(req::delete_route53_records()),
                "DeleteRoute53Records"
            );
        }
        "GetWorkspacesCost" => {
            call!(client.get_workspaces_cost(req::get_workspaces_cost()), "GetWorkspacesCost");
        }
        "GetApplicationsCost" => {
            call!(
                client.get_applications_cost(req::get_applications_cost()),
                "GetApplicationsCost"
            );
        }
        "GetCostByTime" => {
            call!(client.get_cost_by_time(req::get_cost_by_time()), "GetCostByTime");
        }
        "ReadCredentialAws" => {
            call!(client.read_credential(req::read_credential("alexis", "aws")), "ReadCredential");
        }
        "WriteCredentialAws" => {
            call!(client.write_credential(req::write_credential_aws()), "WriteCredential");
        }
        "ReadCredentialAzure" => {
            call!(
                client.read_credential(req::read_credential("netbook-azure-dev", "azure")),
                "ReadCredential"
            );
        }
        "WriteCredentialAzure" => {
            call!(client.write_credential(req::write_credential_azure()), "WriteCredential");
        }
        "ReadCredentialGitPAT" => {
            call!(client.read_credential(req::read_credential("nsp-dev", "git-pat")), "ReadCredential");
        }
        "WriteCredentialGitPAT" => {
            call!(client.write_credential(req::write_credential_git_pat()), "WriteCredential");
        }
        "GetContainerRegistryAuth" => {
            call!(
                client.get_container_registry_auth(req::get_container_registry_auth()),
                "GetContainerRegistryAuth"
            );
        }
        "CreateContainerRegistryRepo" => {
            call!(
                client.create_container_registry_repo(req::create_container_registry_repo()),
                "CreateContainerRegistryRepo"
            );
        }
        "PresignS3" => {
            let resp = client
                .presign_s3_url(traced(req::presign_s3_url(), TRACE_ID))
                .await?
                .into_inner();
            info!(signed_url = %resp.signed_url, "presigned s3 url");
        }
        other => bail!("invalid method '{other}'"),
    }
    Ok(())
}

/// List every cluster of the canned identity and force-delete each one.
async fn delete_all_in_region(client: Client) -> anyhow::Result<()> {
    let identity = ProviderIdentity::new(req::PROVIDER, req::REGION, req::ACCOUNT_NAME);
    let sweep = GrpcSweep::new(client, TRACE_ID);

    let items = delete_all_clusters(&sweep, &identity)
        .await
        .with_context(|| format!("error getting clusters for {identity}"))?;

    for item in &items {
        match &item.result {
            Ok(()) => info!(cluster = %item.cluster, "cluster deleted"),
            Err(e) if item.is_settled() => {
                info!(cluster = %item.cluster, error = %e, "cluster already gone")
            }
            Err(e) => error!(cluster = %item.cluster, error = %e, "error deleting cluster"),
        }
    }
    let failed = unsettled(&items);
    if failed > 0 {
        bail!("{failed} of {} clusters were not deleted", items.len());
    }
    info!(%identity, clusters = items.len(), "deleted all clusters");
    Ok(())
}

/// Clusters that are neither deleted nor already gone.
fn unsettled(items: &[SweepItem]) -> usize {
    items.iter().filter(|item| !item.is_settled()).count()
}
