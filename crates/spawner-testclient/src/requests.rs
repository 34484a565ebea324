//! Canned requests for manual runs against a spawner service.
use std::collections::HashMap;

use spawner_api::proto;

pub const CLUSTER_NAME: &str = "gcp-cluster-test-3";
pub const REGION: &str = "us-west-2";
pub const PROVIDER: &str = "aws";
pub const NODE_NAME: &str = "add-node-2";
pub const INSTANCE: &str = "e2-medium";
pub const VOLUME_NAME: &str = "vol-50-20220607164454";
pub const ACCOUNT_NAME: &str = "netbook-aws";

const COST_ACCOUNT: &str = "netbook-aws-dev";
const COST_IDS: [&str; 3] = [
    "d1411352-c14a-4a78-a1d6-44d4c199ba3a",
    "18638c97-7352-426e-a79e-241956188fed",
    "dceaf501-1775-4339-ba7b-ec6d98569d11",
];

fn labels<const N: usize>(pairs: [(&str, &str); N]) -> HashMap<String, String> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn create_cluster() -> proto::CreateClusterRequest {
    proto::CreateClusterRequest {
        provider: PROVIDER.into(),
        region: REGION.into(),
        account_name: ACCOUNT_NAME.into(),
        cluster_name: CLUSTER_NAME.into(),
        node: Some(proto::NodeSpec {
            name: NODE_NAME.into(),
            instance: INSTANCE.into(),
            disk_size_gb: 30,
            ..Default::default()
        }),
        labels: labels([("user", "dev-tester")]),
    }
}

pub fn get_cluster() -> proto::GetClusterRequest {
    proto::GetClusterRequest {
        provider: PROVIDER.into(),
        region: REGION.into(),
        account_name: ACCOUNT_NAME.into(),
        cluster_name: CLUSTER_NAME.into(),
    }
}

pub fn get_clusters() -> proto::GetClustersRequest {
    proto::GetClustersRequest {
        provider: PROVIDER.into(),
        region: REGION.into(),
        account_name: ACCOUNT_NAME.into(),
    }
}

pub fn cluster_status() -> proto::ClusterStatusRequest {
    proto::ClusterStatusRequest {
        provider: PROVIDER.into(),
        region: REGION.into(),
        account_name: ACCOUNT_NAME.into(),
        cluster_name: CLUSTER_NAME.into(),
    }
}

pub fn delete_cluster() -> proto::DeleteClusterRequest {
    proto::DeleteClusterRequest {
        provider: PROVIDER.into(),
        region: REGION.into(),
        account_name: ACCOUNT_NAME.into(),
        cluster_name: CLUSTER_NAME.into(),
        force_delete: true,
    }
}

pub fn add_node() -> proto::AddNodeRequest {
    proto::AddNodeRequest {
        provider: PROVIDER.into(),
        region: REGION.into(),
        account_name: ACCOUNT_NAME.into(),
        cluster_name: CLUSTER_NAME.into(),
        node: Some(proto::NodeSpec {
            name: NODE_NAME.into(),
            instance: INSTANCE.into(),
            machine_type: "m".into(),
            count: 5,
            disk_size_gb: 20,
            capacity_type: proto::CapacityType::OnDemand as i32,
            spot_instances: vec!["t2.small".into(), "t3.small".into()],
            gpu_enabled: false,
            mig_profile: "MIG3g".into(),
            labels: labels([
                ("cluster-name", CLUSTER_NAME),
                ("node-name", NODE_NAME),
                ("user", "dev-tester"),
                ("workspaceid", "dev-tester"),
            ]),
        }),
    }
}

pub fn delete_node() -> proto::DeleteNodeRequest {
    proto::DeleteNodeRequest {
        provider: PROVIDER.into(),
        region: REGION.into(),
        account_name: ACCOUNT_NAME.into(),
        cluster_name: CLUSTER_NAME.into(),
        node_group: NODE_NAME.into(),
    }
}

pub fn tag_node_instance() -> proto::TagNodeInstanceRequest {
    proto::TagNodeInstanceRequest {
        provider: PROVIDER.into(),
        region: REGION.into(),
        account_name: ACCOUNT_NAME.into(),
        cluster_name: CLUSTER_NAME.into(),
        node_group: NODE_NAME.into(),
        labels: labels([("label1", "valuelabel1")]),
    }
}

pub fn add_token() -> proto::AddTokenRequest {
    proto::AddTokenRequest {
        provider: PROVIDER.into(),
        region: REGION.into(),
        account_name: ACCOUNT_NAME.into(),
        cluster_name: CLUSTER_NAME.into(),
    }
}

pub fn get_token() -> proto::GetTokenRequest {
    proto::GetTokenRequest {
        provider: PROVIDER.into(),
        region: REGION.into(),
        account_name: ACCOUNT_NAME.into(),
        cluster_name: CLUSTER_NAME.into(),
    }
}

pub fn register_with_rancher() -> proto::RegisterWithRancherRequest {
    proto::RegisterWithRancherRequest {
        provider: PROVIDER.into(),
        region: REGION.into(),
        account_name: ACCOUNT_NAME.into(),
        cluster_name: CLUSTER_NAME.into(),
    }
}

pub fn register_cluster_oidc() -> proto::RegisterClusterOidcRequest {
    proto::RegisterClusterOidcRequest {
        provider: PROVIDER.into(),
        region: REGION.into(),
        account_name: ACCOUNT_NAME.into(),
        cluster_name: CLUSTER_NAME.into(),
        ..Default::default()
    }
}

pub fn create_volume() -> proto::CreateVolumeRequest {
    proto::CreateVolumeRequest {
        provider: PROVIDER.into(),
        region: REGION.into(),
        account_name: ACCOUNT_NAME.into(),
        availability_zone: REGION.into(),
        volume_type: "StandardSSD_LRS".into(),
        size_gb: 50,
        snapshot_id: "vol-50-20220607152827-snapshot".into(),
        delete_snapshot: true,
        ..Default::default()
    }
}

pub fn delete_volume() -> proto::DeleteVolumeRequest {
    proto::DeleteVolumeRequest {
        provider: PROVIDER.into(),
        region: REGION.into(),
        account_name: ACCOUNT_NAME.into(),
        volume_id: VOLUME_NAME.into(),
    }
}

pub fn create_snapshot() -> proto::CreateSnapshotRequest {
    proto::CreateSnapshotRequest {
        provider: PROVIDER.into(),
        region: REGION.into(),
        account_name: ACCOUNT_NAME.into(),
        volume_id: VOLUME_NAME.into(),
        ..Default::default()
    }
}

pub fn delete_snapshot() -> proto::DeleteSnapshotRequest {
    proto::DeleteSnapshotRequest {
        provider: PROVIDER.into(),
        region: REGION.into(),
        account_name: ACCOUNT_NAME.into(),
        snapshot_id: format!("{VOLUME_NAME}-snapshot"),
    }
}

pub fn create_snapshot_and_delete() -> proto::CreateSnapshotAndDeleteRequest {
    proto::CreateSnapshotAndDeleteRequest {
        provider: PROVIDER.into(),
        region: REGION.into(),
        account_name: ACCOUNT_NAME.into(),
        volume_id: VOLUME_NAME.into(),
        ..Default::default()
    }
}

pub fn copy_snapshot() -> proto::CopySnapshotRequest {
    proto::CopySnapshotRequest {
        provider: PROVIDER.into(),
        region: REGION.into(),
        account_name: ACCOUNT_NAME.into(),
        snapshot_id: "snap-001c9501528bc1a33".into(),
        ..Default::default()
    }
}

pub fn add_route53_record() -> proto::AddRoute53RecordRequest {
    proto::AddRoute53RecordRequest {
        provider: PROVIDER.into(),
        account_name: ACCOUNT_NAME.into(),
        dns_name: "20.85.85.202".into(),
        record_name: "*.1117907260.eastus2.azure.app.dev.netbook.ai".into(),
        ..Default::default()
    }
}

fn txt_records() -> Vec<proto::DnsRecordSet> {
    vec![proto::DnsRecordSet {
        r#type: "TXT".into(),
        name: "ash1234.app.dev.netbook.ai".into(),
        values: vec!["test1".into(), "test2".into()],
        ttl_seconds: 250,
    }]
}

pub fn create_route53_records() -> proto::CreateRoute53RecordsRequest {
    proto::CreateRoute53RecordsRequest {
        provider: PROVIDER.into(),
        account_name: ACCOUNT_NAME.into(),
        records: txt_records(),
        ..Default::default()
    }
}

pub fn get_route53_txt_records() -> proto::GetRoute53TxtRecordsRequest {
    proto::GetRoute53TxtRecordsRequest {
        provider: PROVIDER.into(),
        account_name: ACCOUNT_NAME.into(),
        ..Default::default()
    }
}

pub fn delete_route53_records() -> proto::DeleteRoute53RecordsRequest {
    proto::DeleteRoute53RecordsRequest {
        provider: PROVIDER.into(),
        account_name: ACCOUNT_NAME.into(),
        records: txt_records(),
        ..Default::default()
    }
}

fn group_by_workspace() -> Option<proto::GroupBy> {
    Some(proto::GroupBy {
        r#type: "TAG".into(),
        key: "workspaceid".into(),
    })
}

fn cost_ids() -> Vec<String> {
    COST_IDS.iter().map(|s| s.to_string()).collect()
}

pub fn get_workspaces_cost() -> proto::GetWorkspacesCostRequest {
    proto::GetWorkspacesCostRequest {
        provider: PROVIDER.into(),
        account_name: COST_ACCOUNT.into(),
        workspace_ids: cost_ids(),
        start_date: "2022-04-01".into(),
        end_date: "2022-05-01".into(),
        granularity: "DAILY".into(),
        cost_type: "BlendedCost".into(),
        group_by: group_by_workspace(),
        ..Default::default()
    }
}

pub fn get_applications_cost() -> proto::GetApplicationsCostRequest {
    proto::GetApplicationsCostRequest {
        provider: PROVIDER.into(),
        account_name: COST_ACCOUNT.into(),
        application_ids: cost_ids(),
        start_date: "2022-04-01".into(),
        end_date: "2022-05-01".into(),
        granularity: "DAILY".into(),
        cost_type: "BlendedCost".into(),
        group_by: group_by_workspace(),
        ..Default::default()
    }
}

pub fn get_cost_by_time() -> proto::GetCostByTimeRequest {
    proto::GetCostByTimeRequest {
        provider: PROVIDER.into(),
        account_name: COST_ACCOUNT.into(),
        ids: cost_ids(),
        start_date: "2022-04-01".into(),
        end_date: "2022-05-01".into(),
        granularity: "DAILY".into(),
        group_by: group_by_workspace(),
        ..Default::default()
    }
}

pub fn read_credential(account: &str, kind: &str) -> proto::ReadCredentialRequest {
    proto::ReadCredentialRequest {
        account: account.into(),
        r#type: kind.into(),
    }
}

pub fn write_credential_aws() -> proto::WriteCredentialRequest {
    proto::WriteCredentialRequest {
        account: "alexis".into(),
        r#type: "aws".into(),
        cred: Some(proto::write_credential_request::Cred::AwsCred(
            proto::AwsCredentials {
                access_key_id: "access_id".into(),
                secret_access_key: "secret_key".into(),
                session_token: "token".into(),
            },
        )),
    }
}

pub fn write_credential_azure() -> proto::WriteCredentialRequest {
    proto::WriteCredentialRequest {
        account: "alex".into(),
        r#type: "azure".into(),
        cred: Some(proto::write_credential_request::Cred::AzureCred(
            proto::AzureCredentials {
                subscription_id: "subscription".into(),
                tenant_id: "tenant_id".into(),
                client_id: "client_id".into(),
                client_secret: "client_secret".into(),
                resource_group: "resource_group".into(),
            },
        )),
    }
}

pub fn write_credential_git_pat() -> proto::WriteCredentialRequest {
    proto::WriteCredentialRequest {
        account: "nsp-dev".into(),
        r#type: "git-pat".into(),
        cred: Some(proto::write_credential_request::Cred::GitPat(
            proto::GitPersonalAccessToken {
                token: "this-is-very-secret-token-thats-why-you-see-this-message-when-reading"
                    .into(),
            },
        )),
    }
}

pub fn get_container_registry_auth() -> proto::GetContainerRegistryAuthRequest {
    proto::GetContainerRegistryAuthRequest {
        provider: PROVIDER.into(),
        region: REGION.into(),
        account_name: ACCOUNT_NAME.into(),
    }
}

pub fn create_container_registry_repo() -> proto::CreateContainerRegistryRepoRequest {
    proto::CreateContainerRegistryRepoRequest {
        provider: PROVIDER.into(),
        region: REGION.into(),
        account_name: ACCOUNT_NAME.into(),
        name: "nsp-test-2".into(),
        ..Default::default()
    }
}

pub fn presign_s3_url() -> proto::PresignS3UrlRequest {
    proto::PresignS3UrlRequest {
        provider: PROVIDER.into(),
        region: REGION.into(),
        account_name: ACCOUNT_NAME.into(),
        bucket: "nishanth-test".into(),
        file: "/hello.txt".into(),
        ..Default::default()
    }
}
