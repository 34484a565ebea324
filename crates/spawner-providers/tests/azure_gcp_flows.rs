//! Azure and GCP adapter flows against the sandbox cloud.
mod common;

use common::{Harness, azure_identity, ctx, gcp_identity};
use spawner_core::{ErrorKind, Provider};
use spawner_model::*;

fn create_request(identity: ProviderIdentity, name: &str, class: &str) -> CreateClusterRequest {
    CreateClusterRequest {
        identity,
        cluster_name: name.to_string(),
        node: NodeSpec::new("pool1").with_machine_type(class),
        labels: Labels::from_iter([("workspaceid", "ws1")]),
    }
}

#[tokio::test]
async fn azure_clusters_are_listed_by_location() {
    let h = Harness::new();
    let created = h
        .azure
        .create_cluster(&ctx(), create_request(azure_identity(), "aks1", "s"))
        .await
        .unwrap();
    assert!(created.cluster_id.ends_with("/managedClusters/aks1"));

    let listed = h
        .azure
        .get_clusters(&ctx(), GetClustersRequest { identity: azure_identity() })
        .await
        .unwrap();
    assert_eq!(listed.clusters.len(), 1);
    assert_eq!(listed.clusters[0].name, "aks1");

    let elsewhere = ProviderIdentity::new("azure", "westeurope", "team");
    let listed = h
        .azure
        .get_clusters(&ctx(), GetClustersRequest { identity: elsewhere })
        .await
        .unwrap();
    assert!(listed.clusters.is_empty());

    let status = h
        .azure
        .cluster_status(
            &ctx(),
            ClusterStatusRequest {
                identity: azure_identity(),
                cluster_name: "aks1".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(status.status, ClusterStatus::Active);
}

#[tokio::test]
async fn azure_deleting_missing_pool_is_not_found() {
    let h = Harness::new();
    h.azure
        .create_cluster(&ctx(), create_request(azure_identity(), "aks1", "s"))
        .await
        .unwrap();

    let err = h
        .azure
        .delete_node(
            &ctx(),
            DeleteNodeRequest {
                identity: azure_identity(),
                cluster_name: "aks1".into(),
                node_group: "nope".into(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn azure_force_delete_removes_cluster() {
    let h = Harness::new();
    h.azure
        .create_cluster(&ctx(), create_request(azure_identity(), "aks1", "m"))
        .await
        .unwrap();
    h.azure
        .delete_cluster(
            &ctx(),
            DeleteClusterRequest {
                identity: azure_identity(),
                cluster_name: "aks1".into(),
                force_delete: true,
            },
        )
        .await
        .unwrap();

    let err = h
        .azure
        .get_cluster(
            &ctx(),
            GetClusterRequest {
                identity: azure_identity(),
                cluster_name: "aks1".into(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn azure_volume_from_snapshot_can_drop_the_snapshot() {
    let h = Harness::new();
    let volume = |snapshot: Option<String>, delete_snapshot| CreateVolumeRequest {
        identity: azure_identity(),
        availability_zone: "1".into(),
        volume_type: "Standard_LRS".into(),
        size_gb: 50,
        snapshot_id: snapshot,
        snapshot_uri: None,
        delete_snapshot,
        labels: Labels::new(),
    };

    let first = h.azure.create_volume(&ctx(), volume(None, false)).await.unwrap();
    let snap = h
        .azure
        .create_snapshot(
            &ctx(),
            CreateSnapshotRequest {
                identity: azure_identity(),
                volume_id: first.volume_id.clone(),
                labels: Labels::new(),
            },
        )
        .await
        .unwrap();

    let second = h
        .azure
        .create_volume(&ctx(), volume(Some(snap.snapshot_id.clone()), true))
        .await
        .unwrap();
    let got = h
        .azure
        .get_volume(
            &ctx(),
            GetVolumeRequest {
                identity: azure_identity(),
                volume_id: second.volume_id,
            },
        )
        .await
        .unwrap();
    assert_eq!(got.volume.size_gb, 50);
    assert_eq!(got.volume.source_snapshot.as_deref(), Some(snap.snapshot_id.as_str()));

    let err = h
        .azure
        .delete_snapshot(
            &ctx(),
            DeleteSnapshotRequest {
                identity: azure_identity(),
                snapshot_id: snap.snapshot_id,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn gcp_cluster_registers_with_rancher() {
    let h = Harness::new();
    h.gcp
        .create_cluster(&ctx(), create_request(gcp_identity(), "gke1", "gpu-t4"))
        .await
        .unwrap();

    let got = h
        .gcp
        .get_cluster(
            &ctx(),
            GetClusterRequest {
                identity: gcp_identity(),
                cluster_name: "gke1".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(got.cluster.nodes.len(), 1);
    assert!(got.cluster.nodes[0].gpu_enabled);

    let reg = h
        .gcp
        .register_with_rancher(
            &ctx(),
            RegisterWithRancherRequest {
                identity: gcp_identity(),
                cluster_name: "gke1".into(),
            },
        )
        .await
        .unwrap();
    assert!(reg.cluster_id.starts_with("c-"));
    assert_eq!(h.rancher.imported(), 1);
}

#[tokio::test]
async fn gcp_tagging_waits_for_instances() {
    let h = Harness::new();
    h.gcp
        .create_cluster(&ctx(), create_request(gcp_identity(), "gke1", "s"))
        .await
        .unwrap();
    let req = TagNodeInstanceRequest {
        identity: gcp_identity(),
        cluster_name: "gke1".into(),
        node_group: "pool1".into(),
        labels: Labels::new(),
    };

    let err = h.gcp.tag_node_instance(&ctx(), req.clone()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransientEmptyResult);
    let tagged = h.gcp.tag_node_instance(&ctx(), req).await.unwrap();
    assert_eq!(tagged.instance_ids.len(), 1);
}

#[tokio::test]
async fn gcp_storage_is_unsupported() {
    let h = Harness::new();
    let err = h
        .gcp
        .get_volume(
            &ctx(),
            GetVolumeRequest {
                identity: gcp_identity(),
                volume_id: "disk-1".into(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);
    assert_eq!(h.sessions.calls(), 0);
}

#[tokio::test]
async fn azure_cost_by_time_has_one_point_per_day() {
    let h = Harness::new();
    let resp = h
        .azure
        .get_cost_by_time(
            &ctx(),
            GetCostByTimeRequest {
                identity: azure_identity(),
                query: CostQuery {
                    ids: vec!["ws1".into(), "ws2".into()],
                    start_date: "2024-01-01".into(),
                    end_date: "2024-01-04".into(),
                    granularity: Granularity::Daily,
                    cost_type: String::new(),
                    group_by: GroupBy::default(),
                },
            },
        )
        .await
        .unwrap();
    assert_eq!(resp.series.len(), 2);
    let days: Vec<_> = resp.series["ws1"].keys().cloned().collect();
    assert_eq!(days, ["2024-01-01", "2024-01-02", "2024-01-03"]);
}

async fn created_node(h: &Harness, identity: ProviderIdentity, node: NodeSpec) -> NodeSpec {
    let provider: &dyn Provider = match identity.provider.as_str() {
        "azure" => &*h.azure,
        _ => &*h.gcp,
    };
    provider
        .create_cluster(
            &ctx(),
            CreateClusterRequest {
                identity: identity.clone(),
                cluster_name: "gpu1".into(),
                node,
                labels: Labels::new(),
            },
        )
        .await
        .unwrap();
    let got = provider
        .get_cluster(
            &ctx(),
            GetClusterRequest {
                identity,
                cluster_name: "gpu1".into(),
            },
        )
        .await
        .unwrap();
    got.cluster.nodes.into_iter().next().expect("one node pool")
}

fn partitioned(node: NodeSpec) -> NodeSpec {
    NodeSpec {
        mig_profile: Some(MigProfile::Mig3g),
        ..node
    }
}

#[tokio::test]
async fn azure_partition_applies_only_to_gpu_pools() {
    let h = Harness::new();
    let gpu = created_node(
        &h,
        azure_identity(),
        partitioned(NodeSpec::new("pool1").with_machine_type("gpu-a100")),
    )
    .await;
    assert!(gpu.gpu_enabled);
    assert_eq!(gpu.mig_profile, Some(MigProfile::Mig3g));

    let h = Harness::new();
    let plain = created_node(
        &h,
        azure_identity(),
        partitioned(NodeSpec::new("pool1").with_machine_type("m")),
    )
    .await;
    assert!(!plain.gpu_enabled);
    assert_eq!(plain.mig_profile, None);
}

#[tokio::test]
async fn gcp_partition_applies_only_to_gpu_pools() {
    let h = Harness::new();
    let gpu = created_node(
        &h,
        gcp_identity(),
        partitioned(NodeSpec::new("pool1").with_machine_type("gpu-a100")),
    )
    .await;
    assert!(gpu.gpu_enabled);
    assert_eq!(gpu.mig_profile, Some(MigProfile::Mig3g));

    let h = Harness::new();
    let plain = created_node(
        &h,
        gcp_identity(),
        partitioned(NodeSpec::new("pool1").with_machine_type("m")),
    )
    .await;
    assert!(!plain.gpu_enabled);
    assert_eq!(plain.mig_profile, None);
}

#[tokio::test]
async fn gcp_flagged_gpu_instance_keeps_its_partition() {
    let h = Harness::new();
    let node = NodeSpec {
        gpu_enabled: true,
        ..partitioned(NodeSpec::new("pool1").with_instance("a2-highgpu-1g"))
    };
    let created = created_node(&h, gcp_identity(), node).await;
    assert!(created.gpu_enabled);
    assert_eq!(created.mig_profile, Some(MigProfile::Mig3g));
}

#[tokio::test]
async fn gcp_partition_without_accelerator_is_rejected() {
    let h = Harness::new();
    let node = NodeSpec {
        gpu_enabled: true,
        ..partitioned(NodeSpec::new("pool1").with_instance("e2-standard-4"))
    };
    let err = h
        .gcp
        .create_cluster(
            &ctx(),
            CreateClusterRequest {
                identity: gcp_identity(),
                cluster_name: "gpu1".into(),
                node,
                labels: Labels::new(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}
