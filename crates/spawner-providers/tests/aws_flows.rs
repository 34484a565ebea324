//! AWS adapter flows against the sandbox cloud.
mod common;

use common::{Harness, SECRET_REGION, aws_identity, ctx};
use spawner_core::{
    ErrorKind, Provider,
    secrets::SecretStore,
    sweep::{HandlerSweep, delete_all_clusters},
};
use spawner_model::*;

fn node(name: &str) -> NodeSpec {
    NodeSpec::new(name).with_instance("t3.medium")
}

async fn create_cluster(h: &Harness, name: &str) {
    h.aws
        .create_cluster(
            &ctx(),
            CreateClusterRequest {
                identity: aws_identity(),
                cluster_name: name.to_string(),
                node: node("pool-a"),
                labels: Labels::new(),
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn created_volume_reads_back() {
    let h = Harness::new();
    let created = h
        .aws
        .create_volume(
            &ctx(),
            CreateVolumeRequest {
                identity: aws_identity(),
                availability_zone: "us-west-2a".into(),
                volume_type: "gp2".into(),
                size_gb: 50,
                snapshot_id: None,
                snapshot_uri: None,
                delete_snapshot: false,
                labels: Labels::new(),
            },
        )
        .await
        .unwrap();
    assert!(created.volume_id.starts_with("vol-"));

    let got = h
        .aws
        .get_volume(
            &ctx(),
            GetVolumeRequest {
                identity: aws_identity(),
                volume_id: created.volume_id.clone(),
            },
        )
        .await
        .unwrap();
    assert_eq!(got.volume.id, created.volume_id);
    assert_eq!(got.volume.size_gb, 50);
    assert_eq!(got.volume.volume_type, "gp2");
    assert_eq!(got.volume.region, "us-west-2");
}

#[tokio::test]
async fn deleting_missing_cluster_is_not_found_every_time() {
    let h = Harness::new();
    for _ in 0..2 {
        let err = h
            .aws
            .delete_cluster(
                &ctx(),
                DeleteClusterRequest {
                    identity: aws_identity(),
                    cluster_name: "ghost".into(),
                    force_delete: true,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}

#[tokio::test]
async fn created_cluster_is_listed_and_active() {
    let h = Harness::new();
    create_cluster(&h, "c1").await;

    let status = h
        .aws
        .cluster_status(
            &ctx(),
            ClusterStatusRequest {
                identity: aws_identity(),
                cluster_name: "c1".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(status.status, ClusterStatus::Active);

    let got = h
        .aws
        .get_cluster(
            &ctx(),
            GetClusterRequest {
                identity: aws_identity(),
                cluster_name: "c1".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(got.cluster.nodes.len(), 1);
    assert_eq!(got.cluster.nodes[0].name, "pool-a");

    let other_region = ProviderIdentity::new("aws", "eu-west-1", "team");
    let listed = h
        .aws
        .get_clusters(&ctx(), GetClustersRequest { identity: other_region })
        .await
        .unwrap();
    assert!(listed.clusters.is_empty());
}

#[tokio::test]
async fn tagging_right_after_add_node_is_transient() {
    let h = Harness::new();
    create_cluster(&h, "c1").await;
    h.aws
        .add_node(
            &ctx(),
            AddNodeRequest {
                identity: aws_identity(),
                cluster_name: "c1".into(),
                node: node("add-node-2"),
            },
        )
        .await
        .unwrap();

    let req = TagNodeInstanceRequest {
        identity: aws_identity(),
        cluster_name: "c1".into(),
        node_group: "add-node-2".into(),
        labels: Labels::from_iter([("workspaceid", "ws1")]),
    };
    let err = h.aws.tag_node_instance(&ctx(), req.clone()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransientEmptyResult);

    let tagged = h.aws.tag_node_instance(&ctx(), req).await.unwrap();
    assert_eq!(tagged.instance_ids.len(), 1);
    assert!(tagged.instance_ids[0].starts_with("i-"));
}

#[tokio::test]
async fn add_node_without_instance_fails_before_any_session() {
    let h = Harness::new();
    let err = h
        .aws
        .add_node(
            &ctx(),
            AddNodeRequest {
                identity: aws_identity(),
                cluster_name: "c1".into(),
                node: NodeSpec::new("bare"),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(h.sessions.calls(), 0);
}

#[tokio::test]
async fn sweep_continues_past_a_failing_cluster() {
    let h = Harness::new();
    for name in ["a", "b", "c"] {
        create_cluster(&h, name).await;
    }
    h.cloud.aws.fail_cluster_delete("b");

    let dispatcher = h.dispatcher();
    let sweep = HandlerSweep::new(&dispatcher, ctx());
    let items = delete_all_clusters(&sweep, &aws_identity()).await.unwrap();

    let names: Vec<_> = items.iter().map(|i| i.cluster.as_str()).collect();
    assert_eq!(names, ["a", "b", "c"]);
    assert!(items[0].result.is_ok());
    assert_eq!(
        items[1].result.as_ref().unwrap_err().kind(),
        ErrorKind::Provider
    );
    assert!(items[2].result.is_ok());

    let left = h
        .aws
        .get_clusters(&ctx(), GetClustersRequest { identity: aws_identity() })
        .await
        .unwrap();
    let left: Vec<_> = left.clusters.into_iter().map(|c| c.name).collect();
    assert_eq!(left, ["b"]);
}

#[tokio::test]
async fn add_token_stores_cluster_access() {
    let h = Harness::new();
    create_cluster(&h, "c1").await;

    let resp = h
        .aws
        .add_token(
            &ctx(),
            AddTokenRequest {
                identity: aws_identity(),
                cluster_name: "c1".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(resp.secret_name, "c1-kube");

    let stored = h
        .secrets
        .get_secret(&ctx(), SECRET_REGION, "c1-kube")
        .await
        .unwrap()
        .expect("stored access");
    let body: serde_json::Value = serde_json::from_str(stored.expose()).unwrap();
    assert!(body["endpoint"].as_str().unwrap().contains("eks.amazonaws.com"));
    assert!(body["token"].as_str().unwrap().starts_with("k8s-aws-v1."));

    let token = h
        .aws
        .get_token(
            &ctx(),
            GetTokenRequest {
                identity: aws_identity(),
                cluster_name: "c1".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(body["endpoint"].as_str().unwrap(), token.endpoint);
    assert!(token.token.expose().starts_with("k8s-aws-v1."));
    assert!(!token.ca_data.is_empty());
}

#[tokio::test]
async fn dns_records_round_trip_through_the_hosted_zone() {
    let h = Harness::new();
    let txt = DnsRecordSet {
        record_type: "TXT".into(),
        name: "ash1234.app.dev.example.com".into(),
        values: vec!["test1".into(), "test2".into()],
        ttl_seconds: 250,
    };
    h.aws
        .create_route53_records(
            &ctx(),
            CreateRoute53RecordsRequest {
                identity: aws_identity(),
                records: vec![txt.clone()],
            },
        )
        .await
        .unwrap();
    h.aws
        .add_route53_record(
            &ctx(),
            AddRoute53RecordRequest {
                identity: aws_identity(),
                dns_name: "20.85.85.202".into(),
                record_name: "*.app.dev.example.com".into(),
                region_identifier: None,
                is_aws_resource: false,
            },
        )
        .await
        .unwrap();

    let listed = h
        .aws
        .get_route53_txt_records(&ctx(), GetRoute53TxtRecordsRequest { identity: aws_identity() })
        .await
        .unwrap();
    assert_eq!(listed.records, vec![txt.clone()]);

    h.aws
        .delete_route53_records(
            &ctx(),
            DeleteRoute53RecordsRequest {
                identity: aws_identity(),
                records: vec![txt],
            },
        )
        .await
        .unwrap();
    let listed = h
        .aws
        .get_route53_txt_records(&ctx(), GetRoute53TxtRecordsRequest { identity: aws_identity() })
        .await
        .unwrap();
    assert!(listed.records.is_empty());
}

#[tokio::test]
async fn dns_without_hosted_zone_is_unsupported() {
    let h = Harness::with_zone("");
    let err = h
        .aws
        .get_route53_txt_records(&ctx(), GetRoute53TxtRecordsRequest { identity: aws_identity() })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);
}

#[tokio::test]
async fn workspace_cost_is_grouped_by_id() {
    let h = Harness::new();
    let resp = h
        .aws
        .get_workspaces_cost(
            &ctx(),
            GetWorkspacesCostRequest {
                identity: aws_identity(),
                query: CostQuery {
                    ids: vec!["ws1".into(), "ws2".into()],
                    start_date: "2022-04-01".into(),
                    end_date: "2022-04-08".into(),
                    granularity: Granularity::Daily,
                    cost_type: String::new(),
                    group_by: GroupBy::default(),
                },
            },
        )
        .await
        .unwrap();
    let groups: Vec<_> = resp.cost.group_cost.keys().cloned().collect();
    assert_eq!(groups, ["ws1", "ws2"]);
    let sum: f64 = resp.cost.group_cost.values().sum();
    assert!((resp.cost.total_cost - sum).abs() < 1e-9);
    assert!(resp.cost.total_cost > 0.0);
}

#[tokio::test]
async fn snapshot_copy_lands_in_the_target_region() {
    let h = Harness::new();
    let volume = h
        .aws
        .create_volume(
            &ctx(),
            CreateVolumeRequest {
                identity: aws_identity(),
                availability_zone: "us-west-2a".into(),
                volume_type: "gp3".into(),
                size_gb: 20,
                snapshot_id: None,
                snapshot_uri: None,
                delete_snapshot: false,
                labels: Labels::new(),
            },
        )
        .await
        .unwrap();
    let snap = h
        .aws
        .create_snapshot(
            &ctx(),
            CreateSnapshotRequest {
                identity: aws_identity(),
                volume_id: volume.volume_id,
                labels: Labels::new(),
            },
        )
        .await
        .unwrap();

    let copied = h
        .aws
        .copy_snapshot(
            &ctx(),
            CopySnapshotRequest {
                identity: ProviderIdentity::new("aws", "eu-west-1", "team"),
                snapshot_id: snap.snapshot_id.clone(),
                source_region: "us-west-2".into(),
                labels: Labels::new(),
            },
        )
        .await
        .unwrap();
    assert_ne!(copied.snapshot_id, snap.snapshot_id);

    let err = h
        .aws
        .copy_snapshot(
            &ctx(),
            CopySnapshotRequest {
                identity: ProviderIdentity::new("aws", "eu-west-1", "team"),
                snapshot_id: snap.snapshot_id,
                source_region: "ap-south-1".into(),
                labels: Labels::new(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn presigned_url_carries_bucket_key_and_expiry() {
    let h = Harness::new();
    let resp = h
        .aws
        .presign_s3_url(
            &ctx(),
            PresignS3UrlRequest {
                identity: aws_identity(),
                bucket: "bucket-1".into(),
                file: "hello.txt".into(),
                timeout_minutes: 0,
            },
        )
        .await
        .unwrap();
    assert!(
        resp.signed_url
            .starts_with("https://bucket-1.s3.us-west-2.amazonaws.com/hello.txt?")
    );
    assert!(resp.signed_url.contains("X-Amz-Expires=600"));
}

#[tokio::test]
async fn oidc_provider_registers_once_per_cluster() {
    let h = Harness::new();
    create_cluster(&h, "c1").await;
    let request = || RegisterClusterOidcRequest {
        identity: aws_identity(),
        cluster_name: "c1".into(),
        issuer_url: "https://issuer.example".into(),
        client_id: "spawner".into(),
    };

    h.aws.register_cluster_oidc(&ctx(), request()).await.unwrap();
    let again = h.aws.register_cluster_oidc(&ctx(), request()).await.unwrap_err();
    assert_eq!(again.kind(), ErrorKind::Provider);

    let missing_issuer = h
        .aws
        .register_cluster_oidc(
            &ctx(),
            RegisterClusterOidcRequest {
                issuer_url: String::new(),
                ..request()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(missing_issuer.kind(), ErrorKind::InvalidInput);
}

#[tokio::test]
async fn registry_auth_and_repository_share_the_account_endpoint() {
    let h = Harness::new();
    let auth = h
        .aws
        .get_container_registry_auth(
            &ctx(),
            GetContainerRegistryAuthRequest {
                identity: aws_identity(),
            },
        )
        .await
        .unwrap();
    assert!(!auth.token.is_empty());
    assert!(auth.url.starts_with("https://"));
    assert!(auth.url.ends_with(".dkr.ecr.us-west-2.amazonaws.com"));
    assert!(!auth.expires_at.is_empty());

    let repo = || CreateContainerRegistryRepoRequest {
        identity: aws_identity(),
        name: "team/app".into(),
        image_tag_mutable: true,
        labels: Labels::new(),
    };
    let created = h.aws.create_container_registry_repo(&ctx(), repo()).await.unwrap();
    assert_eq!(
        format!("https://{}", created.repository_uri),
        format!("{}/team/app", auth.url)
    );
    assert!(!created.registry_id.is_empty());

    let dup = h.aws.create_container_registry_repo(&ctx(), repo()).await.unwrap_err();
    assert_eq!(dup.kind(), ErrorKind::Provider);
}
