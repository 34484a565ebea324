use serde::{Deserialize, Serialize};

use crate::{Labels, ProviderIdentity};

/// Block volume as reported by a provider.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSpec {
    pub id: String,
    pub size_gb: u32,
    pub volume_type: String,
    pub availability_zone: String,
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_snapshot: Option<String>,
    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    pub labels: Labels,
}

/// Point-in-time snapshot, optionally of a volume.
///
/// Deleting the source volume does not delete its snapshots.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSpec {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_id: Option<String>,
    pub size_gb: u32,
    pub region: String,
}

#[derive(Debug, Clone)]
pub struct CreateVolumeRequest {
    pub identity: ProviderIdentity,
    pub availability_zone: String,
    pub volume_type: String,
    pub size_gb: u32,
    /// Restore from this snapshot id.
    pub snapshot_id: Option<String>,
    /// Restore from this snapshot URI (providers addressing snapshots by URI).
    pub snapshot_uri: Option<String>,
    /// Delete the source snapshot once the volume is available.
    pub delete_snapshot: bool,
    pub labels: Labels,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateVolumeResponse {
    pub volume_id: String,
}

#[derive(Debug, Clone)]
pub struct GetVolumeRequest {
    pub identity: ProviderIdentity,
    pub volume_id: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetVolumeResponse {
    pub volume: VolumeSpec,
}

#[derive(Debug, Clone)]
pub struct DeleteVolumeRequest {
    pub identity: ProviderIdentity,
    pub volume_id: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteVolumeResponse {
    pub deleted: bool,
}

#[derive(Debug, Clone)]
pub struct CreateSnapshotRequest {
    pub identity: ProviderIdentity,
    pub volume_id: String,
    pub labels: Labels,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateSnapshotResponse {
    pub snapshot_id: String,
}

#[derive(Debug, Clone)]
pub struct DeleteSnapshotRequest {
    pub identity: ProviderIdentity,
    pub snapshot_id: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteSnapshotResponse {}

#[derive(Debug, Clone)]
pub struct CreateSnapshotAndDeleteRequest {
    pub identity: ProviderIdentity,
    pub volume_id: String,
    pub labels: Labels,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateSnapshotAndDeleteResponse {
    pub snapshot_id: String,
    pub volume_deleted: bool,
}

#[derive(Debug, Clone)]
pub struct CopySnapshotRequest {
    /// Destination identity; the copy lands in `identity.region`.
    pub identity: ProviderIdentity,
    pub snapshot_id: String,
    pub source_region: String,
    pub labels: Labels,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CopySnapshotResponse {
    pub snapshot_id: String,
}

#[derive(Debug, Clone)]
pub struct PresignS3UrlRequest {
    pub identity: ProviderIdentity,
    pub bucket: String,
    pub file: String,
    /// URL lifetime in minutes; `0` means the default of ten minutes.
    pub timeout_minutes: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresignS3UrlResponse {
    pub signed_url: String,
}
