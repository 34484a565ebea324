use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Labels, ModelError, ProviderIdentity};

/// Pricing/availability class for compute nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CapacityType {
    #[default]
    OnDemand,
    Spot,
}

impl CapacityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapacityType::OnDemand => "on-demand",
            CapacityType::Spot => "spot",
        }
    }
}

impl FromStr for CapacityType {
    type Err = ModelError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "on-demand" | "ondemand" => Ok(Self::OnDemand),
            "spot" | "preemptible" => Ok(Self::Spot),
            _ => Err(ModelError::UnknownCapacity(s.to_string())),
        }
    }
}

/// GPU partition (MIG) profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MigProfile {
    Mig1g,
    Mig2g,
    Mig3g,
    Mig4g,
    Mig7g,
}

impl MigProfile {
    /// Slice count of a single GPU.
    pub fn slices(&self) -> u8 {
        match self {
            MigProfile::Mig1g => 1,
            MigProfile::Mig2g => 2,
            MigProfile::Mig3g => 3,
            MigProfile::Mig4g => 4,
            MigProfile::Mig7g => 7,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MigProfile::Mig1g => "MIG1g",
            MigProfile::Mig2g => "MIG2g",
            MigProfile::Mig3g => "MIG3g",
            MigProfile::Mig4g => "MIG4g",
            MigProfile::Mig7g => "MIG7g",
        }
    }
}

impl FromStr for MigProfile {
    type Err = ModelError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mig1g" => Ok(Self::Mig1g),
            "mig2g" => Ok(Self::Mig2g),
            "mig3g" => Ok(Self::Mig3g),
            "mig4g" => Ok(Self::Mig4g),
            "mig7g" => Ok(Self::Mig7g),
            _ => Err(ModelError::UnknownMigProfile(s.to_string())),
        }
    }
}

impl fmt::Display for MigProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Neutral cluster status.
///
/// Any provider status other than "running" is reported as `Inactive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterStatus {
    Active,
    Inactive,
}

impl ClusterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterStatus::Active => "active",
            ClusterStatus::Inactive => "inactive",
        }
    }
}

/// Node pool description.
///
/// Either `machine_type` (a neutral class such as `m` or `gpu-a100`) or `instance`
/// (a provider instance type) must be set for create operations.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_type: Option<String>,
    /// Node count; `0` means provider default of one node.
    #[serde(default)]
    pub count: u32,
    /// Disk size in GiB; `0` means provider default.
    #[serde(default)]
    pub disk_size_gb: u32,
    #[serde(default)]
    pub capacity: CapacityType,
    /// Candidate instance types for spot capacity.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spot_instances: Vec<String>,
    #[serde(default)]
    pub gpu_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mig_profile: Option<MigProfile>,
    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    pub labels: Labels,
}

impl NodeSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    pub fn with_machine_type(mut self, class: impl Into<String>) -> Self {
        self.machine_type = Some(class.into());
        self
    }

    /// Count with the zero default applied.
    pub fn effective_count(&self) -> u32 {
        if self.count == 0 { 1 } else { self.count }
    }
}

/// Cluster as reported by a provider.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    pub cluster_id: String,
    pub name: String,
    pub provider: String,
    pub region: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<NodeSpec>,
    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    pub labels: Labels,
}

#[derive(Debug, Clone)]
pub struct CreateClusterRequest {
    pub identity: ProviderIdentity,
    pub cluster_name: String,
    pub node: NodeSpec,
    pub labels: Labels,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateClusterResponse {
    pub cluster_name: String,
    pub cluster_id: String,
}

#[derive(Debug, Clone)]
pub struct GetClusterRequest {
    pub identity: ProviderIdentity,
    pub cluster_name: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetClusterResponse {
    pub cluster: ClusterSpec,
}

#[derive(Debug, Clone)]
pub struct GetClustersRequest {
    pub identity: ProviderIdentity,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetClustersResponse {
    pub clusters: Vec<ClusterSpec>,
}

#[derive(Debug, Clone)]
pub struct ClusterStatusRequest {
    pub identity: ProviderIdentity,
    pub cluster_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterStatusResponse {
    pub status: ClusterStatus,
}

#[derive(Debug, Clone)]
pub struct DeleteClusterRequest {
    pub identity: ProviderIdentity,
    pub cluster_name: String,
    /// Delete node pools first instead of failing on a non-empty cluster.
    pub force_delete: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteClusterResponse {}

#[derive(Debug, Clone)]
pub struct AddNodeRequest {
    pub identity: ProviderIdentity,
    pub cluster_name: String,
    pub node: NodeSpec,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddNodeResponse {}

#[derive(Debug, Clone)]
pub struct DeleteNodeRequest {
    pub identity: ProviderIdentity,
    pub cluster_name: String,
    pub node_group: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteNodeResponse {}

#[derive(Debug, Clone)]
pub struct TagNodeInstanceRequest {
    pub identity: ProviderIdentity,
    pub cluster_name: String,
    pub node_group: String,
    pub labels: Labels,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagNodeInstanceResponse {
    /// Provider ids of the instances that were tagged.
    pub instance_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_parses_aliases() {
        assert_eq!("".parse::<CapacityType>().unwrap(), CapacityType::OnDemand);
        assert_eq!("SPOT".parse::<CapacityType>().unwrap(), CapacityType::Spot);
        assert_eq!(
            "preemptible".parse::<CapacityType>().unwrap(),
            CapacityType::Spot
        );
        assert!("reserved".parse::<CapacityType>().is_err());
    }

    #[test]
    fn mig_profile_parses_case_insensitive() {
        assert_eq!("MIG3g".parse::<MigProfile>().unwrap(), MigProfile::Mig3g);
        assert_eq!("mig7G".parse::<MigProfile>().unwrap(), MigProfile::Mig7g);
        assert!("mig5g".parse::<MigProfile>().is_err());
        assert_eq!(MigProfile::Mig2g.slices(), 2);
    }

    #[test]
    fn effective_count_defaults_to_one() {
        let node = NodeSpec::new("pool");
        assert_eq!(node.effective_count(), 1);

        let node = NodeSpec {
            count: 4,
            ..NodeSpec::new("pool")
        };
        assert_eq!(node.effective_count(), 4);
    }

    #[test]
    fn node_spec_serde_skips_empty_fields() {
        let node = NodeSpec::new("pool").with_instance("m5.large");
        let json = serde_json::to_string(&node).unwrap();
        assert!(json.contains(r#""instance":"m5.large""#));
        assert!(!json.contains("machineType"));
        assert!(!json.contains("labels"));
    }
}
