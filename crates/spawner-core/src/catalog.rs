//! Neutral machine classes and their per-provider instance types.
use spawner_model::NodeSpec;

use crate::error::{CoreError, CoreResult};

/// Cloud a machine class is resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cloud {
    Aws,
    Azure,
    Gcp,
}

struct MachineClass {
    name: &'static str,
    gpu: bool,
    aws: &'static str,
    azure: &'static str,
    gcp: &'static str,
    /// GKE accelerator type, for GPU classes.
    gcp_accelerator: Option<&'static str>,
}

const CATALOG: &[MachineClass] = &[
    MachineClass {
        name: "s",
        gpu: false,
        aws: "t3.medium",
        azure: "Standard_B2s",
        gcp: "e2-medium",
        gcp_accelerator: None,
    },
    MachineClass {
        name: "m",
        gpu: false,
        aws: "m5.xlarge",
        azure: "Standard_D4s_v3",
        gcp: "e2-standard-4",
        gcp_accelerator: None,
    },
    MachineClass {
        name: "l",
        gpu: false,
        aws: "m5.2xlarge",
        azure: "Standard_D8s_v3",
        gcp: "e2-standard-8",
        gcp_accelerator: None,
    },
    MachineClass {
        name: "xl",
        gpu: false,
        aws: "m5.4xlarge",
        azure: "Standard_D16s_v3",
        gcp: "e2-standard-16",
        gcp_accelerator: None,
    },
    MachineClass {
        name: "gpu-t4",
        gpu: true,
        aws: "g4dn.xlarge",
        azure: "Standard_NC4as_T4_v3",
        gcp: "n1-standard-4",
        gcp_accelerator: Some("nvidia-tesla-t4"),
    },
    MachineClass {
        name: "gpu-a10",
        gpu: true,
        aws: "g5.xlarge",
        azure: "Standard_NV36ads_A10_v5",
        gcp: "g2-standard-4",
        gcp_accelerator: Some("nvidia-l4"),
    },
    MachineClass {
        name: "gpu-a100",
        gpu: true,
        aws: "p4d.24xlarge",
        azure: "Standard_ND96asr_v4",
        gcp: "a2-highgpu-1g",
        gcp_accelerator: Some("nvidia-tesla-a100"),
    },
];

fn lookup(class: &str) -> Option<&'static MachineClass> {
    let class = class.trim().to_ascii_lowercase();
    CATALOG.iter().find(|c| c.name == class)
}

/// Returns `true` for known class names.
pub fn is_known_class(class: &str) -> bool {
    lookup(class).is_some()
}

/// Provider instance type for a node.
///
/// The explicit instance wins; otherwise the machine class must be known.
pub fn resolve_instance(node: &NodeSpec, cloud: Cloud) -> CoreResult<String> {
    if let Some(instance) = node.instance.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        return Ok(instance.to_string());
    }
    let class = node
        .machine_type
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            CoreError::invalid(format!(
                "node '{}' needs an instance type or a machine class",
                node.name
            ))
        })?;
    let entry = lookup(class)
        .ok_or_else(|| CoreError::invalid(format!("unknown machine class '{class}'")))?;

    Ok(match cloud {
        Cloud::Aws => entry.aws,
        Cloud::Azure => entry.azure,
        Cloud::Gcp => entry.gcp,
    }
    .to_string())
}

/// GPU capability: explicit flag or implied by the machine class.
pub fn is_gpu(node: &NodeSpec) -> bool {
    node.gpu_enabled
        || node
            .machine_type
            .as_deref()
            .and_then(lookup)
            .is_some_and(|c| c.gpu)
}

/// GKE machine families with a fixed accelerator, by name prefix.
const GCP_GPU_FAMILIES: &[(&str, &str)] = &[
    ("a2-ultragpu-", "nvidia-a100-80gb"),
    ("a2-", "nvidia-tesla-a100"),
    ("a3-", "nvidia-h100-80gb"),
    ("g2-", "nvidia-l4"),
];

/// GKE accelerator type for a node.
///
/// An explicit instance from a GPU machine family decides first, then the
/// machine class. A GPU-flagged N1 instance gets a T4 attached.
pub fn gcp_accelerator(node: &NodeSpec) -> Option<&'static str> {
    let instance = node
        .instance
        .as_deref()
        .map(|s| s.trim().to_ascii_lowercase())
        .unwrap_or_default();
    GCP_GPU_FAMILIES
        .iter()
        .find(|(prefix, _)| instance.starts_with(prefix))
        .map(|(_, accelerator)| *accelerator)
        .or_else(|| {
            node.machine_type
                .as_deref()
                .and_then(lookup)
                .and_then(|c| c.gcp_accelerator)
        })
        .or_else(|| (node.gpu_enabled && instance.starts_with("n1-")).then_some("nvidia-tesla-t4"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_resolves_per_cloud() {
        let node = NodeSpec::new("pool").with_machine_type("M");
        assert_eq!(resolve_instance(&node, Cloud::Aws).unwrap(), "m5.xlarge");
        assert_eq!(resolve_instance(&node, Cloud::Azure).unwrap(), "Standard_D4s_v3");
        assert_eq!(resolve_instance(&node, Cloud::Gcp).unwrap(), "e2-standard-4");
    }

    #[test]
    fn explicit_instance_is_used_verbatim() {
        let node = NodeSpec::new("pool")
            .with_machine_type("s")
            .with_instance("c6i.large");
        assert_eq!(resolve_instance(&node, Cloud::Aws).unwrap(), "c6i.large");
    }

    #[test]
    fn missing_instance_and_class_is_invalid() {
        let err = resolve_instance(&NodeSpec::new("pool"), Cloud::Aws).unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));

        let node = NodeSpec::new("pool").with_machine_type("huge");
        let err = resolve_instance(&node, Cloud::Gcp).unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[test]
    fn gpu_is_flagged_or_inferred() {
        assert!(is_gpu(&NodeSpec::new("p").with_machine_type("gpu-a100")));
        assert!(!is_gpu(&NodeSpec::new("p").with_machine_type("m")));

        let flagged = NodeSpec {
            gpu_enabled: true,
            ..NodeSpec::new("p").with_instance("custom.gpu")
        };
        assert!(is_gpu(&flagged));
        assert_eq!(
            gcp_accelerator(&NodeSpec::new("p").with_machine_type("gpu-t4")),
            Some("nvidia-tesla-t4")
        );
    }

    #[test]
    fn gcp_accelerator_follows_instance_family() {
        let a100 = NodeSpec::new("p").with_instance("a2-highgpu-1g");
        assert_eq!(gcp_accelerator(&a100), Some("nvidia-tesla-a100"));
        let a100_80 = NodeSpec::new("p").with_instance("a2-ultragpu-1g");
        assert_eq!(gcp_accelerator(&a100_80), Some("nvidia-a100-80gb"));

        let n1 = NodeSpec::new("p").with_instance("n1-standard-8");
        assert_eq!(gcp_accelerator(&n1), None);
        let flagged = NodeSpec {
            gpu_enabled: true,
            ..n1
        };
        assert_eq!(gcp_accelerator(&flagged), Some("nvidia-tesla-t4"));

        let plain = NodeSpec {
            gpu_enabled: true,
            ..NodeSpec::new("p").with_instance("e2-standard-4")
        };
        assert_eq!(gcp_accelerator(&plain), None);
    }
}
