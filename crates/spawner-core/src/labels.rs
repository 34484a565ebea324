//! Tag/label normalization applied to every created resource.
//!
//! Precedence, lowest first: default tags, computed node fields, caller labels.
use spawner_model::{
    Labels, NodeSpec,
    constants::{
        CREATOR_SPAWNER, LABEL_CREATOR, LABEL_INSTANCE, LABEL_NODE_NAME, LABEL_NODE_SELECTOR,
        LABEL_SCOPE, LABEL_TYPE, TYPE_NODEGROUP,
    },
};

/// `{scope: "nb-<env>", creator: "spawner-service"}`.
pub fn default_tags(env: &str) -> Labels {
    let mut tags = Labels::new();
    tags.insert(LABEL_SCOPE, format!("nb-{env}"))
        .insert(LABEL_CREATOR, CREATOR_SPAWNER);
    tags
}

/// Tags for a non-node resource (cluster, volume, snapshot, repository).
pub fn resource_tags(labels: &Labels, env: &str) -> Labels {
    default_tags(env).overlay(labels)
}

/// Labels for the nodes of a node pool.
pub fn node_labels(node: &NodeSpec, env: &str) -> Labels {
    let mut computed = Labels::new();
    computed
        .insert(LABEL_NODE_NAME, node.name.as_str())
        .insert(LABEL_NODE_SELECTOR, node.name.as_str())
        .insert(LABEL_TYPE, TYPE_NODEGROUP);
    if let Some(instance) = instance_label(node) {
        computed.insert(LABEL_INSTANCE, instance);
    }

    default_tags(env).overlay(&computed).overlay(&node.labels)
}

/// Explicit instance type, else the machine class made tag-safe.
fn instance_label(node: &NodeSpec) -> Option<String> {
    if let Some(instance) = node.instance.as_deref().filter(|s| !s.is_empty()) {
        return Some(instance.to_string());
    }
    node.machine_type
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(|class| class.replacen('+', "-", 2))
}
