//! Well-known label keys and values shared by the normalizer and the adapters.

/// Ownership scope tag, `nb-<environment>`.
pub const LABEL_SCOPE: &str = "scope";

/// Creator tag; always [`CREATOR_SPAWNER`].
pub const LABEL_CREATOR: &str = "creator";

/// Node pool name.
pub const LABEL_NODE_NAME: &str = "node-name";

/// Resolved instance type (or machine-type class) of a node pool.
pub const LABEL_INSTANCE: &str = "instance";

/// Node selector label used by workloads to target a node pool.
pub const LABEL_NODE_SELECTOR: &str = "node-selector";

/// Resource type marker on node pools.
pub const LABEL_TYPE: &str = "type";

/// Value of [`LABEL_TYPE`] for node pools.
pub const TYPE_NODEGROUP: &str = "nodegroup";

/// Value of [`LABEL_CREATOR`].
pub const CREATOR_SPAWNER: &str = "spawner-service";

/// Default tag key used to group cost reports.
pub const COST_GROUP_KEY: &str = "workspaceid";
