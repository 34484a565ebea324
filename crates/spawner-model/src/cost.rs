use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{ModelError, ProviderIdentity, domain::constants::COST_GROUP_KEY};

/// Bucket size of a cost report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Granularity {
    #[default]
    Daily,
    Monthly,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Daily => "DAILY",
            Granularity::Monthly => "MONTHLY",
        }
    }
}

impl FromStr for Granularity {
    type Err = ModelError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "" | "DAILY" => Ok(Self::Daily),
            "MONTHLY" => Ok(Self::Monthly),
            _ => Err(ModelError::UnknownGranularity(s.to_string())),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grouping dimension of a cost report, e.g. `TAG` / `workspaceid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupBy {
    pub kind: String,
    pub key: String,
}

impl Default for GroupBy {
    fn default() -> Self {
        Self {
            kind: "TAG".to_string(),
            key: COST_GROUP_KEY.to_string(),
        }
    }
}

/// Filter shared by all cost reports.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CostQuery {
    /// Values of the `group_by.key` tag to report on.
    pub ids: Vec<String>,
    /// Inclusive start date, `YYYY-MM-DD`.
    pub start_date: String,
    /// Exclusive end date, `YYYY-MM-DD`.
    pub end_date: String,
    pub granularity: Granularity,
    /// Cost metric, e.g. `BlendedCost`; empty means the provider default.
    pub cost_type: String,
    pub group_by: GroupBy,
}

/// Total plus per-id cost.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CostBreakdown {
    pub total_cost: f64,
    pub group_cost: BTreeMap<String, f64>,
}

#[derive(Debug, Clone)]
pub struct GetWorkspacesCostRequest {
    pub identity: ProviderIdentity,
    pub query: CostQuery,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetWorkspacesCostResponse {
    pub cost: CostBreakdown,
}

#[derive(Debug, Clone)]
pub struct GetApplicationsCostRequest {
    pub identity: ProviderIdentity,
    pub query: CostQuery,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetApplicationsCostResponse {
    pub cost: CostBreakdown,
}

#[derive(Debug, Clone)]
pub struct GetCostByTimeRequest {
    pub identity: ProviderIdentity,
    pub query: CostQuery,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetCostByTimeResponse {
    /// id -> (period start date -> cost)
    pub series: BTreeMap<String, BTreeMap<String, f64>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn granularity_defaults_to_daily() {
        assert_eq!("".parse::<Granularity>().unwrap(), Granularity::Daily);
        assert_eq!("monthly".parse::<Granularity>().unwrap(), Granularity::Monthly);
        assert!("hourly".parse::<Granularity>().is_err());
    }

    #[test]
    fn group_by_defaults_to_workspace_tag() {
        let g = GroupBy::default();
        assert_eq!(g.kind, "TAG");
        assert_eq!(g.key, "workspaceid");
    }
}
