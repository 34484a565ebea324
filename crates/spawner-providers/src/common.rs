//! Helpers shared by the adapters.
use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;
use spawner_core::{
    CoreError, CoreResult, LongRunningOperation, OperationStatus, RequestContext, Session,
    rancher::{RancherCluster, RancherRegistration},
    secrets::kube_secret_name,
};
use spawner_model::{ClusterStatus, CostBreakdown, CostQuery, Labels, ProviderIdentity, Secret};
use time::{Date, macros::format_description};
use tracing::debug;

use crate::{
    AdapterDeps,
    api::{CostInput, CostPeriod, KubeAccess, OperationApi},
};

pub(crate) fn require(field: &str, value: &str) -> CoreResult<()> {
    if value.trim().is_empty() {
        return Err(CoreError::invalid(format!("{field} is required")));
    }
    Ok(())
}

/// `identity` with `region` filled in when its own region is empty.
///
/// Account-wide operations (DNS, cost) do not need a caller region.
pub(crate) fn with_default_region(identity: &ProviderIdentity, region: &str) -> ProviderIdentity {
    if identity.region.trim().is_empty() {
        identity.with_region(region)
    } else {
        identity.clone()
    }
}

pub(crate) fn cluster_status(running: bool) -> ClusterStatus {
    if running {
        ClusterStatus::Active
    } else {
        ClusterStatus::Inactive
    }
}

/// Wait on an operation handle returned by a mutating call.
pub(crate) struct OperationWait<'a, A: ?Sized> {
    api: &'a A,
    session: &'a Session,
    operation: String,
    name: String,
}

impl<'a, A: OperationApi + ?Sized> OperationWait<'a, A> {
    pub(crate) fn new(
        api: &'a A,
        session: &'a Session,
        operation: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            api,
            session,
            operation: operation.into(),
            name: name.into(),
        }
    }
}

#[async_trait]
impl<'a, A: OperationApi + ?Sized> LongRunningOperation for OperationWait<'a, A> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn poll(&self) -> CoreResult<OperationStatus> {
        let state = self.api.poll_operation(self.session, &self.operation).await?;
        if !state.done {
            return Ok(OperationStatus::Pending);
        }
        match state.error {
            Some(err) => Err(CoreError::Provider(err)),
            None => Ok(OperationStatus::Done {
                http_status: state.http_status,
            }),
        }
    }
}

// ==== kube access ====

/// Stored form of a cluster's access under `<cluster>-kube`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredKubeAccess<'a> {
    endpoint: &'a str,
    ca_data: &'a str,
    token: &'a Secret,
}

/// Store cluster access as JSON under `<cluster>-kube` in the secret host region.
pub(crate) async fn store_kube_access(
    deps: &AdapterDeps,
    ctx: &RequestContext,
    cluster: &str,
    access: &KubeAccess,
) -> CoreResult<String> {
    let name = kube_secret_name(cluster);
    let body = serde_json::to_string(&StoredKubeAccess {
        endpoint: &access.endpoint,
        ca_data: &access.ca_data,
        token: &access.token,
    })
    .map_err(|e| CoreError::Provider(format!("encode cluster access: {e}")))?;
    deps.secrets
        .put_secret(ctx, &deps.secret_host_region, &name, Secret::new(body))
        .await?;
    debug!(secret = %name, "stored cluster access");
    Ok(name)
}

pub(crate) async fn register_rancher(
    deps: &AdapterDeps,
    ctx: &RequestContext,
    cluster: &str,
    access: KubeAccess,
    labels: Labels,
) -> CoreResult<RancherRegistration> {
    let reg = deps
        .rancher
        .register_cluster(
            ctx,
            RancherCluster {
                name: cluster.to_string(),
                endpoint: access.endpoint,
                ca_data: access.ca_data,
                token: access.token,
                labels,
            },
        )
        .await?;
    debug!(cluster, cluster_id = %reg.cluster_id, "registered with rancher");
    Ok(reg)
}

// ==== cost ====

fn parse_date(field: &str, value: &str) -> CoreResult<Date> {
    Date::parse(value.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|e| CoreError::invalid(format!("{field} '{value}' is not YYYY-MM-DD: {e}")))
}

/// Validate dates and build the provider-neutral cost input.
pub(crate) fn cost_input(query: &CostQuery, default_metric: &str) -> CoreResult<CostInput> {
    let start = parse_date("start_date", &query.start_date)?;
    let end = parse_date("end_date", &query.end_date)?;
    if start >= end {
        return Err(CoreError::invalid(format!(
            "start_date {start} must be before end_date {end}"
        )));
    }
    require("group_by.key", &query.group_by.key)?;

    let metric = if query.cost_type.trim().is_empty() {
        default_metric.to_string()
    } else {
        query.cost_type.clone()
    };
    Ok(CostInput {
        start: query.start_date.trim().to_string(),
        end: query.end_date.trim().to_string(),
        granularity: query.granularity,
        metric,
        group_key: query.group_by.key.clone(),
        ids: query.ids.clone(),
    })
}

/// Group value of a raw `"<key>$<value>"` group name.
fn group_value<'a>(raw: &'a str, key: &str) -> &'a str {
    raw.strip_prefix(key)
        .and_then(|rest| rest.strip_prefix('$'))
        .unwrap_or(raw)
}

pub(crate) fn cost_breakdown(periods: &[CostPeriod], key: &str) -> CostBreakdown {
    let mut out = CostBreakdown::default();
    for period in periods {
        for (raw, amount) in &period.groups {
            *out.group_cost
                .entry(group_value(raw, key).to_string())
                .or_default() += amount;
            out.total_cost += amount;
        }
    }
    out
}

pub(crate) fn cost_series(
    periods: &[CostPeriod],
    key: &str,
) -> BTreeMap<String, BTreeMap<String, f64>> {
    let mut series: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
    for period in periods {
        for (raw, amount) in &period.groups {
            *series
                .entry(group_value(raw, key).to_string())
                .or_default()
                .entry(period.start.clone())
                .or_default() += amount;
        }
    }
    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use spawner_model::{Granularity, GroupBy};

    fn query(start: &str, end: &str) -> CostQuery {
        CostQuery {
            ids: vec!["ws1".into()],
            start_date: start.into(),
            end_date: end.into(),
            granularity: Granularity::Daily,
            cost_type: String::new(),
            group_by: GroupBy::default(),
        }
    }

    #[test]
    fn cost_input_validates_dates() {
        let input = cost_input(&query("2024-01-01", "2024-01-03"), "BlendedCost").unwrap();
        assert_eq!(input.metric, "BlendedCost");
        assert_eq!(input.group_key, "workspaceid");

        let err = cost_input(&query("2024-01-03", "2024-01-01"), "BlendedCost").unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
        let err = cost_input(&query("01/01/2024", "2024-01-03"), "BlendedCost").unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[test]
    fn breakdown_strips_group_prefix_and_sums() {
        let periods = vec![
            CostPeriod {
                start: "2024-01-01".into(),
                groups: vec![("workspaceid$ws1".into(), 1.5), ("workspaceid$ws2".into(), 2.0)],
            },
            CostPeriod {
                start: "2024-01-02".into(),
                groups: vec![("workspaceid$ws1".into(), 0.5)],
            },
        ];
        let b = cost_breakdown(&periods, "workspaceid");
        assert_eq!(b.total_cost, 4.0);
        assert_eq!(b.group_cost.get("ws1"), Some(&2.0));
        assert_eq!(b.group_cost.get("ws2"), Some(&2.0));

        let series = cost_series(&periods, "workspaceid");
        assert_eq!(series["ws1"].len(), 2);
        assert_eq!(series["ws1"]["2024-01-02"], 0.5);
    }
}
