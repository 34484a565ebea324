use serde::{Deserialize, Serialize};

use crate::ProviderIdentity;

/// DNS resource record set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsRecordSet {
    /// Record type such as `A`, `CNAME` or `TXT`.
    pub record_type: String,
    pub name: String,
    pub values: Vec<String>,
    pub ttl_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct AddRoute53RecordRequest {
    pub identity: ProviderIdentity,
    /// Target the record resolves to: an IP address or a load balancer host name.
    pub dns_name: String,
    pub record_name: String,
    /// Latency-routing region label; enables set identifier routing when present.
    pub region_identifier: Option<String>,
    /// Create an alias record to a provider-managed resource instead of a plain `A` record.
    pub is_aws_resource: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddRoute53RecordResponse {
    pub change_id: String,
}

#[derive(Debug, Clone)]
pub struct CreateRoute53RecordsRequest {
    pub identity: ProviderIdentity,
    pub records: Vec<DnsRecordSet>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateRoute53RecordsResponse {
    pub change_id: String,
}

#[derive(Debug, Clone)]
pub struct DeleteRoute53RecordsRequest {
    pub identity: ProviderIdentity,
    pub records: Vec<DnsRecordSet>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteRoute53RecordsResponse {
    pub change_id: String,
}

#[derive(Debug, Clone)]
pub struct GetRoute53TxtRecordsRequest {
    pub identity: ProviderIdentity,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetRoute53TxtRecordsResponse {
    pub records: Vec<DnsRecordSet>,
}
