//! Building blocks shared by the sandbox clouds.
use std::collections::HashMap;

use time::{Date, Month, macros::format_description};
use uuid::Uuid;

use crate::{
    api::{CostInput, CostPeriod, OperationState},
    fault::{ApiFault, ApiResult},
};
use spawner_model::Granularity;

/// Lowercase hex id of `len` characters.
pub(super) fn short_id(len: usize) -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(len.min(32));
    id
}

enum Settle {
    Into(String),
    Remove,
}

/// Provider-side status that settles after a number of observations.
pub(super) struct Lifecycle {
    status: String,
    pending: Option<(u32, Settle)>,
}

impl Lifecycle {
    pub(super) fn steady(status: &str) -> Self {
        Self {
            status: status.to_string(),
            pending: None,
        }
    }

    /// `status` now, `next` after `polls` observations.
    pub(super) fn toward(status: &str, next: &str, polls: u32) -> Self {
        if polls == 0 {
            return Self::steady(next);
        }
        Self {
            status: status.to_string(),
            pending: Some((polls, Settle::Into(next.to_string()))),
        }
    }

    /// Start removal; the resource disappears after `polls` observations.
    pub(super) fn remove(&mut self, status: &str, polls: u32) {
        self.status = status.to_string();
        self.pending = Some((polls.max(1), Settle::Remove));
    }

    pub(super) fn status(&self) -> &str {
        &self.status
    }

    pub(super) fn is_removing(&self) -> bool {
        matches!(self.pending, Some((_, Settle::Remove)))
    }

    /// Record one observation. Returns `true` once the resource is gone.
    pub(super) fn observe(&mut self) -> bool {
        let Some((left, _)) = self.pending.as_mut() else {
            return false;
        };
        *left = left.saturating_sub(1);
        if *left > 0 {
            return false;
        }
        match self.pending.take() {
            Some((_, Settle::Into(next))) => {
                self.status = next;
                false
            }
            Some((_, Settle::Remove)) => true,
            None => false,
        }
    }
}

/// Instances behind a node pool; they show up after `lag` lookups.
pub(super) struct PoolInstances {
    lag: u32,
    count: u32,
    ids: Vec<String>,
}

impl PoolInstances {
    pub(super) fn new(count: u32, lag: u32) -> Self {
        Self {
            lag,
            count,
            ids: Vec::new(),
        }
    }

    pub(super) fn lookup(&mut self, make_id: impl Fn(u32) -> String) -> Vec<String> {
        if self.lag > 0 {
            self.lag -= 1;
            return Vec::new();
        }
        if self.ids.is_empty() {
            self.ids = (0..self.count).map(make_id).collect();
        }
        self.ids.clone()
    }
}

struct PendingOp<E> {
    left: u32,
    http_status: Option<u16>,
    effect: Option<E>,
}

/// Operation handles of clouds with asynchronous mutations.
///
/// An operation completes on its `polls`-th poll, which hands out its effect
/// and forgets the handle.
pub(super) struct Operations<E> {
    next: u64,
    ops: HashMap<String, PendingOp<E>>,
}

impl<E> Default for Operations<E> {
    fn default() -> Self {
        Self {
            next: 0,
            ops: HashMap::new(),
        }
    }
}

impl<E> Operations<E> {
    pub(super) fn start(
        &mut self,
        prefix: &str,
        polls: u32,
        http_status: Option<u16>,
        effect: Option<E>,
    ) -> String {
        self.next += 1;
        let id = format!("{prefix}-{:06}", self.next);
        self.ops.insert(
            id.clone(),
            PendingOp {
                left: polls.max(1),
                http_status,
                effect,
            },
        );
        id
    }

    pub(super) fn poll(&mut self, id: &str) -> ApiResult<(OperationState, Option<E>)> {
        let op = self
            .ops
            .get_mut(id)
            .ok_or_else(|| ApiFault::not_found(format!("operation {id}")))?;
        op.left = op.left.saturating_sub(1);
        if op.left > 0 {
            return Ok((OperationState::default(), None));
        }
        let PendingOp {
            http_status,
            effect,
            ..
        } = self
            .ops
            .remove(id)
            .ok_or_else(|| ApiFault::not_found(format!("operation {id}")))?;
        Ok((
            OperationState {
                done: true,
                error: None,
                http_status,
            },
            effect,
        ))
    }

    #[cfg(test)]
    pub(super) fn pending(&self) -> usize {
        self.ops.len()
    }
}

fn parse_date(value: &str) -> ApiResult<Date> {
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .map_err(|e| ApiFault::api("ValidationException", format!("invalid date '{value}': {e}")))
}

fn next_period(date: Date, granularity: Granularity) -> ApiResult<Date> {
    let next = match granularity {
        Granularity::Daily => date.next_day(),
        Granularity::Monthly => {
            let (year, month) = match date.month() {
                Month::December => (date.year() + 1, Month::January),
                m => (date.year(), m.next()),
            };
            Date::from_calendar_date(year, month, 1).ok()
        }
    };
    next.ok_or_else(|| ApiFault::api("ValidationException", "date out of range"))
}

/// Stable pseudo cost of one id in one period.
fn amount(id: &str, period: Date) -> f64 {
    let seed: u32 = id.bytes().map(u32::from).sum::<u32>() + u32::from(period.ordinal());
    f64::from(seed % 97 + 3) / 10.0
}

/// Deterministic cost report grouped as `"<group_key>$<id>"`.
pub(super) fn cost_report(input: &CostInput) -> ApiResult<Vec<CostPeriod>> {
    let end = parse_date(&input.end)?;
    let mut start = parse_date(&input.start)?;
    let mut periods = Vec::new();
    while start < end {
        let groups = input
            .ids
            .iter()
            .map(|id| (format!("{}${id}", input.group_key), amount(id, start)))
            .collect();
        periods.push(CostPeriod {
            start: start.to_string(),
            groups,
        });
        start = next_period(start, input.granularity)?;
    }
    Ok(periods)
}
