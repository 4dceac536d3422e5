//! Share allocation across a membership's grants. Planning is pure; the
//! oversubscription invariant is enforced when the store revalidates each
//! line's observed reservation total inside the submission commit.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;

use crate::workflows::equity::{vesting, GrantId, GrantRecord, GrantStatus};
use crate::workflows::policy::AllocationStrategy;

/// One grant's standing at planning time. `reserved` is the sum of counting
/// reservations against the grant as read in the same snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GrantAvailability {
    pub grant_id: GrantId,
    pub grant_date: NaiveDate,
    pub exercise_price: Decimal,
    pub vested: u64,
    pub reserved: u64,
}

impl GrantAvailability {
    /// Clamped at zero: a grant whose reservations outgrew a shrunk vesting
    /// total contributes nothing rather than a negative count.
    pub fn available(&self) -> u64 {
        self.vested.saturating_sub(self.reserved)
    }
}

/// A planned draw of shares from one grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AllocationLine {
    pub grant_id: GrantId,
    pub shares: u64,
    pub exercise_price: Decimal,
    /// Counting reservation total observed at planning time; the store
    /// rejects the commit if this moved underneath us.
    pub observed_reserved: u64,
}

/// The full allocation decision for one application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationPlan {
    pub strategy: AllocationStrategy,
    pub lines: Vec<AllocationLine>,
}

impl AllocationPlan {
    pub fn total_shares(&self) -> u64 {
        self.lines.iter().map(|line| line.shares).sum()
    }

    /// The allocation document written into the submission snapshots.
    pub fn snapshot(&self) -> serde_json::Value {
        json!({
            "strategy": self.strategy.label(),
            "total_shares": self.total_shares(),
            "lines": self.lines,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ReservationError {
    #[error("requested {requested} shares but only {available} are available")]
    InsufficientShares { requested: u64, available: u64 },
}

/// Compute the allocation pool for a membership's grants at `as_of`. Only
/// `ACTIVE` grants participate; suspended and terminated grants are excluded
/// entirely.
pub fn availability_from(
    records: &[GrantRecord],
    reserved: &BTreeMap<GrantId, u64>,
    as_of: NaiveDate,
) -> Vec<GrantAvailability> {
    records
        .iter()
        .filter(|record| record.grant.status == GrantStatus::Active)
        .map(|record| GrantAvailability {
            grant_id: record.grant.id,
            grant_date: record.grant.grant_date,
            exercise_price: record.grant.exercise_price,
            vested: vesting::grant_vesting(record, as_of).vested,
            reserved: reserved.get(&record.grant.id).copied().unwrap_or(0),
        })
        .collect()
}

/// Plan an all-or-nothing draw of `requested` shares from the pool.
///
/// `OLDEST_VESTED_FIRST` walks grants by ascending grant date (grant id as a
/// deterministic tie-break) and drains each grant's availability before
/// touching the next. `requested` must be positive; callers resolve the
/// borrower's selection before planning. Nothing is persisted here.
pub fn plan_allocation(
    pool: &[GrantAvailability],
    requested: u64,
    strategy: AllocationStrategy,
) -> Result<AllocationPlan, ReservationError> {
    let total_available: u64 = pool.iter().map(GrantAvailability::available).sum();
    if total_available < requested {
        return Err(ReservationError::InsufficientShares {
            requested,
            available: total_available,
        });
    }

    let mut ordered: Vec<&GrantAvailability> = pool
        .iter()
        .filter(|grant| grant.available() > 0)
        .collect();
    match strategy {
        AllocationStrategy::OldestVestedFirst => {
            ordered.sort_by(|a, b| a.grant_date.cmp(&b.grant_date).then(a.grant_id.cmp(&b.grant_id)));
        }
    }

    let mut remaining = requested;
    let mut lines = Vec::new();
    for grant in ordered {
        if remaining == 0 {
            break;
        }
        let draw = remaining.min(grant.available());
        lines.push(AllocationLine {
            grant_id: grant.grant_id,
            shares: draw,
            exercise_price: grant.exercise_price,
            observed_reserved: grant.reserved,
        });
        remaining -= draw;
    }

    Ok(AllocationPlan { strategy, lines })
}
