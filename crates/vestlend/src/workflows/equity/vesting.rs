//! Point-in-time vesting math. Everything here is a pure function of the
//! grant records and the as-of date, safe to call from any number of
//! request workers without coordination.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::domain::{GrantRecord, GrantStatus, VestingStrategy};

/// Vesting totals for one grant at an as-of date. `vested + unvested`
/// always equals `total_granted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrantVesting {
    pub total_granted: u64,
    pub vested: u64,
    pub unvested: u64,
    pub next_event: Option<VestingEventView>,
}

/// A forward-looking vesting entry: the date and the shares landing on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestingEventView {
    pub vest_date: NaiveDate,
    pub shares: u64,
}

/// One calendar-month bucket of scheduled vesting activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyVesting {
    pub month: String,
    pub shares: u64,
}

pub fn grant_vesting(record: &GrantRecord, as_of: NaiveDate) -> GrantVesting {
    let total = record.grant.total_shares;
    match record.grant.strategy {
        VestingStrategy::Immediate => {
            if record.grant.grant_date <= as_of {
                GrantVesting {
                    total_granted: total,
                    vested: total,
                    unvested: 0,
                    next_event: None,
                }
            } else {
                // An unvested immediate grant reports its own grant date as
                // the next vesting event.
                GrantVesting {
                    total_granted: total,
                    vested: 0,
                    unvested: total,
                    next_event: Some(VestingEventView {
                        vest_date: record.grant.grant_date,
                        shares: total,
                    }),
                }
            }
        }
        VestingStrategy::Scheduled => {
            let vested_raw: u64 = record
                .events()
                .iter()
                .filter(|event| event.vest_date <= as_of)
                .map(|event| event.shares)
                .sum();
            let vested = vested_raw.min(total);
            // Events are sorted, so the first strictly-future one is the
            // earliest. Dates within a grant are unique; never merge across
            // dates.
            let next_event = record
                .events()
                .iter()
                .find(|event| event.vest_date > as_of)
                .map(|event| VestingEventView {
                    vest_date: event.vest_date,
                    shares: event.shares,
                });
            GrantVesting {
                total_granted: total,
                vested,
                unvested: total - vested,
                next_event,
            }
        }
    }
}

/// Total vested shares across a membership's active grants.
pub fn total_vested(records: &[GrantRecord], as_of: NaiveDate) -> u64 {
    records
        .iter()
        .filter(|record| record.grant.status == GrantStatus::Active)
        .map(|record| grant_vesting(record, as_of).vested)
        .sum()
}

/// Forward timeline across active grants: future tranches aggregated by
/// date, ascending, truncated to `limit`.
pub fn upcoming_events(
    records: &[GrantRecord],
    as_of: NaiveDate,
    limit: usize,
) -> Vec<VestingEventView> {
    let mut by_date: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for record in records
        .iter()
        .filter(|record| record.grant.status == GrantStatus::Active)
    {
        for (vest_date, shares) in future_tranches(record, as_of) {
            *by_date.entry(vest_date).or_insert(0) += shares;
        }
    }

    by_date
        .into_iter()
        .take(limit)
        .map(|(vest_date, shares)| VestingEventView { vest_date, shares })
        .collect()
}

/// Histogram of vesting activity over the next `months` calendar months,
/// keyed `YYYY-MM`. Bucketing uses calendar month difference, not elapsed
/// days, and empty months still appear.
pub fn monthly_vesting(records: &[GrantRecord], as_of: NaiveDate, months: u32) -> Vec<MonthlyVesting> {
    let mut buckets: Vec<u64> = vec![0; months as usize];

    for record in records
        .iter()
        .filter(|record| record.grant.status == GrantStatus::Active)
    {
        let tranches: Vec<(NaiveDate, u64)> = match record.grant.strategy {
            VestingStrategy::Scheduled => record
                .events()
                .iter()
                .filter(|event| event.vest_date >= as_of)
                .map(|event| (event.vest_date, event.shares))
                .collect(),
            VestingStrategy::Immediate if record.grant.grant_date > as_of => {
                vec![(record.grant.grant_date, record.grant.total_shares)]
            }
            VestingStrategy::Immediate => Vec::new(),
        };

        for (vest_date, shares) in tranches {
            let index = month_index(as_of, vest_date);
            if (0..i64::from(months)).contains(&index) {
                buckets[index as usize] += shares;
            }
        }
    }

    buckets
        .into_iter()
        .enumerate()
        .map(|(offset, shares)| MonthlyVesting {
            month: month_key(as_of, offset as u32),
            shares,
        })
        .collect()
}

fn future_tranches(record: &GrantRecord, as_of: NaiveDate) -> Vec<(NaiveDate, u64)> {
    match record.grant.strategy {
        VestingStrategy::Immediate if record.grant.grant_date > as_of => {
            vec![(record.grant.grant_date, record.grant.total_shares)]
        }
        VestingStrategy::Immediate => Vec::new(),
        VestingStrategy::Scheduled => record
            .events()
            .iter()
            .filter(|event| event.vest_date > as_of)
            .map(|event| (event.vest_date, event.shares))
            .collect(),
    }
}

/// Calendar months between the anchor's month and the target's month.
fn month_index(from: NaiveDate, to: NaiveDate) -> i64 {
    i64::from(to.year() - from.year()) * 12 + i64::from(to.month() as i32 - from.month() as i32)
}

fn month_key(anchor: NaiveDate, offset: u32) -> String {
    let total = anchor.month0() + offset;
    let year = anchor.year() + (total / 12) as i32;
    let month = total % 12 + 1;
    format!("{year:04}-{month:02}")
}
