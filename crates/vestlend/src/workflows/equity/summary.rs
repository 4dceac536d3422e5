//! Per-grant position views for dashboards and allocation. Availability is
//! clamped at zero per grant before anything is summed, so a grant whose
//! reservations outpace a data correction can never drag totals negative.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::domain::{GrantId, GrantRecord, GrantStatus, VestingStrategy};
use super::vesting::{self, VestingEventView};
use crate::workflows::money::round_cents;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrantPosition {
    pub grant_id: GrantId,
    pub grant_date: NaiveDate,
    pub strategy: VestingStrategy,
    pub status: GrantStatus,
    pub exercise_price: Decimal,
    pub total_granted: u64,
    pub vested: u64,
    pub unvested: u64,
    pub reserved: u64,
    pub available: u64,
    pub next_event: Option<VestingEventView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionTotals {
    pub granted: u64,
    pub vested: u64,
    pub unvested: u64,
    pub reserved: u64,
    pub available: u64,
    /// Cost to exercise every currently available share at each grant's
    /// strike price.
    pub estimated_exercise_cost: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockPositionSummary {
    pub grants: Vec<GrantPosition>,
    pub totals: PositionTotals,
}

/// Build the position summary for one membership. `reserved` maps grant id
/// to the shares currently claimed by counting reservations.
pub fn position_summary(
    records: &[GrantRecord],
    reserved: &BTreeMap<GrantId, u64>,
    as_of: NaiveDate,
) -> StockPositionSummary {
    let mut grants = Vec::with_capacity(records.len());
    let mut totals = PositionTotals {
        granted: 0,
        vested: 0,
        unvested: 0,
        reserved: 0,
        available: 0,
        estimated_exercise_cost: Decimal::ZERO,
    };

    let mut ordered: Vec<&GrantRecord> = records.iter().collect();
    ordered.sort_by(|a, b| {
        a.grant
            .grant_date
            .cmp(&b.grant.grant_date)
            .then(a.grant.id.cmp(&b.grant.id))
    });

    for record in ordered {
        let vesting = vesting::grant_vesting(record, as_of);
        let claimed = reserved.get(&record.grant.id).copied().unwrap_or(0);
        // Only active grants expose shares to exercise; suspended and
        // terminated grants still display their vesting state.
        let available = if record.grant.status == GrantStatus::Active {
            vesting.vested.saturating_sub(claimed)
        } else {
            0
        };

        totals.granted += vesting.total_granted;
        totals.vested += vesting.vested;
        totals.unvested += vesting.unvested;
        totals.reserved += claimed;
        totals.available += available;
        totals.estimated_exercise_cost +=
            round_cents(Decimal::from(available) * record.grant.exercise_price);

        grants.push(GrantPosition {
            grant_id: record.grant.id,
            grant_date: record.grant.grant_date,
            strategy: record.grant.strategy,
            status: record.grant.status,
            exercise_price: record.grant.exercise_price,
            total_granted: vesting.total_granted,
            vested: vesting.vested,
            unvested: vesting.unvested,
            reserved: claimed,
            available,
            next_event: vesting.next_event,
        });
    }

    StockPositionSummary { grants, totals }
}
