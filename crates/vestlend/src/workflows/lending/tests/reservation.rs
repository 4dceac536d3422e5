use std::collections::BTreeMap;

use rust_decimal_macros::dec;

use super::common::*;
use crate::workflows::equity::{GrantId, GrantStatus};
use crate::workflows::lending::reservation::{availability_from, plan_allocation};
use crate::workflows::lending::{GrantAvailability, LendingStore, ReservationError};
use crate::workflows::policy::AllocationStrategy;

fn pool_entry(
    grant_id: GrantId,
    grant_date: chrono::NaiveDate,
    vested: u64,
    reserved: u64,
) -> GrantAvailability {
    GrantAvailability {
        grant_id,
        grant_date,
        exercise_price: dec!(1.00),
        vested,
        reserved,
    }
}

#[test]
fn oldest_grant_is_drained_before_newer_ones() {
    let older = GrantId::generate();
    let newer = GrantId::generate();
    let pool = vec![
        pool_entry(newer, date(2022, 6, 1), 400, 0),
        pool_entry(older, date(2021, 1, 15), 600, 0),
    ];

    let plan = plan_allocation(&pool, 700, AllocationStrategy::OldestVestedFirst)
        .expect("enough shares");

    assert_eq!(plan.lines.len(), 2);
    assert_eq!(plan.lines[0].grant_id, older);
    assert_eq!(plan.lines[0].shares, 600);
    assert_eq!(plan.lines[1].grant_id, newer);
    assert_eq!(plan.lines[1].shares, 100);
    assert_eq!(plan.total_shares(), 700);
}

#[test]
fn same_day_grants_break_the_tie_on_grant_id() {
    let a = GrantId::generate();
    let b = GrantId::generate();
    let first = if a < b { a } else { b };
    let pool = vec![
        pool_entry(a, date(2021, 1, 15), 100, 0),
        pool_entry(b, date(2021, 1, 15), 100, 0),
    ];

    let plan = plan_allocation(&pool, 50, AllocationStrategy::OldestVestedFirst)
        .expect("enough shares");

    assert_eq!(plan.lines.len(), 1);
    assert_eq!(plan.lines[0].grant_id, first);
}

#[test]
fn allocation_is_all_or_nothing() {
    let pool = vec![
        pool_entry(GrantId::generate(), date(2021, 1, 15), 600, 0),
        pool_entry(GrantId::generate(), date(2022, 6, 1), 400, 0),
    ];

    let result = plan_allocation(&pool, 1001, AllocationStrategy::OldestVestedFirst);

    assert_eq!(
        result,
        Err(ReservationError::InsufficientShares {
            requested: 1001,
            available: 1000,
        })
    );
}

#[test]
fn existing_reservations_shrink_what_a_grant_can_offer() {
    let older = GrantId::generate();
    let newer = GrantId::generate();
    let pool = vec![
        pool_entry(older, date(2021, 1, 15), 600, 500),
        pool_entry(newer, date(2022, 6, 1), 400, 0),
    ];

    let plan = plan_allocation(&pool, 300, AllocationStrategy::OldestVestedFirst)
        .expect("enough shares");

    assert_eq!(plan.lines[0].grant_id, older);
    assert_eq!(plan.lines[0].shares, 100);
    assert_eq!(plan.lines[0].observed_reserved, 500);
    assert_eq!(plan.lines[1].grant_id, newer);
    assert_eq!(plan.lines[1].shares, 200);
}

#[test]
fn fully_reserved_grants_are_skipped_entirely() {
    let drained = GrantId::generate();
    let open = GrantId::generate();
    let pool = vec![
        pool_entry(drained, date(2021, 1, 15), 600, 600),
        pool_entry(open, date(2022, 6, 1), 400, 0),
    ];

    let plan = plan_allocation(&pool, 200, AllocationStrategy::OldestVestedFirst)
        .expect("enough shares");

    assert_eq!(plan.lines.len(), 1);
    assert_eq!(plan.lines[0].grant_id, open);
}

#[test]
fn over_reserved_grants_clamp_to_zero_availability() {
    let entry = pool_entry(GrantId::generate(), date(2021, 1, 15), 100, 150);
    assert_eq!(entry.available(), 0);
}

#[test]
fn availability_pool_covers_only_active_grants() {
    let harness = harness();
    let mut records = harness
        .ledger
        .grants_for(harness.membership.id)
        .expect("grants load");
    records[1].grant.status = GrantStatus::Suspended;

    let pool = availability_from(&records, &BTreeMap::new(), as_of());

    assert_eq!(pool.len(), 1);
    assert_eq!(pool[0].grant_id, harness.old_grant);
    assert_eq!(pool[0].vested, 600);
}

#[test]
fn availability_reads_the_counting_reservation_totals() {
    let harness = harness();
    let records = harness
        .ledger
        .grants_for(harness.membership.id)
        .expect("grants load");
    let mut reserved = BTreeMap::new();
    reserved.insert(harness.old_grant, 200u64);

    let pool = availability_from(&records, &reserved, as_of());

    let older = pool
        .iter()
        .find(|entry| entry.grant_id == harness.old_grant)
        .expect("older grant present");
    assert_eq!(older.vested, 600);
    assert_eq!(older.reserved, 200);
    assert_eq!(older.available(), 400);
}
