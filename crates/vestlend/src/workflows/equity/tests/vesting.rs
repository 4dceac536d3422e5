use chrono::Duration;
use rust_decimal_macros::dec;

use super::common::*;
use crate::workflows::equity::domain::GrantStatus;
use crate::workflows::equity::vesting::{
    grant_vesting, monthly_vesting, total_vested, upcoming_events,
};

#[test]
fn immediate_grant_fully_vests_on_grant_date() {
    let grant = immediate_grant(membership().id, 400, dec!(1.25), date(2023, 5, 10));

    let vesting = grant_vesting(&grant, date(2023, 5, 10));

    assert_eq!(vesting.vested, 400);
    assert_eq!(vesting.unvested, 0);
    assert!(vesting.next_event.is_none());
}

#[test]
fn immediate_grant_before_grant_date_reports_grant_date_as_next_event() {
    let grant = immediate_grant(membership().id, 400, dec!(1.25), date(2023, 5, 10));

    let vesting = grant_vesting(&grant, date(2023, 5, 9));

    assert_eq!(vesting.vested, 0);
    assert_eq!(vesting.unvested, 400);
    let next = vesting.next_event.expect("pending grant has a next event");
    assert_eq!(next.vest_date, date(2023, 5, 10));
    assert_eq!(next.shares, 400);
}

#[test]
fn scheduled_grant_sums_events_on_or_before_the_as_of_date() {
    let owner = membership().id;
    let grant = scheduled_grant(
        owner,
        1200,
        dec!(2.40),
        date(2022, 1, 1),
        &[
            (date(2022, 7, 1), 300),
            (date(2023, 1, 1), 300),
            (date(2023, 7, 1), 300),
            (date(2024, 1, 1), 300),
        ],
    );

    let vesting = grant_vesting(&grant, date(2023, 1, 1));

    assert_eq!(vesting.vested, 600);
    assert_eq!(vesting.unvested, 600);
    let next = vesting.next_event.expect("future tranches remain");
    assert_eq!(next.vest_date, date(2023, 7, 1));
    assert_eq!(next.shares, 300);
}

#[test]
fn scheduled_vesting_clamps_to_total_granted() {
    let owner = membership().id;
    let grant = scheduled_grant(
        owner,
        500,
        dec!(1.00),
        date(2022, 1, 1),
        &[(date(2022, 6, 1), 400), (date(2022, 12, 1), 400)],
    );

    let vesting = grant_vesting(&grant, date(2023, 1, 1));

    assert_eq!(vesting.vested, 500);
    assert_eq!(vesting.unvested, 0);
}

#[test]
fn vested_plus_unvested_always_equals_total_granted() {
    let owner = membership().id;
    let grants = vec![
        immediate_grant(owner, 400, dec!(1.25), date(2023, 5, 10)),
        scheduled_grant(
            owner,
            1200,
            dec!(2.40),
            date(2022, 1, 1),
            &[
                (date(2022, 7, 1), 300),
                (date(2023, 1, 1), 300),
                (date(2023, 7, 1), 300),
                (date(2024, 1, 1), 300),
            ],
        ),
    ];

    let mut as_of = date(2021, 12, 1);
    let end = date(2024, 6, 1);
    while as_of <= end {
        for grant in &grants {
            let vesting = grant_vesting(grant, as_of);
            assert_eq!(
                vesting.vested + vesting.unvested,
                vesting.total_granted,
                "identity must hold at {as_of} for grant {}",
                grant.grant.id
            );
        }
        as_of += Duration::days(13);
    }
}

#[test]
fn next_event_is_strictly_after_the_as_of_date() {
    let owner = membership().id;
    let grant = scheduled_grant(
        owner,
        600,
        dec!(2.00),
        date(2022, 1, 1),
        &[(date(2023, 3, 1), 300), (date(2023, 9, 1), 300)],
    );

    let vesting = grant_vesting(&grant, date(2023, 3, 1));

    assert_eq!(vesting.vested, 300);
    let next = vesting.next_event.expect("one tranche remains");
    assert_eq!(next.vest_date, date(2023, 9, 1));
}

#[test]
fn upcoming_events_aggregates_shares_landing_on_the_same_date() {
    let owner = membership().id;
    let grants = vec![
        scheduled_grant(
            owner,
            600,
            dec!(2.00),
            date(2022, 1, 1),
            &[(date(2024, 1, 15), 200), (date(2024, 4, 15), 400)],
        ),
        scheduled_grant(
            owner,
            300,
            dec!(3.00),
            date(2022, 6, 1),
            &[(date(2024, 1, 15), 300)],
        ),
    ];

    let events = upcoming_events(&grants, date(2023, 12, 31), 6);

    assert_eq!(events.len(), 2);
    assert_eq!(events[0].vest_date, date(2024, 1, 15));
    assert_eq!(events[0].shares, 500);
    assert_eq!(events[1].vest_date, date(2024, 4, 15));
    assert_eq!(events[1].shares, 400);
}

#[test]
fn upcoming_events_respects_the_limit() {
    let owner = membership().id;
    let tranches: Vec<_> = (1..=10)
        .map(|month| (date(2024, month, 1), 10u64))
        .collect();
    let grants = vec![scheduled_grant(
        owner,
        100,
        dec!(1.00),
        date(2023, 1, 1),
        &tranches,
    )];

    let events = upcoming_events(&grants, date(2023, 12, 31), 3);

    assert_eq!(events.len(), 3);
    assert_eq!(events[2].vest_date, date(2024, 3, 1));
}

#[test]
fn monthly_vesting_buckets_by_calendar_month_not_elapsed_days() {
    let owner = membership().id;
    // One day apart, but a month boundary sits between them.
    let grants = vec![scheduled_grant(
        owner,
        200,
        dec!(1.00),
        date(2023, 1, 1),
        &[(date(2024, 1, 31), 100), (date(2024, 2, 1), 100)],
    )];

    let histogram = monthly_vesting(&grants, date(2024, 1, 31), 6);

    assert_eq!(histogram.len(), 6);
    assert_eq!(histogram[0].month, "2024-01");
    assert_eq!(histogram[0].shares, 100);
    assert_eq!(histogram[1].month, "2024-02");
    assert_eq!(histogram[1].shares, 100);
}

#[test]
fn monthly_vesting_reports_empty_months_and_wraps_the_year() {
    let owner = membership().id;
    let grants = vec![scheduled_grant(
        owner,
        300,
        dec!(1.00),
        date(2023, 1, 1),
        &[(date(2025, 2, 10), 300)],
    )];

    let histogram = monthly_vesting(&grants, date(2024, 11, 20), 6);

    let months: Vec<&str> = histogram.iter().map(|bucket| bucket.month.as_str()).collect();
    assert_eq!(
        months,
        vec!["2024-11", "2024-12", "2025-01", "2025-02", "2025-03", "2025-04"]
    );
    assert_eq!(histogram[3].shares, 300);
    assert!(histogram.iter().filter(|bucket| bucket.shares == 0).count() == 5);
}

#[test]
fn monthly_vesting_skips_events_outside_the_window() {
    let owner = membership().id;
    let grants = vec![scheduled_grant(
        owner,
        300,
        dec!(1.00),
        date(2023, 1, 1),
        &[(date(2024, 1, 5), 100), (date(2024, 9, 5), 200)],
    )];

    let histogram = monthly_vesting(&grants, date(2024, 1, 10), 6);

    // The January event already vested and the September one is past the
    // six-month horizon.
    assert!(histogram.iter().all(|bucket| bucket.shares == 0));
}

#[test]
fn inactive_grants_do_not_contribute_to_totals_or_timeline() {
    let owner = membership().id;
    let mut suspended = immediate_grant(owner, 500, dec!(1.00), date(2022, 1, 1));
    suspended.grant.status = GrantStatus::Suspended;
    let active = immediate_grant(owner, 200, dec!(1.00), date(2022, 1, 1));
    let grants = vec![suspended, active];

    assert_eq!(total_vested(&grants, date(2023, 1, 1)), 200);
    assert!(upcoming_events(&grants, date(2021, 1, 1), 6)
        .iter()
        .all(|event| event.shares == 200));
}
