use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::workflows::equity::domain::{
    AccountStatus, EmploymentStatus, GrantId, GrantRecord, GrantStatus, MembershipId,
    MembershipProfile, StockGrant, VestingEvent, VestingStrategy,
};
use crate::workflows::policy::LendingPolicy;

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn membership() -> MembershipProfile {
    MembershipProfile {
        id: MembershipId::generate(),
        display_name: "Ada Navarro".to_string(),
        employment_status: EmploymentStatus::Active,
        account_status: AccountStatus::Active,
        employment_start_date: Some(date(2020, 3, 1)),
    }
}

pub(super) fn immediate_grant(
    membership_id: MembershipId,
    total_shares: u64,
    exercise_price: Decimal,
    grant_date: NaiveDate,
) -> GrantRecord {
    GrantRecord::new(
        StockGrant {
            id: GrantId::generate(),
            membership_id,
            total_shares,
            exercise_price,
            grant_date,
            strategy: VestingStrategy::Immediate,
            status: GrantStatus::Active,
        },
        Vec::new(),
    )
}

pub(super) fn scheduled_grant(
    membership_id: MembershipId,
    total_shares: u64,
    exercise_price: Decimal,
    grant_date: NaiveDate,
    tranches: &[(NaiveDate, u64)],
) -> GrantRecord {
    let id = GrantId::generate();
    let events = tranches
        .iter()
        .map(|(vest_date, shares)| VestingEvent {
            grant_id: id,
            vest_date: *vest_date,
            shares: *shares,
        })
        .collect();
    GrantRecord::new(
        StockGrant {
            id,
            membership_id,
            total_shares,
            exercise_price,
            grant_date,
            strategy: VestingStrategy::Scheduled,
            status: GrantStatus::Active,
        },
        events,
    )
}

pub(super) fn policy() -> LendingPolicy {
    LendingPolicy::standard()
}
