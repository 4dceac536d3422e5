use chrono::{Months, NaiveDate};
use metrics_exporter_prometheus::PrometheusHandle;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use vestlend::workflows::equity::{
    AccountStatus, EmploymentStatus, GrantId, GrantRecord, GrantStatus, MembershipId,
    MembershipProfile, StockGrant, VestingEvent, VestingStrategy,
};
use vestlend::workflows::lending::{MemoryLedger, StoreError};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) struct SeededEquity {
    pub(crate) membership_id: MembershipId,
    pub(crate) display_name: String,
    pub(crate) total_shares: u64,
}

/// Seed one borrower with a fully vested grant and a partially vested
/// monthly schedule, dated relative to `today` so the dashboard always has
/// both history and upcoming tranches to show.
pub(crate) fn seed_demo_dataset(
    ledger: &MemoryLedger,
    today: NaiveDate,
) -> Result<SeededEquity, StoreError> {
    let membership = MembershipProfile {
        id: MembershipId::generate(),
        display_name: "Nora Castellanos".to_string(),
        employment_status: EmploymentStatus::Active,
        account_status: AccountStatus::Active,
        employment_start_date: today.checked_sub_months(Months::new(40)),
    };
    let membership_id = membership.id;
    let display_name = membership.display_name.clone();
    ledger.upsert_membership(membership)?;

    let seasoned = StockGrant {
        id: GrantId::generate(),
        membership_id,
        total_shares: 800,
        exercise_price: dec!(4.25),
        grant_date: today.checked_sub_months(Months::new(30)).unwrap_or(today),
        strategy: VestingStrategy::Immediate,
        status: GrantStatus::Active,
    };
    ledger.upsert_grant(GrantRecord::new(seasoned, Vec::new()))?;

    // 600 shares vesting 15 a month, roughly half complete as of today.
    let scheduled_id = GrantId::generate();
    let first_tranche = today.checked_sub_months(Months::new(19)).unwrap_or(today);
    let events = (0u32..40)
        .map(|offset| VestingEvent {
            grant_id: scheduled_id,
            vest_date: first_tranche
                .checked_add_months(Months::new(offset))
                .unwrap_or(first_tranche),
            shares: 15,
        })
        .collect();
    let scheduled = StockGrant {
        id: scheduled_id,
        membership_id,
        total_shares: 600,
        exercise_price: dec!(9.75),
        grant_date: first_tranche,
        strategy: VestingStrategy::Scheduled,
        status: GrantStatus::Active,
    };
    ledger.upsert_grant(GrantRecord::new(scheduled, events))?;

    Ok(SeededEquity {
        membership_id,
        display_name,
        total_shares: 1400,
    })
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_decimal(raw: &str) -> Result<Decimal, String> {
    raw.trim()
        .parse::<Decimal>()
        .map_err(|err| format!("failed to parse '{raw}' as a decimal amount ({err})"))
}
