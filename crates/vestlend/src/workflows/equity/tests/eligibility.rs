use rust_decimal_macros::dec;

use super::common::*;
use crate::workflows::equity::domain::EmploymentStatus;
use crate::workflows::equity::eligibility::{evaluate, EligibilityReason, EligibilityRule};

#[test]
fn active_long_tenured_membership_is_eligible() {
    let profile = membership();
    let verdict = evaluate(&profile, &policy(), 600, date(2024, 3, 1));

    assert!(verdict.eligible);
    assert!(verdict.reasons.is_empty());
    assert_eq!(verdict.rules.len(), 3);
    assert!(verdict.rules.iter().all(|rule| rule.passed));
    assert_eq!(verdict.service_years, Some(dec!(4.00)));
}

#[test]
fn terminated_membership_fails_the_employment_rule() {
    let mut profile = membership();
    profile.employment_status = EmploymentStatus::Terminated;

    let verdict = evaluate(&profile, &policy(), 600, date(2024, 3, 1));

    assert!(!verdict.eligible);
    assert_eq!(verdict.reasons, vec![EligibilityReason::EmploymentInactive]);
}

#[test]
fn service_duration_uses_a_365_25_day_year() {
    let mut profile = membership();
    profile.employment_start_date = Some(date(2023, 3, 1));
    let mut rules = policy();
    rules.min_service_duration_years = dec!(1);

    // 2024-02-29 is 365 days in: just shy of one 365.25-day year.
    let shy = evaluate(&profile, &rules, 600, date(2024, 2, 29));
    assert!(shy
        .reasons
        .contains(&EligibilityReason::InsufficientServiceDuration));

    // One more day crosses the threshold.
    let crossed = evaluate(&profile, &rules, 600, date(2024, 3, 1));
    assert!(crossed.eligible);
}

#[test]
fn missing_start_date_fails_an_enforced_service_rule() {
    let mut profile = membership();
    profile.employment_start_date = None;

    let verdict = evaluate(&profile, &policy(), 600, date(2024, 3, 1));

    assert!(!verdict.eligible);
    assert!(verdict
        .reasons
        .contains(&EligibilityReason::InsufficientServiceDuration));
    assert!(verdict.service_years.is_none());
}

#[test]
fn disabled_service_rule_always_passes() {
    let mut profile = membership();
    profile.employment_start_date = Some(date(2024, 2, 20));
    let mut rules = policy();
    rules.enforce_service_duration_rule = false;

    let verdict = evaluate(&profile, &rules, 600, date(2024, 3, 1));

    let service = verdict
        .rules
        .iter()
        .find(|outcome| outcome.rule == EligibilityRule::ServiceDuration)
        .expect("service rule is always reported");
    assert!(!service.enforced);
    assert!(service.passed);
    assert!(verdict.eligible);
}

#[test]
fn vested_threshold_failure_reports_the_shortfall_reason() {
    let profile = membership();
    let mut rules = policy();
    rules.enforce_min_vested_to_exercise = true;
    rules.min_vested_shares_to_exercise = 500;

    let verdict = evaluate(&profile, &rules, 499, date(2024, 3, 1));

    assert!(!verdict.eligible);
    assert_eq!(
        verdict.reasons,
        vec![EligibilityReason::BelowMinVestedThreshold]
    );
    assert_eq!(verdict.vested_shares, 499);
}

#[test]
fn zero_vested_without_threshold_rule_reports_no_vested_shares() {
    let profile = membership();
    let rules = policy();
    assert!(!rules.enforce_min_vested_to_exercise);

    let verdict = evaluate(&profile, &rules, 0, date(2024, 3, 1));

    assert!(!verdict.eligible);
    assert_eq!(verdict.reasons, vec![EligibilityReason::NoVestedShares]);
}

#[test]
fn every_failing_rule_is_reported_without_short_circuit() {
    let mut profile = membership();
    profile.employment_status = EmploymentStatus::OnLeave;
    profile.employment_start_date = Some(date(2024, 1, 15));
    let mut rules = policy();
    rules.enforce_min_vested_to_exercise = true;
    rules.min_vested_shares_to_exercise = 100;

    let verdict = evaluate(&profile, &rules, 0, date(2024, 3, 1));

    assert_eq!(
        verdict.reasons,
        vec![
            EligibilityReason::EmploymentInactive,
            EligibilityReason::InsufficientServiceDuration,
            EligibilityReason::BelowMinVestedThreshold,
        ]
    );
}
