//! Exercise eligibility. Every rule is evaluated independently so callers
//! always receive the complete set of failing reasons, not just the first.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use super::domain::MembershipProfile;
use crate::workflows::policy::LendingPolicy;

/// Machine-readable codes carried on a failed verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EligibilityReason {
    EmploymentInactive,
    InsufficientServiceDuration,
    BelowMinVestedThreshold,
    NoVestedShares,
}

impl EligibilityReason {
    pub const fn code(self) -> &'static str {
        match self {
            EligibilityReason::EmploymentInactive => "EMPLOYMENT_INACTIVE",
            EligibilityReason::InsufficientServiceDuration => "INSUFFICIENT_SERVICE_DURATION",
            EligibilityReason::BelowMinVestedThreshold => "BELOW_MIN_VESTED_THRESHOLD",
            EligibilityReason::NoVestedShares => "NO_VESTED_SHARES",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EligibilityRule {
    Employment,
    ServiceDuration,
    VestedThreshold,
}

/// One rule's evaluation, retained even when it passes so reviews can see
/// what was checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleOutcome {
    pub rule: EligibilityRule,
    pub enforced: bool,
    pub passed: bool,
    pub reason: Option<EligibilityReason>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EligibilityVerdict {
    pub eligible: bool,
    pub rules: Vec<RuleOutcome>,
    pub reasons: Vec<EligibilityReason>,
    /// Completed service, in years to two decimal places, when a start date
    /// is on file.
    pub service_years: Option<Decimal>,
    pub vested_shares: u64,
}

impl EligibilityVerdict {
    /// Stable failure codes for error payloads and logs.
    pub fn reason_codes(&self) -> Vec<&'static str> {
        self.reasons.iter().map(|reason| reason.code()).collect()
    }
}

const DAYS_PER_YEAR: Decimal = dec!(365.25);

pub fn evaluate(
    profile: &MembershipProfile,
    policy: &LendingPolicy,
    vested_shares: u64,
    as_of: NaiveDate,
) -> EligibilityVerdict {
    let service_years = profile
        .employment_start_date
        .filter(|start| *start <= as_of)
        .map(|start| Decimal::from((as_of - start).num_days()) / DAYS_PER_YEAR);

    let employment = RuleOutcome {
        rule: EligibilityRule::Employment,
        enforced: true,
        passed: profile.is_active(),
        reason: if profile.is_active() {
            None
        } else {
            Some(EligibilityReason::EmploymentInactive)
        },
    };

    let service = if policy.enforce_service_duration_rule {
        let passed = service_years
            .map(|years| years >= policy.min_service_duration_years)
            .unwrap_or(false);
        RuleOutcome {
            rule: EligibilityRule::ServiceDuration,
            enforced: true,
            passed,
            reason: if passed {
                None
            } else {
                Some(EligibilityReason::InsufficientServiceDuration)
            },
        }
    } else {
        RuleOutcome {
            rule: EligibilityRule::ServiceDuration,
            enforced: false,
            passed: true,
            reason: None,
        }
    };

    let vested = if policy.enforce_min_vested_to_exercise {
        let passed = vested_shares >= policy.min_vested_shares_to_exercise;
        RuleOutcome {
            rule: EligibilityRule::VestedThreshold,
            enforced: true,
            passed,
            reason: if passed {
                None
            } else {
                Some(EligibilityReason::BelowMinVestedThreshold)
            },
        }
    } else {
        // With the threshold rule disabled, a membership still needs at
        // least one vested share to exercise anything.
        let passed = vested_shares > 0;
        RuleOutcome {
            rule: EligibilityRule::VestedThreshold,
            enforced: false,
            passed,
            reason: if passed {
                None
            } else {
                Some(EligibilityReason::NoVestedShares)
            },
        }
    };

    let rules = vec![employment, service, vested];
    let reasons: Vec<EligibilityReason> =
        rules.iter().filter_map(|outcome| outcome.reason).collect();

    EligibilityVerdict {
        eligible: reasons.is_empty(),
        rules,
        reasons,
        service_years: service_years.map(|years| years.round_dp(2)),
        vested_shares,
    }
}
