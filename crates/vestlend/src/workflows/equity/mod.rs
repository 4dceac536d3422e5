//! Grants, vesting schedules, and exercise eligibility.

pub mod domain;
pub mod eligibility;
pub mod summary;
pub mod vesting;

#[cfg(test)]
mod tests;

pub use domain::{
    AccountStatus, EmploymentStatus, GrantId, GrantRecord, GrantStatus, MembershipId,
    MembershipProfile, StockGrant, VestingEvent, VestingStrategy,
};
pub use eligibility::{EligibilityReason, EligibilityRule, EligibilityVerdict, RuleOutcome};
pub use summary::{GrantPosition, PositionTotals, StockPositionSummary};
pub use vesting::{GrantVesting, MonthlyVesting, VestingEventView};
