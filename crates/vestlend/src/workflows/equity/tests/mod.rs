mod common;
mod eligibility;
mod vesting;
