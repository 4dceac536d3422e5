//! Organization lending policy. Policy rows are read-only, versioned inputs;
//! every submission snapshots the version in effect so later edits never
//! rewrite an agreed loan.

use std::fmt;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// How the nominal annual rate is resolved for a loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterestType {
    Fixed,
    Variable,
}

impl InterestType {
    pub const fn label(self) -> &'static str {
        match self {
            InterestType::Fixed => "FIXED",
            InterestType::Variable => "VARIABLE",
        }
    }
}

impl fmt::Display for InterestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How principal is retired over the term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RepaymentMethod {
    Balloon,
    PrincipalAndInterest,
}

impl RepaymentMethod {
    pub const fn label(self) -> &'static str {
        match self {
            RepaymentMethod::Balloon => "BALLOON",
            RepaymentMethod::PrincipalAndInterest => "PRINCIPAL_AND_INTEREST",
        }
    }
}

impl fmt::Display for RepaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Share allocation order across a membership's grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationStrategy {
    OldestVestedFirst,
}

impl AllocationStrategy {
    pub const fn label(self) -> &'static str {
        match self {
            AllocationStrategy::OldestVestedFirst => "OLDEST_VESTED_FIRST",
        }
    }
}

/// The organization's exercise-lending rules in effect for quoting and
/// submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LendingPolicy {
    pub enforce_service_duration_rule: bool,
    pub min_service_duration_years: Decimal,
    pub enforce_min_vested_to_exercise: bool,
    pub min_vested_shares_to_exercise: u64,
    pub allowed_interest_types: Vec<InterestType>,
    pub allowed_repayment_methods: Vec<RepaymentMethod>,
    pub min_loan_term_months: u32,
    pub max_loan_term_months: u32,
    pub fixed_interest_rate_annual_percent: Decimal,
    pub variable_base_rate_annual_percent: Decimal,
    pub variable_margin_annual_percent: Decimal,
    pub require_down_payment: bool,
    pub down_payment_percent: Decimal,
    pub policy_version: u32,
}

impl LendingPolicy {
    /// Defaults mirroring a typical program configuration, used by demos and
    /// tests.
    pub fn standard() -> Self {
        Self {
            enforce_service_duration_rule: true,
            min_service_duration_years: dec!(1),
            enforce_min_vested_to_exercise: false,
            min_vested_shares_to_exercise: 0,
            allowed_interest_types: vec![InterestType::Fixed, InterestType::Variable],
            allowed_repayment_methods: vec![
                RepaymentMethod::Balloon,
                RepaymentMethod::PrincipalAndInterest,
            ],
            min_loan_term_months: 6,
            max_loan_term_months: 60,
            fixed_interest_rate_annual_percent: dec!(6.0),
            variable_base_rate_annual_percent: dec!(4.5),
            variable_margin_annual_percent: dec!(1.5),
            require_down_payment: false,
            down_payment_percent: Decimal::ZERO,
            policy_version: 1,
        }
    }

    pub fn allows_interest_type(&self, interest_type: InterestType) -> bool {
        self.allowed_interest_types.contains(&interest_type)
    }

    pub fn allows_repayment_method(&self, method: RepaymentMethod) -> bool {
        self.allowed_repayment_methods.contains(&method)
    }

    pub fn term_in_bounds(&self, term_months: u32) -> bool {
        term_months >= self.min_loan_term_months && term_months <= self.max_loan_term_months
    }

    /// The before-the-fact record written into each submission.
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
