//! Loan quoting. Everything here is pure decimal arithmetic over an
//! allocation plan; no storage is touched and nothing is persisted until
//! the submission commit copies the accepted quote into the application.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::Serialize;

use super::domain::ShareSelection;
use super::reservation::AllocationLine;
use crate::workflows::equity::GrantId;
use crate::workflows::money::{monthly_rate, round_cents};
use crate::workflows::policy::{InterestType, LendingPolicy, RepaymentMethod};

/// Input validation failures. All are rejected before any state change.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuoteError {
    #[error("term of {months} months is outside the allowed range {min}..={max}")]
    TermOutOfRange { months: u32, min: u32, max: u32 },
    #[error("interest type {0} is not allowed by policy")]
    InterestTypeNotAllowed(InterestType),
    #[error("repayment method {0} is not allowed by policy")]
    RepaymentMethodNotAllowed(RepaymentMethod),
    #[error("selected percent {0} is outside the range (0, 100]")]
    PercentOutOfRange(Decimal),
    #[error("share selection resolves to zero shares")]
    EmptySelection,
}

/// One purchase line of a quote: shares drawn from a grant at that grant's
/// strike price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuoteLine {
    pub grant_id: GrantId,
    pub shares: u64,
    pub exercise_price: Decimal,
    pub cost: Decimal,
}

/// A fully computed loan quote for one interest-type / repayment-method
/// combination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoanQuote {
    pub share_count: u64,
    pub lines: Vec<QuoteLine>,
    pub purchase_price: Decimal,
    pub down_payment: Decimal,
    pub principal: Decimal,
    pub interest_type: InterestType,
    pub repayment_method: RepaymentMethod,
    /// Resolved at quote time; variable-rate loans never re-derive this.
    pub annual_rate_percent: Decimal,
    pub term_months: u32,
    pub periodic_payment: Decimal,
    pub total_payable: Decimal,
    pub total_interest: Decimal,
    pub policy_version: u32,
}

impl LoanQuote {
    /// The quote-option document written into the submission snapshots.
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// The denormalized figures copied onto the application at submission.
    pub fn economics(&self) -> super::domain::LoanEconomics {
        super::domain::LoanEconomics {
            share_count: self.share_count,
            annual_rate_percent: self.annual_rate_percent,
            purchase_price: self.purchase_price,
            down_payment: self.down_payment,
            principal: self.principal,
            periodic_payment: self.periodic_payment,
            total_payable: self.total_payable,
            total_interest: self.total_interest,
        }
    }
}

/// Shape checks that need no availability figure. Draft terms are validated
/// with this before any allocation is attempted.
pub fn validate_selection(selection: ShareSelection) -> Result<(), QuoteError> {
    match selection {
        ShareSelection::Shares { count: 0 } => Err(QuoteError::EmptySelection),
        ShareSelection::Shares { .. } => Ok(()),
        ShareSelection::Percent { percent } => {
            if percent <= Decimal::ZERO || percent > dec!(100) {
                Err(QuoteError::PercentOutOfRange(percent))
            } else {
                Ok(())
            }
        }
    }
}

/// Turn the borrower's selection into a concrete share count against the
/// currently available total. Percent selections floor to whole shares.
pub fn resolve_selection(
    selection: ShareSelection,
    available: u64,
) -> Result<u64, QuoteError> {
    validate_selection(selection)?;
    match selection {
        ShareSelection::Shares { count } => Ok(count),
        ShareSelection::Percent { percent } => {
            let shares = (Decimal::from(available) * percent / dec!(100))
                .floor()
                .to_u64()
                .unwrap_or(0);
            if shares == 0 {
                Err(QuoteError::EmptySelection)
            } else {
                Ok(shares)
            }
        }
    }
}

/// The resolved nominal annual rate for an interest type under `policy`.
pub fn resolve_rate(policy: &LendingPolicy, interest_type: InterestType) -> Decimal {
    match interest_type {
        InterestType::Fixed => policy.fixed_interest_rate_annual_percent,
        InterestType::Variable => {
            policy.variable_base_rate_annual_percent + policy.variable_margin_annual_percent
        }
    }
}

/// Standard amortizing payment `P*r*(1+r)^n / ((1+r)^n - 1)`, rounded
/// half-up to cents. A zero rate degenerates to equal principal slices.
pub fn amortized_payment(principal: Decimal, monthly: Decimal, term_months: u32) -> Decimal {
    if term_months == 0 {
        return Decimal::ZERO;
    }
    if monthly.is_zero() {
        return round_cents(principal / Decimal::from(term_months));
    }
    let growth = (Decimal::ONE + monthly).powi(i64::from(term_months));
    round_cents(principal * monthly * growth / (growth - Decimal::ONE))
}

/// Price one interest-type / repayment-method combination against an
/// allocation plan.
pub fn build_quote(
    lines: &[AllocationLine],
    policy: &LendingPolicy,
    interest_type: InterestType,
    repayment_method: RepaymentMethod,
    term_months: u32,
) -> Result<LoanQuote, QuoteError> {
    if !policy.term_in_bounds(term_months) {
        return Err(QuoteError::TermOutOfRange {
            months: term_months,
            min: policy.min_loan_term_months,
            max: policy.max_loan_term_months,
        });
    }
    if !policy.allows_interest_type(interest_type) {
        return Err(QuoteError::InterestTypeNotAllowed(interest_type));
    }
    if !policy.allows_repayment_method(repayment_method) {
        return Err(QuoteError::RepaymentMethodNotAllowed(repayment_method));
    }

    let share_count: u64 = lines.iter().map(|line| line.shares).sum();
    if share_count == 0 {
        return Err(QuoteError::EmptySelection);
    }

    let quote_lines: Vec<QuoteLine> = lines
        .iter()
        .map(|line| QuoteLine {
            grant_id: line.grant_id,
            shares: line.shares,
            exercise_price: line.exercise_price,
            cost: round_cents(Decimal::from(line.shares) * line.exercise_price),
        })
        .collect();
    let purchase_price: Decimal = quote_lines.iter().map(|line| line.cost).sum();

    let down_payment = if policy.require_down_payment {
        round_cents(purchase_price * policy.down_payment_percent / dec!(100))
    } else {
        Decimal::ZERO
    };
    let principal = purchase_price - down_payment;

    let annual_rate_percent = resolve_rate(policy, interest_type);
    let monthly = monthly_rate(annual_rate_percent);
    let term = Decimal::from(term_months);

    let (periodic_payment, total_payable, total_interest) = match repayment_method {
        RepaymentMethod::PrincipalAndInterest => {
            let payment = amortized_payment(principal, monthly, term_months);
            let total_payable = round_cents(payment * term);
            (payment, total_payable, total_payable - principal)
        }
        RepaymentMethod::Balloon => {
            // Interest-only periods; the final period also retires the
            // full principal.
            let payment = round_cents(principal * monthly);
            let total_interest = round_cents(payment * term);
            (payment, principal + total_interest, total_interest)
        }
    };

    Ok(LoanQuote {
        share_count,
        lines: quote_lines,
        purchase_price,
        down_payment,
        principal,
        interest_type,
        repayment_method,
        annual_rate_percent,
        term_months,
        periodic_payment,
        total_payable,
        total_interest,
        policy_version: policy.policy_version,
    })
}

/// Build the what-if matrix of every allowed interest-type and
/// repayment-method combination. Combinations that fail validation are
/// omitted rather than surfaced.
pub fn quote_options(
    lines: &[AllocationLine],
    policy: &LendingPolicy,
    term_months: u32,
) -> Vec<LoanQuote> {
    let mut options = Vec::new();
    for interest_type in &policy.allowed_interest_types {
        for repayment_method in &policy.allowed_repayment_methods {
            if let Ok(quote) =
                build_quote(lines, policy, *interest_type, *repayment_method, term_months)
            {
                options.push(quote);
            }
        }
    }
    options
}
