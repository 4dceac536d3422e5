//! Repayment schedules. The schedule is derived, never stored: given the
//! agreed economics it reproduces the same rows every time, and the final
//! period always retires the exact remaining balance so principal
//! components sum to the principal to the cent.

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use super::domain::LoanRepayment;
use super::quote::amortized_payment;
use crate::workflows::money::{cent, monthly_rate, round_cents};
use crate::workflows::policy::RepaymentMethod;

/// One row of an amortization schedule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchedulePeriod {
    pub period: u32,
    pub due_date: NaiveDate,
    pub payment: Decimal,
    pub principal_component: Decimal,
    pub interest_component: Decimal,
    pub remaining_balance: Decimal,
}

/// A loan's standing against its schedule as of a date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentStatus {
    pub periods_due: u32,
    pub amount_due_to_date: Decimal,
    pub total_paid: Decimal,
    pub principal_paid: Decimal,
    pub interest_paid: Decimal,
    pub outstanding_principal: Decimal,
    /// Highest period fully covered by the ledger, in order.
    pub paid_through_period: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_due: Option<SchedulePeriod>,
    pub in_arrears: bool,
    pub arrears_amount: Decimal,
}

/// The first scheduled due date for a loan activated on `activated_on`:
/// one calendar month later, day-of-month clamped to the target month.
pub fn first_due_date(activated_on: NaiveDate) -> NaiveDate {
    activated_on
        .checked_add_months(Months::new(1))
        .unwrap_or(activated_on)
}

fn due_on(first_due: NaiveDate, periods_after: u32) -> NaiveDate {
    first_due
        .checked_add_months(Months::new(periods_after))
        .unwrap_or(first_due)
}

/// Expand loan economics into per-period rows. Due dates advance by
/// calendar month from `first_due`.
pub fn build_schedule(
    principal: Decimal,
    annual_rate_percent: Decimal,
    term_months: u32,
    method: RepaymentMethod,
    first_due: NaiveDate,
) -> Vec<SchedulePeriod> {
    let monthly = monthly_rate(annual_rate_percent);
    let mut periods = Vec::with_capacity(term_months as usize);

    match method {
        RepaymentMethod::PrincipalAndInterest => {
            let payment = amortized_payment(principal, monthly, term_months);
            let mut balance = principal;
            for period in 1..=term_months {
                let interest = round_cents(balance * monthly);
                let (amount, principal_component) = if period == term_months {
                    (balance + interest, balance)
                } else {
                    // Rounding can leave the level payment a hair over the
                    // remaining balance near the end; never over-retire.
                    let principal_component = (payment - interest).min(balance);
                    (payment, principal_component)
                };
                balance -= principal_component;
                periods.push(SchedulePeriod {
                    period,
                    due_date: due_on(first_due, period - 1),
                    payment: amount,
                    principal_component,
                    interest_component: interest,
                    remaining_balance: balance,
                });
            }
        }
        RepaymentMethod::Balloon => {
            let interest = round_cents(principal * monthly);
            for period in 1..=term_months {
                let last = period == term_months;
                periods.push(SchedulePeriod {
                    period,
                    due_date: due_on(first_due, period - 1),
                    payment: if last { interest + principal } else { interest },
                    principal_component: if last { principal } else { Decimal::ZERO },
                    interest_component: interest,
                    remaining_balance: if last { Decimal::ZERO } else { principal },
                });
            }
        }
    }

    periods
}

/// Apply the repayment ledger to a schedule in period order.
pub fn payment_status(
    schedule: &[SchedulePeriod],
    repayments: &[LoanRepayment],
    as_of: NaiveDate,
) -> PaymentStatus {
    let total_paid: Decimal = repayments.iter().map(|entry| entry.amount).sum();
    let principal_paid: Decimal = repayments
        .iter()
        .map(|entry| entry.principal_component)
        .sum();
    let interest_paid: Decimal = repayments
        .iter()
        .map(|entry| entry.interest_component)
        .sum();

    let mut periods_due = 0;
    let mut amount_due_to_date = Decimal::ZERO;
    for row in schedule.iter().filter(|row| row.due_date <= as_of) {
        periods_due += 1;
        amount_due_to_date += row.payment;
    }

    let scheduled_principal: Decimal = schedule
        .iter()
        .map(|row| row.principal_component)
        .sum();
    let outstanding_principal = (scheduled_principal - principal_paid).max(Decimal::ZERO);

    let mut covered = Decimal::ZERO;
    let mut paid_through_period = 0;
    for row in schedule {
        covered += row.payment;
        if covered <= total_paid + cent() {
            paid_through_period = row.period;
        } else {
            break;
        }
    }
    let next_due = schedule
        .iter()
        .find(|row| row.period == paid_through_period + 1)
        .cloned();

    let arrears_amount = (amount_due_to_date - total_paid).max(Decimal::ZERO);

    PaymentStatus {
        periods_due,
        amount_due_to_date,
        total_paid,
        principal_paid,
        interest_paid,
        outstanding_principal,
        paid_through_period,
        next_due,
        in_arrears: arrears_amount > Decimal::ZERO,
        arrears_amount,
    }
}
