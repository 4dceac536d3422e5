//! Flat-file exports of the repayment schedule and ledger. Rows are serde
//! structs with spreadsheet-friendly headers; output lands in a `String`
//! for the caller to send or save.

use chrono::{DateTime, NaiveDate, Utc};
use csv::Writer;
use rust_decimal::Decimal;
use serde::Serialize;

use super::domain::LoanRepayment;
use super::schedule::SchedulePeriod;

#[derive(Debug, Serialize)]
struct ScheduleRow {
    #[serde(rename = "Period")]
    period: u32,
    #[serde(rename = "Due Date")]
    due_date: NaiveDate,
    #[serde(rename = "Payment")]
    payment: Decimal,
    #[serde(rename = "Principal")]
    principal: Decimal,
    #[serde(rename = "Interest")]
    interest: Decimal,
    #[serde(rename = "Remaining Balance")]
    remaining_balance: Decimal,
}

#[derive(Debug, Serialize)]
struct RepaymentRow {
    #[serde(rename = "Paid On")]
    paid_on: NaiveDate,
    #[serde(rename = "Amount")]
    amount: Decimal,
    #[serde(rename = "Principal")]
    principal: Decimal,
    #[serde(rename = "Interest")]
    interest: Decimal,
    #[serde(rename = "Note")]
    note: String,
    #[serde(rename = "Recorded At")]
    recorded_at: DateTime<Utc>,
}

/// Render a repayment schedule as CSV, one row per period.
pub fn schedule_csv(schedule: &[SchedulePeriod]) -> Result<String, csv::Error> {
    let mut writer = Writer::from_writer(Vec::new());
    for period in schedule {
        writer.serialize(ScheduleRow {
            period: period.period,
            due_date: period.due_date,
            payment: period.payment,
            principal: period.principal_component,
            interest: period.interest_component,
            remaining_balance: period.remaining_balance,
        })?;
    }
    finish(writer)
}

/// Render a repayment ledger as CSV, oldest payment first.
pub fn repayments_csv(repayments: &[LoanRepayment]) -> Result<String, csv::Error> {
    let mut ordered: Vec<&LoanRepayment> = repayments.iter().collect();
    ordered.sort_by(|a, b| {
        a.paid_on
            .cmp(&b.paid_on)
            .then(a.recorded_at.cmp(&b.recorded_at))
    });

    let mut writer = Writer::from_writer(Vec::new());
    for repayment in ordered {
        writer.serialize(RepaymentRow {
            paid_on: repayment.paid_on,
            amount: repayment.amount,
            principal: repayment.principal_component,
            interest: repayment.interest_component,
            note: repayment.note.clone().unwrap_or_default(),
            recorded_at: repayment.recorded_at,
        })?;
    }
    finish(writer)
}

fn finish(writer: Writer<Vec<u8>>) -> Result<String, csv::Error> {
    let bytes = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
