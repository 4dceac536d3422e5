use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::common::*;
use crate::workflows::lending::{
    build_schedule, exports, ApplicationId, LoanRepayment, RepaymentId,
};
use crate::workflows::policy::RepaymentMethod;

fn ledger_entry(
    application_id: ApplicationId,
    amount: Decimal,
    paid_on: NaiveDate,
    note: Option<&str>,
) -> LoanRepayment {
    LoanRepayment {
        id: RepaymentId::generate(),
        application_id,
        amount,
        principal_component: amount - dec!(10.00),
        interest_component: dec!(10.00),
        paid_on,
        note: note.map(str::to_string),
        recorded_at: paid_on
            .and_hms_opt(12, 0, 0)
            .expect("valid time")
            .and_utc(),
    }
}

#[test]
fn schedule_export_carries_spreadsheet_headers() {
    let schedule = build_schedule(
        dec!(10000.00),
        dec!(6.0),
        12,
        RepaymentMethod::PrincipalAndInterest,
        date(2024, 7, 1),
    );

    let csv = exports::schedule_csv(&schedule).expect("schedule renders");
    let lines: Vec<&str> = csv.lines().collect();

    assert_eq!(lines.len(), 13);
    assert_eq!(
        lines[0],
        "Period,Due Date,Payment,Principal,Interest,Remaining Balance"
    );
    assert_eq!(lines[1], "1,2024-07-01,860.66,810.66,50.00,9189.34");
    assert!(lines[12].starts_with("12,2025-06-01,"));
}

#[test]
fn empty_schedule_exports_an_empty_document() {
    let csv = exports::schedule_csv(&[]).expect("empty schedule renders");
    assert!(csv.is_empty());
}

#[test]
fn repayment_export_orders_the_ledger_oldest_first() {
    let application_id = ApplicationId::generate();
    let repayments = vec![
        ledger_entry(
            application_id,
            dec!(200.00),
            date(2024, 8, 1),
            Some("second"),
        ),
        ledger_entry(application_id, dec!(100.00), date(2024, 7, 1), Some("first")),
    ];

    let csv = exports::repayments_csv(&repayments).expect("ledger renders");
    let lines: Vec<&str> = csv.lines().collect();

    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[0],
        "Paid On,Amount,Principal,Interest,Note,Recorded At"
    );
    assert!(lines[1].starts_with("2024-07-01,100.00,90.00,10.00,first,"));
    assert!(lines[2].starts_with("2024-08-01,200.00,190.00,10.00,second,"));
}

#[test]
fn missing_notes_export_as_empty_cells() {
    let repayments = vec![ledger_entry(
        ApplicationId::generate(),
        dec!(50.00),
        date(2024, 7, 1),
        None,
    )];

    let csv = exports::repayments_csv(&repayments).expect("ledger renders");
    let row = csv.lines().nth(1).expect("data row present");
    let cells: Vec<&str> = row.split(',').collect();

    assert_eq!(cells[0], "2024-07-01");
    assert_eq!(cells[4], "");
}
