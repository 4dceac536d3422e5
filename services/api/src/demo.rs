use crate::infra::seed_demo_dataset;
use chrono::{Local, NaiveDate};
use clap::Args;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::sync::Arc;
use vestlend::error::AppError;
use vestlend::workflows::equity::GrantId;
use vestlend::workflows::lending::{
    exports, quote, AdvanceApplication, AllocationLine, CreateApplication, LoanOriginationService,
    LoanStatus, LoanTerms, MemoryAuditLog, MemoryLedger, OriginationError, RecordRepayment,
    ShareSelection, SubmitApplication,
};
use vestlend::workflows::policy::{InterestType, LendingPolicy, RepaymentMethod};

#[derive(Args, Debug)]
pub(crate) struct QuoteArgs {
    /// Number of shares to finance
    #[arg(long)]
    pub(crate) shares: u64,
    /// Exercise price per share, e.g. 4.25
    #[arg(long, value_parser = crate::infra::parse_decimal)]
    pub(crate) price: Decimal,
    /// Loan term in months
    #[arg(long, default_value_t = 12)]
    pub(crate) term_months: u32,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Reference date for vesting and eligibility (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) as_of: Option<NaiveDate>,
    /// Shares to finance in the walkthrough
    #[arg(long, default_value_t = 500)]
    pub(crate) shares: u64,
    /// Loan term in months
    #[arg(long, default_value_t = 12)]
    pub(crate) term_months: u32,
    /// Write the repayment schedule as CSV to this path
    #[arg(long)]
    pub(crate) export_schedule: Option<PathBuf>,
}

/// Price every allowed interest-type and repayment-method combination for a
/// synthetic single-grant position. Runs entirely offline.
pub(crate) fn run_quote(args: QuoteArgs) -> Result<(), AppError> {
    let policy = LendingPolicy::standard();
    let line = AllocationLine {
        grant_id: GrantId::generate(),
        shares: args.shares,
        exercise_price: args.price,
        observed_reserved: 0,
    };

    let options = quote::quote_options(&[line], &policy, args.term_months);
    if options.is_empty() {
        println!(
            "No policy-compliant quote for {} shares over {} months",
            args.shares, args.term_months
        );
        return Ok(());
    }

    println!(
        "Quotes for {} shares at {} over {} months (policy v{})",
        args.shares, args.price, args.term_months, policy.policy_version
    );
    for option in &options {
        println!(
            "- {} / {}: principal {} | payment {} | total {} | interest {}",
            option.interest_type,
            option.repayment_method,
            option.principal,
            option.periodic_payment,
            option.total_payable,
            option.total_interest
        );
    }
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        as_of,
        shares,
        term_months,
        export_schedule,
    } = args;
    let as_of = as_of.unwrap_or_else(|| Local::now().date_naive());

    println!("Stock-backed loan origination demo");

    let ledger = Arc::new(MemoryLedger::new(LendingPolicy::standard()));
    let audit = Arc::new(MemoryAuditLog::new());
    let seeded = seed_demo_dataset(&ledger, as_of).map_err(OriginationError::from)?;
    let service = LoanOriginationService::new(Arc::clone(&ledger), Arc::clone(&audit));

    println!("Borrower: {} ({})", seeded.display_name, seeded.membership_id);

    let dashboard = service.self_dashboard(seeded.membership_id, as_of)?;
    let totals = &dashboard.position.totals;
    println!("\nEquity position as of {as_of}");
    println!(
        "- granted {} | vested {} | reserved {} | available {}",
        totals.granted, totals.vested, totals.reserved, totals.available
    );
    println!(
        "- estimated exercise cost of available shares: {}",
        totals.estimated_exercise_cost
    );
    if let Some(event) = &dashboard.next_event {
        println!(
            "- next vesting event: {} shares on {}",
            event.shares, event.vest_date
        );
    }

    let terms = LoanTerms {
        selection: ShareSelection::Shares { count: shares },
        interest_type: InterestType::Fixed,
        repayment_method: RepaymentMethod::PrincipalAndInterest,
        term_months,
    };
    let preview = service.quote_preview(seeded.membership_id, terms, as_of)?;
    println!(
        "\nQuote for {} of {} available shares",
        preview.requested_shares, preview.available_shares
    );
    println!(
        "- principal {} at {}% over {} months",
        preview.quote.principal, preview.quote.annual_rate_percent, term_months
    );
    println!(
        "- periodic payment {} | total payable {}",
        preview.quote.periodic_payment, preview.quote.total_payable
    );
    println!("- alternatives:");
    for option in &preview.options {
        println!(
            "  - {} / {}: payment {} | total {}",
            option.interest_type,
            option.repayment_method,
            option.periodic_payment,
            option.total_payable
        );
    }

    let draft = service
        .create_application(CreateApplication {
            membership_id: seeded.membership_id,
            creation_key: "cli-demo".to_string(),
            terms,
        })?
        .into_inner();
    println!("\nDraft {} created (version {})", draft.id, draft.version);

    let submitted = service
        .submit_application(SubmitApplication {
            application_id: draft.id,
            submission_key: "cli-demo-submit".to_string(),
            expected_version: draft.version,
            as_of,
        })?
        .into_inner();
    println!(
        "Submitted with {} shares reserved (version {})",
        shares, submitted.version
    );

    let in_review = service.advance_application(AdvanceApplication {
        application_id: draft.id,
        next_status: LoanStatus::InReview,
        expected_version: submitted.version,
        decision_reason: None,
        as_of,
    })?;
    let active = service.advance_application(AdvanceApplication {
        application_id: draft.id,
        next_status: LoanStatus::Active,
        expected_version: in_review.version,
        decision_reason: None,
        as_of,
    })?;
    println!(
        "Review walk: {} -> {} -> {}",
        submitted.status, in_review.status, active.status
    );
    if let (Some(activated_on), Some(election_due_on)) =
        (active.activated_on, active.election_due_on)
    {
        println!("Activated {activated_on}; equity election paperwork due {election_due_on}");
    }

    let details = service.application_details(draft.id, as_of)?;
    if let Some(first) = details.schedule.first() {
        let receipt = service.record_repayment(RecordRepayment {
            application_id: draft.id,
            amount: first.payment,
            principal_component: first.principal_component,
            interest_component: first.interest_component,
            paid_on: first.due_date,
            note: Some("first scheduled installment".to_string()),
        })?;
        println!(
            "\nRecorded installment {} on {} -> outstanding principal {}",
            first.payment, first.due_date, receipt.outstanding_principal
        );
    }

    let details = service.application_details(draft.id, as_of)?;
    match serde_json::to_string_pretty(&details.application.view()) {
        Ok(json) => println!("\nApplication record:\n{json}"),
        Err(err) => println!("\nApplication record unavailable: {err}"),
    }

    let actions: Vec<&str> = audit
        .records()
        .iter()
        .map(|record| record.action)
        .collect();
    println!("\nAudit trail: {}", actions.join(" -> "));

    if let Some(path) = export_schedule {
        let csv = exports::schedule_csv(&details.schedule)?;
        std::fs::write(&path, csv)?;
        println!("Schedule exported to {}", path.display());
    }

    Ok(())
}
