use std::sync::Arc;

use axum::response::Response;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use crate::workflows::equity::{
    AccountStatus, EmploymentStatus, GrantId, GrantRecord, GrantStatus, MembershipId,
    MembershipProfile, StockGrant, VestingStrategy,
};
use crate::workflows::lending::{
    AdvanceApplication, CreateApplication, LoanApplication, LoanOriginationService, LoanStatus,
    LoanTerms, MemoryAuditLog, MemoryLedger, ShareSelection, SubmitApplication,
};
use crate::workflows::policy::{InterestType, LendingPolicy, RepaymentMethod};

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

/// Fixed reference date used across the workflow tests.
pub(super) fn as_of() -> NaiveDate {
    date(2024, 6, 1)
}

pub(super) fn immediate_grant(
    membership_id: MembershipId,
    total_shares: u64,
    exercise_price: Decimal,
    grant_date: NaiveDate,
) -> GrantRecord {
    GrantRecord::new(
        StockGrant {
            id: GrantId::generate(),
            membership_id,
            total_shares,
            exercise_price,
            grant_date,
            strategy: VestingStrategy::Immediate,
            status: GrantStatus::Active,
        },
        Vec::new(),
    )
}

pub(super) struct Harness {
    pub(super) service: LoanOriginationService<MemoryLedger, MemoryAuditLog>,
    pub(super) ledger: Arc<MemoryLedger>,
    pub(super) audit: Arc<MemoryAuditLog>,
    pub(super) membership: MembershipProfile,
    /// 600 shares at 2.50, granted 2021-01-15.
    pub(super) old_grant: GrantId,
    /// 400 shares at 10.00, granted 2022-06-01.
    pub(super) new_grant: GrantId,
}

/// A fully seeded in-memory stack: one long-tenured borrower with two
/// immediately vested grants (1000 shares total) under the standard policy.
pub(super) fn harness() -> Harness {
    harness_with_policy(LendingPolicy::standard())
}

pub(super) fn harness_with_policy(policy: LendingPolicy) -> Harness {
    let ledger = Arc::new(MemoryLedger::new(policy));
    let audit = Arc::new(MemoryAuditLog::new());

    let membership = MembershipProfile {
        id: MembershipId::generate(),
        display_name: "Ada Navarro".to_string(),
        employment_status: EmploymentStatus::Active,
        account_status: AccountStatus::Active,
        employment_start_date: Some(date(2020, 3, 1)),
    };
    ledger
        .upsert_membership(membership.clone())
        .expect("seed membership");

    let older = immediate_grant(membership.id, 600, dec!(2.50), date(2021, 1, 15));
    let newer = immediate_grant(membership.id, 400, dec!(10.00), date(2022, 6, 1));
    let old_grant = older.grant.id;
    let new_grant = newer.grant.id;
    ledger.upsert_grant(older).expect("seed grant");
    ledger.upsert_grant(newer).expect("seed grant");

    let service = LoanOriginationService::new(Arc::clone(&ledger), Arc::clone(&audit));
    Harness {
        service,
        ledger,
        audit,
        membership,
        old_grant,
        new_grant,
    }
}

pub(super) fn shares_terms(count: u64) -> LoanTerms {
    LoanTerms {
        selection: ShareSelection::Shares { count },
        interest_type: InterestType::Fixed,
        repayment_method: RepaymentMethod::PrincipalAndInterest,
        term_months: 12,
    }
}

pub(super) fn create_draft(harness: &Harness, terms: LoanTerms, key: &str) -> LoanApplication {
    harness
        .service
        .create_application(CreateApplication {
            membership_id: harness.membership.id,
            creation_key: key.to_string(),
            terms,
        })
        .expect("create draft")
        .into_inner()
}

pub(super) fn submit_draft(
    harness: &Harness,
    draft: &LoanApplication,
    key: &str,
) -> LoanApplication {
    harness
        .service
        .submit_application(SubmitApplication {
            application_id: draft.id,
            submission_key: key.to_string(),
            expected_version: draft.version,
            as_of: as_of(),
        })
        .expect("submit draft")
        .into_inner()
}

pub(super) fn advance(
    harness: &Harness,
    application: &LoanApplication,
    next: LoanStatus,
) -> LoanApplication {
    harness
        .service
        .advance_application(AdvanceApplication {
            application_id: application.id,
            next_status: next,
            expected_version: application.version,
            decision_reason: None,
            as_of: as_of(),
        })
        .expect("advance application")
}

/// Walk a fresh application through `DRAFT -> SUBMITTED -> IN_REVIEW ->
/// ACTIVE` for `count` shares.
pub(super) fn activated_loan(harness: &Harness, count: u64) -> LoanApplication {
    let draft = create_draft(harness, shares_terms(count), "create-1");
    let submitted = submit_draft(harness, &draft, "submit-1");
    let in_review = advance(harness, &submitted, LoanStatus::InReview);
    advance(harness, &in_review, LoanStatus::Active)
}

/// A second service handle over the harness's store, shaped for the router.
pub(super) fn router_service(
    harness: &Harness,
) -> Arc<LoanOriginationService<MemoryLedger, MemoryAuditLog>> {
    Arc::new(LoanOriginationService::new(
        Arc::clone(&harness.ledger),
        Arc::clone(&harness.audit),
    ))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
