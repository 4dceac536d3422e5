use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

use super::audit::{application_diff, AuditRecord, AuditSink};
use super::dashboard::{self, SelfDashboard};
use super::domain::{
    ApplicationId, LoanApplication, LoanRepayment, LoanStatus, LoanTerms, RepaymentId,
    Reservation, SubmissionSnapshots,
};
use super::quote::{self, LoanQuote, QuoteError};
use super::repository::{
    LendingStore, RepaymentOutcome, StoreError, SubmissionCommit, TransitionCommit, UpsertOutcome,
};
use super::reservation::{self, GrantAvailability, ReservationError};
use super::schedule::{self, PaymentStatus, SchedulePeriod};
use crate::workflows::equity::{eligibility, vesting, EligibilityVerdict, MembershipId};
use crate::workflows::money;
use crate::workflows::policy::{AllocationStrategy, LendingPolicy};

/// Bounded re-planning when a concurrent submission moves a grant's
/// reservation totals between our read and our commit.
const MAX_ALLOCATION_RETRIES: u32 = 3;
const ALLOCATION_STRATEGY: AllocationStrategy = AllocationStrategy::OldestVestedFirst;
/// Equity election paperwork is due this many days after activation.
const ELECTION_WINDOW_DAYS: u64 = 30;

/// Error surface of the origination workflow.
#[derive(Debug, thiserror::Error)]
pub enum OriginationError {
    #[error(transparent)]
    Quote(#[from] QuoteError),
    #[error(transparent)]
    Reservation(#[from] ReservationError),
    #[error("eligibility rules failed: {}", .0.reason_codes().join(", "))]
    EligibilityFailed(EligibilityVerdict),
    #[error("application not found")]
    NotFound,
    #[error("membership not found")]
    UnknownMembership,
    #[error("stale version: expected {expected}, found {found}")]
    StaleVersion { expected: u64, found: u64 },
    #[error("cannot move a {from} application to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
    #[error("submission key {key} is already bound to another application")]
    IdempotencyConflict { key: String },
    #[error("a rejection requires a decision reason")]
    MissingDecisionReason,
    #[error("application is {status}; only drafts can be edited")]
    NotADraft { status: &'static str },
    #[error("repayments require an active loan; application is {status}")]
    LoanNotActive { status: &'static str },
    #[error("invalid repayment: {detail}")]
    InvalidRepayment { detail: String },
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for OriginationError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound => OriginationError::NotFound,
            StoreError::VersionConflict { expected, found } => {
                OriginationError::StaleVersion { expected, found }
            }
            StoreError::TransitionDenied { from, to } => {
                OriginationError::InvalidTransition { from, to }
            }
            StoreError::NotDraft { status } => OriginationError::NotADraft { status },
            StoreError::InactiveLoan { status } => OriginationError::LoanNotActive { status },
            StoreError::KeyConflict { key } => OriginationError::IdempotencyConflict { key },
            other => OriginationError::Store(other),
        }
    }
}

/// Create a draft application.
#[derive(Debug, Clone)]
pub struct CreateApplication {
    pub membership_id: MembershipId,
    pub creation_key: String,
    pub terms: LoanTerms,
}

/// Submit a draft: eligibility, allocation, quote, snapshots, one commit.
#[derive(Debug, Clone)]
pub struct SubmitApplication {
    pub application_id: ApplicationId,
    pub submission_key: String,
    pub expected_version: u64,
    pub as_of: NaiveDate,
}

/// Move a submitted application through review.
#[derive(Debug, Clone)]
pub struct AdvanceApplication {
    pub application_id: ApplicationId,
    pub next_status: LoanStatus,
    pub expected_version: u64,
    pub decision_reason: Option<String>,
    pub as_of: NaiveDate,
}

/// Append a repayment against an active loan.
#[derive(Debug, Clone)]
pub struct RecordRepayment {
    pub application_id: ApplicationId,
    pub amount: Decimal,
    pub principal_component: Decimal,
    pub interest_component: Decimal,
    pub paid_on: NaiveDate,
    pub note: Option<String>,
}

/// What-if quote for a membership's current position.
#[derive(Debug, Clone, Serialize)]
pub struct QuotePreview {
    pub membership_id: MembershipId,
    pub as_of: NaiveDate,
    pub available_shares: u64,
    pub requested_shares: u64,
    pub eligibility: EligibilityVerdict,
    pub quote: LoanQuote,
    pub options: Vec<LoanQuote>,
}

/// One application with everything hanging off it.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationDetails {
    pub application: LoanApplication,
    pub reservations: Vec<Reservation>,
    pub repayments: Vec<LoanRepayment>,
    pub schedule: Vec<SchedulePeriod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentStatus>,
}

/// Service composing vesting, eligibility, allocation, quoting, and the
/// workflow state machine over a store and an audit sink.
pub struct LoanOriginationService<S, A> {
    store: Arc<S>,
    audit: Arc<A>,
}

impl<S, A> LoanOriginationService<S, A>
where
    S: LendingStore + 'static,
    A: AuditSink + 'static,
{
    pub fn new(store: Arc<S>, audit: Arc<A>) -> Self {
        Self { store, audit }
    }

    /// Quote the borrower's current position without touching state.
    pub fn quote_preview(
        &self,
        membership_id: MembershipId,
        terms: LoanTerms,
        as_of: NaiveDate,
    ) -> Result<QuotePreview, OriginationError> {
        let profile = self
            .store
            .membership(membership_id)?
            .ok_or(OriginationError::UnknownMembership)?;
        let policy = self.store.lending_policy()?;
        let grants = self.store.grants_for(membership_id)?;
        let reserved = self.store.reserved_by_grant(membership_id)?;

        let vested = vesting::total_vested(&grants, as_of);
        let verdict = eligibility::evaluate(&profile, &policy, vested, as_of);
        if !verdict.eligible {
            return Err(OriginationError::EligibilityFailed(verdict));
        }

        let pool = reservation::availability_from(&grants, &reserved, as_of);
        let available: u64 = pool.iter().map(GrantAvailability::available).sum();
        let requested = quote::resolve_selection(terms.selection, available)?;
        let plan = reservation::plan_allocation(&pool, requested, ALLOCATION_STRATEGY)?;
        let quote = quote::build_quote(
            &plan.lines,
            &policy,
            terms.interest_type,
            terms.repayment_method,
            terms.term_months,
        )?;
        let options = quote::quote_options(&plan.lines, &policy, terms.term_months);

        Ok(QuotePreview {
            membership_id,
            as_of,
            available_shares: available,
            requested_shares: requested,
            eligibility: verdict,
            quote,
            options,
        })
    }

    /// Create a draft. Replaying a creation key returns the draft it
    /// already created.
    pub fn create_application(
        &self,
        command: CreateApplication,
    ) -> Result<UpsertOutcome<LoanApplication>, OriginationError> {
        if self.store.membership(command.membership_id)?.is_none() {
            return Err(OriginationError::UnknownMembership);
        }
        let policy = self.store.lending_policy()?;
        validate_terms(&policy, &command.terms)?;

        let draft = LoanApplication::draft(
            command.membership_id,
            command.creation_key,
            command.terms,
            Utc::now(),
        );
        let outcome = self.store.create_application(draft)?;
        if let UpsertOutcome::Created(application) = &outcome {
            self.emit_audit("owner", "create", None, application);
        }
        Ok(outcome)
    }

    /// Replace a draft's terms under an optimistic version check.
    pub fn update_draft(
        &self,
        application_id: ApplicationId,
        terms: LoanTerms,
        expected_version: u64,
    ) -> Result<LoanApplication, OriginationError> {
        let policy = self.store.lending_policy()?;
        validate_terms(&policy, &terms)?;
        let before = self
            .store
            .application(application_id)?
            .ok_or(OriginationError::NotFound)?;
        let updated = self
            .store
            .update_draft(application_id, expected_version, terms, Utc::now())?;
        self.emit_audit("owner", "update_draft", Some(&before), &updated);
        Ok(updated)
    }

    /// Submit a draft. Eligibility and allocation run first; the commit
    /// lands reservations, all four snapshots, the denormalized economics,
    /// and the status move atomically. Replaying the submission key returns
    /// the already-submitted row.
    pub fn submit_application(
        &self,
        command: SubmitApplication,
    ) -> Result<UpsertOutcome<LoanApplication>, OriginationError> {
        let application = self
            .store
            .application(command.application_id)?
            .ok_or(OriginationError::NotFound)?;
        if application.status != LoanStatus::Draft {
            if application.submission_key.as_deref() == Some(command.submission_key.as_str()) {
                return Ok(UpsertOutcome::Existing(application));
            }
            return Err(OriginationError::InvalidTransition {
                from: application.status.label(),
                to: LoanStatus::Submitted.label(),
            });
        }

        let profile = self
            .store
            .membership(application.membership_id)?
            .ok_or(OriginationError::UnknownMembership)?;
        let policy = self.store.lending_policy()?;
        let grants = self.store.grants_for(application.membership_id)?;

        let vested = vesting::total_vested(&grants, command.as_of);
        let verdict = eligibility::evaluate(&profile, &policy, vested, command.as_of);
        if !verdict.eligible {
            return Err(OriginationError::EligibilityFailed(verdict));
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            let reserved = self.store.reserved_by_grant(application.membership_id)?;
            let pool = reservation::availability_from(&grants, &reserved, command.as_of);
            let available: u64 = pool.iter().map(GrantAvailability::available).sum();
            let requested = quote::resolve_selection(application.terms.selection, available)?;
            let plan = reservation::plan_allocation(&pool, requested, ALLOCATION_STRATEGY)?;
            let quote = quote::build_quote(
                &plan.lines,
                &policy,
                application.terms.interest_type,
                application.terms.repayment_method,
                application.terms.term_months,
            )?;

            let snapshots = SubmissionSnapshots {
                policy: policy.snapshot(),
                quote_inputs: json!({
                    "membership_id": application.membership_id,
                    "as_of": command.as_of,
                    "selection": application.terms.selection,
                    "requested_shares": requested,
                    "available_shares": available,
                    "pool": pool,
                }),
                quote_option: quote.snapshot(),
                allocation: plan.snapshot(),
            };

            match self.store.commit_submission(SubmissionCommit {
                application_id: application.id,
                expected_version: command.expected_version,
                submission_key: command.submission_key.clone(),
                plan,
                economics: quote.economics(),
                snapshots,
                submitted_at: Utc::now(),
            }) {
                Ok(outcome) => {
                    if let UpsertOutcome::Created(submitted) = &outcome {
                        self.emit_audit("owner", "submit", Some(&application), submitted);
                    }
                    return Ok(outcome);
                }
                Err(StoreError::ReservationConflict { grant_id })
                    if attempt < MAX_ALLOCATION_RETRIES =>
                {
                    debug!(%grant_id, attempt, "reservation totals moved; replanning allocation");
                }
                Err(error) => return Err(error.into()),
            }
        }
    }

    /// Move an application through review. The caller's `expected_version`
    /// must match or nothing changes.
    pub fn advance_application(
        &self,
        command: AdvanceApplication,
    ) -> Result<LoanApplication, OriginationError> {
        let before = self
            .store
            .application(command.application_id)?
            .ok_or(OriginationError::NotFound)?;
        // Submission runs through submit_application so snapshots and
        // reservations land together; advance never reaches SUBMITTED.
        if matches!(command.next_status, LoanStatus::Draft | LoanStatus::Submitted) {
            return Err(OriginationError::InvalidTransition {
                from: before.status.label(),
                to: command.next_status.label(),
            });
        }
        if command.next_status == LoanStatus::Rejected && command.decision_reason.is_none() {
            return Err(OriginationError::MissingDecisionReason);
        }

        let (activated_on, election_due_on) = if command.next_status == LoanStatus::Active {
            (Some(command.as_of), Some(election_due(command.as_of)))
        } else {
            (None, None)
        };
        let closed_on = command.next_status.is_terminal().then_some(command.as_of);

        let updated = self.store.commit_transition(TransitionCommit {
            application_id: command.application_id,
            expected_version: command.expected_version,
            next_status: command.next_status,
            decision_reason: command.decision_reason,
            activated_on,
            election_due_on,
            closed_on,
            recorded_at: Utc::now(),
        })?;
        self.emit_audit("reviewer", "advance", Some(&before), &updated);
        Ok(updated)
    }

    /// Append a repayment against an active loan. The loan completes in the
    /// same transaction once the ledger retires the principal.
    pub fn record_repayment(
        &self,
        command: RecordRepayment,
    ) -> Result<RepaymentOutcome, OriginationError> {
        validate_repayment(&command)?;
        let before = self
            .store
            .application(command.application_id)?
            .ok_or(OriginationError::NotFound)?;

        let repayment = LoanRepayment {
            id: RepaymentId::generate(),
            application_id: command.application_id,
            amount: command.amount,
            principal_component: command.principal_component,
            interest_component: command.interest_component,
            paid_on: command.paid_on,
            note: command.note,
            recorded_at: Utc::now(),
        };
        let outcome = self.store.append_repayment(repayment)?;
        self.emit_audit("owner", "repayment", Some(&before), &outcome.application);
        Ok(outcome)
    }

    /// Fetch an application with reservations, ledger, schedule, and
    /// payment standing.
    pub fn application_details(
        &self,
        application_id: ApplicationId,
        as_of: NaiveDate,
    ) -> Result<ApplicationDetails, OriginationError> {
        let application = self
            .store
            .application(application_id)?
            .ok_or(OriginationError::NotFound)?;
        let reservations = self.store.reservations_for(application_id)?;
        let repayments = self.store.repayments_for(application_id)?;

        let schedule = match (application.economics.as_ref(), application.activated_on) {
            (Some(economics), Some(activated_on)) => schedule::build_schedule(
                economics.principal,
                economics.annual_rate_percent,
                application.terms.term_months,
                application.terms.repayment_method,
                schedule::first_due_date(activated_on),
            ),
            _ => Vec::new(),
        };
        let payment = if schedule.is_empty() {
            None
        } else {
            Some(schedule::payment_status(&schedule, &repayments, as_of))
        };

        Ok(ApplicationDetails {
            application,
            reservations,
            repayments,
            schedule,
            payment,
        })
    }

    /// Read-only dashboard composition for one membership.
    pub fn self_dashboard(
        &self,
        membership_id: MembershipId,
        as_of: NaiveDate,
    ) -> Result<SelfDashboard, OriginationError> {
        let profile = self
            .store
            .membership(membership_id)?
            .ok_or(OriginationError::UnknownMembership)?;
        let policy = self.store.lending_policy()?;
        let grants = self.store.grants_for(membership_id)?;
        let reserved = self.store.reserved_by_grant(membership_id)?;
        let applications = self.store.applications_for(membership_id)?;
        let active_repayments = match applications
            .iter()
            .find(|application| application.status == LoanStatus::Active)
        {
            Some(active) => self.store.repayments_for(active.id)?,
            None => Vec::new(),
        };

        Ok(dashboard::compose(
            &profile,
            &policy,
            &grants,
            &reserved,
            &applications,
            &active_repayments,
            as_of,
        ))
    }

    fn emit_audit(
        &self,
        actor: &'static str,
        action: &'static str,
        before: Option<&LoanApplication>,
        after: &LoanApplication,
    ) {
        let (changes, old_document, new_document) = application_diff(before, after);
        let record = AuditRecord {
            application_id: after.id,
            actor,
            action,
            changes,
            before: old_document,
            after: new_document,
            recorded_at: Utc::now(),
        };
        if let Err(error) = self.audit.record(record) {
            warn!(application_id = %after.id, %error, "audit emission failed");
        }
    }
}

fn election_due(activated_on: NaiveDate) -> NaiveDate {
    activated_on
        .checked_add_days(Days::new(ELECTION_WINDOW_DAYS))
        .unwrap_or(activated_on)
}

fn validate_terms(policy: &LendingPolicy, terms: &LoanTerms) -> Result<(), QuoteError> {
    if !policy.term_in_bounds(terms.term_months) {
        return Err(QuoteError::TermOutOfRange {
            months: terms.term_months,
            min: policy.min_loan_term_months,
            max: policy.max_loan_term_months,
        });
    }
    if !policy.allows_interest_type(terms.interest_type) {
        return Err(QuoteError::InterestTypeNotAllowed(terms.interest_type));
    }
    if !policy.allows_repayment_method(terms.repayment_method) {
        return Err(QuoteError::RepaymentMethodNotAllowed(terms.repayment_method));
    }
    quote::validate_selection(terms.selection)
}

fn validate_repayment(command: &RecordRepayment) -> Result<(), OriginationError> {
    if command.amount < Decimal::ZERO
        || command.principal_component < Decimal::ZERO
        || command.interest_component < Decimal::ZERO
    {
        return Err(OriginationError::InvalidRepayment {
            detail: "amounts must be non-negative".to_string(),
        });
    }
    if command.amount.is_zero() {
        return Err(OriginationError::InvalidRepayment {
            detail: "amount must be positive".to_string(),
        });
    }
    let split = command.principal_component + command.interest_component;
    if (split - command.amount).abs() > money::cent() {
        return Err(OriginationError::InvalidRepayment {
            detail: format!(
                "{} principal + {} interest does not reconcile to {}",
                command.principal_component, command.interest_component, command.amount
            ),
        });
    }
    Ok(())
}
