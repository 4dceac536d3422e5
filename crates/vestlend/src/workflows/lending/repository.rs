use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::domain::{
    ApplicationId, LoanApplication, LoanEconomics, LoanRepayment, LoanStatus, LoanTerms,
    Reservation, SubmissionSnapshots,
};
use super::reservation::AllocationPlan;
use crate::workflows::equity::{GrantId, GrantRecord, MembershipId, MembershipProfile};
use crate::workflows::policy::LendingPolicy;

/// Result of writing against a unique idempotency key: either the row was
/// created by this call or the key already named one, returned as-is.
#[derive(Debug, Clone, PartialEq)]
pub enum UpsertOutcome<T> {
    Created(T),
    Existing(T),
}

impl<T> UpsertOutcome<T> {
    pub fn into_inner(self) -> T {
        match self {
            UpsertOutcome::Created(value) | UpsertOutcome::Existing(value) => value,
        }
    }

    pub fn inner(&self) -> &T {
        match self {
            UpsertOutcome::Created(value) | UpsertOutcome::Existing(value) => value,
        }
    }

    pub fn is_existing(&self) -> bool {
        matches!(self, UpsertOutcome::Existing(_))
    }
}

/// Everything the submit transition writes in one transaction: reservation
/// rows, the four snapshots, the denormalized economics, the status move,
/// and the version bump.
#[derive(Debug, Clone)]
pub struct SubmissionCommit {
    pub application_id: ApplicationId,
    pub expected_version: u64,
    pub submission_key: String,
    pub plan: AllocationPlan,
    pub economics: LoanEconomics,
    pub snapshots: SubmissionSnapshots,
    pub submitted_at: DateTime<Utc>,
}

/// A status move plus the date stamps that belong to it. Reservations of
/// the application are re-statused in the same transaction.
#[derive(Debug, Clone)]
pub struct TransitionCommit {
    pub application_id: ApplicationId,
    pub expected_version: u64,
    pub next_status: LoanStatus,
    pub decision_reason: Option<String>,
    pub activated_on: Option<NaiveDate>,
    pub election_due_on: Option<NaiveDate>,
    pub closed_on: Option<NaiveDate>,
    pub recorded_at: DateTime<Utc>,
}

/// Result of appending a repayment, including whether the ledger retired
/// the remaining principal and completed the loan in the same transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepaymentOutcome {
    pub repayment: LoanRepayment,
    pub application: LoanApplication,
    pub total_paid: Decimal,
    pub outstanding_principal: Decimal,
    pub completed: bool,
}

/// Storage abstraction for the origination workflow. Reads return owned,
/// fully materialized values; writes are atomic with respect to each other.
pub trait LendingStore: Send + Sync {
    fn membership(&self, id: MembershipId) -> Result<Option<MembershipProfile>, StoreError>;
    fn lending_policy(&self) -> Result<LendingPolicy, StoreError>;
    /// A membership's grants with vesting events materialized, ordered by
    /// (grant date, id).
    fn grants_for(&self, membership_id: MembershipId) -> Result<Vec<GrantRecord>, StoreError>;
    /// Counting reservation totals per grant for a membership's grants.
    fn reserved_by_grant(
        &self,
        membership_id: MembershipId,
    ) -> Result<BTreeMap<GrantId, u64>, StoreError>;
    fn application(&self, id: ApplicationId) -> Result<Option<LoanApplication>, StoreError>;
    /// A membership's applications ordered by creation time.
    fn applications_for(
        &self,
        membership_id: MembershipId,
    ) -> Result<Vec<LoanApplication>, StoreError>;
    fn reservations_for(
        &self,
        application_id: ApplicationId,
    ) -> Result<Vec<Reservation>, StoreError>;
    fn repayments_for(
        &self,
        application_id: ApplicationId,
    ) -> Result<Vec<LoanRepayment>, StoreError>;

    /// Insert a draft unless the (membership, creation key) pair already
    /// names one, in which case the existing row comes back untouched.
    fn create_application(
        &self,
        application: LoanApplication,
    ) -> Result<UpsertOutcome<LoanApplication>, StoreError>;
    /// Replace a draft's terms under a version check.
    fn update_draft(
        &self,
        application_id: ApplicationId,
        expected_version: u64,
        terms: LoanTerms,
        updated_at: DateTime<Utc>,
    ) -> Result<LoanApplication, StoreError>;
    /// Land a submission atomically, revalidating the plan's observed
    /// per-grant reservation totals under the same lock that writes the
    /// reservation rows. A replayed submission key on an already-submitted
    /// application returns `Existing`.
    fn commit_submission(
        &self,
        commit: SubmissionCommit,
    ) -> Result<UpsertOutcome<LoanApplication>, StoreError>;
    fn commit_transition(&self, commit: TransitionCommit) -> Result<LoanApplication, StoreError>;
    /// Append a ledger entry against an active loan; completes the loan in
    /// the same transaction once the principal is retired.
    fn append_repayment(&self, repayment: LoanRepayment) -> Result<RepaymentOutcome, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("version conflict: expected {expected}, found {found}")]
    VersionConflict { expected: u64, found: u64 },
    #[error("reservation totals moved for grant {grant_id}")]
    ReservationConflict { grant_id: GrantId },
    #[error("idempotency key {key} is already bound to another application")]
    KeyConflict { key: String },
    #[error("cannot move a {from} application to {to}")]
    TransitionDenied {
        from: &'static str,
        to: &'static str,
    },
    #[error("application is {status}; only drafts can be edited")]
    NotDraft { status: &'static str },
    #[error("application is {status}; repayments require an active loan")]
    InactiveLoan { status: &'static str },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
