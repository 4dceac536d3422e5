use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::workflows::equity::{GrantId, MembershipId};
use crate::workflows::policy::{InterestType, RepaymentMethod};

/// Identifier wrapper for loan applications.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ApplicationId(pub Uuid);

impl ApplicationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier wrapper for share reservations.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ReservationId(pub Uuid);

impl ReservationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier wrapper for repayment ledger entries.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct RepaymentId(pub Uuid);

impl RepaymentId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RepaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Loan application lifecycle. `DRAFT` rows are freely editable by their
/// owner; everything from `SUBMITTED` on is immutable except through
/// workflow transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    Draft,
    Submitted,
    InReview,
    Active,
    Completed,
    Cancelled,
    Rejected,
}

impl LoanStatus {
    pub const fn label(self) -> &'static str {
        match self {
            LoanStatus::Draft => "DRAFT",
            LoanStatus::Submitted => "SUBMITTED",
            LoanStatus::InReview => "IN_REVIEW",
            LoanStatus::Active => "ACTIVE",
            LoanStatus::Completed => "COMPLETED",
            LoanStatus::Cancelled => "CANCELLED",
            LoanStatus::Rejected => "REJECTED",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            LoanStatus::Completed | LoanStatus::Cancelled | LoanStatus::Rejected
        )
    }

    /// Legal workflow moves. Cancellation and rejection are reachable from
    /// every non-terminal state; the happy path is strictly
    /// `DRAFT -> SUBMITTED -> IN_REVIEW -> ACTIVE -> COMPLETED`.
    pub const fn can_transition_to(self, next: LoanStatus) -> bool {
        matches!(
            (self, next),
            (LoanStatus::Draft, LoanStatus::Submitted)
                | (LoanStatus::Draft, LoanStatus::Cancelled)
                | (LoanStatus::Draft, LoanStatus::Rejected)
                | (LoanStatus::Submitted, LoanStatus::InReview)
                | (LoanStatus::Submitted, LoanStatus::Cancelled)
                | (LoanStatus::Submitted, LoanStatus::Rejected)
                | (LoanStatus::InReview, LoanStatus::Active)
                | (LoanStatus::InReview, LoanStatus::Cancelled)
                | (LoanStatus::InReview, LoanStatus::Rejected)
                | (LoanStatus::Active, LoanStatus::Completed)
                | (LoanStatus::Active, LoanStatus::Cancelled)
                | (LoanStatus::Active, LoanStatus::Rejected)
        )
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Reservation standing, mirrored from the owning application's status
/// family. Only `SUBMITTED`, `IN_REVIEW`, and `ACTIVE` claim shares from
/// the vested pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Submitted,
    InReview,
    Active,
    Released,
    Completed,
}

impl ReservationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ReservationStatus::Submitted => "SUBMITTED",
            ReservationStatus::InReview => "IN_REVIEW",
            ReservationStatus::Active => "ACTIVE",
            ReservationStatus::Released => "RELEASED",
            ReservationStatus::Completed => "COMPLETED",
        }
    }

    pub const fn counts_against_pool(self) -> bool {
        matches!(
            self,
            ReservationStatus::Submitted | ReservationStatus::InReview | ReservationStatus::Active
        )
    }

    /// The reservation status that mirrors an application status. `DRAFT`
    /// applications hold no reservations.
    pub const fn for_application(status: LoanStatus) -> Option<Self> {
        match status {
            LoanStatus::Draft => None,
            LoanStatus::Submitted => Some(ReservationStatus::Submitted),
            LoanStatus::InReview => Some(ReservationStatus::InReview),
            LoanStatus::Active => Some(ReservationStatus::Active),
            LoanStatus::Completed => Some(ReservationStatus::Completed),
            LoanStatus::Cancelled | LoanStatus::Rejected => Some(ReservationStatus::Released),
        }
    }
}

/// A claim of `shares` against one grant's vested pool, tied to exactly one
/// loan application. At most one reservation exists per (grant, application)
/// pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub grant_id: GrantId,
    pub application_id: ApplicationId,
    pub shares: u64,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
}

/// How the borrower picks a share count: an absolute number or a percentage
/// of the shares currently available to them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShareSelection {
    Shares { count: u64 },
    Percent { percent: Decimal },
}

/// The editable portion of a draft application.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub selection: ShareSelection,
    pub interest_type: InterestType,
    pub repayment_method: RepaymentMethod,
    pub term_months: u32,
}

/// Loan economics denormalized from the accepted quote at submission so
/// reads never recompute what was agreed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanEconomics {
    pub share_count: u64,
    pub annual_rate_percent: Decimal,
    pub purchase_price: Decimal,
    pub down_payment: Decimal,
    pub principal: Decimal,
    pub periodic_payment: Decimal,
    pub total_payable: Decimal,
    pub total_interest: Decimal,
}

/// The four audit documents captured atomically at submission. Write-once:
/// nothing rewrites these after the submit commit lands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionSnapshots {
    pub policy: serde_json::Value,
    pub quote_inputs: serde_json::Value,
    pub quote_option: serde_json::Value,
    pub allocation: serde_json::Value,
}

/// One stock-backed loan application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanApplication {
    pub id: ApplicationId,
    pub membership_id: MembershipId,
    pub status: LoanStatus,
    /// Bumped on every successful write; callers present the version they
    /// read and lose with a stale one.
    pub version: u64,
    pub creation_key: String,
    pub submission_key: Option<String>,
    pub terms: LoanTerms,
    pub economics: Option<LoanEconomics>,
    pub snapshots: Option<SubmissionSnapshots>,
    pub decision_reason: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub activated_on: Option<NaiveDate>,
    pub election_due_on: Option<NaiveDate>,
    pub closed_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LoanApplication {
    pub fn draft(
        membership_id: MembershipId,
        creation_key: String,
        terms: LoanTerms,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ApplicationId::generate(),
            membership_id,
            status: LoanStatus::Draft,
            version: 1,
            creation_key,
            submission_key: None,
            terms,
            economics: None,
            snapshots: None,
            decision_reason: None,
            submitted_at: None,
            activated_on: None,
            election_due_on: None,
            closed_on: None,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn view(&self) -> LoanApplicationView {
        LoanApplicationView {
            application_id: self.id,
            membership_id: self.membership_id,
            status: self.status.label(),
            version: self.version,
            terms: self.terms,
            economics: self.economics.clone(),
            submitted_at: self.submitted_at,
            activated_on: self.activated_on,
            election_due_on: self.election_due_on,
            closed_on: self.closed_on,
            decision_reason: self.decision_reason.clone(),
        }
    }
}

/// Sanitized application representation for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct LoanApplicationView {
    pub application_id: ApplicationId,
    pub membership_id: MembershipId,
    pub status: &'static str,
    pub version: u64,
    pub terms: LoanTerms,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub economics: Option<LoanEconomics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activated_on: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub election_due_on: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_on: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision_reason: Option<String>,
}

/// Append-only repayment ledger entry against an active loan. The amount
/// always splits exactly into its principal and interest components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRepayment {
    pub id: RepaymentId,
    pub application_id: ApplicationId,
    pub amount: Decimal,
    pub principal_component: Decimal,
    pub interest_component: Decimal,
    pub paid_on: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub recorded_at: DateTime<Utc>,
}
