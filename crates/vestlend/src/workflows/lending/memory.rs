//! In-memory store. One mutex guards the whole ledger, so every write is a
//! transaction: the submission commit revalidates its observed reservation
//! totals and lands reservations, snapshots, and the status move under the
//! same lock, and terminal transitions release reservations atomically.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use rust_decimal::Decimal;

use super::audit::{AuditError, AuditRecord, AuditSink};
use super::domain::{
    ApplicationId, LoanApplication, LoanRepayment, LoanStatus, Reservation, ReservationId,
    ReservationStatus,
};
use super::repository::{
    LendingStore, RepaymentOutcome, StoreError, SubmissionCommit, TransitionCommit, UpsertOutcome,
};
use crate::workflows::equity::{GrantId, GrantRecord, MembershipId, MembershipProfile};
use crate::workflows::money;
use crate::workflows::policy::LendingPolicy;

struct LedgerState {
    memberships: HashMap<MembershipId, MembershipProfile>,
    grants: HashMap<GrantId, GrantRecord>,
    policy: LendingPolicy,
    applications: HashMap<ApplicationId, LoanApplication>,
    reservations: Vec<Reservation>,
    repayments: Vec<LoanRepayment>,
}

pub struct MemoryLedger {
    state: Mutex<LedgerState>,
}

impl MemoryLedger {
    pub fn new(policy: LendingPolicy) -> Self {
        Self {
            state: Mutex::new(LedgerState {
                memberships: HashMap::new(),
                grants: HashMap::new(),
                policy,
                applications: HashMap::new(),
                reservations: Vec::new(),
                repayments: Vec::new(),
            }),
        }
    }

    fn guard(&self) -> Result<MutexGuard<'_, LedgerState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("ledger mutex poisoned".to_string()))
    }

    pub fn upsert_membership(&self, profile: MembershipProfile) -> Result<(), StoreError> {
        let mut state = self.guard()?;
        state.memberships.insert(profile.id, profile);
        Ok(())
    }

    pub fn upsert_grant(&self, record: GrantRecord) -> Result<(), StoreError> {
        let mut state = self.guard()?;
        state.grants.insert(record.grant.id, record);
        Ok(())
    }

    pub fn set_policy(&self, policy: LendingPolicy) -> Result<(), StoreError> {
        let mut state = self.guard()?;
        state.policy = policy;
        Ok(())
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new(LendingPolicy::standard())
    }
}

fn counting_for_grant(reservations: &[Reservation], grant_id: GrantId) -> u64 {
    reservations
        .iter()
        .filter(|reservation| {
            reservation.grant_id == grant_id && reservation.status.counts_against_pool()
        })
        .map(|reservation| reservation.shares)
        .sum()
}

fn mirror_reservations(
    reservations: &mut [Reservation],
    application_id: ApplicationId,
    status: LoanStatus,
) {
    if let Some(mirrored) = ReservationStatus::for_application(status) {
        for reservation in reservations
            .iter_mut()
            .filter(|reservation| reservation.application_id == application_id)
        {
            reservation.status = mirrored;
        }
    }
}

impl LendingStore for MemoryLedger {
    fn membership(&self, id: MembershipId) -> Result<Option<MembershipProfile>, StoreError> {
        Ok(self.guard()?.memberships.get(&id).cloned())
    }

    fn lending_policy(&self) -> Result<LendingPolicy, StoreError> {
        Ok(self.guard()?.policy.clone())
    }

    fn grants_for(&self, membership_id: MembershipId) -> Result<Vec<GrantRecord>, StoreError> {
        let state = self.guard()?;
        let mut records: Vec<GrantRecord> = state
            .grants
            .values()
            .filter(|record| record.grant.membership_id == membership_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            a.grant
                .grant_date
                .cmp(&b.grant.grant_date)
                .then(a.grant.id.cmp(&b.grant.id))
        });
        Ok(records)
    }

    fn reserved_by_grant(
        &self,
        membership_id: MembershipId,
    ) -> Result<BTreeMap<GrantId, u64>, StoreError> {
        let state = self.guard()?;
        let owned: HashSet<GrantId> = state
            .grants
            .values()
            .filter(|record| record.grant.membership_id == membership_id)
            .map(|record| record.grant.id)
            .collect();
        let mut totals = BTreeMap::new();
        for reservation in state.reservations.iter().filter(|reservation| {
            owned.contains(&reservation.grant_id) && reservation.status.counts_against_pool()
        }) {
            *totals.entry(reservation.grant_id).or_insert(0) += reservation.shares;
        }
        Ok(totals)
    }

    fn application(&self, id: ApplicationId) -> Result<Option<LoanApplication>, StoreError> {
        Ok(self.guard()?.applications.get(&id).cloned())
    }

    fn applications_for(
        &self,
        membership_id: MembershipId,
    ) -> Result<Vec<LoanApplication>, StoreError> {
        let state = self.guard()?;
        let mut applications: Vec<LoanApplication> = state
            .applications
            .values()
            .filter(|application| application.membership_id == membership_id)
            .cloned()
            .collect();
        applications.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(applications)
    }

    fn reservations_for(
        &self,
        application_id: ApplicationId,
    ) -> Result<Vec<Reservation>, StoreError> {
        let state = self.guard()?;
        Ok(state
            .reservations
            .iter()
            .filter(|reservation| reservation.application_id == application_id)
            .cloned()
            .collect())
    }

    fn repayments_for(
        &self,
        application_id: ApplicationId,
    ) -> Result<Vec<LoanRepayment>, StoreError> {
        let state = self.guard()?;
        Ok(state
            .repayments
            .iter()
            .filter(|repayment| repayment.application_id == application_id)
            .cloned()
            .collect())
    }

    fn create_application(
        &self,
        application: LoanApplication,
    ) -> Result<UpsertOutcome<LoanApplication>, StoreError> {
        let mut state = self.guard()?;
        if let Some(existing) = state.applications.values().find(|candidate| {
            candidate.membership_id == application.membership_id
                && candidate.creation_key == application.creation_key
        }) {
            return Ok(UpsertOutcome::Existing(existing.clone()));
        }
        let stored = application.clone();
        state.applications.insert(application.id, application);
        Ok(UpsertOutcome::Created(stored))
    }

    fn update_draft(
        &self,
        application_id: ApplicationId,
        expected_version: u64,
        terms: super::domain::LoanTerms,
        updated_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<LoanApplication, StoreError> {
        let mut state = self.guard()?;
        let application = state
            .applications
            .get_mut(&application_id)
            .ok_or(StoreError::NotFound)?;
        if application.status != LoanStatus::Draft {
            return Err(StoreError::NotDraft {
                status: application.status.label(),
            });
        }
        if application.version != expected_version {
            return Err(StoreError::VersionConflict {
                expected: expected_version,
                found: application.version,
            });
        }
        application.terms = terms;
        application.version += 1;
        application.updated_at = updated_at;
        Ok(application.clone())
    }

    fn commit_submission(
        &self,
        commit: SubmissionCommit,
    ) -> Result<UpsertOutcome<LoanApplication>, StoreError> {
        let mut state = self.guard()?;

        let current = state
            .applications
            .get(&commit.application_id)
            .cloned()
            .ok_or(StoreError::NotFound)?;
        // Replayed submission: same key, already past DRAFT. Return the row
        // as-is; its snapshots were written exactly once.
        if current.status != LoanStatus::Draft
            && current.submission_key.as_deref() == Some(commit.submission_key.as_str())
        {
            return Ok(UpsertOutcome::Existing(current));
        }
        if state.applications.values().any(|other| {
            other.id != commit.application_id
                && other.membership_id == current.membership_id
                && other.submission_key.as_deref() == Some(commit.submission_key.as_str())
        }) {
            return Err(StoreError::KeyConflict {
                key: commit.submission_key,
            });
        }
        if current.version != commit.expected_version {
            return Err(StoreError::VersionConflict {
                expected: commit.expected_version,
                found: current.version,
            });
        }
        if current.status != LoanStatus::Draft {
            return Err(StoreError::TransitionDenied {
                from: current.status.label(),
                to: LoanStatus::Submitted.label(),
            });
        }

        // The oversubscription check: every planned line must still see the
        // reservation total it planned against.
        for line in &commit.plan.lines {
            let counted = counting_for_grant(&state.reservations, line.grant_id);
            if counted != line.observed_reserved {
                return Err(StoreError::ReservationConflict {
                    grant_id: line.grant_id,
                });
            }
        }

        for line in &commit.plan.lines {
            state.reservations.push(Reservation {
                id: ReservationId::generate(),
                grant_id: line.grant_id,
                application_id: commit.application_id,
                shares: line.shares,
                status: ReservationStatus::Submitted,
                created_at: commit.submitted_at,
            });
        }

        let application = state
            .applications
            .get_mut(&commit.application_id)
            .ok_or(StoreError::NotFound)?;
        application.status = LoanStatus::Submitted;
        application.version += 1;
        application.submission_key = Some(commit.submission_key);
        application.economics = Some(commit.economics);
        application.snapshots = Some(commit.snapshots);
        application.submitted_at = Some(commit.submitted_at);
        application.updated_at = commit.submitted_at;
        Ok(UpsertOutcome::Created(application.clone()))
    }

    fn commit_transition(&self, commit: TransitionCommit) -> Result<LoanApplication, StoreError> {
        let mut state = self.guard()?;
        let application = state
            .applications
            .get_mut(&commit.application_id)
            .ok_or(StoreError::NotFound)?;
        if application.version != commit.expected_version {
            return Err(StoreError::VersionConflict {
                expected: commit.expected_version,
                found: application.version,
            });
        }
        if !application.status.can_transition_to(commit.next_status) {
            return Err(StoreError::TransitionDenied {
                from: application.status.label(),
                to: commit.next_status.label(),
            });
        }
        application.status = commit.next_status;
        application.version += 1;
        application.updated_at = commit.recorded_at;
        if commit.decision_reason.is_some() {
            application.decision_reason = commit.decision_reason;
        }
        if commit.activated_on.is_some() {
            application.activated_on = commit.activated_on;
            application.election_due_on = commit.election_due_on;
        }
        if commit.closed_on.is_some() {
            application.closed_on = commit.closed_on;
        }
        let updated = application.clone();
        mirror_reservations(
            &mut state.reservations,
            commit.application_id,
            commit.next_status,
        );
        Ok(updated)
    }

    fn append_repayment(&self, repayment: LoanRepayment) -> Result<RepaymentOutcome, StoreError> {
        let mut state = self.guard()?;
        let current = state
            .applications
            .get(&repayment.application_id)
            .cloned()
            .ok_or(StoreError::NotFound)?;
        if current.status != LoanStatus::Active {
            return Err(StoreError::InactiveLoan {
                status: current.status.label(),
            });
        }
        let principal = match current.economics.as_ref() {
            Some(economics) => economics.principal,
            None => {
                return Err(StoreError::Unavailable(
                    "active loan is missing its economics".to_string(),
                ))
            }
        };

        state.repayments.push(repayment.clone());
        let mut total_paid = Decimal::ZERO;
        let mut principal_paid = Decimal::ZERO;
        for entry in state
            .repayments
            .iter()
            .filter(|entry| entry.application_id == repayment.application_id)
        {
            total_paid += entry.amount;
            principal_paid += entry.principal_component;
        }
        let outstanding_principal = (principal - principal_paid).max(Decimal::ZERO);
        let completed = outstanding_principal < money::cent();

        if completed {
            {
                let application = state
                    .applications
                    .get_mut(&repayment.application_id)
                    .ok_or(StoreError::NotFound)?;
                application.status = LoanStatus::Completed;
                application.version += 1;
                application.closed_on = Some(repayment.paid_on);
                application.updated_at = repayment.recorded_at;
            }
            mirror_reservations(
                &mut state.reservations,
                repayment.application_id,
                LoanStatus::Completed,
            );
        }

        let application = state
            .applications
            .get(&repayment.application_id)
            .cloned()
            .ok_or(StoreError::NotFound)?;
        Ok(RepaymentOutcome {
            repayment,
            application,
            total_paid,
            outstanding_principal,
            completed,
        })
    }
}

/// Audit sink retaining records in memory, for the demo binary and tests.
#[derive(Default)]
pub struct MemoryAuditLog {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

impl AuditSink for MemoryAuditLog {
    fn record(&self, record: AuditRecord) -> Result<(), AuditError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| AuditError::Unavailable("audit log mutex poisoned".to_string()))?;
        records.push(record);
        Ok(())
    }
}
