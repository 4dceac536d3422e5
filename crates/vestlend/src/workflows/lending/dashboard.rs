//! Self-service dashboard composition. One read model joins the equity
//! position, eligibility standing, the vesting timeline, and the
//! membership's loan activity; composition is pure so the service can feed
//! it from whatever store it runs against.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use super::domain::{LoanApplication, LoanApplicationView, LoanRepayment, LoanStatus};
use super::schedule::{self, PaymentStatus};
use crate::workflows::equity::{
    eligibility, summary, vesting, EligibilityVerdict, GrantId, GrantRecord, MembershipId,
    MembershipProfile, MonthlyVesting, StockPositionSummary, VestingEventView,
};
use crate::workflows::policy::LendingPolicy;

/// How many recent applications and repayments the dashboard carries.
const RECENT_LIMIT: usize = 5;
/// Forward vesting entries shown on the timeline.
const UPCOMING_LIMIT: usize = 6;
/// Calendar months covered by the vesting histogram.
const HISTOGRAM_MONTHS: u32 = 6;

/// The membership's active loan with its live payment standing.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveLoanView {
    pub application: LoanApplicationView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentStatus>,
}

/// Loan activity rollup for one membership.
#[derive(Debug, Clone, Serialize)]
pub struct LoanOverview {
    pub counts_by_status: BTreeMap<&'static str, usize>,
    pub recent: Vec<LoanApplicationView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<ActiveLoanView>,
    pub recent_repayments: Vec<LoanRepayment>,
}

/// Everything the self-service landing page renders in one response.
#[derive(Debug, Clone, Serialize)]
pub struct SelfDashboard {
    pub membership_id: MembershipId,
    pub display_name: String,
    pub as_of: NaiveDate,
    pub position: StockPositionSummary,
    pub eligibility: EligibilityVerdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_event: Option<VestingEventView>,
    pub upcoming_events: Vec<VestingEventView>,
    pub monthly_vesting: Vec<MonthlyVesting>,
    pub loans: LoanOverview,
}

/// Compose the dashboard from already-loaded state. `reserved` carries the
/// counting reservation totals per grant and `active_repayments` the ledger
/// of the active loan, if any.
pub fn compose(
    profile: &MembershipProfile,
    policy: &LendingPolicy,
    records: &[GrantRecord],
    reserved: &BTreeMap<GrantId, u64>,
    applications: &[LoanApplication],
    active_repayments: &[LoanRepayment],
    as_of: NaiveDate,
) -> SelfDashboard {
    let position = summary::position_summary(records, reserved, as_of);
    let verdict = eligibility::evaluate(profile, policy, position.totals.vested, as_of);
    let upcoming = vesting::upcoming_events(records, as_of, UPCOMING_LIMIT);
    let next_event = upcoming.first().copied();
    let monthly = vesting::monthly_vesting(records, as_of, HISTOGRAM_MONTHS);

    SelfDashboard {
        membership_id: profile.id,
        display_name: profile.display_name.clone(),
        as_of,
        position,
        eligibility: verdict,
        next_event,
        upcoming_events: upcoming,
        monthly_vesting: monthly,
        loans: loan_overview(applications, active_repayments, as_of),
    }
}

fn loan_overview(
    applications: &[LoanApplication],
    active_repayments: &[LoanRepayment],
    as_of: NaiveDate,
) -> LoanOverview {
    let mut counts_by_status: BTreeMap<&'static str, usize> = BTreeMap::new();
    for application in applications {
        *counts_by_status
            .entry(application.status.label())
            .or_insert(0) += 1;
    }

    let mut ordered: Vec<&LoanApplication> = applications.iter().collect();
    ordered.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let recent = ordered
        .iter()
        .take(RECENT_LIMIT)
        .map(|application| application.view())
        .collect();

    let active = ordered
        .iter()
        .find(|application| application.status == LoanStatus::Active)
        .map(|application| ActiveLoanView {
            application: application.view(),
            payment: payment_standing(application, active_repayments, as_of),
        });

    let mut recent_repayments: Vec<LoanRepayment> = active_repayments.to_vec();
    recent_repayments.sort_by(|a, b| {
        b.paid_on
            .cmp(&a.paid_on)
            .then(b.recorded_at.cmp(&a.recorded_at))
    });
    recent_repayments.truncate(RECENT_LIMIT);

    LoanOverview {
        counts_by_status,
        recent,
        active,
        recent_repayments,
    }
}

fn payment_standing(
    application: &LoanApplication,
    repayments: &[LoanRepayment],
    as_of: NaiveDate,
) -> Option<PaymentStatus> {
    let economics = application.economics.as_ref()?;
    let activated_on = application.activated_on?;
    let schedule = schedule::build_schedule(
        economics.principal,
        economics.annual_rate_percent,
        application.terms.term_months,
        application.terms.repayment_method,
        schedule::first_due_date(activated_on),
    );
    Some(schedule::payment_status(&schedule, repayments, as_of))
}
