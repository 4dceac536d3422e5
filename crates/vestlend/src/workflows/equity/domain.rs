use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier wrapper for program memberships (employees enrolled in the
/// equity plan).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct MembershipId(pub Uuid);

impl MembershipId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for MembershipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier wrapper for stock grants.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct GrantId(pub Uuid);

impl GrantId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for GrantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Employment standing reported by the HR system of record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmploymentStatus {
    Active,
    OnLeave,
    Terminated,
}

impl EmploymentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            EmploymentStatus::Active => "ACTIVE",
            EmploymentStatus::OnLeave => "ON_LEAVE",
            EmploymentStatus::Terminated => "TERMINATED",
        }
    }
}

/// Platform account standing, independent of employment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Active,
    Suspended,
    Deactivated,
}

impl AccountStatus {
    pub const fn label(self) -> &'static str {
        match self {
            AccountStatus::Active => "ACTIVE",
            AccountStatus::Suspended => "SUSPENDED",
            AccountStatus::Deactivated => "DEACTIVATED",
        }
    }
}

/// Read-only membership data consumed from the HR collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipProfile {
    pub id: MembershipId,
    pub display_name: String,
    pub employment_status: EmploymentStatus,
    pub account_status: AccountStatus,
    pub employment_start_date: Option<NaiveDate>,
}

impl MembershipProfile {
    /// Both statuses must be active for any exercise activity.
    pub fn is_active(&self) -> bool {
        self.employment_status == EmploymentStatus::Active
            && self.account_status == AccountStatus::Active
    }
}

/// How a grant's shares become exercisable over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VestingStrategy {
    Immediate,
    Scheduled,
}

impl VestingStrategy {
    pub const fn label(self) -> &'static str {
        match self {
            VestingStrategy::Immediate => "IMMEDIATE",
            VestingStrategy::Scheduled => "SCHEDULED",
        }
    }
}

/// Grant lifecycle status. Only `ACTIVE` grants participate in allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GrantStatus {
    Active,
    Suspended,
    Terminated,
}

impl GrantStatus {
    pub const fn label(self) -> &'static str {
        match self {
            GrantStatus::Active => "ACTIVE",
            GrantStatus::Suspended => "SUSPENDED",
            GrantStatus::Terminated => "TERMINATED",
        }
    }
}

/// One equity award to a membership. Immutable once vesting events exist,
/// except for `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockGrant {
    pub id: GrantId,
    pub membership_id: MembershipId,
    pub total_shares: u64,
    pub exercise_price: Decimal,
    pub grant_date: NaiveDate,
    pub strategy: VestingStrategy,
    pub status: GrantStatus,
}

/// A scheduled vesting tranche. `SCHEDULED` grants own the authoritative
/// timeline; `IMMEDIATE` grants carry no events and vest on grant date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestingEvent {
    pub grant_id: GrantId,
    pub vest_date: NaiveDate,
    pub shares: u64,
}

/// A grant with its vesting events fully materialized. Stores hand these
/// out as owned values; nothing is lazily fetched on access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrantRecord {
    pub grant: StockGrant,
    events: Vec<VestingEvent>,
}

impl GrantRecord {
    /// Events are kept sorted by vest date so vesting math and next-event
    /// lookups are deterministic.
    pub fn new(grant: StockGrant, mut events: Vec<VestingEvent>) -> Self {
        events.sort_by(|a, b| a.vest_date.cmp(&b.vest_date).then(a.shares.cmp(&b.shares)));
        Self { grant, events }
    }

    pub fn events(&self) -> &[VestingEvent] {
        &self.events
    }
}
