//! Stock-backed loan origination: share reservation, quoting, and the
//! application workflow.

pub mod audit;
pub mod dashboard;
pub mod domain;
pub mod exports;
pub mod memory;
pub mod quote;
pub mod repository;
pub mod reservation;
pub mod router;
pub mod schedule;
pub mod service;

#[cfg(test)]
mod tests;

pub use audit::{application_diff, AuditError, AuditRecord, AuditSink, FieldChange};
pub use dashboard::{ActiveLoanView, LoanOverview, SelfDashboard};
pub use domain::{
    ApplicationId, LoanApplication, LoanApplicationView, LoanEconomics, LoanRepayment, LoanStatus,
    LoanTerms, RepaymentId, Reservation, ReservationId, ReservationStatus, ShareSelection,
    SubmissionSnapshots,
};
pub use memory::{MemoryAuditLog, MemoryLedger};
pub use quote::{LoanQuote, QuoteError, QuoteLine};
pub use repository::{
    LendingStore, RepaymentOutcome, StoreError, SubmissionCommit, TransitionCommit, UpsertOutcome,
};
pub use reservation::{AllocationLine, AllocationPlan, GrantAvailability, ReservationError};
pub use router::lending_router;
pub use schedule::{build_schedule, payment_status, PaymentStatus, SchedulePeriod};
pub use service::{
    AdvanceApplication, ApplicationDetails, CreateApplication, LoanOriginationService,
    OriginationError, QuotePreview, RecordRepayment, SubmitApplication,
};
