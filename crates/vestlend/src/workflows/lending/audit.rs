//! Audit emission for workflow transitions. Records are attempted
//! synchronously before a transition is acknowledged; a failing sink is
//! logged and never fails the transition itself.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use super::domain::{ApplicationId, LoanApplication};

/// One field that changed across a transition, as old/new values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub field: &'static str,
    pub before: Value,
    pub after: Value,
}

/// Immutable record of one workflow action.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub application_id: ApplicationId,
    pub actor: &'static str,
    pub action: &'static str,
    pub changes: Vec<FieldChange>,
    pub before: Value,
    pub after: Value,
    pub recorded_at: DateTime<Utc>,
}

/// Write-only audit sink consumed by the origination service.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: AuditRecord) -> Result<(), AuditError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit sink unavailable: {0}")]
    Unavailable(String),
}

fn to_document(application: &LoanApplication) -> Value {
    serde_json::to_value(application).unwrap_or(Value::Null)
}

fn push_change(changes: &mut Vec<FieldChange>, field: &'static str, before: Value, after: Value) {
    if before != after {
        changes.push(FieldChange {
            field,
            before,
            after,
        });
    }
}

/// Diff the fields a transition is allowed to touch, plus the full old/new
/// documents for verbatim retention.
pub fn application_diff(
    before: Option<&LoanApplication>,
    after: &LoanApplication,
) -> (Vec<FieldChange>, Value, Value) {
    let mut changes = Vec::new();
    let old_status = before.map(|app| app.status.label());
    push_change(
        &mut changes,
        "status",
        json!(old_status),
        json!(after.status.label()),
    );
    push_change(
        &mut changes,
        "version",
        json!(before.map(|app| app.version)),
        json!(after.version),
    );
    push_change(
        &mut changes,
        "submission_key",
        json!(before.and_then(|app| app.submission_key.clone())),
        json!(after.submission_key),
    );
    push_change(
        &mut changes,
        "activated_on",
        json!(before.and_then(|app| app.activated_on)),
        json!(after.activated_on),
    );
    push_change(
        &mut changes,
        "election_due_on",
        json!(before.and_then(|app| app.election_due_on)),
        json!(after.election_due_on),
    );
    push_change(
        &mut changes,
        "closed_on",
        json!(before.and_then(|app| app.closed_on)),
        json!(after.closed_on),
    );
    push_change(
        &mut changes,
        "decision_reason",
        json!(before.and_then(|app| app.decision_reason.clone())),
        json!(after.decision_reason),
    );

    let old_document = before.map(to_document).unwrap_or(Value::Null);
    (changes, old_document, to_document(after))
}
