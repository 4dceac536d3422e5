use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::audit::AuditSink;
use super::domain::{ApplicationId, LoanStatus, LoanTerms};
use super::repository::{LendingStore, UpsertOutcome};
use super::service::{
    AdvanceApplication, CreateApplication, LoanOriginationService, OriginationError,
    RecordRepayment, SubmitApplication,
};
use crate::workflows::equity::MembershipId;

/// Router builder exposing the origination workflow over HTTP.
pub fn lending_router<S, A>(service: Arc<LoanOriginationService<S, A>>) -> Router
where
    S: LendingStore + 'static,
    A: AuditSink + 'static,
{
    Router::new()
        .route("/api/v1/lending/quotes", post(quote_handler::<S, A>))
        .route(
            "/api/v1/lending/applications",
            post(create_handler::<S, A>),
        )
        .route(
            "/api/v1/lending/applications/:application_id",
            get(details_handler::<S, A>),
        )
        .route(
            "/api/v1/lending/applications/:application_id/submit",
            post(submit_handler::<S, A>),
        )
        .route(
            "/api/v1/lending/applications/:application_id/advance",
            post(advance_handler::<S, A>),
        )
        .route(
            "/api/v1/lending/applications/:application_id/repayments",
            post(repayment_handler::<S, A>),
        )
        .route(
            "/api/v1/lending/dashboard/:membership_id",
            get(dashboard_handler::<S, A>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuoteBody {
    pub(crate) membership_id: MembershipId,
    pub(crate) terms: LoanTerms,
    #[serde(default)]
    pub(crate) as_of: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateBody {
    pub(crate) membership_id: MembershipId,
    pub(crate) creation_key: String,
    pub(crate) terms: LoanTerms,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitBody {
    pub(crate) submission_key: String,
    pub(crate) expected_version: u64,
    #[serde(default)]
    pub(crate) as_of: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AdvanceBody {
    pub(crate) next_status: LoanStatus,
    pub(crate) expected_version: u64,
    #[serde(default)]
    pub(crate) decision_reason: Option<String>,
    #[serde(default)]
    pub(crate) as_of: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RepaymentBody {
    pub(crate) amount: Decimal,
    pub(crate) principal_component: Decimal,
    pub(crate) interest_component: Decimal,
    pub(crate) paid_on: NaiveDate,
    #[serde(default)]
    pub(crate) note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AsOfQuery {
    #[serde(default)]
    pub(crate) as_of: Option<NaiveDate>,
}

pub(crate) async fn quote_handler<S, A>(
    State(service): State<Arc<LoanOriginationService<S, A>>>,
    axum::Json(body): axum::Json<QuoteBody>,
) -> Response
where
    S: LendingStore + 'static,
    A: AuditSink + 'static,
{
    let as_of = resolve_as_of(body.as_of);
    match service.quote_preview(body.membership_id, body.terms, as_of) {
        Ok(preview) => (StatusCode::OK, axum::Json(preview)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn create_handler<S, A>(
    State(service): State<Arc<LoanOriginationService<S, A>>>,
    axum::Json(body): axum::Json<CreateBody>,
) -> Response
where
    S: LendingStore + 'static,
    A: AuditSink + 'static,
{
    let command = CreateApplication {
        membership_id: body.membership_id,
        creation_key: body.creation_key,
        terms: body.terms,
    };
    match service.create_application(command) {
        Ok(UpsertOutcome::Created(application)) => {
            (StatusCode::CREATED, axum::Json(application.view())).into_response()
        }
        Ok(UpsertOutcome::Existing(application)) => {
            (StatusCode::OK, axum::Json(application.view())).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn details_handler<S, A>(
    State(service): State<Arc<LoanOriginationService<S, A>>>,
    Path(application_id): Path<Uuid>,
    Query(query): Query<AsOfQuery>,
) -> Response
where
    S: LendingStore + 'static,
    A: AuditSink + 'static,
{
    let as_of = resolve_as_of(query.as_of);
    match service.application_details(ApplicationId(application_id), as_of) {
        Ok(details) => (StatusCode::OK, axum::Json(details)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn submit_handler<S, A>(
    State(service): State<Arc<LoanOriginationService<S, A>>>,
    Path(application_id): Path<Uuid>,
    axum::Json(body): axum::Json<SubmitBody>,
) -> Response
where
    S: LendingStore + 'static,
    A: AuditSink + 'static,
{
    let command = SubmitApplication {
        application_id: ApplicationId(application_id),
        submission_key: body.submission_key,
        expected_version: body.expected_version,
        as_of: resolve_as_of(body.as_of),
    };
    match service.submit_application(command) {
        Ok(UpsertOutcome::Created(application)) => {
            (StatusCode::ACCEPTED, axum::Json(application.view())).into_response()
        }
        Ok(UpsertOutcome::Existing(application)) => {
            (StatusCode::OK, axum::Json(application.view())).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn advance_handler<S, A>(
    State(service): State<Arc<LoanOriginationService<S, A>>>,
    Path(application_id): Path<Uuid>,
    axum::Json(body): axum::Json<AdvanceBody>,
) -> Response
where
    S: LendingStore + 'static,
    A: AuditSink + 'static,
{
    let command = AdvanceApplication {
        application_id: ApplicationId(application_id),
        next_status: body.next_status,
        expected_version: body.expected_version,
        decision_reason: body.decision_reason,
        as_of: resolve_as_of(body.as_of),
    };
    match service.advance_application(command) {
        Ok(application) => (StatusCode::OK, axum::Json(application.view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn repayment_handler<S, A>(
    State(service): State<Arc<LoanOriginationService<S, A>>>,
    Path(application_id): Path<Uuid>,
    axum::Json(body): axum::Json<RepaymentBody>,
) -> Response
where
    S: LendingStore + 'static,
    A: AuditSink + 'static,
{
    let command = RecordRepayment {
        application_id: ApplicationId(application_id),
        amount: body.amount,
        principal_component: body.principal_component,
        interest_component: body.interest_component,
        paid_on: body.paid_on,
        note: body.note,
    };
    match service.record_repayment(command) {
        Ok(outcome) => {
            let payload = json!({
                "repayment": outcome.repayment,
                "application": outcome.application.view(),
                "total_paid": outcome.total_paid,
                "outstanding_principal": outcome.outstanding_principal,
                "completed": outcome.completed,
            });
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn dashboard_handler<S, A>(
    State(service): State<Arc<LoanOriginationService<S, A>>>,
    Path(membership_id): Path<Uuid>,
    Query(query): Query<AsOfQuery>,
) -> Response
where
    S: LendingStore + 'static,
    A: AuditSink + 'static,
{
    let as_of = resolve_as_of(query.as_of);
    match service.self_dashboard(MembershipId(membership_id), as_of) {
        Ok(dashboard) => (StatusCode::OK, axum::Json(dashboard)).into_response(),
        Err(error) => error_response(error),
    }
}

fn resolve_as_of(as_of: Option<NaiveDate>) -> NaiveDate {
    as_of.unwrap_or_else(|| Utc::now().date_naive())
}

fn error_response(error: OriginationError) -> Response {
    let status = match &error {
        OriginationError::Quote(_)
        | OriginationError::MissingDecisionReason
        | OriginationError::InvalidRepayment { .. } => StatusCode::BAD_REQUEST,
        OriginationError::NotFound | OriginationError::UnknownMembership => StatusCode::NOT_FOUND,
        OriginationError::StaleVersion { .. }
        | OriginationError::InvalidTransition { .. }
        | OriginationError::IdempotencyConflict { .. }
        | OriginationError::NotADraft { .. }
        | OriginationError::LoanNotActive { .. } => StatusCode::CONFLICT,
        OriginationError::Reservation(_) | OriginationError::EligibilityFailed(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        OriginationError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = match &error {
        OriginationError::EligibilityFailed(verdict) => json!({
            "error": error.to_string(),
            "reasons": verdict.reason_codes(),
        }),
        _ => json!({ "error": error.to_string() }),
    };
    (status, axum::Json(payload)).into_response()
}
