use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use vestlend::error::AppError;
use vestlend::workflows::lending::{
    build_schedule, exports, lending_router, AuditSink, LendingStore, LoanOriginationService,
    SchedulePeriod,
};
use vestlend::workflows::policy::RepaymentMethod;

#[derive(Debug, Deserialize)]
pub(crate) struct SchedulePreviewRequest {
    pub(crate) principal: Decimal,
    pub(crate) annual_rate_percent: Decimal,
    pub(crate) term_months: u32,
    pub(crate) repayment_method: RepaymentMethod,
    pub(crate) first_due: NaiveDate,
    #[serde(default)]
    pub(crate) include_csv: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct SchedulePreviewResponse {
    pub(crate) principal: Decimal,
    pub(crate) annual_rate_percent: Decimal,
    pub(crate) term_months: u32,
    pub(crate) repayment_method: RepaymentMethod,
    pub(crate) total_payable: Decimal,
    pub(crate) total_interest: Decimal,
    pub(crate) periods: Vec<SchedulePeriod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) csv: Option<String>,
}

pub(crate) fn with_lending_routes<S, A>(service: Arc<LoanOriginationService<S, A>>) -> axum::Router
where
    S: LendingStore + 'static,
    A: AuditSink + 'static,
{
    lending_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/lending/schedule/preview",
            axum::routing::post(schedule_preview_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Amortize an arbitrary principal without touching any stored position.
/// Underwriters use this as a spreadsheet-style what-if for terms that no
/// membership currently qualifies for.
pub(crate) async fn schedule_preview_endpoint(
    Json(payload): Json<SchedulePreviewRequest>,
) -> Result<Json<SchedulePreviewResponse>, AppError> {
    let SchedulePreviewRequest {
        principal,
        annual_rate_percent,
        term_months,
        repayment_method,
        first_due,
        include_csv,
    } = payload;

    let periods = build_schedule(
        principal,
        annual_rate_percent,
        term_months,
        repayment_method,
        first_due,
    );
    let total_payable: Decimal = periods.iter().map(|period| period.payment).sum();
    let total_interest: Decimal = periods.iter().map(|period| period.interest_component).sum();
    let csv = if include_csv {
        Some(exports::schedule_csv(&periods)?)
    } else {
        None
    };

    Ok(Json(SchedulePreviewResponse {
        principal,
        annual_rate_percent,
        term_months,
        repayment_method,
        total_payable,
        total_interest,
        periods,
        csv,
    }))
}
