//! Advance routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::{AppState, middleware::AuthUser};
use ledgerline_core::{AdvanceFilter, AdvanceStatus};
use ledgerline_db::IssueAdvanceInput;
use ledgerline_shared::types::{AdvanceId, EmployeeId};

/// Creates the advance routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/advances", get(list_advances))
        .route("/advances/issue", post(issue_advance))
        .route("/advances/employee/{employee_id}", get(employee_advances))
        .route("/advances/{advance_id}", get(get_advance))
        .route("/advances/{advance_id}/close", post(close_advance))
}

/// Query parameters for listing advances.
#[derive(Debug, Deserialize)]
pub struct ListAdvancesQuery {
    /// Restrict to one employee.
    pub employee_id: Option<EmployeeId>,
    /// Restrict to one status, e.g. `OPEN`.
    pub status: Option<String>,
}

/// Body for issuing an advance.
#[derive(Debug, Deserialize)]
pub struct IssueAdvanceRequest {
    /// Employee receiving the cash.
    pub employee_id: EmployeeId,
    /// Positive amount.
    pub amount: Decimal,
    /// Stated purpose, e.g. `TRAVEL`.
    pub purpose: String,
    /// Last day the advance may be drawn against.
    pub expiry_date: Option<NaiveDate>,
    /// Free-form note.
    pub description: Option<String>,
    /// External reference.
    pub related_entity: Option<String>,
}

/// GET `/advances` - List advances.
async fn list_advances(
    State(state): State<AppState>,
    Query(query): Query<ListAdvancesQuery>,
) -> ApiResult<impl IntoResponse> {
    let status = query
        .status
        .as_deref()
        .map(|s| {
            AdvanceStatus::parse(s)
                .ok_or_else(|| ApiError::validation(format!("unknown advance status '{s}'")))
        })
        .transpose()?;
    let filter = AdvanceFilter {
        employee_id: query.employee_id,
        status,
    };
    Ok(Json(state.repository.list_advances(&filter).await))
}

/// GET `/advances/{advance_id}` - One advance.
async fn get_advance(
    State(state): State<AppState>,
    Path(advance_id): Path<AdvanceId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.repository.advance(advance_id).await?))
}

/// GET `/advances/employee/{employee_id}` - One employee's advances.
async fn employee_advances(
    State(state): State<AppState>,
    Path(employee_id): Path<EmployeeId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.repository.employee_advances(employee_id).await?))
}

/// POST `/advances/issue` - Issue an advance and credit the ledger.
async fn issue_advance(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<IssueAdvanceRequest>,
) -> ApiResult<impl IntoResponse> {
    if body.purpose.trim().is_empty() {
        return Err(ApiError::validation("purpose must not be empty"));
    }
    let input = IssueAdvanceInput {
        amount: body.amount,
        purpose: body.purpose,
        expiry_date: body.expiry_date,
        description: body.description,
        related_entity: body.related_entity,
    };
    let outcome = state
        .repository
        .issue_advance(body.employee_id, input, auth.user_id())
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// POST `/advances/{advance_id}/close` - Close an advance.
async fn close_advance(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(advance_id): Path<AdvanceId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        state
            .repository
            .close_advance(advance_id, auth.user_id())
            .await?,
    ))
}
