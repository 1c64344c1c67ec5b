//! Ledger routes.
//!
//! Postings, balances, previews, reconciliation, opening balances and
//! approvals. Every route here sits behind the auth middleware.

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
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::{AppState, middleware::AuthUser};
use ledgerline_core::{ApprovalStatus, Direction, EntryDraft, EntryFilter, EntryKind};
use ledgerline_shared::types::{AdvanceId, EmployeeId, LedgerEntryId, PageRequest};

/// Creates the ledger routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ledger", get(list_entries))
        .route("/ledger/balance/{employee_id}", get(get_balance))
        .route("/ledger/summary/{employee_id}", get(get_summary))
        .route("/ledger/preview", post(preview))
        .route("/ledger/reconciliation/{employee_id}", get(reconcile))
        .route("/ledger/statistics", get(statistics))
        .route("/ledger/employees", post(open_ledger))
        .route("/ledger/expense", post(post_expense))
        .route("/ledger/cash-return", post(post_cash_return))
        .route("/ledger/reimbursement", post(post_reimbursement))
        .route("/ledger/opening-balance", post(set_opening_balance))
        .route("/ledger/entries/{entry_id}/approve", post(approve_entry))
        .route("/ledger/entries/{entry_id}/reject", post(reject_entry))
        .route("/ledger/audit/{employee_id}", get(get_audit))
}

// ============================================================================
// Request Types
// ============================================================================

/// Query parameters for listing entries.
#[derive(Debug, Default, Deserialize)]
pub struct ListEntriesQuery {
    /// Restrict to one employee.
    pub employee_id: Option<EmployeeId>,
    /// Entry kind, e.g. `EXPENSE`.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// `CR`/`DR` (or `CREDIT`/`DEBIT`).
    pub direction: Option<String>,
    /// Approval status.
    pub status: Option<String>,
    /// Inclusive lower date bound.
    pub date_from: Option<NaiveDate>,
    /// Inclusive upper date bound.
    pub date_to: Option<NaiveDate>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Page size, capped by configuration.
    pub per_page: Option<u32>,
}

impl ListEntriesQuery {
    fn filter(&self) -> ApiResult<EntryFilter> {
        let kind = self
            .kind
            .as_deref()
            .map(|s| parse(s, EntryKind::parse, "entry type"))
            .transpose()?;
        let direction = self
            .direction
            .as_deref()
            .map(|s| parse(s, Direction::parse, "direction"))
            .transpose()?;
        let approval_status = self
            .status
            .as_deref()
            .map(|s| parse(s, ApprovalStatus::parse, "status"))
            .transpose()?;

        if let (Some(from), Some(to)) = (self.date_from, self.date_to)
            && from > to
        {
            return Err(ApiError::validation("date_from must not be after date_to"));
        }

        Ok(EntryFilter {
            kind,
            direction,
            approval_status,
            date_from: self.date_from,
            date_to: self.date_to,
        })
    }
}

fn parse<T>(value: &str, parser: fn(&str) -> Option<T>, what: &str) -> ApiResult<T> {
    parser(value).ok_or_else(|| ApiError::validation(format!("unknown {what} '{value}'")))
}

/// Query parameters for reconciliation.
#[derive(Debug, Deserialize)]
pub struct ReconciliationQuery {
    /// Start of the range; defaults to the first entry's date.
    pub date_from: Option<NaiveDate>,
    /// End of the range; defaults to today.
    pub date_to: Option<NaiveDate>,
}

/// Body for expense, cash return and reimbursement postings.
#[derive(Debug, Deserialize)]
pub struct PostEntryRequest {
    /// Owner of the ledger.
    pub employee_id: EmployeeId,
    /// Positive amount.
    pub amount: Decimal,
    /// Advance drawn against (expenses only).
    pub advance_id: Option<AdvanceId>,
    /// Free-form note.
    pub description: Option<String>,
    /// External reference such as a receipt number.
    pub related_entity: Option<String>,
    /// `PENDING` to hold the entry for approval; defaults to `APPROVED`.
    /// `REJECTED` is refused with `INVALID_INITIAL_STATUS`.
    pub status: Option<ApprovalStatus>,
    /// Version the caller last observed.
    pub expected_version: Option<u64>,
}

impl PostEntryRequest {
    fn into_draft(self, kind: EntryKind) -> (EmployeeId, EntryDraft) {
        let mut draft = EntryDraft::new(kind, self.amount);
        draft.related_advance_id = self.advance_id;
        draft.description = self.description;
        draft.related_entity = self.related_entity;
        draft.approval_status = self.status.unwrap_or_default();
        draft.expected_version = self.expected_version;
        (self.employee_id, draft)
    }
}

/// Body for a dry-run posting.
#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    /// Owner of the ledger.
    pub employee_id: EmployeeId,
    /// Kind of entry to preview.
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Amount; signed only for opening balances.
    pub amount: Decimal,
    /// Advance drawn against (expenses only).
    pub related_advance_id: Option<AdvanceId>,
    /// External reference.
    pub related_entity: Option<String>,
    /// Free-form note.
    pub description: Option<String>,
    /// Purpose, for advance issues.
    pub purpose: Option<String>,
    /// Expiry, for advance issues.
    pub expiry_date: Option<NaiveDate>,
    /// Effective date, for opening balances.
    pub effective_date: Option<NaiveDate>,
    /// Approval status; defaults to `APPROVED`.
    pub status: Option<ApprovalStatus>,
    /// Version the caller last observed.
    pub expected_version: Option<u64>,
}

impl PreviewRequest {
    fn into_draft(self) -> (EmployeeId, EntryDraft) {
        let mut draft = EntryDraft::new(self.kind, self.amount);
        draft.related_advance_id = self.related_advance_id;
        draft.related_entity = self.related_entity;
        draft.description = self.description;
        draft.purpose = self.purpose;
        draft.expiry_date = self.expiry_date;
        draft.effective_date = self.effective_date;
        draft.approval_status = self.status.unwrap_or_default();
        draft.expected_version = self.expected_version;
        (self.employee_id, draft)
    }
}

/// Body for opening a ledger.
#[derive(Debug, Deserialize)]
pub struct OpenLedgerRequest {
    /// Employee to open the ledger for.
    pub employee_id: EmployeeId,
}

/// Body for setting an opening balance.
#[derive(Debug, Deserialize)]
pub struct OpeningBalanceRequest {
    /// Owner of the ledger.
    pub employee_id: EmployeeId,
    /// Signed starting balance.
    pub amount: Decimal,
    /// Date the balance applies from; defaults to today.
    pub effective_date: Option<NaiveDate>,
    /// Replace an existing opening balance instead of failing.
    #[serde(default)]
    pub correction: bool,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/ledger` - List entries with filters and pagination.
async fn list_entries(
    State(state): State<AppState>,
    Query(query): Query<ListEntriesQuery>,
) -> ApiResult<impl IntoResponse> {
    let filter = query.filter()?;
    let page = PageRequest::new(query.page, query.per_page, state.ledger_config.max_page_size);

    let entries = match query.employee_id {
        Some(employee_id) => state.repository.entries(employee_id, &filter).await?,
        None => state.repository.all_entries(&filter).await,
    };
    Ok(Json(page.paginate(entries)))
}

/// GET `/ledger/balance/{employee_id}` - Cached current balance.
async fn get_balance(
    State(state): State<AppState>,
    Path(employee_id): Path<EmployeeId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.repository.balance(employee_id).await?))
}

/// GET `/ledger/summary/{employee_id}` - Full balance summary.
async fn get_summary(
    State(state): State<AppState>,
    Path(employee_id): Path<EmployeeId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.repository.summary(employee_id).await?))
}

/// POST `/ledger/preview` - Dry run; nothing is persisted.
///
/// Entry and advance ids in the response are placeholders; committing the same
/// draft assigns fresh ones.
async fn preview(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<PreviewRequest>,
) -> ApiResult<impl IntoResponse> {
    let (employee_id, draft) = body.into_draft();
    let preview = state
        .repository
        .preview(employee_id, draft, auth.user_id())
        .await?;
    Ok(Json(preview))
}

/// GET `/ledger/reconciliation/{employee_id}` - Reconcile over a date range.
async fn reconcile(
    State(state): State<AppState>,
    Path(employee_id): Path<EmployeeId>,
    Query(query): Query<ReconciliationQuery>,
) -> ApiResult<impl IntoResponse> {
    let summary = state
        .repository
        .reconcile(employee_id, query.date_from, query.date_to)
        .await?;
    Ok(Json(summary))
}

/// GET `/ledger/statistics` - Organization-wide figures. Admin only.
async fn statistics(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<impl IntoResponse> {
    auth.require_admin()?;
    Ok(Json(state.repository.statistics().await))
}

/// POST `/ledger/employees` - Open an empty ledger.
async fn open_ledger(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<OpenLedgerRequest>,
) -> ApiResult<impl IntoResponse> {
    let summary = state.repository.open_ledger(body.employee_id, auth.user_id())?;
    Ok((StatusCode::CREATED, Json(summary)))
}

/// POST `/ledger/expense` - Post an expense, optionally against an advance.
async fn post_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<PostEntryRequest>,
) -> ApiResult<impl IntoResponse> {
    post_entry(&state, &auth, body, EntryKind::Expense).await
}

/// POST `/ledger/cash-return` - Record cash handed back.
async fn post_cash_return(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<PostEntryRequest>,
) -> ApiResult<impl IntoResponse> {
    post_entry(&state, &auth, body, EntryKind::CashReturn).await
}

/// POST `/ledger/reimbursement` - Record money paid to the employee.
async fn post_reimbursement(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<PostEntryRequest>,
) -> ApiResult<impl IntoResponse> {
    post_entry(&state, &auth, body, EntryKind::Reimbursement).await
}

async fn post_entry(
    state: &AppState,
    auth: &AuthUser,
    body: PostEntryRequest,
    kind: EntryKind,
) -> ApiResult<(StatusCode, Json<ledgerline_core::PostingOutcome>)> {
    let (employee_id, draft) = body.into_draft(kind);
    let outcome = state
        .repository
        .append(employee_id, draft, auth.user_id())
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// POST `/ledger/opening-balance` - Set or correct the opening balance. Admin only.
async fn set_opening_balance(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<OpeningBalanceRequest>,
) -> ApiResult<impl IntoResponse> {
    auth.require_admin()?;
    let effective_date = body
        .effective_date
        .unwrap_or_else(|| state.repository.today());

    let outcome = if body.correction {
        state
            .repository
            .correct_opening_balance(body.employee_id, body.amount, effective_date, auth.user_id())
            .await?
    } else {
        state
            .repository
            .set_opening_balance(body.employee_id, body.amount, effective_date, auth.user_id())
            .await?
    };

    info!(
        employee_id = %body.employee_id,
        actor = %auth.user_id(),
        correction = body.correction,
        "Opening balance request applied"
    );
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// POST `/ledger/entries/{entry_id}/approve` - Admin only.
async fn approve_entry(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(entry_id): Path<LedgerEntryId>,
) -> ApiResult<impl IntoResponse> {
    decide(&state, &auth, entry_id, ApprovalStatus::Approved).await
}

/// POST `/ledger/entries/{entry_id}/reject` - Admin only.
async fn reject_entry(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(entry_id): Path<LedgerEntryId>,
) -> ApiResult<impl IntoResponse> {
    decide(&state, &auth, entry_id, ApprovalStatus::Rejected).await
}

async fn decide(
    state: &AppState,
    auth: &AuthUser,
    entry_id: LedgerEntryId,
    status: ApprovalStatus,
) -> ApiResult<Json<ledgerline_core::LedgerEntry>> {
    auth.require_admin()?;
    let entry = state
        .repository
        .set_approval(entry_id, status, auth.user_id())
        .await?;
    Ok(Json(entry))
}

/// GET `/ledger/audit/{employee_id}` - Audit trail.
async fn get_audit(
    State(state): State<AppState>,
    Path(employee_id): Path<EmployeeId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.repository.audit(employee_id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{TestApp, USER};
    use axum::http::StatusCode;
    use rust_decimal_macros::dec;
    use serde_json::{Value, json};

    #[test]
    fn test_filter_parses_wire_values() {
        let query = ListEntriesQuery {
            kind: Some("expense".to_string()),
            direction: Some("DR".to_string()),
            status: Some("PENDING".to_string()),
            ..ListEntriesQuery::default()
        };
        let filter = query.filter().unwrap();
        assert_eq!(filter.kind, Some(EntryKind::Expense));
        assert_eq!(filter.direction, Some(Direction::Debit));
        assert_eq!(filter.approval_status, Some(ApprovalStatus::Pending));
    }

    #[test]
    fn test_filter_rejects_unknown_type() {
        let query = ListEntriesQuery {
            kind: Some("BONUS".to_string()),
            ..ListEntriesQuery::default()
        };
        assert!(query.filter().is_err());
    }

    #[tokio::test]
    async fn test_requires_bearer_token() {
        let app = TestApp::new();
        let (status, body) = app.request_without_token("GET", "/ledger").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let app = TestApp::new();
        let (status, body) = app.request_without_token("GET", "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_expense_flow() {
        let app = TestApp::new();
        let employee = EmployeeId::new();
        app.open(employee).await;

        let (status, issued) = app
            .post(
                USER,
                "/advances/issue",
                json!({ "employee_id": employee, "amount": "15000", "purpose": "TRAVEL" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let advance_id = issued["advance"]["id"].clone();

        let (status, spent) = app
            .post(
                USER,
                "/ledger/expense",
                json!({ "employee_id": employee, "amount": "2500", "advance_id": advance_id }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(spent["entry"]["running_balance"], "12500");
        assert_eq!(spent["entry"]["direction"], "DEBIT");

        let (status, summary) = app.get(USER, &format!("/ledger/summary/{employee}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["current_balance"], "12500");
        assert_eq!(summary["open_advances"][0]["status"], "PARTIALLY_UTILIZED");

        let (status, page) = app
            .get(USER, &format!("/ledger?employee_id={employee}&type=EXPENSE"))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["meta"]["total"], 1);
    }

    #[tokio::test]
    async fn test_over_utilization_is_422() {
        let app = TestApp::new();
        let employee = EmployeeId::new();
        app.open(employee).await;
        let (_, issued) = app
            .post(
                USER,
                "/advances/issue",
                json!({ "employee_id": employee, "amount": "15000", "purpose": "TRAVEL" }),
            )
            .await;

        let (status, body) = app
            .post(
                USER,
                "/ledger/expense",
                json!({
                    "employee_id": employee,
                    "amount": "20000",
                    "advance_id": issued["advance"]["id"],
                }),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "OVER_UTILIZATION");

        let (_, balance) = app.get(USER, &format!("/ledger/balance/{employee}")).await;
        assert_eq!(balance["current_balance"], "15000");
    }

    #[tokio::test]
    async fn test_invalid_amount_is_400() {
        let app = TestApp::new();
        let employee = EmployeeId::new();
        app.open(employee).await;

        let (status, body) = app
            .post(
                USER,
                "/ledger/reimbursement",
                json!({ "employee_id": employee, "amount": "-5" }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "INVALID_AMOUNT");
    }

    #[tokio::test]
    async fn test_rejected_status_refused_at_posting() {
        let app = TestApp::new();
        let employee = EmployeeId::new();
        app.open(employee).await;

        let (status, body) = app
            .post(
                USER,
                "/ledger/reimbursement",
                json!({ "employee_id": employee, "amount": "30", "status": "REJECTED" }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "INVALID_INITIAL_STATUS");

        let (_, page) = app.get(USER, &format!("/ledger?employee_id={employee}")).await;
        assert_eq!(page["meta"]["total"], 0);
    }

    #[tokio::test]
    async fn test_amount_beyond_range_is_400_and_server_survives() {
        let app = TestApp::new();
        let employee = EmployeeId::new();
        app.open(employee).await;
        let body = json!({ "employee_id": employee, "amount": Decimal::MAX });

        for _ in 0..2 {
            let (status, err) = app.post(USER, "/ledger/reimbursement", body.clone()).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(err["error"], "AMOUNT_OVERFLOW");
        }

        let (status, balance) = app.get(USER, &format!("/ledger/balance/{employee}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(balance["current_balance"], "0");
        assert_eq!(balance["version"], 0);
    }

    #[tokio::test]
    async fn test_unknown_employee_is_404() {
        let app = TestApp::new();
        let (status, body) = app
            .get(USER, &format!("/ledger/balance/{}", EmployeeId::new()))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "EMPLOYEE_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_preview_does_not_persist() {
        let app = TestApp::new();
        let employee = EmployeeId::new();
        app.open(employee).await;

        let (status, preview) = app
            .post(
                USER,
                "/ledger/preview",
                json!({ "employee_id": employee, "type": "EXPENSE", "amount": "40" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(preview["summary"]["current_balance"], "-40");
        assert_eq!(preview["warnings"][0]["code"], "WOULD_CREATE_DEFICIT");

        let (_, balance) = app.get(USER, &format!("/ledger/balance/{employee}")).await;
        assert_eq!(balance["current_balance"], "0");
    }

    #[tokio::test]
    async fn test_opening_balance_admin_only() {
        let app = TestApp::new();
        let employee = EmployeeId::new();
        let body = json!({
            "employee_id": employee,
            "amount": "500",
            "effective_date": "2024-01-01",
        });

        let (status, _) = app.post(USER, "/ledger/opening-balance", body.clone()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, outcome) = app.post_as_admin("/ledger/opening-balance", body.clone()).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(outcome["opening"]["amount"], "500");

        let (status, err) = app.post_as_admin("/ledger/opening-balance", body).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(err["error"], "OPENING_BALANCE_ALREADY_SET");

        let (status, corrected) = app
            .post_as_admin(
                "/ledger/opening-balance",
                json!({
                    "employee_id": employee,
                    "amount": "250",
                    "effective_date": "2024-01-01",
                    "correction": true,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(corrected["opening"]["amount"], "250");
    }

    #[tokio::test]
    async fn test_pending_entry_approval() {
        let app = TestApp::new();
        let employee = EmployeeId::new();
        app.open(employee).await;

        let (_, pending) = app
            .post(
                USER,
                "/ledger/reimbursement",
                json!({ "employee_id": employee, "amount": "75", "status": "PENDING" }),
            )
            .await;
        let entry_id = pending["entry"]["id"].as_str().unwrap().to_string();

        let (status, _) = app
            .post(USER, &format!("/ledger/entries/{entry_id}/approve"), Value::Null)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, approved) = app
            .post_as_admin(&format!("/ledger/entries/{entry_id}/approve"), Value::Null)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(approved["approval_status"], "APPROVED");
        assert_eq!(approved["running_balance"], "75");

        let (status, err) = app
            .post_as_admin(&format!("/ledger/entries/{entry_id}/reject"), Value::Null)
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(err["error"], "INVALID_APPROVAL_TRANSITION");
    }

    #[tokio::test]
    async fn test_statistics_admin_only() {
        let app = TestApp::new();
        let employee = EmployeeId::new();
        app.open(employee).await;
        app.post(
            USER,
            "/ledger/reimbursement",
            json!({ "employee_id": employee, "amount": dec!(12.50) }),
        )
        .await;

        let (status, _) = app.get(USER, "/ledger/statistics").await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, stats) = app.get_as_admin("/ledger/statistics").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["ledger_count"], 1);
        assert_eq!(stats["total_balance"], "12.50");
    }

    #[tokio::test]
    async fn test_reconciliation_route() {
        let app = TestApp::new();
        let employee = EmployeeId::new();
        app.open(employee).await;
        app.post(
            USER,
            "/ledger/reimbursement",
            json!({ "employee_id": employee, "amount": "10" }),
        )
        .await;

        let (status, summary) = app
            .get(USER, &format!("/ledger/reconciliation/{employee}"))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["is_reconciled"], true);
        assert_eq!(summary["actual_closing"], "10");

        let (status, err) = app
            .get(
                USER,
                &format!("/ledger/reconciliation/{employee}?date_from=2024-03-01&date_to=2024-02-01"),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["error"], "INVALID_DATE_RANGE");
    }

    #[tokio::test]
    async fn test_open_ledger_conflict_and_audit() {
        let app = TestApp::new();
        let employee = EmployeeId::new();
        app.open(employee).await;

        let (status, err) = app
            .post(USER, "/ledger/employees", json!({ "employee_id": employee }))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(err["error"], "LEDGER_ALREADY_EXISTS");

        let (status, audit) = app.get(USER, &format!("/ledger/audit/{employee}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(audit[0]["kind"], "LEDGER_OPENED");
    }
}
