use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, patch, put};
use axum::{Extension, Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{today, ApiJson, ApiPath, ApiQuery, AppState};
use crate::analysis::budget::{budget_analysis, financial_summary, BudgetAnalysis, FinancialSummary};
use crate::analysis::schedule::{overdue_invoices, OverdueInvoice};
use crate::analysis::DateWindow;
use crate::auth::CurrentUser;
use crate::db::{ExpenseFilter, InvoiceFilter};
use crate::error::{ApiError, ApiResult};
use crate::models::{
    Expense, ExpenseCategory, ExpenseInput, ExpenseView, Invoice, InvoiceInput, InvoiceStatus, InvoiceView, Role,
};
use crate::validation::Validate;

const EXPENSE_EDITORS: &[Role] = &[Role::ProjectManager, Role::FinanceManager];
const BILLING: &[Role] = &[Role::FinanceManager];

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/expenses", get(list_expenses).post(create_expense))
        .route("/expenses/:id", put(update_expense).delete(delete_expense))
        .route("/invoices", get(list_invoices).post(create_invoice))
        .route("/invoices/overdue", get(overdue))
        .route("/invoices/:id/status", patch(update_invoice_status))
        .route("/budget/:project_id", get(budget))
        .route("/summary", get(summary))
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseQuery {
    project_id: Option<i32>,
    category: Option<ExpenseCategory>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceQuery {
    project_id: Option<i32>,
    status: Option<InvoiceStatus>,
    milestone_id: Option<i32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceStatusInput {
    status: InvoiceStatus,
    paid_date: Option<NaiveDate>,
}

impl InvoiceStatusInput {
    fn paid_date(&self, today: NaiveDate) -> Option<NaiveDate> {
        match self.status {
            InvoiceStatus::Paid => Some(self.paid_date.unwrap_or(today)),
            _ => None,
        }
    }
}

async fn list_expenses(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ExpenseQuery>,
) -> ApiResult<Json<Vec<ExpenseView>>> {
    let filter = ExpenseFilter {
        project_id: query.project_id,
        category: query.category,
        window: DateWindow::from_bounds(query.start_date, query.end_date),
    };
    Ok(Json(state.db.list_expenses(filter).await?))
}

async fn create_expense(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(input): ApiJson<ExpenseInput>,
) -> ApiResult<(StatusCode, Json<Expense>)> {
    user.require_role(EXPENSE_EDITORS)?;
    input.validate()?;

    let project_id = input
        .project_id
        .ok_or_else(|| ApiError::Validation("projectId is required".to_string()))?;
    if state.db.find_project(project_id).await?.is_none() {
        return Err(ApiError::not_found("Project"));
    }

    let expense = state.db.create_expense(project_id, &input).await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

async fn update_expense(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(input): ApiJson<ExpenseInput>,
) -> ApiResult<Json<Expense>> {
    user.require_role(EXPENSE_EDITORS)?;
    input.validate()?;

    let expense = state
        .db
        .update_expense(id, &input)
        .await?
        .ok_or_else(|| ApiError::not_found("Expense"))?;

    Ok(Json(expense))
}

async fn delete_expense(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Json<Value>> {
    user.require_role(EXPENSE_EDITORS)?;

    if !state.db.delete_expense(id).await? {
        return Err(ApiError::not_found("Expense"));
    }
    Ok(Json(json!({ "message": "Expense deleted successfully" })))
}

async fn list_invoices(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<InvoiceQuery>,
) -> ApiResult<Json<Vec<InvoiceView>>> {
    let filter = InvoiceFilter {
        project_id: query.project_id,
        status: query.status,
        milestone_id: query.milestone_id,
    };
    Ok(Json(state.db.list_invoices(filter).await?))
}

async fn create_invoice(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(input): ApiJson<InvoiceInput>,
) -> ApiResult<(StatusCode, Json<Invoice>)> {
    user.require_role(BILLING)?;
    input.validate()?;

    if state.db.find_project(input.project_id).await?.is_none() {
        return Err(ApiError::not_found("Project"));
    }
    if let Some(milestone_id) = input.milestone_id {
        let milestone = state
            .db
            .find_milestone(milestone_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Milestone"))?;
        if milestone.project_id != input.project_id {
            return Err(ApiError::Validation(
                "Milestone does not belong to the project".to_string(),
            ));
        }
    }

    let invoice = state.db.create_invoice(&input).await?;
    tracing::info!(invoice = invoice.id, number = %invoice.invoice_number, "invoice created");

    Ok((StatusCode::CREATED, Json(invoice)))
}

async fn update_invoice_status(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(input): ApiJson<InvoiceStatusInput>,
) -> ApiResult<Json<Invoice>> {
    user.require_role(BILLING)?;

    let invoice = state
        .db
        .set_invoice_status(id, input.status, input.paid_date(today()))
        .await?
        .ok_or_else(|| ApiError::not_found("Invoice"))?;

    Ok(Json(invoice))
}

async fn overdue(State(state): State<AppState>) -> ApiResult<Json<Vec<OverdueInvoice>>> {
    let invoices = state.db.list_invoices(InvoiceFilter::default()).await?;
    Ok(Json(overdue_invoices(invoices, today())))
}

async fn budget(
    State(state): State<AppState>,
    ApiPath(project_id): ApiPath<i32>,
) -> ApiResult<Json<BudgetAnalysis>> {
    let portfolio = state.db.load_portfolio(Some(&[project_id])).await?;
    let records = portfolio.records();
    let project = records.first().ok_or_else(|| ApiError::not_found("Project"))?;

    Ok(Json(budget_analysis(project)))
}

async fn summary(State(state): State<AppState>) -> ApiResult<Json<FinancialSummary>> {
    let portfolio = state.db.load_portfolio(None).await?;
    Ok(Json(financial_summary(&portfolio.records())))
}
