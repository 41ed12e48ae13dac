use std::collections::HashMap;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{today, ApiJson, ApiQuery, AppState, WindowQuery};
use crate::analysis::allocation::{resource_utilization, ResourceUtilization};
use crate::analysis::budget::{
    financial_summary_report, project_status_report, FinancialSummaryReport, ProjectStatusRow,
};
use crate::analysis::dashboard::{dashboard, Dashboard};
use crate::analysis::schedule::{milestone_slippage, SlippageReport};
use crate::analysis::{within, DateWindow, Portfolio};
use crate::db::{AllocationFilter, ExpenseFilter, MilestoneFilter};
use crate::error::{ApiError, ApiResult};
use crate::models::{text_enum, AllocationView, Expense, ExpenseView, Milestone, Project};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/project-status", get(project_status))
        .route("/resource-utilization", get(utilization))
        .route("/financial-summary", get(financial))
        .route("/milestone-slippage", get(slippage))
        .route("/dashboard", get(overview))
        .route("/custom", post(custom))
}

async fn project_status(State(state): State<AppState>) -> ApiResult<Json<Vec<ProjectStatusRow>>> {
    let portfolio = state.db.load_portfolio(None).await?;
    Ok(Json(project_status_report(&portfolio.records())))
}

async fn utilization(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<WindowQuery>,
) -> ApiResult<Json<Vec<ResourceUtilization>>> {
    let resources = state.db.list_resources().await?;
    let allocations = state
        .db
        .list_allocations(AllocationFilter {
            active_only: true,
            ..Default::default()
        })
        .await?;

    Ok(Json(resource_utilization(&resources, &allocations, query.window())))
}

async fn financial(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<WindowQuery>,
) -> ApiResult<Json<FinancialSummaryReport>> {
    let portfolio = state.db.load_portfolio(None).await?;
    Ok(Json(financial_summary_report(&portfolio.records(), query.window())))
}

async fn slippage(State(state): State<AppState>) -> ApiResult<Json<SlippageReport>> {
    let milestones = state.db.list_milestones(MilestoneFilter::default()).await?;
    Ok(Json(milestone_slippage(&milestones, today())))
}

async fn overview(State(state): State<AppState>) -> ApiResult<Json<Dashboard>> {
    let portfolio = state.db.load_portfolio(None).await?;
    let resources = state.db.list_resources().await?;
    Ok(Json(dashboard(&portfolio.records(), &resources, today())))
}

text_enum! {
    pub enum ReportType as "report type" {
        ProjectPerformance => "PROJECT_PERFORMANCE",
        ResourceAllocation => "RESOURCE_ALLOCATION",
        FinancialAnalysis => "FINANCIAL_ANALYSIS",
    }
}

/// Filters echoed back with the report.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct CustomFilters {
    project_ids: Option<Vec<i32>>,
    resource_ids: Option<Vec<i32>>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
}

impl CustomFilters {
    fn window(&self) -> Option<DateWindow> {
        DateWindow::from_bounds(self.start_date, self.end_date)
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CustomReportRequest {
    report_type: String,
    group_by: Option<String>,
    #[serde(flatten)]
    filters: CustomFilters,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPerformance {
    #[serde(flatten)]
    project: Project,
    milestones: Vec<Milestone>,
    expenses: Vec<Expense>,
    allocations: Vec<AllocationView>,
}

#[derive(Serialize, Debug)]
#[serde(untagged)]
pub enum CustomData {
    Projects(Vec<ProjectPerformance>),
    Allocations(Vec<AllocationView>),
    Expenses(Vec<ExpenseView>),
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CustomReport {
    report_type: ReportType,
    group_by: Option<String>,
    filters: CustomFilters,
    data: CustomData,
    generated_at: DateTime<Utc>,
}

fn selected(ids: Option<&[i32]>, id: i32) -> bool {
    ids.is_none_or(|ids| ids.contains(&id))
}

/// Projects created inside `window`, each with its milestones, expenses and
/// allocations.
fn project_performance(
    portfolio: Portfolio,
    allocations: Vec<AllocationView>,
    window: Option<DateWindow>,
) -> Vec<ProjectPerformance> {
    let mut rows: Vec<ProjectPerformance> = portfolio
        .projects
        .into_iter()
        .filter(|p| within(window, p.created_at.date_naive()))
        .map(|project| ProjectPerformance {
            project,
            milestones: Vec::new(),
            expenses: Vec::new(),
            allocations: Vec::new(),
        })
        .collect();
    let index: HashMap<i32, usize> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| (row.project.id, i))
        .collect();

    for m in portfolio.milestones {
        if let Some(&i) = index.get(&m.project_id) {
            rows[i].milestones.push(m);
        }
    }
    for e in portfolio.expenses {
        if let Some(&i) = index.get(&e.project_id) {
            rows[i].expenses.push(e);
        }
    }
    for a in allocations {
        if let Some(&i) = index.get(&a.allocation.project_id) {
            rows[i].allocations.push(a);
        }
    }
    rows
}

/// Allocations of the selected resources that overlap `window`.
fn allocation_rows(
    allocations: Vec<AllocationView>,
    resource_ids: Option<&[i32]>,
    window: Option<DateWindow>,
) -> Vec<AllocationView> {
    allocations
        .into_iter()
        .filter(|v| {
            let a = &v.allocation;
            selected(resource_ids, a.resource_id)
                && window.is_none_or(|w| w.overlaps(a.start_date, a.end_date))
        })
        .collect()
}

async fn custom(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CustomReportRequest>,
) -> ApiResult<Json<CustomReport>> {
    let report_type: ReportType = request
        .report_type
        .parse()
        .map_err(|_| ApiError::Validation("Invalid report type".to_string()))?;
    let filters = request.filters;
    let window = filters.window();
    let project_ids = filters.project_ids.as_deref();

    let data = match report_type {
        ReportType::ProjectPerformance => {
            let portfolio = state.db.load_portfolio(project_ids).await?;
            let allocations = state.db.list_allocations(AllocationFilter::default()).await?;
            CustomData::Projects(project_performance(portfolio, allocations, window))
        }
        ReportType::ResourceAllocation => {
            let allocations = state.db.list_allocations(AllocationFilter::default()).await?;
            CustomData::Allocations(allocation_rows(
                allocations,
                filters.resource_ids.as_deref(),
                window,
            ))
        }
        ReportType::FinancialAnalysis => {
            let expenses = state
                .db
                .list_expenses(ExpenseFilter {
                    window,
                    ..Default::default()
                })
                .await?;
            CustomData::Expenses(
                expenses
                    .into_iter()
                    .filter(|e| selected(project_ids, e.expense.project_id))
                    .collect(),
            )
        }
    };

    Ok(Json(CustomReport {
        report_type,
        group_by: request.group_by,
        filters,
        data,
        generated_at: Utc::now(),
    }))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::analysis::fixtures::*;
    use crate::models::{ExpenseCategory, MilestoneStatus, ProjectStatus};

    fn view(id: i32, resource_id: i32, project_id: i32, start: &str, end: &str) -> AllocationView {
        let mut a = allocation(id, project_id, start, end, 50.0);
        a.resource_id = resource_id;
        AllocationView {
            allocation: a,
            resource_name: "Dev".into(),
            resource_code: "RES-001".into(),
            project_name: "Project".into(),
            project_code: "PROJ-001".into(),
            project_status: ProjectStatus::InProgress,
        }
    }

    #[test]
    fn report_types_parse_from_wire_names() {
        assert_eq!(
            "RESOURCE_ALLOCATION".parse::<ReportType>().unwrap(),
            ReportType::ResourceAllocation
        );
        assert!("SALES".parse::<ReportType>().is_err());
    }

    #[test]
    fn request_flattens_filters() {
        let req: CustomReportRequest = serde_json::from_value(serde_json::json!({
            "reportType": "FINANCIAL_ANALYSIS",
            "projectIds": [1, 2],
            "startDate": "2024-01-01",
            "endDate": "2024-03-31",
            "groupBy": "category"
        }))
        .unwrap();

        assert_eq!(req.report_type, "FINANCIAL_ANALYSIS");
        assert_eq!(req.filters.project_ids, Some(vec![1, 2]));
        assert!(req.filters.window().is_some());
        assert_eq!(req.group_by.as_deref(), Some("category"));
    }

    #[test]
    fn allocation_rows_filter_by_resource_and_window() {
        let views = vec![
            view(1, 1, 1, "2024-01-01", "2024-01-31"),
            view(2, 2, 1, "2024-01-15", "2024-02-15"),
            view(3, 1, 2, "2024-05-01", "2024-05-31"),
        ];
        let window = DateWindow::from_bounds(Some(date("2024-01-20")), Some(date("2024-03-01")));

        let ids: Vec<i32> = allocation_rows(views.clone(), Some(&[1]), None)
            .iter()
            .map(|v| v.allocation.id)
            .collect();
        assert_eq!(ids, vec![1, 3]);

        let ids: Vec<i32> = allocation_rows(views, None, window)
            .iter()
            .map(|v| v.allocation.id)
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn project_performance_groups_rows_and_applies_creation_window() {
        let mut late = project(2, 500.0);
        late.created_at += Duration::days(200);
        let portfolio = Portfolio {
            projects: vec![project(1, 1000.0), late],
            milestones: vec![milestone(1, 1, "2024-03-01", None, MilestoneStatus::Planned)],
            allocations: vec![],
            expenses: vec![
                expense(1, 1, 10.0, ExpenseCategory::Travel, "2024-02-01"),
                expense(2, 2, 20.0, ExpenseCategory::Travel, "2024-02-01"),
            ],
            invoices: vec![],
        };
        let allocations = vec![view(1, 1, 1, "2024-01-01", "2024-01-31")];
        let window = DateWindow::from_bounds(Some(date("2023-12-01")), Some(date("2024-02-01")));

        let rows = project_performance(portfolio, allocations, window);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].project.id, 1);
        assert_eq!(rows[0].milestones.len(), 1);
        assert_eq!(rows[0].expenses.len(), 1);
        assert_eq!(rows[0].allocations.len(), 1);
    }
}
