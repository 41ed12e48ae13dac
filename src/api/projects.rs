use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};

use super::{ApiJson, ApiPath, AppState};
use crate::analysis::budget::{project_dashboard, ProjectDashboard};
use crate::analysis::Portfolio;
use crate::auth::CurrentUser;
use crate::db::AllocationFilter;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    AllocationView, Expense, Invoice, Milestone, Project, ProjectInput, ProjectStatus, ProjectWithCounts, Role,
};
use crate::validation::Validate;

const EDITORS: &[Role] = &[Role::ProjectManager];

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_projects).post(create_project))
        .route("/:id", get(get_project).put(update_project).delete(archive_project))
        .route("/:id/status", patch(update_status))
        .route("/:id/dashboard", get(dashboard))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetail {
    #[serde(flatten)]
    project: Project,
    milestones: Vec<Milestone>,
    allocations: Vec<AllocationView>,
    expenses: Vec<Expense>,
    invoices: Vec<Invoice>,
}

#[derive(Deserialize)]
pub struct StatusInput {
    status: ProjectStatus,
}

#[derive(Serialize)]
pub struct Archived {
    message: &'static str,
    project: Project,
}

fn code_taken(err: sqlx::Error) -> ApiError {
    match ApiError::from(err) {
        ApiError::Conflict(_) => ApiError::Conflict("Project code already exists".to_string()),
        other => other,
    }
}

async fn list_projects(State(state): State<AppState>) -> ApiResult<Json<Vec<ProjectWithCounts>>> {
    Ok(Json(state.db.list_projects().await?))
}

async fn get_project(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Json<ProjectDetail>> {
    let Portfolio {
        mut projects,
        milestones,
        expenses,
        invoices,
        ..
    } = state.db.load_portfolio(Some(&[id])).await?;
    let project = projects.pop().ok_or_else(|| ApiError::not_found("Project"))?;

    let allocations = state
        .db
        .list_allocations(AllocationFilter {
            project_id: Some(id),
            ..Default::default()
        })
        .await?;

    Ok(Json(ProjectDetail {
        project,
        milestones,
        allocations,
        expenses,
        invoices,
    }))
}

async fn create_project(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(input): ApiJson<ProjectInput>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    user.require_role(EDITORS)?;
    input.validate()?;

    let project = state.db.create_project(&input, user.id).await.map_err(code_taken)?;
    tracing::info!(project = project.id, code = %project.project_code, "project created");

    Ok((StatusCode::CREATED, Json(project)))
}

async fn update_project(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(input): ApiJson<ProjectInput>,
) -> ApiResult<Json<Project>> {
    user.require_role(EDITORS)?;
    input.validate()?;

    let project = state
        .db
        .update_project(id, &input)
        .await
        .map_err(code_taken)?
        .ok_or_else(|| ApiError::not_found("Project"))?;

    Ok(Json(project))
}

async fn update_status(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(input): ApiJson<StatusInput>,
) -> ApiResult<Json<Project>> {
    user.require_role(EDITORS)?;

    let project = state
        .db
        .set_project_status(id, input.status)
        .await?
        .ok_or_else(|| ApiError::not_found("Project"))?;

    Ok(Json(project))
}

/// Projects are never removed, only archived.
async fn archive_project(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Json<Archived>> {
    user.require_role(EDITORS)?;

    let project = state
        .db
        .set_project_status(id, ProjectStatus::Archived)
        .await?
        .ok_or_else(|| ApiError::not_found("Project"))?;
    tracing::info!(project = id, "project archived");

    Ok(Json(Archived {
        message: "Project archived successfully",
        project,
    }))
}

async fn dashboard(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Json<ProjectDashboard>> {
    let portfolio = state.db.load_portfolio(Some(&[id])).await?;
    let records = portfolio.records();
    let project = records.first().ok_or_else(|| ApiError::not_found("Project"))?;

    Ok(Json(project_dashboard(project)))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::api::testing::{state, user};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn input() -> ProjectInput {
        ProjectInput {
            name: "Data Platform".into(),
            project_code: "PROJ-2024-009".into(),
            description: None,
            po_number: "PO-9".into(),
            po_date: d(2024, 1, 10),
            po_amount: 50_000.0,
            client_name: "Acme".into(),
            start_date: d(2024, 2, 1),
            end_date: d(2024, 6, 30),
            budget: 40_000.0,
        }
    }

    #[tokio::test]
    async fn resource_and_finance_managers_cannot_create_projects() {
        for role in [Role::ResourceManager, Role::FinanceManager, Role::Executive] {
            let result = create_project(State(state()), Extension(user(role)), ApiJson(input())).await;
            assert!(matches!(result, Err(ApiError::Forbidden(_))), "{role}");
        }
    }

    #[tokio::test]
    async fn archiving_and_status_changes_need_an_editor() {
        let result = archive_project(State(state()), Extension(user(Role::FinanceManager)), ApiPath(1)).await;
        assert!(matches!(result, Err(ApiError::Forbidden(_))));

        let result = update_status(
            State(state()),
            Extension(user(Role::ResourceManager)),
            ApiPath(1),
            ApiJson(StatusInput {
                status: ProjectStatus::OnHold,
            }),
        )
        .await;
        assert!(matches!(result, Err(ApiError::Forbidden(_))));

        assert!(user(Role::ProjectManager).require_role(EDITORS).is_ok());
        assert!(user(Role::Admin).require_role(EDITORS).is_ok());
    }
}
