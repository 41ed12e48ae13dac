use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Extension, Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{today, ApiJson, ApiPath, ApiQuery, AppState};
use crate::analysis::schedule::{delayed_milestones, milestone_timeline, DelayedMilestone, Timeline};
use crate::analysis::Portfolio;
use crate::auth::CurrentUser;
use crate::db::{InvoiceFilter, MilestoneFilter};
use crate::error::{ApiError, ApiResult};
use crate::models::{InvoiceView, Milestone, MilestoneInput, MilestoneStatus, MilestoneView, Role};
use crate::validation::Validate;

const EDITORS: &[Role] = &[Role::ProjectManager];

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_milestones).post(create_milestone))
        .route(
            "/:id",
            get(get_milestone).put(update_milestone).delete(delete_milestone),
        )
        .route("/:id/status", patch(update_status))
        .route("/project/:project_id", get(project_milestones))
        .route("/project/:project_id/timeline", get(timeline))
        .route("/delayed/all", get(delayed))
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneQuery {
    project_id: Option<i32>,
    status: Option<MilestoneStatus>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusInput {
    status: MilestoneStatus,
    actual_date: Option<NaiveDate>,
}

impl StatusInput {
    /// Completing a milestone always records when it happened; other
    /// statuses never touch the stored date.
    fn actual_date(&self, today: NaiveDate) -> Option<NaiveDate> {
        match self.status {
            MilestoneStatus::Completed => Some(self.actual_date.unwrap_or(today)),
            _ => None,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneDetail {
    #[serde(flatten)]
    milestone: Milestone,
    invoices: Vec<InvoiceView>,
}

async fn list_milestones(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<MilestoneQuery>,
) -> ApiResult<Json<Vec<MilestoneView>>> {
    let filter = MilestoneFilter {
        project_id: query.project_id,
        status: query.status,
    };
    Ok(Json(state.db.list_milestones(filter).await?))
}

async fn get_milestone(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Json<MilestoneDetail>> {
    let milestone = state
        .db
        .find_milestone(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Milestone"))?;
    let invoices = state
        .db
        .list_invoices(InvoiceFilter {
            milestone_id: Some(id),
            ..Default::default()
        })
        .await?;

    Ok(Json(MilestoneDetail { milestone, invoices }))
}

async fn create_milestone(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(input): ApiJson<MilestoneInput>,
) -> ApiResult<(StatusCode, Json<Milestone>)> {
    user.require_role(EDITORS)?;
    input.validate()?;

    let project_id = input
        .project_id
        .ok_or_else(|| ApiError::Validation("projectId is required".to_string()))?;
    if state.db.find_project(project_id).await?.is_none() {
        return Err(ApiError::not_found("Project"));
    }

    let milestone = state.db.create_milestone(project_id, &input).await?;
    Ok((StatusCode::CREATED, Json(milestone)))
}

async fn update_milestone(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(input): ApiJson<MilestoneInput>,
) -> ApiResult<Json<Milestone>> {
    user.require_role(EDITORS)?;
    input.validate()?;

    let milestone = state
        .db
        .update_milestone(id, &input)
        .await?
        .ok_or_else(|| ApiError::not_found("Milestone"))?;

    Ok(Json(milestone))
}

async fn update_status(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(input): ApiJson<StatusInput>,
) -> ApiResult<Json<Milestone>> {
    user.require_role(EDITORS)?;

    let milestone = state
        .db
        .set_milestone_status(id, input.status, input.actual_date(today()))
        .await?
        .ok_or_else(|| ApiError::not_found("Milestone"))?;

    Ok(Json(milestone))
}

/// Milestones referenced by invoices cannot be removed.
async fn delete_milestone(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Json<Value>> {
    user.require_role(EDITORS)?;

    if state.db.find_milestone(id).await?.is_none() {
        return Err(ApiError::not_found("Milestone"));
    }
    if state.db.count_milestone_invoices(id).await? > 0 {
        return Err(ApiError::Validation(
            "Cannot delete milestone with associated invoices".to_string(),
        ));
    }
    if !state.db.delete_milestone(id).await? {
        return Err(ApiError::not_found("Milestone"));
    }

    Ok(Json(json!({ "message": "Milestone deleted successfully" })))
}

async fn project_milestones(
    State(state): State<AppState>,
    ApiPath(project_id): ApiPath<i32>,
) -> ApiResult<Json<Vec<MilestoneView>>> {
    let filter = MilestoneFilter {
        project_id: Some(project_id),
        ..Default::default()
    };
    Ok(Json(state.db.list_milestones(filter).await?))
}

async fn timeline(
    State(state): State<AppState>,
    ApiPath(project_id): ApiPath<i32>,
) -> ApiResult<Json<Timeline>> {
    let Portfolio {
        projects, milestones, ..
    } = state.db.load_portfolio(Some(&[project_id])).await?;
    let project = projects.first().ok_or_else(|| ApiError::not_found("Project"))?;

    Ok(Json(milestone_timeline(project, &milestones, today())))
}

async fn delayed(State(state): State<AppState>) -> ApiResult<Json<Vec<DelayedMilestone>>> {
    let milestones = state.db.list_milestones(MilestoneFilter::default()).await?;
    Ok(Json(delayed_milestones(milestones, today())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{state, user};

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn completion_defaults_actual_date_to_today() {
        let today = d("2024-06-15");
        let input = StatusInput {
            status: MilestoneStatus::Completed,
            actual_date: None,
        };
        assert_eq!(input.actual_date(today), Some(today));

        let input = StatusInput {
            status: MilestoneStatus::Completed,
            actual_date: Some(d("2024-06-01")),
        };
        assert_eq!(input.actual_date(today), Some(d("2024-06-01")));

        let input = StatusInput {
            status: MilestoneStatus::Delayed,
            actual_date: None,
        };
        assert_eq!(input.actual_date(today), None);
    }

    #[test]
    fn actual_date_is_ignored_unless_completing() {
        let input = StatusInput {
            status: MilestoneStatus::InProgress,
            actual_date: Some(d("2024-06-10")),
        };
        assert_eq!(input.actual_date(d("2024-06-15")), None);
    }

    #[tokio::test]
    async fn only_project_managers_edit_milestones() {
        let input = MilestoneInput {
            project_id: Some(1),
            name: "Design sign-off".into(),
            description: None,
            scheduled_date: d("2024-04-15"),
            is_billing_milestone: false,
            billing_amount: None,
            billing_percentage: None,
        };
        for role in [Role::FinanceManager, Role::ResourceManager, Role::Executive] {
            let result = create_milestone(State(state()), Extension(user(role)), ApiJson(input.clone())).await;
            assert!(matches!(result, Err(ApiError::Forbidden(_))), "{role}");

            let result = delete_milestone(State(state()), Extension(user(role)), ApiPath(1)).await;
            assert!(matches!(result, Err(ApiError::Forbidden(_))), "{role}");
        }
        assert!(user(Role::ProjectManager).require_role(EDITORS).is_ok());
    }
}
