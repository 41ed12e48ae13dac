use std::collections::HashMap;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Extension, Json, Router};
use serde::Serialize;

use super::{ApiJson, ApiPath, ApiQuery, AppState, WindowQuery};
use crate::analysis::allocation::{current_utilization, utilization_report, UtilizationReport};
use crate::auth::CurrentUser;
use crate::db::AllocationFilter;
use crate::error::{ApiError, ApiResult};
use crate::models::{AllocationInput, AllocationView, Resource, ResourceAllocation, ResourceInput, Role};
use crate::validation::Validate;

const MANAGERS: &[Role] = &[Role::ResourceManager];
const ALLOCATORS: &[Role] = &[Role::ResourceManager, Role::ProjectManager];

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_resources).post(create_resource))
        .route("/:id", get(get_resource).put(update_resource))
        .route("/:id/deactivate", patch(deactivate))
        .route("/:id/activate", patch(activate))
        .route("/:id/allocations", post(allocate))
        .route("/:id/utilization", get(utilization))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSummary {
    #[serde(flatten)]
    resource: Resource,
    allocations: Vec<AllocationView>,
    current_utilization: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDetail {
    #[serde(flatten)]
    resource: Resource,
    allocations: Vec<AllocationView>,
}

fn code_or_email_taken(err: sqlx::Error) -> ApiError {
    match ApiError::from(err) {
        ApiError::Conflict(_) => ApiError::Conflict("Resource code or email already exists".to_string()),
        other => other,
    }
}

async fn list_resources(State(state): State<AppState>) -> ApiResult<Json<Vec<ResourceSummary>>> {
    let resources = state.db.list_resources().await?;
    let active = state
        .db
        .list_allocations(AllocationFilter {
            active_only: true,
            ..Default::default()
        })
        .await?;

    let mut by_resource: HashMap<i32, Vec<AllocationView>> = HashMap::new();
    for view in active {
        by_resource.entry(view.allocation.resource_id).or_default().push(view);
    }

    let summaries = resources
        .into_iter()
        .map(|resource| {
            let allocations = by_resource.remove(&resource.id).unwrap_or_default();
            ResourceSummary {
                current_utilization: current_utilization(allocations.iter().map(|v| &v.allocation)),
                resource,
                allocations,
            }
        })
        .collect();

    Ok(Json(summaries))
}

async fn get_resource(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Json<ResourceDetail>> {
    let resource = state
        .db
        .find_resource(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Resource"))?;
    let allocations = state
        .db
        .list_allocations(AllocationFilter {
            resource_id: Some(id),
            ..Default::default()
        })
        .await?;

    Ok(Json(ResourceDetail { resource, allocations }))
}

async fn create_resource(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(input): ApiJson<ResourceInput>,
) -> ApiResult<(StatusCode, Json<Resource>)> {
    user.require_role(MANAGERS)?;
    input.validate()?;

    let resource = state
        .db
        .create_resource(&input, user.id)
        .await
        .map_err(code_or_email_taken)?;
    tracing::info!(resource = resource.id, code = %resource.resource_code, "resource created");

    Ok((StatusCode::CREATED, Json(resource)))
}

async fn update_resource(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(input): ApiJson<ResourceInput>,
) -> ApiResult<Json<Resource>> {
    user.require_role(MANAGERS)?;
    input.validate()?;

    let resource = state
        .db
        .update_resource(id, &input)
        .await
        .map_err(code_or_email_taken)?
        .ok_or_else(|| ApiError::not_found("Resource"))?;

    Ok(Json(resource))
}

async fn deactivate(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Json<Resource>> {
    user.require_role(MANAGERS)?;

    let resource = state
        .db
        .deactivate_resource(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Resource"))?;

    Ok(Json(resource))
}

async fn activate(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Json<Resource>> {
    user.require_role(MANAGERS)?;

    let resource = state
        .db
        .activate_resource(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Resource"))?;

    Ok(Json(resource))
}

async fn allocate(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(input): ApiJson<AllocationInput>,
) -> ApiResult<(StatusCode, Json<ResourceAllocation>)> {
    user.require_role(ALLOCATORS)?;
    input.validate()?;

    let allocation = state.db.allocate(id, &input).await?;
    Ok((StatusCode::CREATED, Json(allocation)))
}

async fn utilization(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    ApiQuery(query): ApiQuery<WindowQuery>,
) -> ApiResult<Json<UtilizationReport>> {
    let resource = state
        .db
        .find_resource(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Resource"))?;
    let allocations = state
        .db
        .list_allocations(AllocationFilter {
            resource_id: Some(id),
            active_only: true,
            ..Default::default()
        })
        .await?;

    Ok(Json(utilization_report(&resource, allocations, query.window())))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::api::testing::{state, user};

    fn allocation() -> AllocationInput {
        AllocationInput {
            project_id: 1,
            start_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            allocation: 50.0,
            hourly_rate: 60.0,
        }
    }

    #[tokio::test]
    async fn executives_and_finance_cannot_allocate() {
        for role in [Role::Executive, Role::FinanceManager] {
            let result = allocate(
                State(state()),
                Extension(user(role)),
                ApiPath(1),
                ApiJson(allocation()),
            )
            .await;
            assert!(matches!(result, Err(ApiError::Forbidden(_))), "{role}");
        }
    }

    #[tokio::test]
    async fn project_managers_allocate_but_do_not_manage_resources() {
        let input = ResourceInput {
            resource_code: "RES-010".into(),
            name: "Dana Analyst".into(),
            email: "dana@company.com".into(),
            phone: None,
            salary: None,
            hourly_rate: Some(55.0),
            years_of_exp: 2,
            skills: vec!["SQL".into()],
            certifications: vec![],
        };
        let result = create_resource(
            State(state()),
            Extension(user(Role::ProjectManager)),
            ApiJson(input),
        )
        .await;
        assert!(matches!(result, Err(ApiError::Forbidden(_))));

        let result = deactivate(State(state()), Extension(user(Role::ProjectManager)), ApiPath(1)).await;
        assert!(matches!(result, Err(ApiError::Forbidden(_))));

        assert!(user(Role::ProjectManager).require_role(ALLOCATORS).is_ok());
        assert!(user(Role::ResourceManager).require_role(ALLOCATORS).is_ok());
        assert!(user(Role::ResourceManager).require_role(MANAGERS).is_ok());
    }
}
