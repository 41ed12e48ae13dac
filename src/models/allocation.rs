use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::ProjectStatus;

#[derive(sqlx::FromRow, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ResourceAllocation {
    pub id: i32,
    pub resource_id: i32,
    pub project_id: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Share of the resource's time, in percent.
    pub allocation: f64,
    pub hourly_rate: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Allocation joined with the names of its resource and project.
#[derive(sqlx::FromRow, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AllocationView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub allocation: ResourceAllocation,
    pub resource_name: String,
    pub resource_code: String,
    pub project_name: String,
    pub project_code: String,
    #[sqlx(try_from = "String")]
    pub project_status: ProjectStatus,
}

/// Body of `POST /resources/:id/allocations`.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AllocationInput {
    pub project_id: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub allocation: f64,
    pub hourly_rate: f64,
}
