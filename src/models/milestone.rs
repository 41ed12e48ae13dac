use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

text_enum! {
    pub enum MilestoneStatus as "milestone status" {
        Planned => "PLANNED",
        InProgress => "IN_PROGRESS",
        Completed => "COMPLETED",
        Delayed => "DELAYED",
        Cancelled => "CANCELLED",
    }
}

#[derive(sqlx::FromRow, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub id: i32,
    pub project_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub scheduled_date: NaiveDate,
    pub actual_date: Option<NaiveDate>,
    pub is_billing_milestone: bool,
    pub billing_amount: Option<f64>,
    pub billing_percentage: Option<f64>,
    #[sqlx(try_from = "String")]
    pub status: MilestoneStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Milestone joined with its project name and invoice count.
#[derive(sqlx::FromRow, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub milestone: Milestone,
    pub project_name: String,
    pub project_code: String,
    pub invoice_count: i64,
}

/// Body of milestone create and update requests. `project_id` is only read
/// on create.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneInput {
    pub project_id: Option<i32>,
    pub name: String,
    pub description: Option<String>,
    pub scheduled_date: NaiveDate,
    #[serde(default)]
    pub is_billing_milestone: bool,
    pub billing_amount: Option<f64>,
    pub billing_percentage: Option<f64>,
}
