use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

text_enum! {
    pub enum ProjectStatus as "project status" {
        Planned => "PLANNED",
        InProgress => "IN_PROGRESS",
        OnHold => "ON_HOLD",
        Completed => "COMPLETED",
        Archived => "ARCHIVED",
    }
}

#[derive(sqlx::FromRow, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: i32,
    pub project_code: String,
    pub name: String,
    pub description: Option<String>,
    pub po_number: String,
    pub po_date: NaiveDate,
    pub po_amount: f64,
    pub client_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub budget: f64,
    #[sqlx(try_from = "String")]
    pub status: ProjectStatus,
    pub created_by: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Project row with the number of related records, used by the list view.
#[derive(sqlx::FromRow, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ProjectWithCounts {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub project: Project,
    pub milestone_count: i64,
    pub allocation_count: i64,
    pub expense_count: i64,
}

/// Body of project create and update requests.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInput {
    pub name: String,
    pub project_code: String,
    pub description: Option<String>,
    pub po_number: String,
    pub po_date: NaiveDate,
    pub po_amount: f64,
    pub client_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub budget: f64,
}
