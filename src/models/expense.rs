use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

text_enum! {
    pub enum ExpenseCategory as "expense category" {
        ResourceCost => "RESOURCE_COST",
        License => "LICENSE",
        Infrastructure => "INFRASTRUCTURE",
        Travel => "TRAVEL",
        Material => "MATERIAL",
        Other => "OTHER",
    }
}

#[derive(sqlx::FromRow, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: i32,
    pub project_id: i32,
    pub description: String,
    pub amount: f64,
    #[sqlx(try_from = "String")]
    pub category: ExpenseCategory,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub expense: Expense,
    pub project_name: String,
    pub project_code: String,
}

/// Body of expense create and update requests. `project_id` is only read on
/// create.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseInput {
    pub project_id: Option<i32>,
    pub description: String,
    pub amount: f64,
    pub category: ExpenseCategory,
    pub date: NaiveDate,
}
