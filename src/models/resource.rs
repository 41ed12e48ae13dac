use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(sqlx::FromRow, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: i32,
    pub resource_code: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub salary: Option<f64>,
    pub hourly_rate: Option<f64>,
    pub years_of_exp: i32,
    pub skills: Vec<String>,
    pub certifications: Vec<String>,
    pub is_active: bool,
    pub created_by: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of resource create and update requests.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ResourceInput {
    pub resource_code: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub salary: Option<f64>,
    pub hourly_rate: Option<f64>,
    pub years_of_exp: i32,
    pub skills: Vec<String>,
    #[serde(default)]
    pub certifications: Vec<String>,
}
