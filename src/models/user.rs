use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

text_enum! {
    /// Access level of an authenticated user.
    pub enum Role as "role" {
        Admin => "ADMIN",
        ProjectManager => "PROJECT_MANAGER",
        ResourceManager => "RESOURCE_MANAGER",
        FinanceManager => "FINANCE_MANAGER",
        Executive => "EXECUTIVE",
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::ProjectManager
    }
}

#[derive(sqlx::FromRow, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i32,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /auth/register`.
#[derive(Deserialize, Debug, Clone)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: Option<Role>,
}

/// Body of `POST /auth/login`.
#[derive(Deserialize, Debug, Clone)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}
