use sqlx::Result;

use super::Database;
use crate::models::{Role, User};

impl Database {
    pub async fn find_user(&self, id: i32) -> Result<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(self.pool())
            .await
    }

    /// Fails with a unique violation when the email is taken.
    pub async fn create_user(&self, email: &str, name: &str, password_hash: &str, role: Role) -> Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, name, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(name)
        .bind(password_hash)
        .bind(role.as_str())
        .fetch_one(self.pool())
        .await
    }

    /// Insert or refresh a user by email. Used by the seed command.
    pub async fn upsert_user(&self, email: &str, name: &str, password_hash: &str, role: Role) -> Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, name, password_hash, role)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO UPDATE
            SET name = EXCLUDED.name,
                password_hash = EXCLUDED.password_hash,
                role = EXCLUDED.role,
                updated_at = now()
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(name)
        .bind(password_hash)
        .bind(role.as_str())
        .fetch_one(self.pool())
        .await
    }
}
