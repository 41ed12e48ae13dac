use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Serialize;

use super::{ApiJson, AppState};
use crate::auth::{hash_password, verify_password, CurrentUser};
use crate::error::{ApiError, ApiResult};
use crate::models::{LoginInput, RegisterInput, Role, User};
use crate::validation::Validate;

const INVALID_CREDENTIALS: &str = "Invalid credentials";

#[derive(Serialize)]
pub struct AuthResponse {
    message: &'static str,
    user: User,
    token: String,
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<RegisterInput>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    input.validate()?;

    let role = input.role.unwrap_or_default();
    if role == Role::Admin {
        return Err(ApiError::Forbidden("Cannot self-register as ADMIN".to_string()));
    }

    if state.db.find_user_by_email(&input.email).await?.is_some() {
        return Err(ApiError::Conflict("User already exists".to_string()));
    }

    let hash = hash_password(&input.password)?;
    let user = state
        .db
        .create_user(&input.email, input.name.trim(), &hash, role)
        .await?;
    let token = state.jwt.issue(&user)?;
    tracing::info!(user = user.id, role = %user.role, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User created successfully",
            user,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<LoginInput>,
) -> ApiResult<Json<AuthResponse>> {
    input.validate()?;

    let user = state
        .db
        .find_user_by_email(&input.email)
        .await?
        .filter(|user| verify_password(&input.password, &user.password_hash))
        .ok_or_else(|| {
            tracing::warn!(email = %input.email, "failed login");
            ApiError::Unauthorized(INVALID_CREDENTIALS.to_string())
        })?;

    let token = state.jwt.issue(&user)?;
    Ok(Json(AuthResponse {
        message: "Login successful",
        user,
        token,
    }))
}

pub async fn me(Extension(user): Extension<CurrentUser>) -> Json<CurrentUser> {
    Json(user)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::api::testing::*;

    #[tokio::test]
    async fn register_validates_before_storage() {
        let req = json_request(
            "POST",
            "/api/auth/register",
            json!({ "email": "bad", "password": "secret1", "name": "A" }),
        );
        let (status, body) = send(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid email address");
        assert_eq!(body["code"], "VALIDATION_FAILED");
    }

    #[tokio::test]
    async fn admin_self_registration_is_refused() {
        let req = json_request(
            "POST",
            "/api/auth/register",
            json!({ "email": "a@b.co", "password": "secret1", "name": "A", "role": "ADMIN" }),
        );
        let (status, body) = send(req).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn unknown_role_is_a_bad_request() {
        let req = json_request(
            "POST",
            "/api/auth/register",
            json!({ "email": "a@b.co", "password": "secret1", "name": "A", "role": "JANITOR" }),
        );
        let (status, _) = send(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn login_requires_both_fields() {
        let req = json_request("POST", "/api/auth/login", json!({ "email": "a@b.co", "password": "" }));
        let (status, body) = send(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Email and password are required");
    }
}
