//! Bearer-token authentication and role checks.

mod jwt;
mod password;

pub use jwt::JwtService;
pub use password::{hash_password, verify_password};

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use serde::Serialize;

use crate::api::AppState;
use crate::error::ApiError;
use crate::models::{Role, User};

pub const NO_TOKEN: &str = "Access denied. No token provided.";
pub const INVALID_TOKEN: &str = "Invalid token.";

/// The authenticated caller, attached to each protected request.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub id: i32,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
        }
    }
}

impl CurrentUser {
    /// ADMIN passes every check.
    pub fn require_role(&self, allowed: &[Role]) -> Result<(), ApiError> {
        if self.role == Role::Admin || allowed.contains(&self.role) {
            return Ok(());
        }
        tracing::warn!(user = self.id, role = %self.role, "insufficient permissions");
        Err(ApiError::Forbidden("Insufficient permissions".to_string()))
    }
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Rejects requests without a valid token for an existing user and
/// inserts the `CurrentUser` into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&req).ok_or_else(|| ApiError::Unauthorized(NO_TOKEN.to_string()))?;
    let claims = state.jwt.verify(token)?;

    let user = state
        .db
        .find_user(claims.user_id()?)
        .await?
        .ok_or_else(|| {
            tracing::warn!(sub = %claims.sub, "token for unknown user");
            ApiError::Unauthorized(INVALID_TOKEN.to_string())
        })?;

    req.extensions_mut().insert(CurrentUser::from(user));
    Ok(next.run(req).await)
}
